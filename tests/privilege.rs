use devutils::fake::FakePrivileges;
use rtprobe::{Capability, CapabilityFlags, CapabilitySet, PrivilegeGate};

#[test]
fn effective_sys_nice_is_required_privilege() {
    let capabilities =
        CapabilitySet::empty().with(Capability::SysNice, CapabilityFlags::EFFECTIVE | CapabilityFlags::PERMITTED);
    let gate = PrivilegeGate::new(FakePrivileges::with_capabilities(capabilities));

    assert!(gate.has_required_privilege());
}

#[test]
fn permitted_but_not_effective_is_not_enough() {
    let capabilities = CapabilitySet::empty().with(Capability::SysNice, CapabilityFlags::PERMITTED);
    let gate = PrivilegeGate::new(FakePrivileges::with_capabilities(capabilities));

    assert!(!gate.has_required_privilege());
}

#[test]
fn other_capabilities_are_not_enough() {
    let capabilities = CapabilitySet::empty()
        .with(Capability::SysAdmin, CapabilityFlags::all())
        .with(Capability::SysResource, CapabilityFlags::all());
    let gate = PrivilegeGate::new(FakePrivileges::with_capabilities(capabilities));

    assert!(!gate.has_required_privilege());
}

#[test]
fn failing_query_is_treated_as_absent() {
    let gate = PrivilegeGate::new(FakePrivileges::failing());

    assert!(!gate.has_required_privilege());
}

#[test]
fn required_capability_is_sys_nice() {
    let gate = PrivilegeGate::new(FakePrivileges::failing());

    assert_eq!(gate.required(), Capability::SysNice);
}

#[test]
fn describe_privileges_without_capabilities() {
    let gate = PrivilegeGate::new(FakePrivileges::with_capabilities(CapabilitySet::empty()));

    assert_eq!(gate.describe_privileges(), "Has caps: = - AT_SECURE: 0");
}

#[test]
fn describe_privileges_with_capabilities_and_secure_execution() {
    let capabilities = CapabilitySet::empty()
        .with(Capability::SysNice, CapabilityFlags::EFFECTIVE | CapabilityFlags::PERMITTED)
        .with(Capability::NetRaw, CapabilityFlags::PERMITTED);
    let gate = PrivilegeGate::new(FakePrivileges {
        secure_execution: Some(true),
        ..FakePrivileges::with_capabilities(capabilities)
    });

    assert_eq!(gate.describe_privileges(), "Has caps: cap_sys_nice=ep cap_net_raw+p - AT_SECURE: 1");
}

#[test]
fn describe_privileges_of_root_without_one_capability() {
    let all_but_sys_resource = ((1 << 41) - 1) & !(1 << Capability::SysResource.number());
    let capabilities = CapabilitySet {
        effective: all_but_sys_resource,
        permitted: all_but_sys_resource,
        inheritable: 0,
    };
    let gate = PrivilegeGate::new(FakePrivileges::with_capabilities(capabilities));

    assert_eq!(gate.describe_privileges(), "Has caps: =ep cap_sys_resource-ep - AT_SECURE: 0");
}

#[test]
fn describe_privileges_is_bounded_by_kernel() {
    let capabilities = CapabilitySet {
        effective: (1 << 38) - 1,
        permitted: (1 << 38) - 1,
        inheritable: 0,
    };
    let gate = PrivilegeGate::new(FakePrivileges {
        last_capability: Some(37),
        ..FakePrivileges::with_capabilities(capabilities)
    });

    assert_eq!(gate.describe_privileges(), "Has caps: =ep - AT_SECURE: 0");
}

#[test]
fn describe_privileges_without_kernel_bound_considers_all_known_capabilities() {
    let capabilities = CapabilitySet {
        effective: (1 << 38) - 1,
        permitted: (1 << 38) - 1,
        inheritable: 0,
    };
    let gate = PrivilegeGate::new(FakePrivileges {
        last_capability: None,
        ..FakePrivileges::with_capabilities(capabilities)
    });

    assert_eq!(
        gate.describe_privileges(),
        "Has caps: =ep cap_perfmon,cap_bpf,cap_checkpoint_restore-ep - AT_SECURE: 0"
    );
}

#[test]
fn describe_privileges_with_failing_queries() {
    let gate = PrivilegeGate::new(FakePrivileges::failing());
    let description = gate.describe_privileges();

    assert!(description.starts_with("Has caps: <unavailable: "));
    assert!(description.contains(" - AT_SECURE: <unavailable: "));
}

#[test]
fn gate_can_borrow_its_source() {
    let privileges = FakePrivileges::failing();
    let gate = PrivilegeGate::new(&privileges);

    assert!(!gate.has_required_privilege());
}
