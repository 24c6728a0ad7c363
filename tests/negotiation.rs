use devutils::fake::{Call, FakeAccelerator, FakeContext, FakeRuntime};
use rtprobe::{
    ApiVersion, GlobalPriority, NegotiationFailure, Negotiator, Outcome, QueueFlags, QueueRequest, RuntimeError,
};

fn runtime() -> FakeRuntime {
    FakeRuntime::new(vec![
        FakeAccelerator::new("old", ApiVersion::V1_1).family(QueueFlags::COMPUTE),
        FakeAccelerator::new("gpu", ApiVersion::V1_2)
            .family(QueueFlags::GRAPHICS | QueueFlags::COMPUTE)
            .family(QueueFlags::TRANSFER)
            .family(QueueFlags::COMPUTE),
    ])
}

#[test]
fn granted() {
    let runtime = runtime();

    let outcome = Negotiator::new(&runtime).select_and_negotiate(ApiVersion::V1_2, GlobalPriority::Realtime);

    let Outcome::Granted(context) = outcome else {
        panic!("expected granted context");
    };

    assert_eq!(context.priority(), GlobalPriority::Realtime);
    assert_eq!(context.selection().accelerator().handle, 1);
    assert_eq!(context.selection().queue_family_index(), 2);
    assert_eq!(
        context.into_context(),
        FakeContext {
            accelerator: 1,
            request: QueueRequest::single(2, GlobalPriority::Realtime),
        }
    );
}

#[test]
fn requests_exactly_one_queue_of_selected_family() {
    let runtime = runtime();

    Negotiator::new(&runtime).select_and_negotiate(ApiVersion::V1_2, GlobalPriority::High);

    let requests: Vec<_> = runtime
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            Call::CreateContext(accelerator, request) => Some((accelerator, request)),
            _ => None,
        })
        .collect();

    assert_eq!(
        requests,
        vec![(
            1,
            QueueRequest {
                queue_family_index: 2,
                queue_count: 1,
                queue_priority: 1.0,
                global_priority: GlobalPriority::High,
            }
        )]
    );
}

#[test]
fn not_permitted_is_denial_by_policy() {
    let runtime = runtime().denying_creation();

    let outcome = Negotiator::new(&runtime).select_and_negotiate(ApiVersion::V1_2, GlobalPriority::Realtime);

    assert!(outcome.is_denied_by_policy());
    assert!(outcome.failure().is_none());
}

#[test]
fn other_creation_error_is_failure() {
    let err = RuntimeError::Failed {
        call: "vkCreateDevice",
        code: -3,
    };
    let runtime = runtime().failing_creation(err.clone());

    let outcome = Negotiator::new(&runtime).select_and_negotiate(ApiVersion::V1_2, GlobalPriority::Realtime);

    assert!(!outcome.is_denied_by_policy());
    assert_eq!(outcome.failure(), Some(&NegotiationFailure::ContextCreation(err)));
}

#[test]
fn creation_is_attempted_once() {
    let runtime = runtime().failing_creation(RuntimeError::Failed {
        call: "vkCreateDevice",
        code: -4,
    });

    Negotiator::new(&runtime).select_and_negotiate(ApiVersion::V1_2, GlobalPriority::Realtime);

    let attempts = runtime
        .calls()
        .iter()
        .filter(|call| matches!(call, Call::CreateContext(..)))
        .count();

    assert_eq!(attempts, 1);
}

#[test]
fn no_suitable_accelerator_skips_creation() {
    let runtime = FakeRuntime::new(vec![FakeAccelerator::new("gpu", ApiVersion::V1_2).family(QueueFlags::GRAPHICS)]);

    let outcome = Negotiator::new(&runtime).select_and_negotiate(ApiVersion::V1_2, GlobalPriority::Realtime);

    assert_eq!(outcome.failure(), Some(&NegotiationFailure::NoSuitableAccelerator));
    assert!(!runtime.calls().iter().any(|call| matches!(call, Call::CreateContext(..))));
}

#[test]
fn failure_messages_carry_raw_code() {
    let failure = NegotiationFailure::ContextCreation(RuntimeError::Failed {
        call: "vkCreateDevice",
        code: -3,
    });

    assert_eq!(failure.to_string(), "failed to create execution context: vkCreateDevice failed: result code -3");
}
