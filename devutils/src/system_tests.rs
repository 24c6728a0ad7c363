//! Utilities for running integration tests against the real operating system and GPU driver
//!
//! These tests depend on the privileges of the test process and on the installed hardware, so they are ignored unless
//! `RTPROBE_SYSTEM_TESTS_ENABLED=true` is set. To run them with `CAP_SYS_NICE`, grant it to the test binary (e.g.
//! `setcap cap_sys_nice+ep <binary>`) or run it as root.

pub extern crate libtest_mimic;

use std::env;
use std::process::ExitCode;

use libtest_mimic::{Arguments, Conclusion, Trial};

/// The environment variable enabling system tests
pub const ENABLED_VAR: &str = "RTPROBE_SYSTEM_TESTS_ENABLED";

#[macro_export]
macro_rules! system_tests {
    ($($test_name:ident),*) => {
        $crate::system_tests![$($test_name,)*];
    };

    ($($test_name:ident,)*) => {
        fn main() -> ::std::process::ExitCode {
            $(
                fn $test_name() -> ::std::result::Result<(), $crate::system_tests::libtest_mimic::Failed> {
                    self::$test_name();
                    ::std::result::Result::Ok(())
                }
            )*

            $crate::system_tests::test_main(::std::vec![
                $(
                    $crate::system_tests::libtest_mimic::Trial::test(
                        stringify!($test_name),
                        $test_name
                    )
                    .with_kind("system")
                ),*
            ])
        }
    };
}

pub fn test_main(tests: Vec<Trial>) -> ExitCode {
    match env::var(ENABLED_VAR).map(|value| value.to_ascii_lowercase()).as_deref() {
        Ok("true") => libtest_mimic::run(&Arguments::from_args(), tests).exit(),

        _ => {
            println!("System tests are disabled, set {ENABLED_VAR}=true to enable");
            ignore_tests(tests).exit()
        }
    }
}

fn ignore_tests(tests: Vec<Trial>) -> Conclusion {
    libtest_mimic::run(
        &Arguments::from_args(),
        tests.into_iter().map(|test| test.with_ignored_flag(true)).collect(),
    )
}
