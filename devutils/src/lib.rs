//! Utilities for testing `rtprobe`

pub mod fake;
pub mod system_tests;
