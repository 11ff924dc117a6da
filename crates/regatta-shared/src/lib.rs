//! Small lock-free helpers shared by the test harness.

pub mod atomic;
