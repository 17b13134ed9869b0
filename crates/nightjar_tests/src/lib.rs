//! nightjar_tests: end-to-end test harness for the nightjar front end.
//!
//! The crate itself is empty; the suites live under `tests/`.
