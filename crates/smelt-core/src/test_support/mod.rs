//! Test support utilities
//!
//! Available to this crate's tests and, with the `test-utils` feature, to other
//! crates' tests.

pub mod mocks;
