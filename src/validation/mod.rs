//! Validation utilities
//!
//! Consistency checks for sequence trees, used by the `check` command and
//! after mutations in tests

mod invariants;

pub use invariants::{check_all, check_tree};
