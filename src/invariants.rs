//! Runtime invariant checks for capture sessions
//!
//! Session transitions assert their invariants through [`assert_invariant!`].
//! Every check is recorded in a thread-local log so contract tests can prove
//! that a scenario actually exercised the invariants it claims to cover.
//!
//! ```rust,ignore
//! use facegate::invariants::{contract_test, SAMPLES_WITHIN_CAPACITY};
//!
//! #[test]
//! fn contract_sample_capacity() {
//!     // ... drive a session to completion ...
//!     contract_test("sample capacity", &[SAMPLES_WITHIN_CAPACITY]);
//! }
//! ```

use std::cell::RefCell;
use std::collections::HashSet;
use std::thread_local;

pub const SAMPLES_WITHIN_CAPACITY: &str = "Buffered samples never exceed the required count";
pub const FINALIZE_ONLY_WHEN_FULL: &str = "Finalization starts only with a full buffer";
pub const SINGLE_FINALIZE: &str = "A filled buffer finalizes exactly once";
pub const ATTEMPTS_MONOTONIC: &str = "Attempt count never decreases";
pub const ATTEMPTS_BOUNDED: &str = "Attempt count never exceeds the maximum";
pub const NO_DETECTION_WHILE_PROCESSING: &str = "No detection starts while processing";

thread_local! {
    static CHECKED: RefCell<HashSet<&'static str>> = RefCell::new(HashSet::new());
}

/// Assert a session invariant and record that it was checked.
///
/// Panics with the invariant text (and optional context) when violated.
#[macro_export]
macro_rules! assert_invariant {
    ($condition:expr, $invariant:expr) => {
        $crate::invariants::check($condition, $invariant, None)
    };
    ($condition:expr, $invariant:expr, $context:expr) => {
        $crate::invariants::check($condition, $invariant, Some($context))
    };
}

#[doc(hidden)]
pub fn check(condition: bool, invariant: &'static str, context: Option<&str>) {
    CHECKED.with(|checked| {
        checked.borrow_mut().insert(invariant);
    });

    if !condition {
        panic!(
            "INVARIANT VIOLATION [{}]: {}",
            context.unwrap_or("session"),
            invariant
        );
    }
}

/// Panic unless every listed invariant was checked on this thread.
pub fn contract_test(name: &str, required: &[&str]) {
    let missing: Vec<&str> = CHECKED.with(|checked| {
        let checked = checked.borrow();
        required
            .iter()
            .copied()
            .filter(|invariant| !checked.contains(*invariant))
            .collect()
    });

    if !missing.is_empty() {
        panic!(
            "CONTRACT FAILURE [{}]: invariants never checked:\n  - {}",
            name,
            missing.join("\n  - ")
        );
    }
}

pub fn clear_checked() {
    CHECKED.with(|checked| checked.borrow_mut().clear());
}
