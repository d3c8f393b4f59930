//! Panic isolation for strategy, reducer and task calls
//!
//! A fault in one participant must not take the tick down with it. Calls are
//! run under `catch_unwind`; a panic becomes [`Error::Panicked`] and is handled
//! like any other returned error.

use crate::error::{Error, Result};
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

/// Run `f`, converting a panic into `Error::Panicked`
pub(crate) fn guarded<T>(f: impl FnOnce() -> Result<T>) -> Result<T> {
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(Error::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ok_passes_through() {
        assert_eq!(guarded(|| Ok(7)).unwrap(), 7);
    }

    #[test]
    fn test_error_passes_through() {
        let result: Result<()> = guarded(|| Err(Error::Transport("gone".to_string())));
        assert!(matches!(result, Err(Error::Transport(_))));
    }

    #[test]
    fn test_panic_becomes_error() {
        let result: Result<()> = guarded(|| panic!("boom {}", 1));
        match result {
            Err(Error::Panicked(msg)) => assert_eq!(msg, "boom 1"),
            other => panic!("Expected Panicked, got {:?}", other),
        }
    }
}
