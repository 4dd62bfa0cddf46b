//! Thread-local value-capture scope.
//!
//! [`CaptureScope::enter`] pushes a frame onto a thread-local stack and
//! returns a guard that pops it on drop, so a panicking assertion body
//! still releases its frame. During the live evaluation the reserved
//! `that(...)` call records its argument value into the innermost frame,
//! keyed by the span of the call; the diagnostic pass substitutes those
//! values instead of recomputing the argument.

use std::cell::RefCell;
use std::collections::HashMap;

use crate::error::Error;
use crate::span::SourceSpan;
use crate::value::Value;

// Frames are keyed by (start, end) byte offsets; line/column are
// redundant for identity.
type Frame = HashMap<(usize, usize), Value>;

thread_local! {
    static FRAMES: RefCell<Vec<Frame>> = RefCell::new(Vec::new());
}

/// Entry point for value capture around an assertion.
///
/// ```
/// use avow::{CaptureScope, Scope};
///
/// let mut scope = Scope::new();
/// scope.bind("total", 3);
/// let _guard = CaptureScope::enter();
/// let ok = scope.truthy("that(total) == 3").unwrap();
/// assert!(ok);
/// ```
pub struct CaptureScope;

impl CaptureScope {
    /// Opens a capture scope on the current thread and returns the guard
    /// that closes it.
    pub fn enter() -> CaptureGuard {
        FRAMES.with(|frames| frames.borrow_mut().push(Frame::new()));
        CaptureGuard { _not_send: () }
    }
}

/// Guard for an open capture scope; dropping it closes the scope on
/// every exit path, including unwinding.
pub struct CaptureGuard {
    _not_send: (),
}

impl Drop for CaptureGuard {
    fn drop(&mut self) {
        FRAMES.with(|frames| {
            frames.borrow_mut().pop();
        });
    }
}

/// Returns whether a capture scope is open on this thread.
pub(crate) fn is_active() -> bool {
    FRAMES.with(|frames| !frames.borrow().is_empty())
}

/// Records a marked value in the innermost frame.
pub(crate) fn record(span: &SourceSpan, value: Value) -> Result<(), Error> {
    FRAMES.with(|frames| match frames.borrow_mut().last_mut() {
        Some(frame) => {
            frame.insert((span.start, span.end), value);
            Ok(())
        }
        None => Err(Error::NoActiveCaptureScope),
    })
}

/// Looks up a recorded value by span in the innermost frame.
pub(crate) fn lookup(span: &SourceSpan) -> Option<Value> {
    FRAMES.with(|frames| {
        frames
            .borrow()
            .last()
            .and_then(|frame| frame.get(&(span.start, span.end)).cloned())
    })
}

/// Clears the innermost frame. Every live evaluation starts fresh so a
/// previous assertion's marks are never substituted into a new one.
pub(crate) fn clear_innermost() {
    FRAMES.with(|frames| {
        if let Some(frame) = frames.borrow_mut().last_mut() {
            frame.clear();
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: usize, end: usize) -> SourceSpan {
        SourceSpan {
            start,
            end,
            line: 1,
            column: start + 1,
        }
    }

    #[test]
    fn test_record_requires_open_scope() {
        assert!(!is_active());
        let err = record(&span(0, 4), Value::Int(1)).unwrap_err();
        assert!(matches!(err, Error::NoActiveCaptureScope));
    }

    #[test]
    fn test_guard_opens_and_closes() {
        {
            let _guard = CaptureScope::enter();
            assert!(is_active());
            record(&span(0, 4), Value::Int(7)).unwrap();
            assert_eq!(lookup(&span(0, 4)), Some(Value::Int(7)));
        }
        assert!(!is_active());
        assert_eq!(lookup(&span(0, 4)), None);
    }

    #[test]
    fn test_nested_scopes_use_innermost_frame() {
        let _outer = CaptureScope::enter();
        record(&span(0, 4), Value::Int(1)).unwrap();
        {
            let _inner = CaptureScope::enter();
            assert_eq!(lookup(&span(0, 4)), None);
            record(&span(0, 4), Value::Int(2)).unwrap();
            assert_eq!(lookup(&span(0, 4)), Some(Value::Int(2)));
        }
        assert_eq!(lookup(&span(0, 4)), Some(Value::Int(1)));
    }

    #[test]
    fn test_clear_innermost_drops_stale_marks() {
        let _guard = CaptureScope::enter();
        record(&span(0, 4), Value::Int(1)).unwrap();
        clear_innermost();
        assert_eq!(lookup(&span(0, 4)), None);
    }

    #[test]
    fn test_guard_releases_on_unwind() {
        let result = std::panic::catch_unwind(|| {
            let _guard = CaptureScope::enter();
            panic!("boom");
        });
        assert!(result.is_err());
        assert!(!is_active());
    }
}
