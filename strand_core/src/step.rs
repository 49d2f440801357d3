//! The result of a single advancement.
//!
//! A `Step` is what every advancement of an iterator handle produces:
//! a value (or nothing) and a flag saying whether the sequence is over.
//!
//! ```text
//! { value: Some(1), done: false }   yielded
//! { value: Some(x), done: true  }   completed with an explicit value (once)
//! { value: None,    done: true  }   exhausted (forever after)
//! ```

use std::fmt;

/// One `(value, done)` pair.
///
/// `value` is `None` where the protocol leaves it unset: after exhaustion,
/// or when a generator completes without an explicit value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Step<T> {
    /// The produced value, if any.
    pub value: Option<T>,
    /// Whether the sequence has terminated.
    pub done: bool,
}

impl<T> Step<T> {
    /// A non-terminal step carrying a yielded value.
    #[inline]
    pub const fn yielded(value: T) -> Self {
        Self {
            value: Some(value),
            done: false,
        }
    }

    /// The terminal step of a completion, optionally carrying its value.
    #[inline]
    pub const fn complete(value: Option<T>) -> Self {
        Self { value, done: true }
    }

    /// The terminal step with no value.
    #[inline]
    pub const fn exhausted() -> Self {
        Self {
            value: None,
            done: true,
        }
    }

    /// Returns true if this step terminates the sequence.
    #[inline]
    pub const fn is_done(&self) -> bool {
        self.done
    }

    /// Returns true if this is the bare terminal step.
    #[inline]
    pub const fn is_exhausted(&self) -> bool {
        self.done && self.value.is_none()
    }

    /// Borrows the value.
    #[inline]
    pub fn value(&self) -> Option<&T> {
        self.value.as_ref()
    }

    /// Consumes the step, returning the value.
    #[inline]
    pub fn into_value(self) -> Option<T> {
        self.value
    }

    /// Returns the yielded value if this step is non-terminal.
    #[inline]
    pub fn into_yielded(self) -> Option<T> {
        if self.done { None } else { self.value }
    }

    /// Maps the carried value, keeping `done`.
    #[inline]
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Step<U> {
        Step {
            value: self.value.map(f),
            done: self.done,
        }
    }
}

impl<T> Default for Step<T> {
    #[inline]
    fn default() -> Self {
        Self::exhausted()
    }
}

impl<T: fmt::Display> fmt::Display for Step<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.value {
            Some(v) => write!(f, "{{ value: {}, done: {} }}", v, self.done),
            None => write!(f, "{{ value: undefined, done: {} }}", self.done),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yielded() {
        let step = Step::yielded(7);
        assert!(!step.is_done());
        assert_eq!(step.value(), Some(&7));
        assert_eq!(step.into_yielded(), Some(7));
    }

    #[test]
    fn test_complete_with_value() {
        let step = Step::complete(Some("ending"));
        assert!(step.is_done());
        assert!(!step.is_exhausted());
        assert_eq!(step.into_yielded(), None);
        assert_eq!(step.into_value(), Some("ending"));
    }

    #[test]
    fn test_exhausted() {
        let step: Step<i32> = Step::exhausted();
        assert!(step.is_done());
        assert!(step.is_exhausted());
        assert_eq!(step, Step::default());
    }

    #[test]
    fn test_map_keeps_done() {
        let step = Step::complete(Some(21)).map(|v| v * 2);
        assert_eq!(step, Step::complete(Some(42)));
    }

    #[test]
    fn test_display() {
        assert_eq!(Step::yielded(1).to_string(), "{ value: 1, done: false }");
        assert_eq!(
            Step::<i32>::exhausted().to_string(),
            "{ value: undefined, done: true }"
        );
    }
}
