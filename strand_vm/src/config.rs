//! Per-handle generator configuration.

use std::borrow::Cow;

/// Options fixed when a generator is created.
///
/// ```
/// use strand_vm::GeneratorConfig;
///
/// let config = GeneratorConfig::default().named("numbers").strict_start(true);
/// assert_eq!(config.name(), Some("numbers"));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratorConfig {
    name: Option<Cow<'static, str>>,
    strict_start: bool,
}

impl GeneratorConfig {
    /// Anonymous generator with lenient first-call input handling.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tags every log event from this handle with `name`.
    #[must_use]
    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// When set, an input passed to the very first `advance` is rejected
    /// instead of ignored.
    #[must_use]
    pub fn strict_start(mut self, strict: bool) -> Self {
        self.strict_start = strict;
        self
    }

    /// The configured name, if any.
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Whether first-call inputs are rejected.
    #[inline]
    pub fn is_strict_start(&self) -> bool {
        self.strict_start
    }

    /// Name used in log events.
    #[inline]
    pub(crate) fn label(&self) -> &str {
        self.name().unwrap_or("<anonymous>")
    }
}
