//! Startup and lifecycle errors of the authorization core.
//!
//! Per-request outcomes are not errors: a rejected credential is a
//! [`VerificationError`] and a refused request is a [`DenialReason`], both
//! carried inside an [`AuthDecision`]. The [`Error`] type defined here covers
//! everything that can go wrong while *building* the core:
//!
//! - Reading or parsing the policy table
//! - Fetching or decoding trust registry material
//! - Invalid configuration values
//!
//! [`VerificationError`]: crate::verify::VerificationError
//! [`DenialReason`]: crate::strategy::DenialReason
//! [`AuthDecision`]: crate::strategy::AuthDecision

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;

/// Type alias for boxed errors that are Send + Sync.
///
/// The `Send + Sync` bounds let errors cross the task boundary of the
/// background registry refresh.
pub type BoxedError = Box<dyn StdError + Send + Sync>;

/// Result type alias for fallible operations of the authorization core.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Error kind enumeration for categorizing core errors.
///
/// Kept separate from [`Error`] so callers can branch on the category
/// without inspecting the message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Invalid or inconsistent configuration.
    Config,
    /// Local file could not be read.
    FileSystem,
    /// Remote authority returned an unusable response.
    External,
    /// No trust snapshot could be obtained at startup.
    RegistryUnavailable,
    /// Internal logic errors.
    Internal,
}

impl ErrorKind {
    /// Returns the error kind as a string for categorization.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Config => "config",
            Self::FileSystem => "file_system",
            Self::External => "external_service",
            Self::RegistryUnavailable => "registry_unavailable",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authorization core error with structured information.
#[derive(Debug, thiserror::Error)]
#[error("{kind} error: {message}")]
pub struct Error {
    /// The error category.
    kind: ErrorKind,
    /// Human-readable error message.
    message: Cow<'static, str>,
    /// Optional underlying error that caused this error.
    #[source]
    source: Option<BoxedError>,
}

impl Error {
    /// Creates a new [`Error`].
    #[inline]
    fn new(kind: ErrorKind, message: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Attaches a source error to this error.
    #[inline]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Attaches an already boxed source error to this error.
    #[inline]
    pub fn with_boxed_source(mut self, source: BoxedError) -> Self {
        self.source = Some(source);
        self
    }

    /// Returns the error kind.
    #[must_use]
    #[inline]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error message.
    #[must_use]
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Creates a new configuration error.
    #[inline]
    pub fn config(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Config, message)
    }

    /// Creates a new file system error.
    #[inline]
    pub fn file_system(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::FileSystem, message)
    }

    /// Creates a new external service error.
    #[inline]
    pub fn external(
        service: impl Into<Cow<'static, str>>,
        message: impl Into<Cow<'static, str>>,
    ) -> Self {
        let full_message = format!("{}: {}", service.into(), message.into());
        Self::new(ErrorKind::External, full_message)
    }

    /// Creates a new registry unavailable error.
    #[inline]
    pub fn registry_unavailable(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::RegistryUnavailable, message)
    }

    /// Creates a new internal error.
    #[inline]
    pub fn internal(message: impl Into<Cow<'static, str>>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}
