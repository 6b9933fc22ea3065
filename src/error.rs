// src/error.rs
//! Error handling for material translation and shader variant creation.
//!
//! - Enum discriminant match is cheap; allocations happen only on error paths.
//! - All fatal conditions propagate synchronously: a material or shader
//!   variant either fully succeeds or is entirely rejected.
//! - Capability overflows (too many bones/morph targets/colors/lights) are
//!   *not* errors; they are surfaced through `log::warn!` and the draw
//!   proceeds best-effort.

use thiserror::Error;

/// Main error type — lightweight, Send + Sync + 'static.
#[derive(Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// A document field carried a value the loader does not recognize
    /// (e.g. an unknown `alphaMode` string). Aborts the material load.
    #[error("unsupported value: {0}")]
    UnsupportedValue(String),

    /// A required hardware extension or feature is absent on this backend.
    /// Aborts variant creation.
    #[error("missing capability: {0}")]
    MissingCapability(String),

    /// The renderable describes a configuration the shader pipeline cannot
    /// express (more than two UV sets, packed vertex colors).
    #[error("unsupported configuration: {0}")]
    UnsupportedConfiguration(String),

    /// The external compiler rejected the generated source. Carries the
    /// full compiler log.
    #[error("shader compilation failed:\n{log}")]
    ShaderCompilation { log: String },

    /// The freshly built program cannot render the renderable that
    /// triggered its creation. This is an internal variant-key/feature
    /// mismatch, not bad input; it is never retryable.
    #[error("shader compatibility check failed: {0}")]
    ShaderCompatibility(String),
}

impl Error {
    #[inline]
    pub fn is_unsupported_value(&self) -> bool {
        matches!(self, Error::UnsupportedValue(_))
    }

    #[inline]
    pub fn is_missing_capability(&self) -> bool {
        matches!(self, Error::MissingCapability(_))
    }

    #[inline]
    pub fn is_unsupported_configuration(&self) -> bool {
        matches!(self, Error::UnsupportedConfiguration(_))
    }

    #[inline]
    pub fn is_compilation(&self) -> bool {
        matches!(self, Error::ShaderCompilation { .. })
    }

    #[inline]
    pub fn is_compatibility(&self) -> bool {
        matches!(self, Error::ShaderCompatibility(_))
    }
}

/// Convenient `Result` alias — use `crate::Result<T>` everywhere.
pub type Result<T> = std::result::Result<T, Error>;
