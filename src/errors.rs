//! Error Types
//!
//! This module defines the error types used throughout the pipeline core.
//!
//! # Overview
//!
//! The main error type [`RenderError`] covers the failure modes that are
//! surfaced to callers:
//! - Pipeline description parsing and validation
//! - Shader template parsing and uniform default values
//! - Backend allocation failures (the only class callers should treat as fatal)
//! - File I/O
//!
//! Per-frame conditions (unknown stage, destroyed proxy, unbound material) are
//! *not* errors: they are recovered locally, logged, and reported through
//! [`FrameStats`](crate::renderer::FrameStats).
//!
//! # Usage
//!
//! ```rust,ignore
//! use myth_pipeline::errors::{RenderError, Result};
//!
//! fn build() -> Result<()> {
//!     let config = PipelineConfig::parse(text)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for the pipeline core.
#[derive(Error, Debug)]
pub enum RenderError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// The pipeline or shader description is not valid JSON for its schema.
    #[error("Description parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Two stages in one pipeline share a name.
    #[error("Duplicate stage name in pipeline: {0}")]
    DuplicateStage(String),

    /// Two framebuffers in one pipeline share an id.
    #[error("Duplicate framebuffer id in pipeline: {0}")]
    DuplicateFramebuffer(u32),

    /// The description declares no stages at all.
    #[error("Pipeline description contains no stages")]
    EmptyPipeline,

    /// A framebuffer operation named an id the pipeline does not declare.
    #[error("Framebuffer {0} is not declared")]
    UnknownFramebuffer(u32),

    /// The operation needs an active pipeline and none is set.
    #[error("No active pipeline")]
    NoActivePipeline,

    // ========================================================================
    // Shader & Uniform Errors
    // ========================================================================
    /// No shader template is registered under the given path.
    #[error("Shader not found: {0}")]
    ShaderNotFound(String),

    /// A uniform default or override value could not be interpreted.
    #[error("Invalid value for uniform '{name}': {reason}")]
    InvalidUniformValue {
        /// Uniform name
        name: String,
        /// What was wrong with it
        reason: String,
    },

    // ========================================================================
    // Backend Errors
    // ========================================================================
    /// The backend could not allocate the requested GPU-side object.
    #[error("Backend allocation failed: {0}")]
    BackendAllocation(String),

    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Alias for `Result<T, RenderError>`.
pub type Result<T> = std::result::Result<T, RenderError>;
