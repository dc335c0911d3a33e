//! Error handling for vizpipe
//!
//! This module defines the top-level error type and a Result alias used by
//! configuration, project files and the binary. Pipeline operations use
//! [`PipelineError`](crate::pipeline::PipelineError) and convert into
//! [`VizError`] at the edges.

use crate::pipeline::PipelineError;
use thiserror::Error;

/// Main error type for vizpipe operations
#[derive(Error, Debug)]
pub enum VizError {
    /// Errors raised while building, updating or restoring a pipeline
    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// Errors related to configuration loading/saving
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<VizError>,
    },
}

impl VizError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        VizError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

impl From<serde_json::Error> for VizError {
    fn from(err: serde_json::Error) -> Self {
        VizError::Serialization(err.to_string())
    }
}

/// Result type alias for vizpipe operations
pub type Result<T> = std::result::Result<T, VizError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, PipelineError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| VizError::from(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| VizError::from(e).with_context(f()))
    }
}
