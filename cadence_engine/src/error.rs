//! Error types for the Cadence engine
//!
//! This module defines the fatal error taxonomy of the frame pacer.
//! Transient surface invalidation (out-of-date / suboptimal) is NOT an error:
//! it is reported through `AcquireOutcome` / `PresentOutcome` and absorbed by
//! the pacer as a pending rebuild.

use std::fmt;

/// Result type for Cadence engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Cadence engine errors
///
/// Every variant is fatal for the render loop that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// The presentation surface was invalidated externally
    SurfaceLost(String),

    /// No compatible capability set (format, present mode, extent, depth)
    Configuration(String),

    /// Allocation failure for sync primitives, command buffers or chain images
    ResourceExhaustion(String),

    /// Any other device or presentation failure
    BackendError(String),

    /// Backend bootstrap failed (instance, device, surface)
    InitializationFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SurfaceLost(msg) => write!(f, "Surface lost: {}", msg),
            Error::Configuration(msg) => write!(f, "Configuration error: {}", msg),
            Error::ResourceExhaustion(msg) => write!(f, "Resource exhaustion: {}", msg),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
