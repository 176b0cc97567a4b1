//! Error types for hostcfg-wua

use std::fmt;

use thiserror::Error;

use crate::automation::AutomationError;
use crate::diagnostic;

/// Phase of an install attempt that failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallPhase {
    /// License acceptance and collection setup
    Prepare,
    Download,
    Install,
}

impl fmt::Display for InstallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallPhase::Prepare => write!(f, "preparation"),
            InstallPhase::Download => write!(f, "download"),
            InstallPhase::Install => write!(f, "install"),
        }
    }
}

/// Errors that can occur while driving the Windows Update Agent
#[derive(Error, Debug, Clone)]
pub enum WuaError {
    /// Automation subsystem could not be initialized for this thread
    #[error("failed to initialize automation subsystem: {0}")]
    SubsystemInit(#[source] AutomationError),

    /// Top-level automation object could not be created
    #[error("failed to create automation object {prog_id:?}: {source}{scode}")]
    CreateObject {
        /// `ProgID` that was requested
        prog_id: String,
        /// Platform failure
        source: AutomationError,
        /// Rendered status code suffix, empty when none was decoded
        scode: String,
    },

    /// An automation call failed
    #[error("{operation}: {source}{scode}")]
    Call {
        /// The call that failed, e.g. `IUpdate.GetProperty("Title")`
        operation: String,
        /// Platform failure
        source: AutomationError,
        /// Rendered status code suffix, empty when none was decoded
        scode: String,
    },

    /// A call returned a value of the wrong shape
    #[error("{operation}: expected {expected}, found {found}")]
    UnexpectedType {
        /// The call whose result was rejected
        operation: String,
        /// Expected variant kind
        expected: &'static str,
        /// Variant kind actually returned
        found: &'static str,
    },

    /// An automation date could not be turned into a timestamp
    #[error("{property}: cannot decode automation date {value}")]
    DateDecode {
        /// Property holding the date
        property: String,
        /// Raw date value
        value: f64,
    },

    /// Searching for updates failed
    #[error("search with query {query:?} failed: {source}")]
    Search {
        /// Query passed to the searcher
        query: String,
        /// Underlying failure
        source: Box<WuaError>,
    },

    /// Downloading or installing a single update failed
    #[error("{phase} of update {title:?} failed: {source}")]
    Install {
        /// Update title
        title: String,
        /// Phase that failed
        phase: InstallPhase,
        /// Underlying failure
        source: Box<WuaError>,
    },

    /// The platform has no update agent
    #[error("update agent not supported: {0}")]
    Unsupported(String),

    /// The blocking worker running an operation did not finish
    #[error("update agent worker failed: {0}")]
    Join(String),
}

impl WuaError {
    /// Wrap a failed automation call, decoding its status code
    pub fn call(operation: impl Into<String>, source: AutomationError) -> Self {
        let scode = diagnostic::scode_suffix(&source);
        WuaError::Call {
            operation: operation.into(),
            source,
            scode,
        }
    }

    /// Wrap a failed object creation, decoding its status code
    pub fn create_object(prog_id: impl Into<String>, source: AutomationError) -> Self {
        let scode = diagnostic::scode_suffix(&source);
        WuaError::CreateObject {
            prog_id: prog_id.into(),
            source,
            scode,
        }
    }

    /// Reject a value of the wrong shape
    pub fn unexpected(
        operation: impl Into<String>,
        expected: &'static str,
        found: &'static str,
    ) -> Self {
        WuaError::UnexpectedType {
            operation: operation.into(),
            expected,
            found,
        }
    }

    /// Check if error is retryable
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, WuaError::SubsystemInit(_) | WuaError::Join(_))
    }

    /// Check if the platform lacks an update agent entirely
    #[must_use]
    pub fn is_unsupported(&self) -> bool {
        matches!(self, WuaError::Unsupported(_))
    }
}
