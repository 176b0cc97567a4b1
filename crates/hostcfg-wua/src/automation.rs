//! Automation object model seam
//!
//! The update agent is driven through late-bound automation objects. Everything
//! above this module talks to [`Dispatch`] and [`AutomationRuntime`], never to a
//! platform calling convention directly.

use std::any::Any;
use std::fmt;

use thiserror::Error;

/// `ProgID` of the update agent root object
pub const SESSION_PROG_ID: &str = "Microsoft.Update.Session";

/// `ProgID` of a standalone update collection
pub const COLLECTION_PROG_ID: &str = "Microsoft.Update.UpdateColl";

/// `ProgID` of the system information object
pub const SYSTEM_INFO_PROG_ID: &str = "Microsoft.Update.SystemInfo";

/// Exception details raised by an automation object
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExceptionInfo {
    /// Platform status code describing the failure
    pub scode: u32,
    /// Human readable description, possibly empty
    pub description: String,
}

/// Failure reported by a single automation call
#[derive(Error, Debug, Clone)]
#[error("{message} (0x{code:08x})")]
pub struct AutomationError {
    /// Result code returned by the call
    pub code: u32,
    /// Error text
    pub message: String,
    /// Exception details, present when the object raised an exception
    pub exception: Option<ExceptionInfo>,
}

impl AutomationError {
    /// Create an error without exception details
    pub fn new(code: u32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            exception: None,
        }
    }

    /// Attach exception details carrying a status code
    #[must_use]
    pub fn with_exception(mut self, scode: u32, description: impl Into<String>) -> Self {
        self.exception = Some(ExceptionInfo {
            scode,
            description: description.into(),
        });
        self
    }
}

/// Value returned by a property read or method call
pub enum Variant {
    Empty,
    Bool(bool),
    Int(i64),
    Float(f64),
    /// OLE automation date: days since 1899-12-30, fraction is time of day
    Date(f64),
    String(String),
    /// Owned handle; released when dropped
    Object(Box<dyn Dispatch>),
}

impl Variant {
    /// Short name of the variant kind, used in error messages
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Variant::Empty => "empty",
            Variant::Bool(_) => "bool",
            Variant::Int(_) => "int",
            Variant::Float(_) => "float",
            Variant::Date(_) => "date",
            Variant::String(_) => "string",
            Variant::Object(_) => "object",
        }
    }
}

impl fmt::Debug for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Empty => write!(f, "Empty"),
            Variant::Bool(b) => write!(f, "Bool({b})"),
            Variant::Int(n) => write!(f, "Int({n})"),
            Variant::Float(x) => write!(f, "Float({x})"),
            Variant::Date(d) => write!(f, "Date({d})"),
            Variant::String(s) => write!(f, "String({s:?})"),
            Variant::Object(_) => write!(f, "Object(..)"),
        }
    }
}

/// Argument passed into a property read, property write or method call
///
/// Objects are borrowed: passing a handle never transfers its ownership.
#[derive(Clone, Copy)]
pub enum Arg<'a> {
    Int(i32),
    Str(&'a str),
    Object(&'a dyn Dispatch),
}

/// Capability set of a late-bound automation object
///
/// Implementations release the underlying native object when dropped.
pub trait Dispatch {
    /// Read a (possibly indexed) property
    ///
    /// # Errors
    /// Returns the platform failure of the call.
    fn get_property(&self, name: &str, args: &[Arg<'_>]) -> Result<Variant, AutomationError>;

    /// Invoke a method
    ///
    /// # Errors
    /// Returns the platform failure of the call.
    fn call_method(&self, name: &str, args: &[Arg<'_>]) -> Result<Variant, AutomationError>;

    /// Assign a property
    ///
    /// # Errors
    /// Returns the platform failure of the call.
    fn put_property(&self, name: &str, value: Arg<'_>) -> Result<(), AutomationError>;

    /// Access the concrete backend object, used when an object is passed as an argument
    fn as_any(&self) -> &dyn Any;
}

/// Per-thread automation subsystem and object factory
pub trait AutomationRuntime: Send + Sync {
    /// Initialize the subsystem for the calling thread
    ///
    /// # Errors
    /// Returns the platform failure if the thread cannot be initialized.
    fn initialize(&self) -> Result<(), AutomationError>;

    /// Tear down what [`AutomationRuntime::initialize`] set up on the calling thread
    fn uninitialize(&self);

    /// Create a top-level object from its `ProgID`
    ///
    /// # Errors
    /// Returns the platform failure if the class is unknown or cannot be created.
    fn create_object(&self, prog_id: &str) -> Result<Box<dyn Dispatch>, AutomationError>;

    /// Backend name for logging
    fn runtime_type(&self) -> &'static str;
}
