//! Owned handles over update agent objects
//!
//! Each handle owns one automation object and releases it when dropped, so every
//! exit path of the code holding it releases it exactly once.

use crate::automation::{Arg, AutomationRuntime, COLLECTION_PROG_ID, Dispatch, Variant};
use crate::error::WuaError;

/// Read a property and describe the call on failure
pub(crate) fn get(
    obj: &dyn Dispatch,
    owner: &str,
    name: &str,
    args: &[Arg<'_>],
) -> Result<Variant, WuaError> {
    obj.get_property(name, args)
        .map_err(|e| WuaError::call(describe(owner, "GetProperty", name, args), e))
}

/// Invoke a method and describe the call on failure
pub(crate) fn call(
    obj: &dyn Dispatch,
    owner: &str,
    name: &str,
    args: &[Arg<'_>],
) -> Result<Variant, WuaError> {
    obj.call_method(name, args)
        .map_err(|e| WuaError::call(describe(owner, "CallMethod", name, args), e))
}

/// Assign a property and describe the call on failure
pub(crate) fn put(
    obj: &dyn Dispatch,
    owner: &str,
    name: &str,
    value: Arg<'_>,
) -> Result<(), WuaError> {
    obj.put_property(name, value)
        .map_err(|e| WuaError::call(describe(owner, "PutProperty", name, &[value]), e))
}

pub(crate) fn get_object(
    obj: &dyn Dispatch,
    owner: &str,
    name: &str,
    args: &[Arg<'_>],
) -> Result<Box<dyn Dispatch>, WuaError> {
    let value = get(obj, owner, name, args)?;
    into_object(value, || describe(owner, "GetProperty", name, args))
}

pub(crate) fn call_object(
    obj: &dyn Dispatch,
    owner: &str,
    name: &str,
    args: &[Arg<'_>],
) -> Result<Box<dyn Dispatch>, WuaError> {
    let value = call(obj, owner, name, args)?;
    into_object(value, || describe(owner, "CallMethod", name, args))
}

/// Read a string property; an empty value reads as `""`
pub(crate) fn get_string(
    obj: &dyn Dispatch,
    owner: &str,
    name: &str,
    args: &[Arg<'_>],
) -> Result<String, WuaError> {
    match get(obj, owner, name, args)? {
        Variant::String(s) => Ok(s),
        Variant::Empty => Ok(String::new()),
        other => Err(WuaError::unexpected(
            describe(owner, "GetProperty", name, args),
            "string",
            other.kind(),
        )),
    }
}

pub(crate) fn get_bool(obj: &dyn Dispatch, owner: &str, name: &str) -> Result<bool, WuaError> {
    match get(obj, owner, name, &[])? {
        Variant::Bool(b) => Ok(b),
        Variant::Int(n) => Ok(n != 0),
        other => Err(WuaError::unexpected(
            describe(owner, "GetProperty", name, &[]),
            "bool",
            other.kind(),
        )),
    }
}

pub(crate) fn get_i32(obj: &dyn Dispatch, owner: &str, name: &str) -> Result<i32, WuaError> {
    let operation = || describe(owner, "GetProperty", name, &[]);
    match get(obj, owner, name, &[])? {
        Variant::Int(n) => {
            i32::try_from(n).map_err(|_| WuaError::unexpected(operation(), "i32", "int"))
        }
        other => Err(WuaError::unexpected(operation(), "int", other.kind())),
    }
}

/// Read the `Count` property of any indexable collection
pub(crate) fn count(obj: &dyn Dispatch, owner: &str) -> Result<i32, WuaError> {
    get_i32(obj, owner, "Count")
}

fn into_object(
    value: Variant,
    operation: impl FnOnce() -> String,
) -> Result<Box<dyn Dispatch>, WuaError> {
    match value {
        Variant::Object(obj) => Ok(obj),
        other => Err(WuaError::unexpected(operation(), "object", other.kind())),
    }
}

/// Render a call as `Owner.Kind("Name", args..)`
fn describe(owner: &str, kind: &str, name: &str, args: &[Arg<'_>]) -> String {
    let mut s = format!("{owner}.{kind}({name:?}");
    for arg in args {
        match arg {
            Arg::Int(n) => s.push_str(&format!(", {n}")),
            Arg::Str(v) => s.push_str(&format!(", {v:?}")),
            Arg::Object(_) => s.push_str(", <object>"),
        }
    }
    s.push(')');
    s
}

/// Ordered, mutable collection of updates (`IUpdateCollection`)
pub struct UpdateCollection {
    inner: Box<dyn Dispatch>,
}

impl UpdateCollection {
    const OWNER: &'static str = "IUpdateCollection";

    /// Create an empty standalone collection
    ///
    /// # Errors
    /// Returns an error if the collection object cannot be created.
    pub fn new(runtime: &dyn AutomationRuntime) -> Result<Self, WuaError> {
        let inner = runtime
            .create_object(COLLECTION_PROG_ID)
            .map_err(|e| WuaError::create_object(COLLECTION_PROG_ID, e))?;
        Ok(Self { inner })
    }

    pub(crate) fn from_dispatch(inner: Box<dyn Dispatch>) -> Self {
        Self { inner }
    }

    pub(crate) fn as_dispatch(&self) -> &dyn Dispatch {
        self.inner.as_ref()
    }

    /// Append an update
    ///
    /// # Errors
    /// Returns an error if the `Add` call fails.
    pub fn add(&self, update: &Update) -> Result<(), WuaError> {
        call(
            self.as_dispatch(),
            Self::OWNER,
            "Add",
            &[Arg::Object(update.as_dispatch())],
        )?;
        Ok(())
    }

    /// Remove the update at `index`
    ///
    /// # Errors
    /// Returns an error if the `RemoveAt` call fails.
    pub fn remove_at(&self, index: i32) -> Result<(), WuaError> {
        call(self.as_dispatch(), Self::OWNER, "RemoveAt", &[Arg::Int(index)])?;
        Ok(())
    }

    /// Number of updates in the collection
    ///
    /// # Errors
    /// Returns an error if `Count` cannot be read.
    pub fn count(&self) -> Result<i32, WuaError> {
        count(self.as_dispatch(), Self::OWNER)
    }

    /// Fetch the update at `index`
    ///
    /// # Errors
    /// Returns an error if `Item` cannot be read.
    pub fn item(&self, index: i32) -> Result<Update, WuaError> {
        let inner = get_object(self.as_dispatch(), Self::OWNER, "Item", &[Arg::Int(index)])?;
        Ok(Update { inner })
    }
}

/// One update descriptor (`IUpdate`)
pub struct Update {
    inner: Box<dyn Dispatch>,
}

impl Update {
    pub(crate) const OWNER: &'static str = "IUpdate";

    pub(crate) fn as_dispatch(&self) -> &dyn Dispatch {
        self.inner.as_ref()
    }

    /// Update title
    ///
    /// # Errors
    /// Returns an error if `Title` cannot be read.
    pub fn title(&self) -> Result<String, WuaError> {
        get_string(self.as_dispatch(), Self::OWNER, "Title", &[])
    }

    /// Whether the license terms have been accepted
    ///
    /// # Errors
    /// Returns an error if `EulaAccepted` cannot be read.
    pub fn eula_accepted(&self) -> Result<bool, WuaError> {
        get_bool(self.as_dispatch(), Self::OWNER, "EulaAccepted")
    }

    /// Accept the license terms
    ///
    /// # Errors
    /// Returns an error if the `AcceptEula` call fails.
    pub fn accept_eula(&self) -> Result<(), WuaError> {
        call(self.as_dispatch(), Self::OWNER, "AcceptEula", &[])?;
        Ok(())
    }
}
