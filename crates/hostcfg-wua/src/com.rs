//! COM `IDispatch` backend
//!
//! Maps the automation seam onto late-bound COM calls: names are resolved with
//! `GetIDsOfNames` and invoked with `Invoke`.

use std::any::Any;

use windows::Win32::Foundation::DISP_E_EXCEPTION;
use windows::Win32::System::Com::{
    CLSCTX_ALL, CLSIDFromProgID, COINIT_MULTITHREADED, CoCreateInstance, CoInitializeEx,
    CoUninitialize, DISPATCH_FLAGS, DISPATCH_METHOD, DISPATCH_PROPERTYGET, DISPATCH_PROPERTYPUT,
    DISPPARAMS, EXCEPINFO, IDispatch,
};
use windows::Win32::System::Ole::DISPID_PROPERTYPUT;
use windows::Win32::System::Variant::{
    VT_BOOL, VT_BSTR, VT_DATE, VT_DISPATCH, VT_EMPTY, VT_I1, VT_I2, VT_I4, VT_I8, VT_INT, VT_NULL,
    VT_R4, VT_R8, VT_UI1, VT_UI2, VT_UI4, VT_UI8, VT_UINT,
};
use windows::core::{BSTR, GUID, HSTRING, IUnknown, Interface, PCWSTR, VARIANT};

use crate::automation::{Arg, AutomationError, AutomationRuntime, Dispatch, Variant};

const LOCALE_USER_DEFAULT: u32 = 0x0400;

/// `E_INVALIDARG`, used for arguments the backend cannot marshal
const E_INVALIDARG: u32 = 0x8007_0057;

impl From<windows::core::Error> for AutomationError {
    fn from(err: windows::core::Error) -> Self {
        #[allow(clippy::cast_sign_loss)]
        let code = err.code().0 as u32;
        AutomationError::new(code, err.message().to_string())
    }
}

/// COM automation subsystem
#[derive(Debug, Clone, Default)]
pub struct ComRuntime;

impl ComRuntime {
    /// Create a new COM runtime
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl AutomationRuntime for ComRuntime {
    fn initialize(&self) -> Result<(), AutomationError> {
        // S_FALSE (already initialized on this thread) counts as success and
        // still needs a matching CoUninitialize.
        unsafe { CoInitializeEx(None, COINIT_MULTITHREADED) }.ok()?;
        Ok(())
    }

    fn uninitialize(&self) {
        unsafe { CoUninitialize() };
    }

    fn create_object(&self, prog_id: &str) -> Result<Box<dyn Dispatch>, AutomationError> {
        let wide = HSTRING::from(prog_id);
        let clsid = unsafe { CLSIDFromProgID(PCWSTR(wide.as_ptr())) }?;
        let dispatch: IDispatch = unsafe { CoCreateInstance(&clsid, None, CLSCTX_ALL) }?;
        Ok(Box::new(ComObject(dispatch)))
    }

    fn runtime_type(&self) -> &'static str {
        "com"
    }
}

/// Owned `IDispatch` reference; `Drop` releases it
pub struct ComObject(IDispatch);

impl ComObject {
    fn dispid(&self, name: &str) -> Result<i32, AutomationError> {
        let wide = HSTRING::from(name);
        let names = [PCWSTR(wide.as_ptr())];
        let mut dispid = 0;
        unsafe {
            self.0.GetIDsOfNames(
                &GUID::zeroed(),
                names.as_ptr(),
                1,
                LOCALE_USER_DEFAULT,
                &mut dispid,
            )
        }?;
        Ok(dispid)
    }

    fn invoke(
        &self,
        name: &str,
        flags: DISPATCH_FLAGS,
        args: &[Arg<'_>],
    ) -> Result<VARIANT, AutomationError> {
        let dispid = self.dispid(name)?;

        // DISPPARAMS takes its arguments in reverse order.
        let mut vargs = args
            .iter()
            .rev()
            .map(to_variant)
            .collect::<Result<Vec<_>, _>>()?;
        let mut named = DISPID_PROPERTYPUT;
        let is_put = flags == DISPATCH_PROPERTYPUT;

        #[allow(clippy::cast_possible_truncation)]
        let params = DISPPARAMS {
            rgvarg: vargs.as_mut_ptr(),
            rgdispidNamedArgs: if is_put {
                &mut named
            } else {
                std::ptr::null_mut()
            },
            cArgs: vargs.len() as u32,
            cNamedArgs: u32::from(is_put),
        };

        let mut result = VARIANT::default();
        let mut excep = EXCEPINFO::default();
        let mut arg_err = 0u32;
        let outcome = unsafe {
            self.0.Invoke(
                dispid,
                &GUID::zeroed(),
                LOCALE_USER_DEFAULT,
                flags,
                &params,
                Some(&mut result as *mut _),
                Some(&mut excep as *mut _),
                Some(&mut arg_err as *mut _),
            )
        };

        match outcome {
            Ok(()) => Ok(result),
            Err(e) if e.code() == DISP_E_EXCEPTION => {
                #[allow(clippy::cast_sign_loss)]
                let scode = excep.scode as u32;
                let description = excep.bstrDescription.to_string();
                Err(AutomationError::from(e).with_exception(scode, description))
            }
            Err(e) => Err(e.into()),
        }
    }
}

impl Dispatch for ComObject {
    fn get_property(&self, name: &str, args: &[Arg<'_>]) -> Result<Variant, AutomationError> {
        from_variant(&self.invoke(name, DISPATCH_PROPERTYGET, args)?)
    }

    fn call_method(&self, name: &str, args: &[Arg<'_>]) -> Result<Variant, AutomationError> {
        from_variant(&self.invoke(name, DISPATCH_METHOD, args)?)
    }

    fn put_property(&self, name: &str, value: Arg<'_>) -> Result<(), AutomationError> {
        self.invoke(name, DISPATCH_PROPERTYPUT, &[value])?;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

fn to_variant(arg: &Arg<'_>) -> Result<VARIANT, AutomationError> {
    match *arg {
        Arg::Int(n) => Ok(VARIANT::from(n)),
        Arg::Str(s) => Ok(VARIANT::from(BSTR::from(s))),
        Arg::Object(obj) => {
            let com = obj.as_any().downcast_ref::<ComObject>().ok_or_else(|| {
                AutomationError::new(E_INVALIDARG, "argument is not a COM object")
            })?;
            Ok(VARIANT::from(com.0.cast::<IUnknown>()?))
        }
    }
}

fn from_variant(value: &VARIANT) -> Result<Variant, AutomationError> {
    let vt = value.vt();
    let converted = match vt {
        VT_EMPTY | VT_NULL => Variant::Empty,
        VT_BOOL => Variant::Bool(bool::try_from(value)?),
        VT_BSTR => Variant::String(BSTR::try_from(value)?.to_string()),
        VT_DATE => Variant::Date(f64::try_from(value)?),
        VT_R4 | VT_R8 => Variant::Float(f64::try_from(value)?),
        VT_I1 | VT_I2 | VT_I4 | VT_I8 | VT_INT | VT_UI1 | VT_UI2 | VT_UI4 | VT_UI8 | VT_UINT => {
            Variant::Int(i64::try_from(value)?)
        }
        VT_DISPATCH => {
            let raw = value.as_raw();
            let ptr = unsafe { raw.Anonymous.Anonymous.Anonymous.pdispVal };
            match unsafe { IDispatch::from_raw_borrowed(&ptr) } {
                Some(dispatch) => Variant::Object(Box::new(ComObject(dispatch.clone()))),
                None => Variant::Empty,
            }
        }
        other => {
            return Err(AutomationError::new(
                E_INVALIDARG,
                format!("unsupported variant type {}", other.0),
            ));
        }
    };
    Ok(converted)
}
