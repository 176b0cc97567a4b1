//! Status code extraction for failed automation calls

use std::error::Error;

use tracing::error;

use crate::automation::AutomationError;

/// Find the platform status code carried anywhere in an error's source chain
///
/// Returns `None` when no automation exception is present. Never fails.
#[must_use]
pub fn scode(err: &(dyn Error + 'static)) -> Option<u32> {
    let mut current = Some(err);
    while let Some(e) = current {
        if let Some(info) = e
            .downcast_ref::<AutomationError>()
            .and_then(|a| a.exception.as_ref())
        {
            return Some(info.scode);
        }
        current = e.source();
    }
    None
}

/// Render `" SCODE: 0x.."` for an error carrying a status code, or `""`
///
/// A decoded code is also logged at error level.
#[must_use]
pub fn scode_suffix(err: &(dyn Error + 'static)) -> String {
    match scode(err) {
        Some(code) => {
            error!(scode = %format!("0x{code:x}"), "automation call failed with SCODE");
            format!(" SCODE: 0x{code:x}")
        }
        None => String::new(),
    }
}
