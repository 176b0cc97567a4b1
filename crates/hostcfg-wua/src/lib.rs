//! hostcfg-wua: Windows Update Agent integration
//!
//! Searches, downloads and installs operating system updates through the
//! platform's update agent automation API and turns the results into portable
//! [`UpdatePackage`] records.

pub mod agent;
pub mod automation;
#[cfg(windows)]
pub mod com;
pub mod date;
pub mod diagnostic;
pub mod error;
pub mod handles;
mod install;
mod search;
pub mod selector;
pub mod session;
pub mod traits;
pub mod types;

pub use agent::WuaAgent;
pub use error::{InstallPhase, WuaError};
pub use handles::{Update, UpdateCollection};
pub use selector::UpdateSelector;
pub use session::Session;
pub use traits::UpdateAgent;
pub use types::{Category, FailedInstall, InstallReport, UpdateIdentity, UpdatePackage};
