//! Update agent traits

use async_trait::async_trait;

use crate::error::WuaError;
use crate::selector::UpdateSelector;
use crate::types::{InstallReport, UpdatePackage};

/// Asynchronous front for a platform update agent
#[async_trait]
pub trait UpdateAgent: Send + Sync {
    /// Search for updates matching `query`
    async fn search(&self, query: &str) -> Result<Vec<UpdatePackage>, WuaError>;

    /// Search for updates matching `query` and install those `selector` matches
    async fn install(
        &self,
        query: &str,
        selector: &UpdateSelector,
    ) -> Result<InstallReport, WuaError>;

    /// Whether the system reports a pending reboot
    async fn reboot_required(&self) -> Result<bool, WuaError>;

    /// Name of the agent implementation
    fn agent_type(&self) -> &'static str;

    /// Whether the agent can be reached on this system
    async fn is_available(&self) -> bool;
}
