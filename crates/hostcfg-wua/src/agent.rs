//! Windows Update Agent front end
//!
//! Every operation opens its own session on a blocking worker thread, so the
//! session, the automation subsystem and every handle live and die on one thread.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::automation::AutomationRuntime;
use crate::error::WuaError;
use crate::selector::UpdateSelector;
use crate::session::Session;
use crate::traits::UpdateAgent;
use crate::types::{InstallReport, UpdatePackage};

/// Windows Update Agent implementation of [`UpdateAgent`]
#[derive(Clone)]
pub struct WuaAgent {
    /// Automation backend
    runtime: Arc<dyn AutomationRuntime>,
}

impl WuaAgent {
    /// Create an agent over the given automation backend
    pub fn new(runtime: Arc<dyn AutomationRuntime>) -> Self {
        Self { runtime }
    }

    /// Create an agent over the platform's native backend
    ///
    /// # Errors
    /// Returns [`WuaError::Unsupported`] on platforms without an update agent.
    pub fn platform() -> Result<Self, WuaError> {
        #[cfg(windows)]
        {
            Ok(Self::new(Arc::new(crate::com::ComRuntime::new())))
        }
        #[cfg(not(windows))]
        {
            Err(WuaError::Unsupported(
                "the Windows Update Agent is only available on Windows".to_string(),
            ))
        }
    }

    /// Open a session on a blocking thread, run `f`, close the session
    async fn with_session<T, F>(&self, f: F) -> Result<T, WuaError>
    where
        T: Send + 'static,
        F: FnOnce(&Session) -> Result<T, WuaError> + Send + 'static,
    {
        let runtime = Arc::clone(&self.runtime);
        tokio::task::spawn_blocking(move || {
            let session = Session::open(runtime)?;
            let result = f(&session);
            session.close();
            result
        })
        .await
        .map_err(|e| WuaError::Join(e.to_string()))?
    }
}

#[async_trait]
impl UpdateAgent for WuaAgent {
    #[instrument(skip(self))]
    async fn search(&self, query: &str) -> Result<Vec<UpdatePackage>, WuaError> {
        let query = query.to_string();
        self.with_session(move |session| session.search_packages(&query))
            .await
    }

    #[instrument(skip(self, selector))]
    async fn install(
        &self,
        query: &str,
        selector: &UpdateSelector,
    ) -> Result<InstallReport, WuaError> {
        let query = query.to_string();
        let selector = selector.clone();
        self.with_session(move |session| session.install_matching(&query, &selector))
            .await
    }

    #[instrument(skip(self))]
    async fn reboot_required(&self) -> Result<bool, WuaError> {
        self.with_session(Session::reboot_required).await
    }

    fn agent_type(&self) -> &'static str {
        "wua"
    }

    async fn is_available(&self) -> bool {
        match self.with_session(|_| Ok(())).await {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "update agent unavailable");
                false
            }
        }
    }
}
