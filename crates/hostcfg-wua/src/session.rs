//! Update agent session lifecycle
//!
//! The update agent is not safe for concurrent use from one process, so every
//! [`Session`] holds a process-wide lock for its whole lifetime. Opening a
//! second session blocks until the first one has been closed.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, instrument};

use crate::automation::{AutomationRuntime, Dispatch, SESSION_PROG_ID, SYSTEM_INFO_PROG_ID};
use crate::error::WuaError;
use crate::handles::get_bool;

static WUA_SESSION: Mutex<()> = Mutex::new(());

/// Initialized automation subsystem plus the session lock
///
/// Dropping it uninitializes the subsystem first, then releases the lock.
struct Apartment {
    runtime: Arc<dyn AutomationRuntime>,
    _lock: MutexGuard<'static, ()>,
}

impl Drop for Apartment {
    fn drop(&mut self) {
        self.runtime.uninitialize();
        debug!(runtime = self.runtime.runtime_type(), "update agent session closed");
    }
}

/// Live connection to the update agent (`IUpdateSession`)
///
/// Not `Send`: the session must be closed on the thread that opened it.
pub struct Session {
    // Fields drop in declaration order: the root is released before the
    // apartment tears the subsystem down.
    root: Box<dyn Dispatch>,
    apartment: Apartment,
}

impl Session {
    pub(crate) const OWNER: &'static str = "IUpdateSession";

    /// Open a session, waiting for any other session in this process to close
    ///
    /// # Errors
    /// Returns an error if the subsystem cannot be initialized or the session
    /// object cannot be created. The session lock is released in both cases.
    #[instrument(skip_all, fields(runtime = runtime.runtime_type()))]
    pub fn open(runtime: Arc<dyn AutomationRuntime>) -> Result<Self, WuaError> {
        // The lock guards no data, so a holder that panicked leaves nothing to repair.
        let lock = WUA_SESSION.lock().unwrap_or_else(PoisonError::into_inner);
        debug!("acquired update agent session lock");

        runtime.initialize().map_err(WuaError::SubsystemInit)?;
        let apartment = Apartment {
            runtime,
            _lock: lock,
        };

        let root = apartment
            .runtime
            .create_object(SESSION_PROG_ID)
            .map_err(|e| WuaError::create_object(SESSION_PROG_ID, e))?;

        debug!("update agent session opened");
        Ok(Self { root, apartment })
    }

    /// Release the session object, uninitialize the subsystem and release the lock
    pub fn close(self) {
        drop(self);
    }

    pub(crate) fn root(&self) -> &dyn Dispatch {
        self.root.as_ref()
    }

    pub(crate) fn runtime(&self) -> &dyn AutomationRuntime {
        self.apartment.runtime.as_ref()
    }

    /// Whether the system reports a pending reboot
    ///
    /// # Errors
    /// Returns an error if the system information object cannot be created or read.
    #[instrument(skip(self))]
    pub fn reboot_required(&self) -> Result<bool, WuaError> {
        let info = self
            .runtime()
            .create_object(SYSTEM_INFO_PROG_ID)
            .map_err(|e| WuaError::create_object(SYSTEM_INFO_PROG_ID, e))?;
        let required = get_bool(info.as_ref(), "ISystemInformation", "RebootRequired")?;
        debug!(required, "read reboot state");
        Ok(required)
    }
}
