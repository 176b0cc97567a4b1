//! Download and install of individual updates

use tracing::{debug, info, instrument, warn};

use crate::automation::Arg;
use crate::error::{InstallPhase, WuaError};
use crate::handles::{Update, UpdateCollection, call, call_object, put};
use crate::selector::UpdateSelector;
use crate::session::Session;
use crate::types::{FailedInstall, InstallReport};

impl Session {
    /// Accept the license if needed, then download and install one update
    ///
    /// Download always completes before install starts. Nothing is retried and
    /// nothing is rolled back on failure.
    ///
    /// # Errors
    /// Returns the first step that fails.
    #[instrument(skip_all)]
    pub fn install(&self, update: &Update) -> Result<(), WuaError> {
        let title = update.title()?;

        let updates = self.prepare(update, &title).map_err(|e| WuaError::Install {
            title: title.clone(),
            phase: InstallPhase::Prepare,
            source: Box::new(e),
        })?;

        debug!(%title, "downloading update");
        self.download(&updates).map_err(|e| WuaError::Install {
            title: title.clone(),
            phase: InstallPhase::Download,
            source: Box::new(e),
        })?;

        debug!(%title, "installing update");
        self.install_collection(&updates)
            .map_err(|e| WuaError::Install {
                title: title.clone(),
                phase: InstallPhase::Install,
                source: Box::new(e),
            })?;

        info!(%title, "update installed");
        Ok(())
    }

    /// Accept the license if needed and wrap the update in a fresh collection
    fn prepare(&self, update: &Update, title: &str) -> Result<UpdateCollection, WuaError> {
        let updates = UpdateCollection::new(self.runtime())?;

        if update.eula_accepted()? {
            debug!(%title, "EULA already accepted");
        } else {
            debug!(%title, "accepting EULA");
            update.accept_eula()?;
        }

        updates.add(update)?;
        Ok(updates)
    }

    /// Download every update in the collection
    ///
    /// # Errors
    /// Returns an error if the downloader cannot be created, configured or run.
    pub fn download(&self, updates: &UpdateCollection) -> Result<(), WuaError> {
        let downloader = call_object(self.root(), Self::OWNER, "CreateUpdateDownloader", &[])?;
        put(
            downloader.as_ref(),
            "IUpdateDownloader",
            "Updates",
            Arg::Object(updates.as_dispatch()),
        )?;
        call(downloader.as_ref(), "IUpdateDownloader", "Download", &[])?;
        Ok(())
    }

    /// Install every update in the collection
    ///
    /// # Errors
    /// Returns an error if the installer cannot be created, configured or run.
    pub fn install_collection(&self, updates: &UpdateCollection) -> Result<(), WuaError> {
        let installer = call_object(self.root(), Self::OWNER, "CreateUpdateInstaller", &[])?;
        put(
            installer.as_ref(),
            "IUpdateInstaller",
            "Updates",
            Arg::Object(updates.as_dispatch()),
        )?;
        // TODO: switch to BeginInstall and poll its progress so long installs can be reported.
        call(installer.as_ref(), "IUpdateInstaller", "Install", &[])?;
        Ok(())
    }

    /// Search, then install every update the selector matches, one at a time
    ///
    /// Every result is extracted before the first install starts. A failed update
    /// is recorded in the report and later updates are still attempted.
    ///
    /// # Errors
    /// Returns an error if the search itself or the extraction of any result
    /// fails. Nothing has been installed in that case.
    #[instrument(skip(self, selector))]
    pub fn install_matching(
        &self,
        query: &str,
        selector: &UpdateSelector,
    ) -> Result<InstallReport, WuaError> {
        let wrap = |e: WuaError| WuaError::Search {
            query: query.to_string(),
            source: Box::new(e),
        };

        let updates = self.search(query).map_err(wrap)?;
        let n = updates.count().map_err(wrap)?;

        // No install starts until every result has been extracted.
        let mut extracted = Vec::with_capacity(usize::try_from(n).unwrap_or_default());
        for i in 0..n {
            let update = updates.item(i).map_err(wrap)?;
            let package = update.to_package().map_err(wrap)?;
            extracted.push((update, package));
        }
        debug!(count = extracted.len(), "search returned updates");

        let mut report = InstallReport::default();
        for (update, package) in extracted {
            if !selector.matches(&package) {
                debug!(title = %package.title, "update not selected");
                report.skipped.push(package);
                continue;
            }

            match self.install(&update) {
                Ok(()) => report.installed.push(package),
                Err(e) => {
                    warn!(title = %package.title, error = %e, "update install failed");
                    report.failed.push(FailedInstall {
                        package,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            installed = report.installed.len(),
            failed = report.failed.len(),
            skipped = report.skipped.len(),
            "install run completed"
        );
        Ok(report)
    }
}
