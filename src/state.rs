//! Shared, reloadable handle on the current catalog.

use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use log::{info, warn};

use crate::config::LoadConfig;
use crate::data::catalog::Catalog;
use crate::data::loader::{load_with, CancelToken};
use crate::error::LoadError;

// ---------------------------------------------------------------------------
// Catalog state
// ---------------------------------------------------------------------------

/// Holds the current catalog for a host application.
///
/// Readers take an `Arc` snapshot with [`CatalogState::current`] and keep
/// using it for as long as they like. [`CatalogState::reload`] builds the new
/// catalog without holding the lock and publishes it with a single swap, so
/// readers see either the old catalog or the new one, never a mix. A failed
/// or cancelled reload leaves the previous catalog in place.
#[derive(Debug, Default)]
pub struct CatalogState {
    current: RwLock<Option<Arc<Catalog>>>,
    config: LoadConfig,
}

impl CatalogState {
    pub fn new(config: LoadConfig) -> Self {
        Self {
            current: RwLock::new(None),
            config,
        }
    }

    pub fn config(&self) -> &LoadConfig {
        &self.config
    }

    /// Snapshot of the current catalog, `None` until the first successful load.
    pub fn current(&self) -> Option<Arc<Catalog>> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Load `master` and make it current.
    pub fn reload(&self, master: impl AsRef<Path>) -> Result<Arc<Catalog>, LoadError> {
        self.reload_cancellable(master, &CancelToken::new())
    }

    /// As [`CatalogState::reload`], aborting early once `cancel` is set.
    pub fn reload_cancellable(
        &self,
        master: impl AsRef<Path>,
        cancel: &CancelToken,
    ) -> Result<Arc<Catalog>, LoadError> {
        let master = master.as_ref();
        let catalog = match load_with(master, &self.config, cancel) {
            Ok(catalog) => Arc::new(catalog),
            Err(e) => {
                warn!("keeping previous catalog, reload of {} failed: {e}", master.display());
                return Err(e);
            }
        };

        let mut slot = self.current.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Some(Arc::clone(&catalog));
        info!("switched to catalog {}", catalog.source().display());
        Ok(catalog)
    }

    /// Drop the current catalog.
    pub fn clear(&self) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = None;
    }
}
