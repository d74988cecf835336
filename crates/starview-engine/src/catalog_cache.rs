use std::sync::Arc;

use parking_lot::RwLock;
use starview_rules::BadgeCatalog;
use tracing::{debug, info};

use crate::error::EngineError;
use crate::store::CatalogSource;

/// Read-through cache of the validated catalog.
///
/// Populated on first access and kept until [`invalidate`](Self::invalidate).
/// A source that yields a malformed catalog is reported on every access until
/// fixed; nothing is cached in that case.
pub struct CatalogCache {
    source: Arc<dyn CatalogSource>,
    current: RwLock<Option<Arc<BadgeCatalog>>>,
}

impl CatalogCache {
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self {
            source,
            current: RwLock::new(None),
        }
    }

    pub fn get(&self) -> Result<Arc<BadgeCatalog>, EngineError> {
        if let Some(catalog) = self.current.read().as_ref() {
            return Ok(Arc::clone(catalog));
        }

        let mut slot = self.current.write();
        // Another caller may have loaded it while we waited for the lock.
        if let Some(catalog) = slot.as_ref() {
            return Ok(Arc::clone(catalog));
        }

        debug!("loading badge catalog");
        let catalog = Arc::new(BadgeCatalog::build(self.source.load_definitions()?)?);
        info!(badges = catalog.len(), "badge catalog loaded");
        *slot = Some(Arc::clone(&catalog));
        Ok(catalog)
    }

    /// Drop the cached catalog; the next access reloads it.
    pub fn invalidate(&self) {
        if self.current.write().take().is_some() {
            info!("badge catalog invalidated");
        }
    }
}
