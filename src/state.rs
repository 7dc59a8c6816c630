use std::sync::Arc;

use crate::config::AppConfig;
use crate::dicom::DicomReader;
use crate::metrics::Metrics;
use crate::storage::FileStore;

/// The shared application state.
///
/// Everything in here is read-only after startup apart from the atomic
/// counters in [`Metrics`]. Cloning is cheap and happens once per request.
#[derive(Clone)]
pub struct AppState {
    /// The record store.
    pub store: FileStore,
    /// Opens stored records for tag lookup and rendering.
    pub dicom: DicomReader,
    /// The application configuration.
    pub config: Arc<AppConfig>,
    /// Request counters.
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(store: FileStore, config: AppConfig) -> Self {
        Self { store, dicom: DicomReader::new(), config: Arc::new(config), metrics: Metrics::new() }
    }

    /// Creates the storage directory named in `config` and builds the state on top of it.
    pub fn from_config(config: AppConfig) -> std::io::Result<Self> {
        let store = FileStore::new(&config.storage_dir)?;
        Ok(Self::new(store, config))
    }
}
