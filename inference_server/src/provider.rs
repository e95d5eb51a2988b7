//! Process-wide model lifecycle.
//!
//! `ModelProvider` owns at most one loaded `ModelHandle`. The first caller of
//! [`ModelProvider::get`] performs the load on the blocking pool; callers that
//! arrive while it is in flight wait for that same load. Handles are shared
//! as `Arc`s so inference never holds a provider lock.

use std::{
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, PoisonError, RwLock,
    },
    time::Instant,
};
use tokio::sync::OnceCell;
use tracing::{error, info};

use crate::error::ModelLoadError;
use crate::model::ModelHandle;

type Slot = Arc<OnceCell<LoadedModel>>;

#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub handle: Arc<ModelHandle>,
    pub load_time_ms: f64,
}

#[derive(Debug)]
pub struct ModelProvider {
    path: PathBuf,
    // Swapped for a fresh cell on reset; each cell initializes at most once.
    slot: RwLock<Slot>,
    loads: AtomicU64,
}

impl ModelProvider {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            slot: RwLock::new(Arc::new(OnceCell::new())),
            loads: AtomicU64::new(0),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn current(&self) -> Slot {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Return the loaded model, loading it first if needed. A failed load
    /// leaves the slot empty so a later call can retry.
    pub async fn get(&self) -> Result<Arc<ModelHandle>, ModelLoadError> {
        let slot = self.current();
        let loaded = slot.get_or_try_init(|| self.load()).await?;
        Ok(loaded.handle.clone())
    }

    async fn load(&self) -> Result<LoadedModel, ModelLoadError> {
        let path = self.path.clone();
        info!("Loading model from {}", path.display());
        let start_time = Instant::now();

        let result = tokio::task::spawn_blocking(move || ModelHandle::load(path))
            .await
            .map_err(|e| ModelLoadError::Aborted(e.to_string()))?;

        let handle = match result {
            Ok(handle) => handle,
            Err(e) => {
                error!("Failed to load model: {}", e);
                return Err(e);
            }
        };

        let load_time_ms = start_time.elapsed().as_secs_f64() * 1000.0;
        let count = self.loads.fetch_add(1, Ordering::SeqCst) + 1;
        info!(
            "✓ Model {} loaded in {:.2}ms ({} classes, load #{})",
            handle.metadata().version,
            load_time_ms,
            handle.class_count(),
            count
        );

        Ok(LoadedModel {
            handle: Arc::new(handle),
            load_time_ms,
        })
    }

    /// The current model without triggering a load.
    pub fn loaded(&self) -> Option<LoadedModel> {
        self.current().get().cloned()
    }

    pub fn is_loaded(&self) -> bool {
        self.current().initialized()
    }

    /// Number of successful loads since the provider was created.
    pub fn load_count(&self) -> u64 {
        self.loads.load(Ordering::SeqCst)
    }

    /// Drop the cached model. Requests already holding a handle keep it; the
    /// next [`get`](Self::get) loads a fresh one.
    pub fn reset(&self) {
        let mut slot = self.slot.write().unwrap_or_else(PoisonError::into_inner);
        *slot = Arc::new(OnceCell::new());
        info!("Model cache cleared");
    }

    pub async fn reload(&self) -> Result<Arc<ModelHandle>, ModelLoadError> {
        self.reset();
        self.get().await
    }
}
