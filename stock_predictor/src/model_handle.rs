//! Lock-free, read-mostly slot for the current trained model.
//!
//! Readers call [`ModelHandle::current`], which loads an `Arc` snapshot with
//! no lock contention. Retraining calls [`ModelHandle::install`] to swap in a
//! new model atomically; readers holding the previous snapshot keep using it
//! until they drop it.
//!
//! The slot starts empty. Unlike a process-wide static, each handle is owned
//! by whoever constructs it and passed explicitly to the code that predicts.

use std::sync::Arc;

use arc_swap::ArcSwapOption;
use forecast::{LinearModel, Split, TrainedModel};
use tracing::info;

#[derive(Default)]
pub struct ModelHandle {
    current: ArcSwapOption<TrainedModel>,
}

impl ModelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot, or `None` until a model is installed.
    pub fn current(&self) -> Option<Arc<TrainedModel>> {
        self.current.load_full()
    }

    /// Atomically replaces the current model; returns the new snapshot.
    pub fn install(&self, trained: TrainedModel) -> Arc<TrainedModel> {
        let trained = Arc::new(trained);
        info!(
            training_rows = trained.split.training.len(),
            testing_rows = trained.split.testing.len(),
            "installing model"
        );
        self.current.store(Some(Arc::clone(&trained)));
        trained
    }

    /// Installs a model that was fitted elsewhere (e.g. loaded from JSON);
    /// it carries no split.
    pub fn install_fitted(&self, model: LinearModel) -> Arc<TrainedModel> {
        self.install(TrainedModel {
            model,
            split: Split::default(),
        })
    }

    pub fn clear(&self) {
        self.current.store(None);
    }
}
