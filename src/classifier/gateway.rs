use std::sync::Arc;

use image::DynamicImage;
use log::{error, info, warn};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::errors::ClassifierError;

use super::model::{ClassifierModel, ModelProvider, Prediction};

#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModelStatus {
    pub model_loaded: bool,
    pub model_loading: bool,
}

enum LoadState {
    Idle,
    Ready(Arc<dyn ClassifierModel>),
    Unavailable,
}

/// Wraps the third-party model behind lazy, idempotent loading. The load
/// state mutex is the only mutually-exclusive operation here: concurrent
/// classify calls before load completion queue behind the single
/// in-flight load, and classification itself runs on a shared `Arc`
/// without further locking.
pub struct ClassifierGateway {
    providers: Vec<Arc<dyn ModelProvider>>,
    state: Mutex<LoadState>,
}

impl ClassifierGateway {
    pub fn new(providers: Vec<Arc<dyn ModelProvider>>) -> Self {
        Self {
            providers,
            state: Mutex::new(LoadState::Idle),
        }
    }

    /// Explicit load trigger. Returns whether a model ended up ready.
    pub async fn warm_up(&self) -> bool {
        self.ensure_loaded().await.is_ok()
    }

    pub async fn classify(
        &self,
        image: DynamicImage,
    ) -> Result<Vec<Prediction>, ClassifierError> {
        let model = self.ensure_loaded().await?;

        tokio::task::spawn_blocking(move || model.classify(&image))
            .await
            .map_err(|err| {
                ClassifierError::Inference(format!("classification worker join failed: {err}"))
            })?
            .map_err(|err| ClassifierError::Inference(format!("{err:#}")))
    }

    /// A failed load leaves the gateway unavailable until this is called.
    pub async fn retry(&self) {
        let mut state = self.state.lock().await;
        if matches!(*state, LoadState::Unavailable) {
            info!("classifier gateway re-armed for another load attempt");
            *state = LoadState::Idle;
        }
    }

    pub fn status(&self) -> ModelStatus {
        match self.state.try_lock() {
            Ok(state) => ModelStatus {
                model_loaded: matches!(*state, LoadState::Ready(_)),
                model_loading: false,
            },
            // The lock is held across the load await, so contention here
            // means a load is in flight.
            Err(_) => ModelStatus {
                model_loaded: false,
                model_loading: true,
            },
        }
    }

    async fn ensure_loaded(&self) -> Result<Arc<dyn ClassifierModel>, ClassifierError> {
        let mut state = self.state.lock().await;

        match &*state {
            LoadState::Ready(model) => return Ok(model.clone()),
            LoadState::Unavailable => return Err(ClassifierError::ModelUnavailable),
            LoadState::Idle => {}
        }

        for provider in &self.providers {
            info!("loading classifier model from {}", provider.name());
            match provider.load().await {
                Ok(model) => {
                    info!("classifier model loaded from {}", provider.name());
                    *state = LoadState::Ready(model.clone());
                    return Ok(model);
                }
                Err(err) => {
                    warn!("model load from {} failed: {err:#}", provider.name());
                }
            }
        }

        error!("every model source failed; classifier unavailable until retried");
        *state = LoadState::Unavailable;
        Err(ClassifierError::ModelUnavailable)
    }
}
