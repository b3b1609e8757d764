use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use image::DynamicImage;
use serde::{Deserialize, Serialize};

/// One classifier output: a label and its probability in [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prediction {
    pub class_name: String,
    pub probability: f64,
}

/// The opaque pretrained model. Classification is read-only and must be
/// safe to call from concurrent requests sharing one instance.
pub trait ClassifierModel: Send + Sync {
    fn classify(&self, image: &DynamicImage) -> Result<Vec<Prediction>>;
}

/// One place a model can be loaded from. The gateway tries providers in
/// order: primary first, then the fallback source.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn load(&self) -> Result<Arc<dyn ClassifierModel>>;
}
