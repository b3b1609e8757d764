pub mod gateway;
pub mod model;

pub use gateway::{ClassifierGateway, ModelStatus};
pub use model::{ClassifierModel, ModelProvider, Prediction};
