use std::sync::Arc;

use log::{debug, info};
use tokio::sync::mpsc;

use crate::classifier::ClassifierGateway;
use crate::errors::ClassifierError;

use super::protocol::{EvaluatorRequest, EvaluatorResponse, ResponsePayload};

/// The evaluation context: a long-lived task owning the classifier
/// gateway. Requests fan out into their own tasks so a slow inference
/// never blocks the ones behind it; the model instance is shared
/// read-only across all of them.
pub async fn run_evaluator(
    gateway: Arc<ClassifierGateway>,
    mut requests: mpsc::Receiver<EvaluatorRequest>,
    responses: mpsc::Sender<EvaluatorResponse>,
) {
    // Warm the model in the background so the first analysis does not pay
    // for the load.
    {
        let gateway = gateway.clone();
        tokio::spawn(async move {
            if gateway.warm_up().await {
                info!("evaluator model ready");
            }
        });
    }

    while let Some(request) = requests.recv().await {
        let gateway = gateway.clone();
        let responses = responses.clone();
        tokio::spawn(async move {
            let response = handle_request(&gateway, request).await;
            if responses.send(response).await.is_err() {
                debug!("response channel closed, dropping evaluator result");
            }
        });
    }

    debug!("evaluator request channel closed, shutting down");
}

async fn handle_request(
    gateway: &ClassifierGateway,
    request: EvaluatorRequest,
) -> EvaluatorResponse {
    let correlation_id = request.correlation_id();
    let payload = match request {
        EvaluatorRequest::AnalyzeFrame { image_data, .. } => analyze(gateway, image_data).await,
        EvaluatorRequest::Status { .. } => {
            let status = gateway.status();
            ResponsePayload::Status {
                model_loaded: status.model_loaded,
                model_loading: status.model_loading,
            }
        }
    };

    EvaluatorResponse {
        correlation_id,
        payload,
    }
}

/// Errors never propagate as faults across the boundary; they become
/// structured error payloads the relay can hand back to the caller.
async fn analyze(gateway: &ClassifierGateway, image_data: Vec<u8>) -> ResponsePayload {
    let decoded =
        tokio::task::spawn_blocking(move || image::load_from_memory(&image_data)).await;

    let image = match decoded {
        Ok(Ok(image)) => image,
        Ok(Err(err)) => {
            return ResponsePayload::Error {
                error: format!("frame decode failed: {err}"),
            }
        }
        Err(err) => {
            return ResponsePayload::Error {
                error: format!("decode worker join failed: {err}"),
            }
        }
    };

    match gateway.classify(image).await {
        Ok(predictions) => ResponsePayload::Analysis {
            success: true,
            predictions,
        },
        Err(err @ ClassifierError::ModelUnavailable) => ResponsePayload::Error {
            error: err.to_string(),
        },
        Err(ClassifierError::Inference(message)) => ResponsePayload::Error { error: message },
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use anyhow::Result;
    use async_trait::async_trait;
    use image::DynamicImage;
    use uuid::Uuid;

    use crate::classifier::{ClassifierModel, ModelProvider, Prediction};

    use super::*;

    struct StubModel;

    impl ClassifierModel for StubModel {
        fn classify(&self, _image: &DynamicImage) -> Result<Vec<Prediction>> {
            Ok(vec![Prediction {
                class_name: "Drawing".to_string(),
                probability: 0.8,
            }])
        }
    }

    struct StubProvider;

    #[async_trait]
    impl ModelProvider for StubProvider {
        fn name(&self) -> &str {
            "stub"
        }

        async fn load(&self) -> Result<Arc<dyn ClassifierModel>> {
            Ok(Arc::new(StubModel))
        }
    }

    fn spawn_service() -> (
        mpsc::Sender<EvaluatorRequest>,
        mpsc::Receiver<EvaluatorResponse>,
    ) {
        let gateway = Arc::new(ClassifierGateway::new(vec![Arc::new(StubProvider)]));
        let (request_tx, request_rx) = mpsc::channel(8);
        let (response_tx, response_rx) = mpsc::channel(8);
        tokio::spawn(run_evaluator(gateway, request_rx, response_tx));
        (request_tx, response_rx)
    }

    fn tiny_jpeg() -> Vec<u8> {
        let image = image::RgbImage::from_pixel(4, 4, image::Rgb([120, 40, 200]));
        let mut encoded = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut encoded), image::ImageFormat::Jpeg)
            .unwrap();
        encoded
    }

    #[tokio::test]
    async fn echoes_correlation_id_on_success() {
        let (requests, mut responses) = spawn_service();
        let id = Uuid::new_v4();

        requests
            .send(EvaluatorRequest::AnalyzeFrame {
                correlation_id: id,
                image_data: tiny_jpeg(),
            })
            .await
            .unwrap();

        let response = responses.recv().await.unwrap();
        assert_eq!(response.correlation_id, id);
        match response.payload {
            ResponsePayload::Analysis {
                success,
                predictions,
            } => {
                assert!(success);
                assert_eq!(predictions[0].class_name, "Drawing");
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_frame_becomes_structured_error() {
        let (requests, mut responses) = spawn_service();
        let id = Uuid::new_v4();

        requests
            .send(EvaluatorRequest::AnalyzeFrame {
                correlation_id: id,
                image_data: vec![0, 1, 2, 3],
            })
            .await
            .unwrap();

        let response = responses.recv().await.unwrap();
        assert_eq!(response.correlation_id, id);
        match response.payload {
            ResponsePayload::Error { error } => {
                assert!(error.contains("frame decode failed"));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[tokio::test]
    async fn answers_status_requests() {
        let (requests, mut responses) = spawn_service();
        let id = Uuid::new_v4();

        requests
            .send(EvaluatorRequest::Status { correlation_id: id })
            .await
            .unwrap();

        let response = responses.recv().await.unwrap();
        assert_eq!(response.correlation_id, id);
        assert!(matches!(response.payload, ResponsePayload::Status { .. }));
    }
}
