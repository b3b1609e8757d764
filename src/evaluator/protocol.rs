//! Messages crossing the evaluation-context boundary. Both sides are
//! provisioned independently, so everything here is plain structured
//! data with a stable serialized shape; no references cross over.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::classifier::Prediction;

/// A request into the evaluation context. The caller picks the
/// correlation id; the evaluator echoes it on the response so completions
/// can be matched out of order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase")]
pub enum EvaluatorRequest {
    #[serde(rename_all = "camelCase")]
    AnalyzeFrame {
        correlation_id: Uuid,
        /// JPEG-encoded frame bytes.
        image_data: Vec<u8>,
    },
    #[serde(rename_all = "camelCase")]
    Status { correlation_id: Uuid },
}

impl EvaluatorRequest {
    pub fn correlation_id(&self) -> Uuid {
        match self {
            EvaluatorRequest::AnalyzeFrame { correlation_id, .. } => *correlation_id,
            EvaluatorRequest::Status { correlation_id } => *correlation_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluatorResponse {
    pub correlation_id: Uuid,
    #[serde(flatten)]
    pub payload: ResponsePayload,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponsePayload {
    #[serde(rename_all = "camelCase")]
    Analysis {
        success: bool,
        predictions: Vec<Prediction>,
    },
    #[serde(rename_all = "camelCase")]
    Status {
        model_loaded: bool,
        model_loading: bool,
    },
    #[serde(rename_all = "camelCase")]
    Error { error: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn analysis_response_wire_shape_is_stable() {
        let id = Uuid::new_v4();
        let response = EvaluatorResponse {
            correlation_id: id,
            payload: ResponsePayload::Analysis {
                success: true,
                predictions: vec![Prediction {
                    class_name: "Neutral".to_string(),
                    probability: 0.25,
                }],
            },
        };

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["correlationId"], serde_json::json!(id.to_string()));
        assert_eq!(value["success"], serde_json::json!(true));
        assert_eq!(value["predictions"][0]["className"], "Neutral");

        let back: EvaluatorResponse = serde_json::from_value(value).unwrap();
        assert!(matches!(
            back.payload,
            ResponsePayload::Analysis { success: true, .. }
        ));
    }

    #[test]
    fn error_response_round_trips() {
        let response = EvaluatorResponse {
            correlation_id: Uuid::new_v4(),
            payload: ResponsePayload::Error {
                error: "Model not loaded".to_string(),
            },
        };

        let raw = serde_json::to_string(&response).unwrap();
        assert!(raw.contains("\"error\":\"Model not loaded\""));

        let back: EvaluatorResponse = serde_json::from_str(&raw).unwrap();
        assert!(matches!(back.payload, ResponsePayload::Error { .. }));
    }

    #[test]
    fn request_serializes_with_action_tag() {
        let request = EvaluatorRequest::AnalyzeFrame {
            correlation_id: Uuid::new_v4(),
            image_data: vec![1, 2, 3],
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["action"], "analyzeFrame");
        assert_eq!(value["imageData"], serde_json::json!([1, 2, 3]));
    }
}
