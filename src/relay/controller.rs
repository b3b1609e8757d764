use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use log::{debug, warn};
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::classifier::{ClassifierGateway, ModelStatus, Prediction};
use crate::errors::AnalysisError;
use crate::evaluator::{run_evaluator, EvaluatorRequest, EvaluatorResponse, ResponsePayload};

/// Depth of the request channel into the evaluator. Each monitored video
/// keeps at most one analysis in flight, so hitting this bound means a
/// misbehaving host; excess requests are shed, not queued.
const REQUEST_QUEUE_LIMIT: usize = 32;

/// Bounded wait for a matching response before the pending entry is
/// discarded.
const RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Brings up an evaluation context wired to the given channel ends. Must
/// return only once the context is accepting work.
#[async_trait]
pub trait EvaluatorFactory: Send + Sync {
    async fn provision(
        &self,
        requests: mpsc::Receiver<EvaluatorRequest>,
        responses: mpsc::Sender<EvaluatorResponse>,
    ) -> Result<()>;
}

/// Default factory: the evaluator is a task in this process wrapping the
/// classifier gateway.
pub struct InProcessEvaluator {
    gateway: Arc<ClassifierGateway>,
}

impl InProcessEvaluator {
    pub fn new(gateway: Arc<ClassifierGateway>) -> Self {
        Self { gateway }
    }
}

#[async_trait]
impl EvaluatorFactory for InProcessEvaluator {
    async fn provision(
        &self,
        requests: mpsc::Receiver<EvaluatorRequest>,
        responses: mpsc::Sender<EvaluatorResponse>,
    ) -> Result<()> {
        tokio::spawn(run_evaluator(self.gateway.clone(), requests, responses));
        Ok(())
    }
}

type PendingTable = Arc<StdMutex<HashMap<Uuid, oneshot::Sender<ResponsePayload>>>>;

struct EvaluatorLink {
    requests: mpsc::Sender<EvaluatorRequest>,
    dispatcher: JoinHandle<()>,
}

/// Bridges callers to the evaluation context it provisions on demand.
/// Completions are matched to callers purely by correlation id, so
/// pipelined requests may resolve in any order.
pub struct CoordinationRelay {
    factory: Arc<dyn EvaluatorFactory>,
    link: Mutex<Option<EvaluatorLink>>,
    pending: PendingTable,
    response_timeout: Duration,
}

impl CoordinationRelay {
    pub fn new(factory: Arc<dyn EvaluatorFactory>) -> Self {
        Self {
            factory,
            link: Mutex::new(None),
            pending: Arc::new(StdMutex::new(HashMap::new())),
            response_timeout: RESPONSE_TIMEOUT,
        }
    }

    /// Idempotent and safe to call concurrently: callers queue on the
    /// link mutex, so provisioning runs at most once per evaluator
    /// lifetime. It re-arms only when the request channel is observed
    /// closed, i.e. the evaluator was torn down externally.
    pub async fn ensure_evaluator_ready(
        &self,
    ) -> Result<mpsc::Sender<EvaluatorRequest>, AnalysisError> {
        let mut link = self.link.lock().await;

        if let Some(existing) = link.as_ref() {
            if !existing.requests.is_closed() {
                return Ok(existing.requests.clone());
            }
            warn!("evaluator channel closed, provisioning a replacement");
            existing.dispatcher.abort();
            *link = None;
        }

        let (request_tx, request_rx) = mpsc::channel(REQUEST_QUEUE_LIMIT);
        let (response_tx, response_rx) = mpsc::channel(REQUEST_QUEUE_LIMIT);

        self.factory
            .provision(request_rx, response_tx)
            .await
            .map_err(|err| {
                AnalysisError::EvaluatorUnavailable(format!("provisioning failed: {err:#}"))
            })?;

        let dispatcher = tokio::spawn(dispatch_responses(response_rx, self.pending.clone()));
        *link = Some(EvaluatorLink {
            requests: request_tx.clone(),
            dispatcher,
        });
        debug!("evaluator provisioned");

        Ok(request_tx)
    }

    /// Single entry point for frame analysis: ensures the evaluator is
    /// up, dispatches, and awaits the matching response within the
    /// bounded wait.
    pub async fn analyze_frame(
        &self,
        image_data: Vec<u8>,
    ) -> Result<Vec<Prediction>, AnalysisError> {
        let payload = self
            .round_trip(|correlation_id| EvaluatorRequest::AnalyzeFrame {
                correlation_id,
                image_data,
            })
            .await?;

        match payload {
            ResponsePayload::Analysis { predictions, .. } => Ok(predictions),
            ResponsePayload::Error { error } => Err(AnalysisError::Rejected(error)),
            ResponsePayload::Status { .. } => Err(AnalysisError::Rejected(
                "status payload for an analysis request".to_string(),
            )),
        }
    }

    pub async fn evaluator_status(&self) -> Result<ModelStatus, AnalysisError> {
        let payload = self
            .round_trip(|correlation_id| EvaluatorRequest::Status { correlation_id })
            .await?;

        match payload {
            ResponsePayload::Status {
                model_loaded,
                model_loading,
            } => Ok(ModelStatus {
                model_loaded,
                model_loading,
            }),
            ResponsePayload::Error { error } => Err(AnalysisError::Rejected(error)),
            ResponsePayload::Analysis { .. } => Err(AnalysisError::Rejected(
                "analysis payload for a status request".to_string(),
            )),
        }
    }

    async fn round_trip(
        &self,
        make_request: impl FnOnce(Uuid) -> EvaluatorRequest,
    ) -> Result<ResponsePayload, AnalysisError> {
        let requests = self.ensure_evaluator_ready().await?;

        let correlation_id = Uuid::new_v4();
        let (completion_tx, completion_rx) = oneshot::channel();
        self.pending
            .lock()
            .unwrap()
            .insert(correlation_id, completion_tx);

        if let Err(err) = requests.try_send(make_request(correlation_id)) {
            self.pending.lock().unwrap().remove(&correlation_id);
            let reason = match err {
                mpsc::error::TrySendError::Full(_) => "request queue full",
                mpsc::error::TrySendError::Closed(_) => "evaluator channel closed",
            };
            return Err(AnalysisError::EvaluatorUnavailable(reason.to_string()));
        }

        match tokio::time::timeout(self.response_timeout, completion_rx).await {
            Ok(Ok(payload)) => Ok(payload),
            Ok(Err(_)) => {
                self.pending.lock().unwrap().remove(&correlation_id);
                Err(AnalysisError::EvaluatorUnavailable(
                    "completion dropped before a response arrived".to_string(),
                ))
            }
            Err(_) => {
                // Drop the entry so a late response cannot match.
                self.pending.lock().unwrap().remove(&correlation_id);
                debug!("analysis {correlation_id} timed out");
                Err(AnalysisError::Timeout(self.response_timeout))
            }
        }
    }
}

/// Routes responses to their pending completions by correlation id only.
/// A response with no pending entry (late after timeout, or a stray
/// duplicate) is dropped here.
async fn dispatch_responses(mut responses: mpsc::Receiver<EvaluatorResponse>, pending: PendingTable) {
    while let Some(response) = responses.recv().await {
        let completion = pending.lock().unwrap().remove(&response.correlation_id);
        match completion {
            Some(tx) => {
                let _ = tx.send(response.payload);
            }
            None => debug!(
                "dropping unmatched analysis response {}",
                response.correlation_id
            ),
        }
    }
    debug!("evaluator response channel closed");
}
