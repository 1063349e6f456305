// Plot orchestrator - Four independent plot queries with last-issued-wins slots
use crate::application::compute_client::RemoteComputeClient;
use crate::domain::files::UploadedFile;
use crate::domain::params::ProcessingParams;
use crate::domain::plot::{PlotBoard, PlotFailure, PlotKind, PlotRequest, PlotSlot};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::broadcast;
use tokio::task::AbortHandle;

const UPDATE_CHANNEL_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct PlotOrchestrator {
    client: Arc<dyn RemoteComputeClient>,
    board: Arc<Mutex<PlotBoard>>,
    tasks: Arc<Mutex<HashMap<PlotKind, AbortHandle>>>,
    updates: broadcast::Sender<PlotSlot>,
    request_timeout: Duration,
}

impl PlotOrchestrator {
    pub fn new(client: Arc<dyn RemoteComputeClient>, request_timeout: Duration) -> Self {
        let (updates, _) = broadcast::channel(UPDATE_CHANNEL_CAPACITY);
        Self {
            client,
            board: Arc::new(Mutex::new(PlotBoard::default())),
            tasks: Arc::new(Mutex::new(HashMap::new())),
            updates,
            request_timeout,
        }
    }

    /// Issue all four plot queries concurrently. Each slot settles on its own.
    pub fn load_all(
        &self,
        file: &UploadedFile,
        params: ProcessingParams,
        requests: [PlotRequest; 4],
    ) {
        tracing::info!(
            "Loading all plots for {} ({} levels, {})",
            file.name,
            params.n_levels,
            params.wavelet_type
        );
        for request in requests {
            self.issue(file, params, request);
        }
    }

    /// Issue one plot query, superseding whatever that slot had in flight.
    /// Returns the request's generation.
    pub fn issue(&self, file: &UploadedFile, params: ProcessingParams, request: PlotRequest) -> u64 {
        let kind = request.kind();

        let mut tasks = lock(&self.tasks);
        if let Some(previous) = tasks.remove(&kind) {
            previous.abort();
        }

        // Updates are sent under the board lock so subscribers see them in
        // the order the board changed.
        let generation = {
            let mut board = lock(&self.board);
            let generation = board.begin(request, &file.name, params);
            let _ = self.updates.send(board.slot(kind).clone());
            generation
        };

        tracing::debug!(
            "Issuing {} plot (mode={}, generation={}) for {}",
            kind,
            request.mode(),
            generation,
            file.name
        );

        let client = self.client.clone();
        let board = self.board.clone();
        let updates = self.updates.clone();
        let timeout = self.request_timeout;
        let file = file.clone();

        let handle = tokio::spawn(async move {
            let outcome =
                match tokio::time::timeout(timeout, client.plot(&file, &params, request)).await {
                    Ok(Ok(payload)) => Ok(payload),
                    Ok(Err(e)) => Err(PlotFailure::Remote {
                        message: format!("{:#}", e),
                    }),
                    Err(_) => Err(PlotFailure::Timeout {
                        after_ms: timeout.as_millis() as u64,
                    }),
                };

            match &outcome {
                Ok(payload) if payload.is_empty() => {
                    tracing::warn!("{} plot for {} came back empty", kind, file.name);
                }
                Ok(_) => {}
                Err(failure) => {
                    tracing::warn!("{} plot failed for {}: {}", kind, file.name, failure);
                }
            }

            let mut board = lock(&board);
            if board.settle(kind, generation, outcome) {
                let snapshot = board.slot(kind).clone();
                tracing::debug!("{} plot settled as {:?}", kind, snapshot.status);
                let _ = updates.send(snapshot);
            } else {
                tracing::warn!(
                    "Discarding stale {} plot response (generation {})",
                    kind,
                    generation
                );
            }
        });

        tasks.insert(kind, handle.abort_handle());
        generation
    }

    /// Cancel in-flight queries and return every slot to Idle
    pub fn reset(&self) -> bool {
        for (_, handle) in lock(&self.tasks).drain() {
            handle.abort();
        }

        let mut board = lock(&self.board);
        let changed = board.reset();
        if changed {
            for slot in board.slots() {
                let _ = self.updates.send(slot.clone());
            }
        }
        changed
    }

    pub fn slot(&self, kind: PlotKind) -> PlotSlot {
        lock(&self.board).slot(kind).clone()
    }

    pub fn slots(&self) -> Vec<PlotSlot> {
        lock(&self.board).slots().to_vec()
    }

    /// Slot snapshots, one per state change
    pub fn subscribe(&self) -> broadcast::Receiver<PlotSlot> {
        self.updates.subscribe()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
