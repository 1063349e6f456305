// Scripted compute client for application tests
use crate::application::compute_client::RemoteComputeClient;
use crate::domain::files::{UploadAck, UploadedFile};
use crate::domain::params::{FftMode, ProcessingParams, SourceSignalMode, SpectrumMode, WaveletMode};
use crate::domain::plot::{PlotKind, PlotPayload, PlotRequest};
use crate::domain::signal::{METRIC_KEYS, SignalResult, StatisticsSnapshot, WaveletCoefficients};
use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::oneshot;

type GateResult = Result<PlotPayload, String>;

#[derive(Debug, Clone, PartialEq)]
pub struct PlotCall {
    pub file: String,
    pub params: ProcessingParams,
    pub request: PlotRequest,
}

#[derive(Default)]
struct Script {
    rejected_uploads: HashSet<String>,
    process_failure: Option<String>,
    process_gate: Option<oneshot::Receiver<()>>,
    failing_plots: HashMap<PlotKind, String>,
    gates: HashMap<(PlotKind, &'static str), VecDeque<oneshot::Receiver<GateResult>>>,
    uploads: Vec<String>,
    processed: Vec<(String, ProcessingParams)>,
    plot_calls: Vec<PlotCall>,
}

/// Succeeds immediately unless told otherwise. Gated calls wait until the
/// test sends their outcome through the returned sender.
#[derive(Default)]
pub struct ScriptedClient {
    script: Mutex<Script>,
}

impl ScriptedClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_upload(&self, name: &str) {
        self.script.lock().unwrap().rejected_uploads.insert(name.to_string());
    }

    pub fn fail_process(&self, message: &str) {
        self.script.lock().unwrap().process_failure = Some(message.to_string());
    }

    pub fn gate_process(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.script.lock().unwrap().process_gate = Some(rx);
        tx
    }

    pub fn fail_plot(&self, kind: PlotKind, message: &str) {
        self.script
            .lock()
            .unwrap()
            .failing_plots
            .insert(kind, message.to_string());
    }

    pub fn gate(&self, kind: PlotKind, mode: &'static str) -> oneshot::Sender<GateResult> {
        let (tx, rx) = oneshot::channel();
        self.script
            .lock()
            .unwrap()
            .gates
            .entry((kind, mode))
            .or_default()
            .push_back(rx);
        tx
    }

    pub fn uploads(&self) -> Vec<String> {
        self.script.lock().unwrap().uploads.clone()
    }

    pub fn processed(&self) -> Vec<(String, ProcessingParams)> {
        self.script.lock().unwrap().processed.clone()
    }

    pub fn plot_calls(&self) -> Vec<PlotCall> {
        self.script.lock().unwrap().plot_calls.clone()
    }

    async fn answer(
        &self,
        file: &UploadedFile,
        params: &ProcessingParams,
        request: PlotRequest,
    ) -> anyhow::Result<PlotPayload> {
        let kind = request.kind();
        let (failure, gate) = {
            let mut script = self.script.lock().unwrap();
            script.plot_calls.push(PlotCall {
                file: file.name.clone(),
                params: *params,
                request,
            });
            let gate = script
                .gates
                .get_mut(&(kind, request.mode()))
                .and_then(|queue| queue.pop_front());
            (script.failing_plots.get(&kind).cloned(), gate)
        };

        if let Some(message) = failure {
            anyhow::bail!("{}", message);
        }

        match gate {
            Some(rx) => match rx.await {
                Ok(Ok(payload)) => Ok(payload),
                Ok(Err(message)) => anyhow::bail!("{}", message),
                Err(_) => anyhow::bail!("gate closed"),
            },
            None => Ok(PlotPayload(json!({
                "data": [{ "plot": kind.as_str(), "mode": request.mode() }],
                "layout": { "title": file.name, "levels": params.n_levels },
            }))),
        }
    }
}

pub fn full_statistics() -> StatisticsSnapshot {
    StatisticsSnapshot::from_pairs(
        METRIC_KEYS
            .iter()
            .enumerate()
            .map(|(i, key)| (*key, i as f64 + 0.5)),
    )
}

#[async_trait]
impl RemoteComputeClient for ScriptedClient {
    async fn upload(&self, file: &UploadedFile) -> anyhow::Result<UploadAck> {
        let mut script = self.script.lock().unwrap();
        if script.rejected_uploads.contains(&file.name) {
            anyhow::bail!("service rejected {}", file.name);
        }
        script.uploads.push(file.name.clone());
        Ok(UploadAck {
            filename: file.name.clone(),
            columns: 2,
            rows: 2,
            status: "success".to_string(),
        })
    }

    async fn process(
        &self,
        file: &UploadedFile,
        params: &ProcessingParams,
    ) -> anyhow::Result<SignalResult> {
        let (failure, gate) = {
            let mut script = self.script.lock().unwrap();
            script.processed.push((file.name.clone(), *params));
            (script.process_failure.clone(), script.process_gate.take())
        };
        if let Some(rx) = gate {
            let _ = rx.await;
        }
        if let Some(message) = failure {
            anyhow::bail!("{}", message);
        }

        Ok(SignalResult {
            time: vec![0.0, 0.001, 0.002],
            raw_signal: vec![0.2, 0.9, 0.4],
            denoised_signal: vec![0.25, 0.8, 0.4],
            wavelet_coeffs: WaveletCoefficients {
                approximation: vec![1.1],
                detail: vec![vec![0.1]; params.n_levels as usize],
            },
            statistics: full_statistics(),
            filename: Some(file.name.clone()),
        })
    }

    async fn plot_signal(
        &self,
        file: &UploadedFile,
        params: &ProcessingParams,
        mode: SourceSignalMode,
    ) -> anyhow::Result<PlotPayload> {
        self.answer(file, params, PlotRequest::Signal(mode)).await
    }

    async fn plot_wavelet(
        &self,
        file: &UploadedFile,
        params: &ProcessingParams,
        mode: WaveletMode,
    ) -> anyhow::Result<PlotPayload> {
        self.answer(file, params, PlotRequest::Wavelet(mode)).await
    }

    async fn plot_fft(
        &self,
        file: &UploadedFile,
        params: &ProcessingParams,
        mode: FftMode,
    ) -> anyhow::Result<PlotPayload> {
        self.answer(file, params, PlotRequest::Fft(mode)).await
    }

    async fn plot_spectrum(
        &self,
        file: &UploadedFile,
        params: &ProcessingParams,
        mode: SpectrumMode,
    ) -> anyhow::Result<PlotPayload> {
        self.answer(file, params, PlotRequest::Spectrum(mode)).await
    }
}

/// Poll until the condition holds, failing the test after two seconds
pub async fn wait_until<F: Fn() -> bool>(condition: F) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(
            tokio::time::Instant::now() < deadline,
            "condition not reached in time"
        );
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}
