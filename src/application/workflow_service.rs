// Workflow service - Session state and the upload/process/plot use cases
use crate::application::compute_client::RemoteComputeClient;
use crate::application::error::WorkflowError;
use crate::application::plot_orchestrator::PlotOrchestrator;
use crate::domain::files::{file_stem, FileRegistry, FileSummary, UploadAck, UploadedFile};
use crate::domain::params::{
    FftMode, ParameterStore, ParamsUpdate, ProcessingParams, SourceSignalMode, SpectrumMode,
    WaveletMode,
};
use crate::domain::plot::{PlotKind, PlotRequest, PlotSlot};
use crate::domain::signal::{SignalResult, StatisticsSnapshot};
use crate::infrastructure::csv_export::{export_statistics, ExportedFile};
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};

/// The last successful process call and what it was computed from
#[derive(Debug, Clone)]
struct ProcessedResult {
    file: String,
    params: ProcessingParams,
    result: Arc<SignalResult>,
}

#[derive(Debug, Default)]
struct Session {
    registry: FileRegistry,
    store: ParameterStore,
    results: Option<ProcessedResult>,
    banner: Option<String>,
    /// Bumped whenever an in-flight process result would no longer apply
    epoch: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadRejection {
    pub file: String,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct UploadReport {
    pub accepted: Vec<UploadAck>,
    pub rejected: Vec<UploadRejection>,
    pub selected: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ModesView {
    pub signal: SourceSignalMode,
    pub wavelet: WaveletMode,
    pub fft: FftMode,
    pub spectrum: SpectrumMode,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResultsView {
    pub file: String,
    pub params: ProcessingParams,
    pub samples: usize,
    pub levels: usize,
    pub statistics: StatisticsSnapshot,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub files: Vec<FileSummary>,
    pub selected: Option<String>,
    pub params: ProcessingParams,
    pub modes: ModesView,
    pub banner: Option<String>,
    pub results: Option<ResultsView>,
    pub plots: Vec<PlotSlot>,
}

#[derive(Clone)]
pub struct WorkflowService {
    client: Arc<dyn RemoteComputeClient>,
    orchestrator: PlotOrchestrator,
    session: Arc<Mutex<Session>>,
}

impl WorkflowService {
    pub fn new(
        client: Arc<dyn RemoteComputeClient>,
        orchestrator: PlotOrchestrator,
        defaults: ProcessingParams,
    ) -> Self {
        let session = Session {
            store: ParameterStore::new(defaults),
            ..Session::default()
        };
        Self {
            client,
            orchestrator,
            session: Arc::new(Mutex::new(session)),
        }
    }

    pub fn orchestrator(&self) -> &PlotOrchestrator {
        &self.orchestrator
    }

    fn session(&self) -> MutexGuard<'_, Session> {
        self.session
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Upload files one by one. A rejected file is reported and skipped;
    /// the rest of the batch still goes through.
    pub async fn upload(&self, files: Vec<UploadedFile>) -> UploadReport {
        self.session().banner = None;
        let mut report = UploadReport::default();

        for file in files {
            let outcome = match file.check_extension() {
                Ok(()) => self
                    .client
                    .upload(&file)
                    .await
                    .map_err(|e| WorkflowError::Upload {
                        file: file.name.clone(),
                        message: format!("{:#}", e),
                    }),
                Err(e) => Err(WorkflowError::from(e)),
            };

            match outcome {
                Ok(ack) => {
                    tracing::info!(
                        "Uploaded {} ({} columns, {} rows)",
                        ack.filename,
                        ack.columns,
                        ack.rows
                    );
                    if self.session().registry.add(file) {
                        tracing::debug!("Selected {}", ack.filename);
                    }
                    report.accepted.push(ack);
                }
                Err(e) => {
                    tracing::error!("{}", e);
                    report.rejected.push(UploadRejection {
                        file: file.name.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        let mut session = self.session();
        if !report.rejected.is_empty() {
            let reasons: Vec<&str> = report.rejected.iter().map(|r| r.reason.as_str()).collect();
            session.banner = Some(reasons.join("; "));
        }
        report.selected = session.registry.selected_name().map(str::to_string);
        report
    }

    /// Change the selected file. A real change empties all plot slots.
    pub fn select(&self, name: &str) -> Result<bool, WorkflowError> {
        let mut session = self.session();
        let changed = session.registry.select(name)?;
        if changed {
            session.epoch += 1;
            self.orchestrator.reset();
            tracing::info!("Selected {}", name);
        }
        Ok(changed)
    }

    pub fn update_params(&self, update: &ParamsUpdate) -> ProcessingParams {
        let mut session = self.session();
        session.store.apply(update);
        session.store.params()
    }

    /// Run the full computation for the selected file, then refresh all four
    /// plots. A failed computation leaves earlier results untouched.
    pub async fn process(&self) -> Result<StatisticsSnapshot, WorkflowError> {
        let (file, params, epoch) = {
            let mut session = self.session();
            session.banner = None;
            session.epoch += 1;
            let file = session
                .registry
                .selected_file()
                .cloned()
                .ok_or(WorkflowError::NoFileSelected)?;
            (file, session.store.params(), session.epoch)
        };

        tracing::info!(
            "Processing {} (time={}, signal={}, wavelet={}, levels={})",
            file.name,
            params.time_column,
            params.signal_column,
            params.wavelet_type,
            params.n_levels
        );

        let result = match self.client.process(&file, &params).await {
            Ok(result) => result,
            Err(e) => {
                let error = WorkflowError::Process {
                    file: file.name.clone(),
                    message: format!("{:#}", e),
                };
                tracing::error!("{}", error);
                let mut session = self.session();
                if session.epoch == epoch {
                    session.banner = Some(error.to_string());
                }
                return Err(error);
            }
        };

        let mut session = self.session();
        if session.epoch != epoch {
            tracing::warn!("Dropping superseded results for {}", file.name);
            return Err(WorkflowError::Superseded(file.name));
        }

        let missing = result.statistics.missing_metrics();
        if !missing.is_empty() {
            tracing::warn!("Statistics for {} lack {:?}", file.name, missing);
        }

        let statistics = result.statistics.clone();
        session.results = Some(ProcessedResult {
            file: file.name.clone(),
            params,
            result: Arc::new(result),
        });

        // Issued under the session lock so a concurrent select or clear
        // cannot slip in between storing results and loading their plots.
        self.orchestrator.reset();
        self.orchestrator
            .load_all(&file, session.store.params(), current_requests(&session.store));
        Ok(statistics)
    }

    /// Store one visualization's mode and, when results exist for the
    /// selected file, re-issue only that visualization's query.
    /// Returns true when a query was issued.
    pub fn set_mode(&self, request: PlotRequest) -> bool {
        let mut session = self.session();
        match request {
            PlotRequest::Signal(mode) => session.store.set_source_signal(mode),
            PlotRequest::Wavelet(mode) => session.store.set_wavelet(mode),
            PlotRequest::Fft(mode) => session.store.set_fft(mode),
            PlotRequest::Spectrum(mode) => session.store.set_spectrum(mode),
        }

        let Some(file) = session.registry.selected_file() else {
            return false;
        };
        match &session.results {
            Some(results) if results.file == file.name => {
                self.orchestrator.issue(file, session.store.params(), request);
                true
            }
            _ => false,
        }
    }

    /// Drop every file, the selection, results and plots. Idempotent.
    pub fn clear(&self) -> bool {
        let mut session = self.session();
        let mut changed = session.registry.clear();
        changed |= session.results.take().is_some();
        changed |= session.banner.take().is_some();
        session.epoch += 1;
        changed |= self.orchestrator.reset();
        if changed {
            tracing::info!("Session cleared");
        }
        changed
    }

    pub fn statistics(&self) -> Result<StatisticsSnapshot, WorkflowError> {
        self.session()
            .results
            .as_ref()
            .map(|r| r.result.statistics.clone())
            .ok_or(WorkflowError::NoResults)
    }

    pub fn export_statistics(&self) -> Result<ExportedFile, WorkflowError> {
        let results = self
            .session()
            .results
            .clone()
            .ok_or(WorkflowError::NoResults)?;

        let source = results.result.filename.as_deref().unwrap_or(&results.file);
        export_statistics(&results.result.statistics, file_stem(source))
            .map_err(|e| WorkflowError::Export(format!("{:#}", e)))
    }

    pub fn plot(&self, kind: PlotKind) -> PlotSlot {
        self.orchestrator.slot(kind)
    }

    pub fn snapshot(&self) -> SessionView {
        let session = self.session();
        SessionView {
            files: session.registry.summaries(),
            selected: session.registry.selected_name().map(str::to_string),
            params: session.store.params(),
            modes: ModesView {
                signal: session.store.source_signal(),
                wavelet: session.store.wavelet(),
                fft: session.store.fft(),
                spectrum: session.store.spectrum(),
            },
            banner: session.banner.clone(),
            results: session.results.as_ref().map(|r| ResultsView {
                file: r.file.clone(),
                params: r.params,
                samples: r.result.raw_signal.len(),
                levels: r.result.levels(),
                statistics: r.result.statistics.clone(),
            }),
            plots: self.orchestrator.slots(),
        }
    }
}

fn current_requests(store: &ParameterStore) -> [PlotRequest; 4] {
    [
        PlotRequest::Signal(store.source_signal()),
        PlotRequest::Wavelet(store.wavelet()),
        PlotRequest::Fft(store.fft()),
        PlotRequest::Spectrum(store.spectrum()),
    ]
}
