// Plot slots: per-visualization request state
use super::params::{FftMode, ProcessingParams, SourceSignalMode, SpectrumMode, WaveletMode};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlotKind {
    Signal,
    Wavelet,
    Fft,
    Spectrum,
}

impl PlotKind {
    pub const ALL: [PlotKind; 4] = [
        PlotKind::Signal,
        PlotKind::Wavelet,
        PlotKind::Fft,
        PlotKind::Spectrum,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PlotKind::Signal => "signal",
            PlotKind::Wavelet => "wavelet",
            PlotKind::Fft => "fft",
            PlotKind::Spectrum => "spectrum",
        }
    }

    fn index(&self) -> usize {
        match self {
            PlotKind::Signal => 0,
            PlotKind::Wavelet => 1,
            PlotKind::Fft => 2,
            PlotKind::Spectrum => 3,
        }
    }
}

impl fmt::Display for PlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlotKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown plot '{}'", s))
    }
}

/// One plot query: the visualization plus its display mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlotRequest {
    Signal(SourceSignalMode),
    Wavelet(WaveletMode),
    Fft(FftMode),
    Spectrum(SpectrumMode),
}

impl PlotRequest {
    pub fn kind(&self) -> PlotKind {
        match self {
            PlotRequest::Signal(_) => PlotKind::Signal,
            PlotRequest::Wavelet(_) => PlotKind::Wavelet,
            PlotRequest::Fft(_) => PlotKind::Fft,
            PlotRequest::Spectrum(_) => PlotKind::Spectrum,
        }
    }

    pub fn mode(&self) -> &'static str {
        match self {
            PlotRequest::Signal(mode) => mode.as_str(),
            PlotRequest::Wavelet(mode) => mode.as_str(),
            PlotRequest::Fft(mode) => mode.as_str(),
            PlotRequest::Spectrum(mode) => mode.as_str(),
        }
    }

    /// Parse a mode name for the given visualization
    pub fn parse(kind: PlotKind, mode: &str) -> Result<Self, String> {
        let parsed = match kind {
            PlotKind::Signal => mode.parse().map(PlotRequest::Signal),
            PlotKind::Wavelet => mode.parse().map(PlotRequest::Wavelet),
            PlotKind::Fft => mode.parse().map(PlotRequest::Fft),
            PlotKind::Spectrum => mode.parse().map(PlotRequest::Spectrum),
        };
        parsed.map_err(|e| e.to_string())
    }
}

/// Renderable plot description produced by the compute service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlotPayload(pub serde_json::Value);

impl PlotPayload {
    pub fn is_empty(&self) -> bool {
        match &self.0 {
            serde_json::Value::Null => true,
            serde_json::Value::Object(map) => map.is_empty(),
            serde_json::Value::Array(items) => items.is_empty(),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlotFailure {
    #[error("{message}")]
    Remote { message: String },
    #[error("request timed out after {after_ms} ms")]
    Timeout { after_ms: u64 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Idle,
    Loading,
    Ready,
    Failed,
}

/// Params and mode a slot's current request was issued with
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssuedWith {
    pub file: String,
    pub params: ProcessingParams,
    pub mode: &'static str,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlotSlot {
    pub kind: PlotKind,
    pub status: SlotStatus,
    pub data: Option<PlotPayload>,
    pub last_error: Option<PlotFailure>,
    pub generation: u64,
    pub issued_with: Option<IssuedWith>,
    pub updated_at: DateTime<Utc>,
}

impl PlotSlot {
    fn idle(kind: PlotKind, generation: u64) -> Self {
        Self {
            kind,
            status: SlotStatus::Idle,
            data: None,
            last_error: None,
            generation,
            issued_with: None,
            updated_at: Utc::now(),
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == SlotStatus::Loading
    }

    fn is_clean(&self) -> bool {
        self.status == SlotStatus::Idle && self.data.is_none() && self.last_error.is_none()
    }
}

/// The four plot slots. Generations only ever increase, so a response can be
/// matched against the request that is currently expected for its slot.
#[derive(Debug, Clone)]
pub struct PlotBoard {
    slots: [PlotSlot; 4],
}

impl Default for PlotBoard {
    fn default() -> Self {
        Self {
            slots: PlotKind::ALL.map(|kind| PlotSlot::idle(kind, 0)),
        }
    }
}

impl PlotBoard {
    pub fn slot(&self, kind: PlotKind) -> &PlotSlot {
        &self.slots[kind.index()]
    }

    pub fn slots(&self) -> &[PlotSlot] {
        &self.slots
    }

    /// Mark the slot loading for a new request and return its generation
    pub fn begin(&mut self, request: PlotRequest, file: &str, params: ProcessingParams) -> u64 {
        let slot = &mut self.slots[request.kind().index()];
        slot.generation += 1;
        slot.status = SlotStatus::Loading;
        slot.issued_with = Some(IssuedWith {
            file: file.to_string(),
            params,
            mode: request.mode(),
        });
        slot.updated_at = Utc::now();
        slot.generation
    }

    /// Apply a response. Returns false when the response is stale.
    pub fn settle(
        &mut self,
        kind: PlotKind,
        generation: u64,
        outcome: Result<PlotPayload, PlotFailure>,
    ) -> bool {
        let slot = &mut self.slots[kind.index()];
        if slot.generation != generation || !slot.is_loading() {
            return false;
        }

        match outcome {
            Ok(payload) => {
                slot.status = SlotStatus::Ready;
                slot.data = Some(payload);
                slot.last_error = None;
            }
            Err(failure) => {
                slot.status = SlotStatus::Failed;
                slot.last_error = Some(failure);
            }
        }
        slot.updated_at = Utc::now();
        true
    }

    /// Return every slot to Idle. A slot that is already Idle and empty has
    /// nothing in flight and is left untouched. Reset slots keep counting
    /// generations so that responses to earlier requests are discarded.
    pub fn reset(&mut self) -> bool {
        let mut changed = false;
        for slot in self.slots.iter_mut().filter(|s| !s.is_clean()) {
            *slot = PlotSlot::idle(slot.kind, slot.generation + 1);
            changed = true;
        }
        changed
    }
}
