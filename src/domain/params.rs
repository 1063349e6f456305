// Processing parameters and per-visualization display options
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const MIN_LEVELS: u32 = 1;
pub const MAX_LEVELS: u32 = 20;
pub const MAX_COLUMN: u32 = 9;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {what} '{value}'")]
pub struct ParseOptionError {
    what: &'static str,
    value: String,
}

impl ParseOptionError {
    fn new(what: &'static str, value: &str) -> Self {
        Self {
            what,
            value: value.to_string(),
        }
    }
}

/// Biorthogonal wavelet families accepted by the compute service
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WaveletType {
    #[serde(rename = "bior1.3")]
    Bior1_3,
    #[serde(rename = "bior1.5")]
    Bior1_5,
    #[serde(rename = "bior2.2")]
    Bior2_2,
    #[default]
    #[serde(rename = "bior2.4")]
    Bior2_4,
    #[serde(rename = "bior2.6")]
    Bior2_6,
    #[serde(rename = "bior3.1")]
    Bior3_1,
    #[serde(rename = "bior3.3")]
    Bior3_3,
    #[serde(rename = "bior3.5")]
    Bior3_5,
    #[serde(rename = "bior3.7")]
    Bior3_7,
    #[serde(rename = "bior3.9")]
    Bior3_9,
    #[serde(rename = "bior4.4")]
    Bior4_4,
    #[serde(rename = "bior5.5")]
    Bior5_5,
    #[serde(rename = "bior6.8")]
    Bior6_8,
}

impl WaveletType {
    pub const ALL: [WaveletType; 13] = [
        WaveletType::Bior1_3,
        WaveletType::Bior1_5,
        WaveletType::Bior2_2,
        WaveletType::Bior2_4,
        WaveletType::Bior2_6,
        WaveletType::Bior3_1,
        WaveletType::Bior3_3,
        WaveletType::Bior3_5,
        WaveletType::Bior3_7,
        WaveletType::Bior3_9,
        WaveletType::Bior4_4,
        WaveletType::Bior5_5,
        WaveletType::Bior6_8,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WaveletType::Bior1_3 => "bior1.3",
            WaveletType::Bior1_5 => "bior1.5",
            WaveletType::Bior2_2 => "bior2.2",
            WaveletType::Bior2_4 => "bior2.4",
            WaveletType::Bior2_6 => "bior2.6",
            WaveletType::Bior3_1 => "bior3.1",
            WaveletType::Bior3_3 => "bior3.3",
            WaveletType::Bior3_5 => "bior3.5",
            WaveletType::Bior3_7 => "bior3.7",
            WaveletType::Bior3_9 => "bior3.9",
            WaveletType::Bior4_4 => "bior4.4",
            WaveletType::Bior5_5 => "bior5.5",
            WaveletType::Bior6_8 => "bior6.8",
        }
    }
}

impl fmt::Display for WaveletType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WaveletType {
    type Err = ParseOptionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|w| w.as_str() == s)
            .ok_or_else(|| ParseOptionError::new("wavelet type", s))
    }
}

/// Generates a display-mode enum with its wire names
macro_rules! display_mode {
    ($(#[$meta:meta])* $name:ident, $what:literal, default = $default:ident, { $($variant:ident => $wire:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $wire)]
                $variant,
            )+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $wire,)+
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                $name::$default
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseOptionError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($wire => Ok($name::$variant),)+
                    other => Err(ParseOptionError::new($what, other)),
                }
            }
        }
    };
}

display_mode!(
    /// Which signal the source-signal chart shows
    SourceSignalMode, "signal type", default = Raw, {
        Raw => "raw",
        Denoised => "denoised",
    }
);

display_mode!(
    /// Which coefficient view the wavelet chart shows
    WaveletMode, "wavelet option", default = Approx, {
        Approx => "approx",
        Detail => "detail",
        PearsonApprox => "pearson_approx",
        PearsonDetail => "pearson_detail",
    }
);

display_mode!(
    /// Which sequence the FFT chart transforms
    FftMode, "fft type", default = Raw, {
        Raw => "raw",
        Denoised => "denoised",
        Approx => "approx",
        Detail => "detail",
    }
);

display_mode!(
    /// Which signal the time-frequency spectrum is computed from
    SpectrumMode, "spectrum type", default = Raw, {
        Raw => "raw",
        Denoised => "denoised",
    }
);

/// Parameters shared by the process call and all four plot queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessingParams {
    pub time_column: u32,
    pub signal_column: u32,
    pub wavelet_type: WaveletType,
    pub n_levels: u32,
}

impl ProcessingParams {
    pub fn new(time_column: u32, signal_column: u32, wavelet_type: WaveletType, n_levels: u32) -> Self {
        Self {
            time_column: clamp_column(time_column.into()),
            signal_column: clamp_column(signal_column.into()),
            wavelet_type,
            n_levels: clamp_levels(n_levels.into()),
        }
    }
}

impl Default for ProcessingParams {
    fn default() -> Self {
        Self::new(0, 1, WaveletType::default(), 7)
    }
}

/// Accepts any integer the client sends; out-of-range values are pulled
/// back into range rather than rejected.
pub fn clamp_levels(n_levels: i64) -> u32 {
    n_levels.clamp(MIN_LEVELS.into(), MAX_LEVELS.into()) as u32
}

pub fn clamp_column(column: i64) -> u32 {
    column.clamp(0, MAX_COLUMN.into()) as u32
}

/// Partial update of the processing parameters
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParamsUpdate {
    pub time_column: Option<i64>,
    pub signal_column: Option<i64>,
    pub wavelet_type: Option<WaveletType>,
    pub n_levels: Option<i64>,
}

/// Independent mutable cells for processing params and display modes.
/// Setters only transition state; callers decide whether to re-fetch.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParameterStore {
    params: ProcessingParams,
    source_signal: SourceSignalMode,
    wavelet: WaveletMode,
    fft: FftMode,
    spectrum: SpectrumMode,
}

impl ParameterStore {
    pub fn new(params: ProcessingParams) -> Self {
        Self {
            params: ProcessingParams::new(
                params.time_column,
                params.signal_column,
                params.wavelet_type,
                params.n_levels,
            ),
            ..Self::default()
        }
    }

    pub fn params(&self) -> ProcessingParams {
        self.params
    }

    pub fn set_time_column(&mut self, column: i64) {
        self.params.time_column = clamp_column(column);
    }

    pub fn set_signal_column(&mut self, column: i64) {
        self.params.signal_column = clamp_column(column);
    }

    pub fn set_wavelet_type(&mut self, wavelet_type: WaveletType) {
        self.params.wavelet_type = wavelet_type;
    }

    pub fn set_n_levels(&mut self, n_levels: i64) {
        self.params.n_levels = clamp_levels(n_levels);
    }

    pub fn apply(&mut self, update: &ParamsUpdate) {
        if let Some(column) = update.time_column {
            self.set_time_column(column);
        }
        if let Some(column) = update.signal_column {
            self.set_signal_column(column);
        }
        if let Some(wavelet_type) = update.wavelet_type {
            self.set_wavelet_type(wavelet_type);
        }
        if let Some(n_levels) = update.n_levels {
            self.set_n_levels(n_levels);
        }
    }

    pub fn source_signal(&self) -> SourceSignalMode {
        self.source_signal
    }

    pub fn set_source_signal(&mut self, mode: SourceSignalMode) {
        self.source_signal = mode;
    }

    pub fn wavelet(&self) -> WaveletMode {
        self.wavelet
    }

    pub fn set_wavelet(&mut self, mode: WaveletMode) {
        self.wavelet = mode;
    }

    pub fn fft(&self) -> FftMode {
        self.fft
    }

    pub fn set_fft(&mut self, mode: FftMode) {
        self.fft = mode;
    }

    pub fn spectrum(&self) -> SpectrumMode {
        self.spectrum
    }

    pub fn set_spectrum(&mut self, mode: SpectrumMode) {
        self.spectrum = mode;
    }
}
