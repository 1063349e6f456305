// Full-process results: base arrays and the statistics snapshot
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metric names reported by the compute service, in export order
pub const METRIC_KEYS: [&str; 24] = [
    "Mean",
    "Median",
    "Mode",
    "Std Dev",
    "Variance",
    "Mean Square",
    "RMS",
    "Max",
    "Peak-to-Peak",
    "Peak-to-RMS",
    "Skewness",
    "Kurtosis",
    "Energy",
    "Power",
    "Crest Factor",
    "Impulse Factor",
    "Shape Factor",
    "Shannon Entropy",
    "Signal-to-Noise Ratio",
    "Root Mean Square Error",
    "Maximum Error",
    "Mean Absolute Error",
    "Peak Signal-to-Noise Ratio",
    "Coefficient of Variation",
];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WaveletCoefficients {
    pub approximation: Vec<f64>,
    /// One array per decomposition level
    pub detail: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatisticsSnapshot {
    metrics: HashMap<String, f64>,
}

impl StatisticsSnapshot {
    #[cfg(test)]
    pub fn from_pairs<I, K>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, f64)>,
        K: Into<String>,
    {
        Self {
            metrics: pairs.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    #[cfg(test)]
    pub fn get(&self, name: &str) -> Option<f64> {
        self.metrics.get(name).copied()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn missing_metrics(&self) -> Vec<&'static str> {
        METRIC_KEYS
            .iter()
            .copied()
            .filter(|key| !self.metrics.contains_key(*key))
            .collect()
    }

    /// Known metrics in export order, followed by any extra keys sorted by name
    pub fn ordered(&self) -> Vec<(&str, f64)> {
        let mut rows: Vec<(&str, f64)> = METRIC_KEYS
            .iter()
            .filter_map(|key| self.metrics.get(*key).map(|v| (*key, *v)))
            .collect();

        let mut extra: Vec<(&str, f64)> = self
            .metrics
            .iter()
            .filter(|(k, _)| !METRIC_KEYS.contains(&k.as_str()))
            .map(|(k, v)| (k.as_str(), *v))
            .collect();
        extra.sort_by(|a, b| a.0.cmp(b.0));

        rows.extend(extra);
        rows
    }
}

/// Response of the full process call. Replaced wholesale, never patched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalResult {
    pub time: Vec<f64>,
    pub raw_signal: Vec<f64>,
    pub denoised_signal: Vec<f64>,
    pub wavelet_coeffs: WaveletCoefficients,
    pub statistics: StatisticsSnapshot,
    #[serde(default)]
    pub filename: Option<String>,
}

impl SignalResult {
    pub fn levels(&self) -> usize {
        self.wavelet_coeffs.detail.len()
    }
}
