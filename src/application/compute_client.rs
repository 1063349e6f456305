// Client trait for the remote signal-processing service
use crate::domain::files::{UploadAck, UploadedFile};
use crate::domain::params::{FftMode, ProcessingParams, SourceSignalMode, SpectrumMode, WaveletMode};
use crate::domain::plot::{PlotPayload, PlotRequest};
use crate::domain::signal::SignalResult;
use async_trait::async_trait;

#[async_trait]
pub trait RemoteComputeClient: Send + Sync {
    /// Register a file with the service; required before any processing call on it
    async fn upload(&self, file: &UploadedFile) -> anyhow::Result<UploadAck>;

    /// Full computation: statistics plus base arrays
    async fn process(
        &self,
        file: &UploadedFile,
        params: &ProcessingParams,
    ) -> anyhow::Result<SignalResult>;

    async fn plot_signal(
        &self,
        file: &UploadedFile,
        params: &ProcessingParams,
        mode: SourceSignalMode,
    ) -> anyhow::Result<PlotPayload>;

    async fn plot_wavelet(
        &self,
        file: &UploadedFile,
        params: &ProcessingParams,
        mode: WaveletMode,
    ) -> anyhow::Result<PlotPayload>;

    async fn plot_fft(
        &self,
        file: &UploadedFile,
        params: &ProcessingParams,
        mode: FftMode,
    ) -> anyhow::Result<PlotPayload>;

    async fn plot_spectrum(
        &self,
        file: &UploadedFile,
        params: &ProcessingParams,
        mode: SpectrumMode,
    ) -> anyhow::Result<PlotPayload>;

    /// Dispatch a plot request to the matching query
    async fn plot(
        &self,
        file: &UploadedFile,
        params: &ProcessingParams,
        request: PlotRequest,
    ) -> anyhow::Result<PlotPayload> {
        match request {
            PlotRequest::Signal(mode) => self.plot_signal(file, params, mode).await,
            PlotRequest::Wavelet(mode) => self.plot_wavelet(file, params, mode).await,
            PlotRequest::Fft(mode) => self.plot_fft(file, params, mode).await,
            PlotRequest::Spectrum(mode) => self.plot_spectrum(file, params, mode).await,
        }
    }
}
