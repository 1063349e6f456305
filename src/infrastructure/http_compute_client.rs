// HTTP implementation of the remote compute client
use crate::application::compute_client::RemoteComputeClient;
use crate::domain::files::{UploadAck, UploadedFile};
use crate::domain::params::{FftMode, ProcessingParams, SourceSignalMode, SpectrumMode, WaveletMode};
use crate::domain::plot::PlotPayload;
use crate::domain::signal::SignalResult;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HttpComputeClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpComputeClient {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn file_part(file: &UploadedFile) -> Part {
        Part::bytes(file.contents.to_vec()).file_name(file.name.clone())
    }

    fn process_form(file: &UploadedFile, params: &ProcessingParams) -> Form {
        param_fields(params)
            .into_iter()
            .fold(Form::new().part("file", Self::file_part(file)), |form, (name, value)| {
                form.text(name, value)
            })
    }

    async fn post_form<T: DeserializeOwned>(&self, path: &str, form: Form) -> Result<T> {
        let url = self.endpoint(path);

        let response = self
            .http
            .post(&url)
            .multipart(form)
            .send()
            .await
            .with_context(|| format!("Failed to send request to {}", url))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("{} failed with status {}: {}", path, status, detail(&body));
        }

        response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse response from {}", path))
    }

    async fn post_plot(
        &self,
        path: &str,
        file: &UploadedFile,
        params: &ProcessingParams,
        mode_field: &'static str,
        mode: &'static str,
    ) -> Result<PlotPayload> {
        tracing::debug!("POST {} {}={} for {}", path, mode_field, mode, file.name);
        let form = Self::process_form(file, params).text(mode_field, mode);
        self.post_form(path, form).await
    }
}

/// Form fields carrying the processing parameters
pub fn param_fields(params: &ProcessingParams) -> Vec<(&'static str, String)> {
    vec![
        ("time_column", params.time_column.to_string()),
        ("signal_column", params.signal_column.to_string()),
        ("wavelet_type", params.wavelet_type.to_string()),
        ("n_levels", params.n_levels.to_string()),
    ]
}

/// Prefer the service's `detail` message over the raw error body
fn detail(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| {
            v.get("detail")
                .map(|d| d.as_str().map(str::to_string).unwrap_or_else(|| d.to_string()))
        })
        .unwrap_or_else(|| body.to_string())
}

#[async_trait]
impl RemoteComputeClient for HttpComputeClient {
    async fn upload(&self, file: &UploadedFile) -> Result<UploadAck> {
        let form = Form::new().part("file", Self::file_part(file));
        self.post_form("upload", form).await
    }

    async fn process(&self, file: &UploadedFile, params: &ProcessingParams) -> Result<SignalResult> {
        self.post_form("process", Self::process_form(file, params)).await
    }

    async fn plot_signal(
        &self,
        file: &UploadedFile,
        params: &ProcessingParams,
        mode: SourceSignalMode,
    ) -> Result<PlotPayload> {
        self.post_plot("plot/signal", file, params, "signal_type", mode.as_str())
            .await
    }

    async fn plot_wavelet(
        &self,
        file: &UploadedFile,
        params: &ProcessingParams,
        mode: WaveletMode,
    ) -> Result<PlotPayload> {
        self.post_plot("plot/wavelet", file, params, "wavelet_option", mode.as_str())
            .await
    }

    async fn plot_fft(
        &self,
        file: &UploadedFile,
        params: &ProcessingParams,
        mode: FftMode,
    ) -> Result<PlotPayload> {
        self.post_plot("plot/fft", file, params, "fft_type", mode.as_str())
            .await
    }

    async fn plot_spectrum(
        &self,
        file: &UploadedFile,
        params: &ProcessingParams,
        mode: SpectrumMode,
    ) -> Result<PlotPayload> {
        self.post_plot("plot/spectrum", file, params, "spectrum_type", mode.as_str())
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::params::WaveletType;
    use crate::domain::plot::PlotRequest;
    use axum::extract::Multipart;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    async fn fields(mut multipart: Multipart) -> HashMap<String, String> {
        let mut fields = HashMap::new();
        while let Some(field) = multipart.next_field().await.unwrap() {
            let name = field.name().unwrap_or_default().to_string();
            let value = match field.file_name() {
                Some(file_name) => file_name.to_string(),
                None => field.text().await.unwrap(),
            };
            fields.insert(name, value);
        }
        fields
    }

    async fn echo(multipart: Multipart) -> Json<Value> {
        Json(json!({ "received": fields(multipart).await }))
    }

    async fn upload(multipart: Multipart) -> (StatusCode, Json<Value>) {
        let fields = fields(multipart).await;
        let name = fields.get("file").cloned().unwrap_or_default();
        if name.ends_with(".txt") {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "detail": "unreadable file" })),
            );
        }
        (
            StatusCode::OK,
            Json(json!({ "filename": name, "columns": 2, "rows": 1000, "status": "success" })),
        )
    }

    async fn process(multipart: Multipart) -> Json<Value> {
        let fields = fields(multipart).await;
        let levels: usize = fields["n_levels"].parse().unwrap();
        let detail = vec![vec![0.1]; levels];
        let filename = fields["file"].clone();
        Json(json!({
            "time": [0.0, 1.0],
            "raw_signal": [0.5, 0.7],
            "denoised_signal": [0.5, 0.6],
            "wavelet_coeffs": { "approximation": [1.0], "detail": detail },
            "statistics": { "Mean": 0.6 },
            "filename": filename,
        }))
    }

    async fn spawn_service() -> String {
        let router = Router::new()
            .route("/upload", post(upload))
            .route("/process", post(process))
            .route("/plot/signal", post(echo))
            .route("/plot/wavelet", post(echo))
            .route("/plot/fft", post(echo))
            .route("/plot/spectrum", post(echo));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}/", addr)
    }

    fn params() -> ProcessingParams {
        ProcessingParams::new(0, 1, WaveletType::Bior2_4, 7)
    }

    #[test]
    fn test_param_fields() {
        let fields = param_fields(&params());
        assert_eq!(
            fields,
            vec![
                ("time_column", "0".to_string()),
                ("signal_column", "1".to_string()),
                ("wavelet_type", "bior2.4".to_string()),
                ("n_levels", "7".to_string()),
            ]
        );
    }

    #[test]
    fn test_error_detail() {
        assert_eq!(detail(r#"{"detail":"bad column"}"#), "bad column");
        assert_eq!(detail(r#"{"detail":[1]}"#), "[1]");
        assert_eq!(detail("Internal Server Error"), "Internal Server Error");
    }

    #[tokio::test]
    async fn test_upload_and_process() {
        let base = spawn_service().await;
        let client = HttpComputeClient::new(base, Duration::from_secs(5)).unwrap();
        let file = UploadedFile::new("signal1.lvm", "0\t0.5\n1\t0.7\n");

        let ack = client.upload(&file).await.unwrap();
        assert_eq!(ack.filename, "signal1.lvm");
        assert_eq!(ack.rows, 1000);

        let result = client.process(&file, &params()).await.unwrap();
        assert_eq!(result.levels(), 7);
        assert_eq!(result.statistics.get("Mean"), Some(0.6));
    }

    #[tokio::test]
    async fn test_rejected_upload_carries_detail() {
        let base = spawn_service().await;
        let client = HttpComputeClient::new(base, Duration::from_secs(5)).unwrap();
        let file = UploadedFile::new("notes.txt", "garbage");

        let err = client.upload(&file).await.unwrap_err();
        let message = format!("{:#}", err);
        assert!(message.contains("400"), "{}", message);
        assert!(message.contains("unreadable file"), "{}", message);
    }

    #[tokio::test]
    async fn test_plot_sends_its_mode_field() {
        let base = spawn_service().await;
        let client = HttpComputeClient::new(base, Duration::from_secs(5)).unwrap();
        let file = UploadedFile::new("signal1.lvm", "0\t0.5\n");

        let cases = [
            (PlotRequest::Signal(SourceSignalMode::Denoised), "signal_type", "denoised"),
            (PlotRequest::Wavelet(WaveletMode::PearsonApprox), "wavelet_option", "pearson_approx"),
            (PlotRequest::Fft(FftMode::Detail), "fft_type", "detail"),
            (PlotRequest::Spectrum(SpectrumMode::Raw), "spectrum_type", "raw"),
        ];

        for (request, field, value) in cases {
            let payload = client.plot(&file, &params(), request).await.unwrap();
            let received = &payload.0["received"];
            assert_eq!(received[field], value);
            assert_eq!(received["wavelet_type"], "bior2.4");
            assert_eq!(received["n_levels"], "7");
            assert_eq!(received["file"], "signal1.lvm");
        }
    }
}
