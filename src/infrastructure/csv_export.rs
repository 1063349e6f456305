// Statistics export as a delimited download
use crate::domain::signal::StatisticsSnapshot;
use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct ExportedFile {
    pub filename: String,
    pub contents: Vec<u8>,
}

pub fn export_filename(source_stem: &str) -> String {
    format!("{}_statistics.csv", source_stem)
}

/// One `Metric,Value` row per statistic in the fixed metric order
pub fn export_statistics(statistics: &StatisticsSnapshot, source_stem: &str) -> Result<ExportedFile> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(["Metric", "Value"])
        .context("Failed to write CSV header")?;

    for (name, value) in statistics.ordered() {
        writer
            .write_record([name.to_string(), value.to_string()])
            .with_context(|| format!("Failed to write CSV row for {}", name))?;
    }

    let contents = writer
        .into_inner()
        .map_err(|e| anyhow::anyhow!("Failed to flush CSV writer: {}", e))?;

    Ok(ExportedFile {
        filename: export_filename(source_stem),
        contents,
    })
}
