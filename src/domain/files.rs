// Uploaded file domain model and the session's file registry
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ACCEPTED_EXTENSIONS: [&str; 2] = ["lvm", "txt"];

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FileError {
    #[error("file '{0}' has not been uploaded")]
    UnknownFile(String),
    #[error("file '{0}' is not an .lvm or .txt file")]
    UnsupportedFileType(String),
}

/// A file as held by the session. Never mutated after creation.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub name: String,
    pub contents: Bytes,
    pub uploaded_at: DateTime<Utc>,
}

impl UploadedFile {
    pub fn new(name: impl Into<String>, contents: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            contents: contents.into(),
            uploaded_at: Utc::now(),
        }
    }

    pub fn check_extension(&self) -> Result<(), FileError> {
        let accepted = Path::new(&self.name)
            .extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                ACCEPTED_EXTENSIONS
                    .iter()
                    .any(|accepted| ext.eq_ignore_ascii_case(accepted))
            })
            .unwrap_or(false);

        if accepted {
            Ok(())
        } else {
            Err(FileError::UnsupportedFileType(self.name.clone()))
        }
    }
}

/// File name without its extension, used to name exports
pub fn file_stem(name: &str) -> &str {
    Path::new(name)
        .file_stem()
        .and_then(|stem| stem.to_str())
        .unwrap_or(name)
}

/// Acknowledgement returned by the compute service for an upload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadAck {
    pub filename: String,
    pub columns: u32,
    pub rows: u64,
    pub status: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct FileSummary {
    pub name: String,
    pub size_bytes: usize,
    pub uploaded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct FileRegistry {
    files: Vec<UploadedFile>,
    selected: Option<String>,
}

impl FileRegistry {
    /// Append an accepted file. The first file added to a registry with no
    /// selection becomes selected; later adds never move the selection.
    /// Returns true when this add changed the selection.
    pub fn add(&mut self, file: UploadedFile) -> bool {
        let select = self.selected.is_none();
        if select {
            self.selected = Some(file.name.clone());
        }
        self.files.push(file);
        select
    }

    /// Returns true when the selection actually changed
    pub fn select(&mut self, name: &str) -> Result<bool, FileError> {
        if !self.files.iter().any(|f| f.name == name) {
            return Err(FileError::UnknownFile(name.to_string()));
        }
        if self.selected.as_deref() == Some(name) {
            return Ok(false);
        }
        self.selected = Some(name.to_string());
        Ok(true)
    }

    /// Returns true when there was anything to clear
    pub fn clear(&mut self) -> bool {
        let changed = !self.files.is_empty() || self.selected.is_some();
        self.files.clear();
        self.selected = None;
        changed
    }

    pub fn selected_name(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    /// Re-uploads keep their own entries; a name resolves to its first entry.
    pub fn selected_file(&self) -> Option<&UploadedFile> {
        let name = self.selected.as_deref()?;
        self.files.iter().find(|f| f.name == name)
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.files.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn summaries(&self) -> Vec<FileSummary> {
        self.files
            .iter()
            .map(|f| FileSummary {
                name: f.name.clone(),
                size_bytes: f.contents.len(),
                uploaded_at: f.uploaded_at,
            })
            .collect()
    }
}
