// Workflow-level errors surfaced to the user
use crate::domain::files::FileError;

#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("upload of '{file}' failed: {message}")]
    Upload { file: String, message: String },
    #[error("processing '{file}' failed: {message}")]
    Process { file: String, message: String },
    #[error(transparent)]
    File(#[from] FileError),
    #[error("no file selected")]
    NoFileSelected,
    #[error("no processed results available")]
    NoResults,
    #[error("results for '{0}' arrived after the session moved on and were dropped")]
    Superseded(String),
    #[error("export failed: {0}")]
    Export(String),
}
