use signcraft_core::ObjectId;
use thiserror::Error;

/// User-facing editor failures. The scene is unchanged whenever one of
/// these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    #[error("Select an object first.")]
    NoSelection,
    #[error("The canvas is not ready yet.")]
    CanvasNotReady,
    #[error("Could not find object `{0}` on the canvas.")]
    ObjectNotFound(ObjectId),
    #[error("`{0}` is not an image file.")]
    InvalidFileType(String),
    #[error("`{name}` is {size} bytes; the limit is {limit} bytes.")]
    FileTooLarge { name: String, size: u64, limit: u64 },
    #[error("Could not read image `{0}`.")]
    ImageDecode(String),
    #[error("`{0}` is required by the template and cannot be deleted.")]
    RequiredObject(ObjectId),
    #[error("Export failed: {0}")]
    Export(String),
}
