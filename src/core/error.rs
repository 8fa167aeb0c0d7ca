use std::fmt;

/// Universal error type for annotation pipeline operations.
///
/// This error type covers all failures that can occur while decoding the
/// source document, rasterizing pages, and flattening annotations into the
/// output file.
#[derive(Debug, Clone)]
pub enum ParaphError {
    /// The source document could not be parsed.
    ///
    /// Fatal: aborts the whole editing session.
    Decode(String),

    /// A page rasterization was superseded by a newer request.
    ///
    /// Expected during resize/zoom churn; never logged as an error.
    RenderCancelled,

    /// An embedded asset could not be decoded during export.
    ///
    /// Recovered locally: the affected annotation is skipped unless the
    /// export runs in strict mode.
    AssetDecode(String),

    /// Output serialization failed.
    ///
    /// Fatal for the export action only; session state is preserved.
    Export(String),

    /// A page index outside the document was requested.
    PageOutOfRange { page: usize, count: usize },

    /// Generic error with message.
    Generic(String),
}

impl fmt::Display for ParaphError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParaphError::Decode(msg) => {
                write!(f, "Failed to decode source document: {}", msg)
            }
            ParaphError::RenderCancelled => {
                write!(f, "Render superseded by a newer request")
            }
            ParaphError::AssetDecode(msg) => {
                write!(f, "Failed to decode embedded asset: {}", msg)
            }
            ParaphError::Export(msg) => {
                write!(f, "Export failed: {}", msg)
            }
            ParaphError::PageOutOfRange { page, count } => {
                write!(
                    f,
                    "Page {} out of range for document with {} pages",
                    page, count
                )
            }
            ParaphError::Generic(msg) => {
                write!(f, "{}", msg)
            }
        }
    }
}

impl std::error::Error for ParaphError {}

/// Result type alias for annotation pipeline operations
pub type ParaphResult<T> = Result<T, ParaphError>;
