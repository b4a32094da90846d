use thiserror::Error;

/// Unified error type for doc-translator-core
///
/// This enum encompasses all error cases that can occur in the library:
/// - Input validation (missing file, unsupported type, oversized file)
/// - PDF operations (opening, page extraction, saving)
/// - Translation operations (API requests, responses, rate limiting)
/// - Pipeline outcomes (nothing translated, cancellation)
/// - Cache, configuration and output rendering
/// - General I/O operations
#[derive(Error, Debug)]
pub enum Error {
    // ==========================================================================
    // Input Validation Errors
    // ==========================================================================
    /// No file (or an empty file) was provided
    #[error("no file provided")]
    MissingFile,

    /// The media type is not one of the accepted document/image types
    #[error("unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// The file exceeds the configured size ceiling
    #[error("file is too large ({size} bytes, limit is {limit} bytes)")]
    FileTooLarge { size: u64, limit: u64 },

    /// The payload does not match its declared type
    #[error("invalid document: {0}")]
    InvalidDocument(String),

    // ==========================================================================
    // PDF Errors
    // ==========================================================================
    /// Failed to open or parse a PDF file
    #[error("failed to open PDF: {0}")]
    PdfOpen(String),

    /// Invalid page range requested
    #[error("invalid page range {start}..{end} (document has {total} pages)")]
    PdfInvalidPage { start: usize, end: usize, total: usize },

    /// Failed to save a PDF
    #[error("failed to save PDF: {0}")]
    PdfSave(String),

    /// Error from the lopdf library
    #[error("lopdf error: {0}")]
    Lopdf(String),

    // ==========================================================================
    // Translation Errors
    // ==========================================================================
    /// Translation API request failed
    #[error("translation API request failed: {0}")]
    TranslationRequest(String),

    /// Invalid response from translation API
    #[error("invalid translation API response: {0}")]
    TranslationInvalidResponse(String),

    /// Rate limited by translation API
    #[error("translation rate limited{}", retry_after.map(|s| format!(", retry after {s} seconds")).unwrap_or_default())]
    TranslationRateLimited { retry_after: Option<u64> },

    /// API key not configured for translation service
    #[error("translation API key not configured")]
    TranslationMissingApiKey,

    /// Translation request timed out
    #[error("translation request timed out")]
    TranslationTimeout,

    /// The API refused the request itself (bad key, bad model, malformed payload)
    #[error("translation request rejected: {0}")]
    TranslationRejected(String),

    /// The model refused to process the payload
    #[error("translation blocked by the model: {0}")]
    TranslationBlocked(String),

    // ==========================================================================
    // Pipeline Errors
    // ==========================================================================
    /// Every chunk failed or came back empty
    #[error("no translatable content could be extracted from the document")]
    NoTranslatableContent,

    /// The upstream service could not be used at all
    #[error("upstream translation service error: {0}")]
    UpstreamServiceError(String),

    /// The run was cancelled before it finished
    #[error("translation cancelled")]
    Cancelled,

    // ==========================================================================
    // Cache Errors
    // ==========================================================================
    /// Failed to initialize the cache
    #[error("failed to initialize cache: {0}")]
    CacheInit(String),

    /// Failed to write to cache
    #[error("failed to write to cache: {0}")]
    CacheWrite(String),

    // ==========================================================================
    // Configuration Errors
    // ==========================================================================
    /// Failed to load configuration file
    #[error("failed to load config: {0}")]
    ConfigLoad(String),

    /// Invalid configuration value
    #[error("invalid config value for '{field}': {reason}")]
    ConfigInvalid { field: String, reason: String },

    // ==========================================================================
    // Output Errors
    // ==========================================================================
    /// Failed to render an output document
    #[error("failed to render {format} output: {reason}")]
    OutputRender { format: &'static str, reason: String },

    // ==========================================================================
    // I/O Errors
    // ==========================================================================
    /// General I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Caller-facing classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    UnsupportedFileType,
    FileTooLarge,
    NoTranslatableContent,
    UpstreamServiceError,
    Cancelled,
    Internal,
}

impl Error {
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingFile | Self::InvalidDocument(_) | Self::PdfOpen(_) => {
                ErrorKind::InvalidInput
            }
            Self::UnsupportedFileType(_) => ErrorKind::UnsupportedFileType,
            Self::FileTooLarge { .. } => ErrorKind::FileTooLarge,
            Self::NoTranslatableContent => ErrorKind::NoTranslatableContent,
            Self::TranslationRequest(_)
            | Self::TranslationInvalidResponse(_)
            | Self::TranslationRateLimited { .. }
            | Self::TranslationMissingApiKey
            | Self::TranslationTimeout
            | Self::TranslationRejected(_)
            | Self::TranslationBlocked(_)
            | Self::UpstreamServiceError(_) => ErrorKind::UpstreamServiceError,
            Self::Cancelled => ErrorKind::Cancelled,
            _ => ErrorKind::Internal,
        }
    }

    /// Whether retrying the same request could plausibly succeed.
    pub const fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::TranslationRequest(_)
                | Self::TranslationInvalidResponse(_)
                | Self::TranslationRateLimited { .. }
                | Self::TranslationTimeout
                | Self::UpstreamServiceError(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_classification() {
        assert_eq!(Error::NoTranslatableContent.kind(), ErrorKind::NoTranslatableContent);
        assert_eq!(
            Error::FileTooLarge { size: 2, limit: 1 }.kind(),
            ErrorKind::FileTooLarge
        );
        assert_eq!(Error::TranslationTimeout.kind(), ErrorKind::UpstreamServiceError);
        assert_eq!(Error::CacheInit("x".into()).kind(), ErrorKind::Internal);
    }

    #[test]
    fn test_rate_limit_message() {
        let err = Error::TranslationRateLimited { retry_after: Some(7) };
        assert_eq!(err.to_string(), "translation rate limited, retry after 7 seconds");
        let err = Error::TranslationRateLimited { retry_after: None };
        assert_eq!(err.to_string(), "translation rate limited");
    }

    #[test]
    fn test_transient_errors() {
        assert!(Error::TranslationTimeout.is_transient());
        assert!(!Error::TranslationMissingApiKey.is_transient());
        assert!(!Error::TranslationRejected("HTTP 400".into()).is_transient());
        assert!(!Error::Cancelled.is_transient());
    }
}
