//! Error types for the pdf-decomposer library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`DecomposeError`] — **Fatal**: decomposition cannot proceed at all
//!   (unreadable document, wrong password, invalid configuration). Returned
//!   as `Err(DecomposeError)` from [`crate::decompose::decompose`] and
//!   [`crate::decompose::Decomposer::open`].
//!
//! * [`PageWarning`] — **Non-fatal**: one page failed to parse or one image
//!   failed to rasterise. Attached to the affected [`crate::output::Page`]
//!   and collected on the document, so the rest of the run still produces
//!   content.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf-decomposer library.
#[derive(Debug, Error)]
pub enum DecomposeError {
    // ── Document errors ───────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The file exists and was read, but is not a PDF.
    #[error("File is not a valid PDF: '{path}'\nFirst bytes: {magic:?}")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("PDF '{path}' is corrupt: {detail}")]
    CorruptPdf { path: PathBuf, detail: String },

    /// PDF requires a password but none was provided.
    #[error("PDF '{path}' is encrypted and requires a password.\nProvide it with --password <PASSWORD>.")]
    PasswordRequired { path: PathBuf },

    /// A password was provided but it is wrong.
    #[error("Wrong password for PDF '{path}'")]
    WrongPassword { path: PathBuf },

    /// The page selection does not match any page of the document.
    #[error("Page {page} is out of range (document has {total} pages)")]
    PageOutOfRange { page: usize, total: usize },

    // ── Output errors ─────────────────────────────────────────────────────
    /// Failed to write an exported image or report.
    #[error("Failed to write output '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
Set PDFIUM_LIB_PATH=/path/to/libpdfium, place the library next to the\n\
binary, or install it system-wide.\n"
    )]
    PdfiumBindingFailed(String),
}

impl DecomposeError {
    /// True for every variant meaning the PDF container itself could not be
    /// opened or parsed.
    pub fn is_document_unreadable(&self) -> bool {
        matches!(
            self,
            DecomposeError::FileNotFound { .. }
                | DecomposeError::PermissionDenied { .. }
                | DecomposeError::NotAPdf { .. }
                | DecomposeError::CorruptPdf { .. }
                | DecomposeError::PasswordRequired { .. }
                | DecomposeError::WrongPassword { .. }
        )
    }
}

/// A non-fatal problem on a single page.
///
/// Page numbers are 1-indexed; `block` is the 0-based position of the
/// placeholder in the page's ordered block list.
#[derive(Debug, Clone, PartialEq, Error, serde::Serialize, serde::Deserialize)]
pub enum PageWarning {
    /// The page content could not be extracted; the page is emitted empty.
    #[error("Page {page}: content extraction failed: {detail}")]
    PageParseFailure { page: usize, detail: String },

    /// One image region could not be rendered; a failed placeholder was kept.
    #[error("Page {page}: rasterisation of image block {block} failed: {detail}")]
    RasterizationFailure {
        page: usize,
        block: usize,
        detail: String,
    },
}

impl PageWarning {
    /// The 1-indexed page the warning belongs to.
    pub fn page(&self) -> usize {
        match self {
            PageWarning::PageParseFailure { page, .. } => *page,
            PageWarning::RasterizationFailure { page, .. } => *page,
        }
    }
}
