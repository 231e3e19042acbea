//! Pipeline stages for page decomposition.
//!
//! Each submodule implements exactly one transformation step. Only
//! [`extract`] and the pdfium half of [`render`] touch pdfium; every other
//! stage works on plain boxes and can be tested without a PDF.
//!
//! ## Data Flow
//!
//! ```text
//! input ──▶ extract ──▶ cluster ──▶ overlap ──▶ render ──▶ encode ──▶ order
//! (path)    (pdfium)    (union-    (merge,     (clip at   (PNG)     (row
//!                        find)      suppress)   DPI)                 bands)
//! ```
//!
//! 1. [`input`]   — validate the user-supplied path before pdfium sees it
//! 2. [`extract`] — enumerate text runs, raster placements and vector
//!    fragments of one page
//! 3. [`cluster`] — connected components of fragment proximity; noise
//!    discard and raster anchoring
//! 4. [`overlap`] — merge overlapping image candidates to a fixpoint and
//!    drop text that sits inside an image
//! 5. [`render`]  — re-render each image region of the page at the target DPI
//! 6. [`encode`]  — PNG-encode (optionally downscale) each rendered region
//! 7. [`order`]   — row-band reading order over text and image blocks

pub mod cluster;
pub mod encode;
pub mod extract;
pub mod input;
pub mod order;
pub mod overlap;
pub mod render;
