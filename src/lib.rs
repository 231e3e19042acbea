//! # pdf-decomposer
//!
//! Split every page of a PDF into an ordered list of text and image blocks.
//!
//! ## Why this crate?
//!
//! A chart or logo inside a PDF is rarely one image. Usually it is dozens of
//! small filled paths, and no single path looks like a picture. Text
//! extraction tools drop them entirely; page rasterisers keep them but lose
//! the text. This crate clusters nearby vector fragments back into whole
//! pictures, renders each picture (and every embedded raster) at a target
//! DPI, removes text that is baked into those pictures, and returns all
//! blocks in reading order, ready for a multimodal language model.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input    validate the path and %PDF magic bytes
//!  ├─ 2. Extract  text runs, raster placements, vector fragments (pdfium)
//!  ├─ 3. Cluster  union-find over fragment proximity, noise discard
//!  ├─ 4. Overlap  merge rasters and clusters, suppress text inside images
//!  ├─ 5. Render   crop each region from a full-page render at the target DPI
//!  ├─ 6. Encode   PNG, optional downscale
//!  └─ 7. Order    row bands top to bottom, left to right within a band
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf_decomposer::{decompose, Block, DecomposeConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = DecomposeConfig::builder().raster_dpi(150.0).build()?;
//!     let doc = decompose("document.pdf", &config)?;
//!     for page in &doc.pages {
//!         for block in &page.blocks {
//!             match block {
//!                 Block::Text(t) => println!("p{} text: {}", page.number(), t.text),
//!                 Block::Image(i) => println!("p{} image: {} bytes", page.number(), i.data.len()),
//!             }
//!         }
//!     }
//!     for warning in doc.warnings() {
//!         eprintln!("warning: {warning}");
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdfdecomp` debug binary (clap + anyhow + tracing-subscriber + indicatif) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! pdf-decomposer = { version = "0.1", default-features = false }
//! ```
//!
//! ## Pdfium
//!
//! The library binds pdfium at runtime: `PDFIUM_LIB_PATH` if set, otherwise
//! the platform library in the working directory, otherwise the system
//! library path.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod decompose;
pub mod error;
pub mod geometry;
pub mod output;
pub mod pipeline;
pub mod progress;
pub mod prompts;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{DecomposeConfig, DecomposeConfigBuilder, PageSelection, TextOverlapPolicy};
pub use decompose::{
    decompose, decompose_bytes, decompose_page, decompose_page_within, export_images, Decomposer,
    OpenDocument, Pages,
};
pub use error::{DecomposeError, PageWarning};
pub use geometry::BBox;
pub use output::{
    Block, DecomposeStats, DecomposedDocument, FragmentAccounting, ImageBlock, ImageOrigin, Page,
    RasterStatus, TextBlock,
};
pub use pipeline::extract::PageContent;
pub use pipeline::render::{RegionRenderer, RenderedRegion};
pub use progress::{DecomposeProgressCallback, NoopProgressCallback, ProgressCallback};
pub use prompts::{build_user_parts, PromptOptions, UserPart, DEFAULT_SYSTEM_PROMPT};
