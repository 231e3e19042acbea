//! Output types: the decomposed document, its pages and their blocks.
//!
//! A [`Page`] owns an ordered list of [`Block`]s. Blocks are a sum type
//! because the two variants share geometry and nothing else; every site that
//! consumes them (ordering, prompt building, the debug binary) matches
//! exhaustively.

use crate::error::PageWarning;
use crate::geometry::BBox;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::path::PathBuf;

/// The result of decomposing one PDF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecomposedDocument {
    /// Path of the source PDF.
    pub source: PathBuf,
    /// Total page count of the document (selected or not).
    pub page_count: usize,
    /// Decomposed pages, in page-index order.
    pub pages: Vec<Page>,
    /// Aggregate counters.
    pub stats: DecomposeStats,
}

impl DecomposedDocument {
    /// Every warning of every page, in page order.
    pub fn warnings(&self) -> impl Iterator<Item = &PageWarning> {
        self.pages.iter().flat_map(|p| p.warnings.iter())
    }

    /// Every image block with the 0-based index of its page.
    pub fn image_blocks(&self) -> impl Iterator<Item = (usize, &ImageBlock)> {
        self.pages
            .iter()
            .flat_map(|p| p.images().map(move |img| (p.index, img)))
    }
}

/// One decomposed page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    /// 0-based page index in the document.
    pub index: usize,
    /// Page width in page units.
    pub width: f32,
    /// Page height in page units.
    pub height: f32,
    /// Blocks in reading order.
    pub blocks: Vec<Block>,
    /// Recovered failures on this page.
    pub warnings: Vec<PageWarning>,
    /// How the page's vector fragments were consumed.
    pub fragments: FragmentAccounting,
}

impl Page {
    /// An empty page, used when content extraction fails.
    pub fn empty(index: usize, width: f32, height: f32, warning: PageWarning) -> Self {
        Self {
            index,
            width,
            height,
            blocks: Vec::new(),
            warnings: vec![warning],
            fragments: FragmentAccounting::default(),
        }
    }

    /// 1-indexed page number.
    pub fn number(&self) -> usize {
        self.index + 1
    }

    pub fn texts(&self) -> impl Iterator<Item = &TextBlock> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Text(t) => Some(t),
            Block::Image(_) => None,
        })
    }

    pub fn images(&self) -> impl Iterator<Item = &ImageBlock> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Image(i) => Some(i),
            Block::Text(_) => None,
        })
    }
}

/// A unit of page content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Block {
    Text(TextBlock),
    Image(ImageBlock),
}

impl Block {
    pub fn bbox(&self) -> &BBox {
        match self {
            Block::Text(t) => &t.bbox,
            Block::Image(i) => &i.bbox,
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, Block::Image(_))
    }
}

/// Extracted string content of one text run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextBlock {
    pub bbox: BBox,
    pub text: String,
}

/// An encoded picture cut from the page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageBlock {
    /// Region of the page the image was rendered from.
    pub bbox: BBox,
    /// Encoded image bytes (empty for a failed placeholder). Serialised as base64.
    #[serde(serialize_with = "as_base64", deserialize_with = "from_base64")]
    pub data: Vec<u8>,
    /// MIME type of `data`, e.g. `image/png`.
    pub mime_type: String,
    /// Pixel width of the encoded image.
    pub width_px: u32,
    /// Pixel height of the encoded image.
    pub height_px: u32,
    /// Resolution the region was rendered at, after any pixel cap.
    pub dpi: f32,
    /// What the image was assembled from.
    pub origin: ImageOrigin,
    /// Number of vector fragments merged into this image.
    pub fragment_count: usize,
    /// Number of embedded rasters merged into this image.
    pub raster_count: usize,
    pub status: RasterStatus,
}

impl ImageBlock {
    pub fn is_failed(&self) -> bool {
        matches!(self.status, RasterStatus::Failed { .. })
    }

    /// `data:<mime>;base64,<payload>` form for multimodal payloads and HTML.
    pub fn to_data_uri(&self) -> String {
        crate::pipeline::encode::data_uri(&self.data, &self.mime_type)
    }
}

/// Provenance of an image block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageOrigin {
    /// One or more embedded raster images, no vector fragments.
    Embedded,
    /// A reassembled cluster of vector fragments.
    Vector,
    /// Rasters and vector fragments merged into one picture.
    Composite,
}

impl ImageOrigin {
    /// Short label used in debug file names.
    pub fn label(&self) -> &'static str {
        match self {
            ImageOrigin::Embedded => "img",
            ImageOrigin::Vector => "vector",
            ImageOrigin::Composite => "merged",
        }
    }
}

/// Whether the image region rendered successfully.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RasterStatus {
    Rendered,
    Failed { reason: String },
}

/// Where each vector fragment of a page ended up.
///
/// `clustered + anchored + discarded == total` always holds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FragmentAccounting {
    pub total: usize,
    /// In a component that became a cluster on its own.
    pub clustered: usize,
    /// In a small component attached to a nearby embedded raster.
    pub anchored: usize,
    /// Dropped as decorative noise (rules, bullets, off-page paths).
    pub discarded: usize,
}

impl FragmentAccounting {
    pub fn is_balanced(&self) -> bool {
        self.clustered + self.anchored + self.discarded == self.total
    }
}

/// Aggregate counters for a decomposition run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecomposeStats {
    pub total_pages: usize,
    pub decomposed_pages: usize,
    pub failed_pages: usize,
    pub text_blocks: usize,
    pub image_blocks: usize,
    pub failed_images: usize,
    pub fragments: FragmentAccounting,
    pub duration_ms: u64,
}

impl DecomposeStats {
    /// Fold one page into the counters.
    pub fn record_page(&mut self, page: &Page) {
        let parse_failed = page
            .warnings
            .iter()
            .any(|w| matches!(w, PageWarning::PageParseFailure { .. }));
        if parse_failed {
            self.failed_pages += 1;
        } else {
            self.decomposed_pages += 1;
        }
        self.text_blocks += page.texts().count();
        self.image_blocks += page.images().count();
        self.failed_images += page.images().filter(|i| i.is_failed()).count();
        self.fragments.total += page.fragments.total;
        self.fragments.clustered += page.fragments.clustered;
        self.fragments.anchored += page.fragments.anchored;
        self.fragments.discarded += page.fragments.discarded;
    }
}

fn as_base64<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(data))
}

fn from_base64<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
    let s = String::deserialize(deserializer)?;
    STANDARD.decode(s.as_bytes()).map_err(serde::de::Error::custom)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(bbox: BBox, status: RasterStatus) -> ImageBlock {
        ImageBlock {
            bbox,
            data: vec![1, 2, 3],
            mime_type: "image/png".into(),
            width_px: 2,
            height_px: 2,
            dpi: 144.0,
            origin: ImageOrigin::Vector,
            fragment_count: 3,
            raster_count: 0,
            status,
        }
    }

    #[test]
    fn image_data_serialises_as_base64() {
        let block = Block::Image(image(BBox::new(0.0, 0.0, 1.0, 1.0), RasterStatus::Rendered));
        let json = serde_json::to_string(&block).unwrap();
        assert!(json.contains("\"kind\":\"image\""), "got: {json}");
        assert!(json.contains("\"AQID\""), "got: {json}");
        let back: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(back, block);
    }

    #[test]
    fn page_filters_blocks_by_kind() {
        let page = Page {
            index: 0,
            width: 100.0,
            height: 100.0,
            blocks: vec![
                Block::Text(TextBlock {
                    bbox: BBox::new(0.0, 0.0, 50.0, 10.0),
                    text: "Title".into(),
                }),
                Block::Image(image(BBox::new(0.0, 20.0, 50.0, 60.0), RasterStatus::Rendered)),
            ],
            warnings: vec![],
            fragments: FragmentAccounting::default(),
        };
        assert_eq!(page.texts().count(), 1);
        assert_eq!(page.images().count(), 1);
        assert_eq!(page.number(), 1);

        let doc = DecomposedDocument {
            source: PathBuf::from("a.pdf"),
            page_count: 1,
            pages: vec![page],
            stats: DecomposeStats::default(),
        };
        let found: Vec<usize> = doc.image_blocks().map(|(index, _)| index).collect();
        assert_eq!(found, vec![0]);
    }

    #[test]
    fn stats_count_failed_pages_and_images() {
        let mut stats = DecomposeStats::default();
        stats.record_page(&Page::empty(
            0,
            612.0,
            792.0,
            PageWarning::PageParseFailure {
                page: 1,
                detail: "x".into(),
            },
        ));
        stats.record_page(&Page {
            index: 1,
            width: 612.0,
            height: 792.0,
            blocks: vec![Block::Image(image(
                BBox::new(0.0, 0.0, 10.0, 10.0),
                RasterStatus::Failed {
                    reason: "boom".into(),
                },
            ))],
            warnings: vec![],
            fragments: FragmentAccounting {
                total: 4,
                clustered: 3,
                anchored: 0,
                discarded: 1,
            },
        });
        assert_eq!(stats.failed_pages, 1);
        assert_eq!(stats.decomposed_pages, 1);
        assert_eq!(stats.image_blocks, 1);
        assert_eq!(stats.failed_images, 1);
        assert!(stats.fragments.is_balanced());
    }
}
