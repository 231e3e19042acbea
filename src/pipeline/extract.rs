//! Page content extraction: one pdfium page → [`PageContent`].
//!
//! Pdfium exposes three things we care about:
//!
//! * text segments — rectangular runs of characters sharing a baseline,
//! * image objects — embedded rasters, with bounds already transformed by
//!   their placement matrix,
//! * path, shading and form objects — the vector fragments a chart or logo
//!   is built from.
//!
//! Every item receives a `seq` number in scan order. Ordering uses it as
//! the final tie-break, which keeps repeated runs byte-identical.

use crate::geometry::BBox;
use pdfium_render::prelude::*;
use tracing::debug;

/// Everything extracted from one page, in top-down page units.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageContent {
    /// 0-based page index.
    pub index: usize,
    pub width: f32,
    pub height: f32,
    pub text_runs: Vec<TextRun>,
    pub rasters: Vec<RasterPlacement>,
    pub fragments: Vec<Fragment>,
}

impl PageContent {
    /// Empty content for a page of the given size.
    pub fn new(index: usize, width: f32, height: f32) -> Self {
        Self {
            index,
            width,
            height,
            ..Default::default()
        }
    }

    /// Next free scan-order number.
    fn next_seq(&self) -> usize {
        self.text_runs.len() + self.rasters.len() + self.fragments.len()
    }

    pub fn push_text(&mut self, bbox: BBox, text: impl Into<String>) -> &mut Self {
        let seq = self.next_seq();
        self.text_runs.push(TextRun {
            bbox,
            text: text.into(),
            seq,
        });
        self
    }

    pub fn push_raster(&mut self, bbox: BBox) -> &mut Self {
        let seq = self.next_seq();
        self.rasters.push(RasterPlacement { bbox, seq });
        self
    }

    pub fn push_fragment(&mut self, bbox: BBox) -> &mut Self {
        let seq = self.next_seq();
        self.fragments.push(Fragment { bbox, seq });
        self
    }
}

/// One run of text with its box.
#[derive(Debug, Clone, PartialEq)]
pub struct TextRun {
    pub bbox: BBox,
    pub text: String,
    pub seq: usize,
}

/// An embedded raster image as placed on the page.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterPlacement {
    pub bbox: BBox,
    pub seq: usize,
}

/// A single vector drawing instruction: a path, a shading or a form XObject.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fragment {
    pub bbox: BBox,
    pub seq: usize,
}

/// Extract text runs, raster placements and vector fragments from `page`.
///
/// Returns `Err` with a description when pdfium cannot load the page's text
/// layer; the caller turns that into a page-level warning.
pub fn extract_page(page: &PdfPage, index: usize) -> Result<PageContent, String> {
    let width = page.width().value;
    let height = page.height().value;
    if !width.is_finite() || !height.is_finite() || width <= 0.0 || height <= 0.0 {
        return Err(format!("page has invalid size {width}x{height}"));
    }

    let mut content = PageContent::new(index, width, height);

    let text = page
        .text()
        .map_err(|e| format!("text layer unavailable: {e:?}"))?;
    for segment in text.segments().iter() {
        let s = segment.text();
        if s.trim().is_empty() {
            continue;
        }
        let rect = segment.bounds();
        let bbox = rect_to_bbox(&rect, height);
        if bbox.is_finite() {
            content.push_text(bbox, s.trim_end());
        }
    }

    for object in page.objects().iter() {
        let Some(bbox) = object_bbox(&object, height) else {
            continue;
        };
        match &object {
            PdfPageObject::Image(_) => {
                content.push_raster(bbox);
            }
            PdfPageObject::Path(_) | PdfPageObject::Shading(_) | PdfPageObject::XObjectForm(_) => {
                content.push_fragment(bbox);
            }
            _ => {}
        }
    }

    debug!(
        "Page {}: {} text runs, {} rasters, {} vector fragments",
        index + 1,
        content.text_runs.len(),
        content.rasters.len(),
        content.fragments.len()
    );

    Ok(content)
}

fn object_bbox(object: &PdfPageObject, page_height: f32) -> Option<BBox> {
    let rect = object.bounds().ok()?.to_rect();
    let bbox = rect_to_bbox(&rect, page_height);
    bbox.is_finite().then_some(bbox)
}

fn rect_to_bbox(rect: &PdfRect, page_height: f32) -> BBox {
    BBox::from_pdf_rect(
        rect.left().value,
        rect.bottom().value,
        rect.right().value,
        rect.top().value,
        page_height,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seq_follows_push_order_across_kinds() {
        let mut c = PageContent::new(0, 612.0, 792.0);
        c.push_text(BBox::new(0.0, 0.0, 50.0, 10.0), "a")
            .push_fragment(BBox::new(0.0, 20.0, 10.0, 30.0))
            .push_raster(BBox::new(0.0, 40.0, 10.0, 50.0))
            .push_text(BBox::new(0.0, 60.0, 50.0, 70.0), "b");

        assert_eq!(c.text_runs[0].seq, 0);
        assert_eq!(c.fragments[0].seq, 1);
        assert_eq!(c.rasters[0].seq, 2);
        assert_eq!(c.text_runs[1].seq, 3);
    }
}
