//! Region rasterisation: re-render the clipped page area of each image.
//!
//! Exporting vector fragments one by one loses transparency, overlapping
//! fills and clipping paths. Rendering the page and cutting the region out
//! of the bitmap keeps every pixel exactly as a viewer would show it.
//!
//! ## Why one full-page render per page?
//!
//! A page with several image regions would otherwise be rasterised once per
//! region. The full-page bitmap is rendered lazily on the first request, at
//! `dpi / 72` scale, and every region is cropped from it.
//!
//! ## Why cap pixels, not DPI?
//!
//! Page sizes vary wildly: an A0 poster at 300 DPI would produce a
//! 10,000 × 14,000 px bitmap. `max_rendered_pixels` caps the longest edge
//! regardless of physical size. When the cap bites, the effective DPI is
//! lower than requested and is reported back with each region.

use crate::error::DecomposeError;
use crate::geometry::BBox;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::PathBuf;
use tracing::debug;

/// PDF page space has 72 units per inch.
pub const POINTS_PER_INCH: f32 = 72.0;

/// A rendered region and the resolution it was actually produced at.
#[derive(Debug, Clone)]
pub struct RenderedRegion {
    pub image: DynamicImage,
    pub dpi: f32,
}

/// Rasterises rectangular regions of one page.
///
/// The pdfium implementation is [`PdfiumPageRenderer`]; tests substitute an
/// in-memory renderer.
pub trait RegionRenderer {
    /// Render `region` (top-down page units) at `dpi`.
    fn render_region(&mut self, region: &BBox, dpi: f32) -> Result<RenderedRegion, String>;
}

/// Pixels per page unit for a page of the given size, honouring the cap on
/// the longest rendered edge.
pub fn effective_scale(page_width: f32, page_height: f32, dpi: f32, max_pixels: u32) -> f32 {
    let scale = dpi / POINTS_PER_INCH;
    let longest = page_width.max(page_height);
    if longest <= 0.0 {
        return scale;
    }
    scale.min(max_pixels as f32 / longest)
}

/// Cut `region` out of a page bitmap rendered at `scale` pixels per unit.
///
/// Edges are rounded outwards so the crop never loses a partially covered
/// pixel, then clamped to the bitmap.
pub fn crop_region(page: &DynamicImage, scale: f32, region: &BBox) -> Result<DynamicImage, String> {
    let (w, h) = (page.width(), page.height());
    let to_px = |v: f32, limit: u32| (v * scale).clamp(0.0, limit as f32);

    let x0 = to_px(region.left, w).floor() as u32;
    let y0 = to_px(region.top, h).floor() as u32;
    let x1 = to_px(region.right, w).ceil() as u32;
    let y1 = to_px(region.bottom, h).ceil() as u32;

    if x1 <= x0 || y1 <= y0 {
        return Err(format!("region {region} is empty at {scale:.3} px/unit"));
    }
    Ok(page.crop_imm(x0, y0, x1 - x0, y1 - y0))
}

/// Renders regions of one pdfium page, caching the full-page bitmap.
pub struct PdfiumPageRenderer<'a> {
    page: PdfPage<'a>,
    max_pixels: u32,
    cached: Option<(f32, f32, DynamicImage)>,
}

impl<'a> PdfiumPageRenderer<'a> {
    pub fn new(page: PdfPage<'a>, max_pixels: u32) -> Self {
        Self {
            page,
            max_pixels,
            cached: None,
        }
    }

    fn full_page(&mut self, dpi: f32) -> Result<(f32, &DynamicImage), String> {
        let stale = !matches!(&self.cached, Some((cached_dpi, _, _)) if *cached_dpi == dpi);
        if stale {
            let width = self.page.width().value;
            let height = self.page.height().value;
            let scale = effective_scale(width, height, dpi, self.max_pixels);
            let px_w = ((width * scale).round() as i32).max(1);
            let px_h = ((height * scale).round() as i32).max(1);

            let render_config = PdfRenderConfig::new()
                .set_target_width(px_w)
                .set_target_height(px_h)
                .render_form_data(true)
                .render_annotations(true);
            let bitmap = self
                .page
                .render_with_config(&render_config)
                .map_err(|e| format!("page render failed: {e:?}"))?;
            let image = bitmap.as_image();
            debug!(
                "Rendered full page at {:.1} DPI → {}x{} px",
                scale * POINTS_PER_INCH,
                image.width(),
                image.height()
            );
            self.cached = Some((dpi, scale, image));
        }
        match &self.cached {
            Some((_, scale, image)) => Ok((*scale, image)),
            None => Err("page bitmap missing after render".to_string()),
        }
    }
}

impl RegionRenderer for PdfiumPageRenderer<'_> {
    fn render_region(&mut self, region: &BBox, dpi: f32) -> Result<RenderedRegion, String> {
        let (scale, page) = self.full_page(dpi)?;
        let image = crop_region(page, scale, region)?;
        Ok(RenderedRegion {
            image,
            dpi: scale * POINTS_PER_INCH,
        })
    }
}

/// Bind pdfium: `PDFIUM_LIB_PATH` first, then the working directory, then
/// the system library path.
pub fn bind_pdfium() -> Result<Pdfium, DecomposeError> {
    let from_env = std::env::var_os("PDFIUM_LIB_PATH").map(PathBuf::from);
    let bindings = match from_env {
        Some(path) => Pdfium::bind_to_library(&path),
        None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./")),
    }
    .or_else(|_| Pdfium::bind_to_system_library())
    .map_err(|e| DecomposeError::PdfiumBindingFailed(format!("{e:?}")))?;

    Ok(Pdfium::new(bindings))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GenericImageView, Rgba, RgbaImage};

    #[test]
    fn scale_follows_dpi_below_cap() {
        let s = effective_scale(612.0, 792.0, 144.0, 8000);
        assert!((s - 2.0).abs() < 1e-6);
    }

    #[test]
    fn scale_is_capped_on_longest_edge() {
        // 100 x 200 unit page at 720 DPI would be 2000 px tall.
        let s = effective_scale(100.0, 200.0, 720.0, 1000);
        assert!((s - 5.0).abs() < 1e-6);
    }

    #[test]
    fn crop_rounds_outwards() {
        let page = DynamicImage::ImageRgba8(RgbaImage::from_pixel(200, 100, Rgba([0, 0, 0, 255])));
        let region = BBox::new(10.2, 10.2, 20.5, 30.1);
        let cropped = crop_region(&page, 2.0, &region).unwrap();
        // 20.4 → 20 .. 41.0 → 41 ; 20.4 → 20 .. 60.2 → 61
        assert_eq!(cropped.dimensions(), (21, 41));
    }

    #[test]
    fn crop_is_clamped_to_bitmap() {
        let page = DynamicImage::ImageRgba8(RgbaImage::from_pixel(100, 100, Rgba([0, 0, 0, 255])));
        let cropped = crop_region(&page, 1.0, &BBox::new(50.0, 50.0, 500.0, 500.0)).unwrap();
        assert_eq!(cropped.dimensions(), (50, 50));
    }

    #[test]
    fn empty_crop_is_an_error() {
        let page = DynamicImage::ImageRgba8(RgbaImage::from_pixel(10, 10, Rgba([0, 0, 0, 255])));
        assert!(crop_region(&page, 1.0, &BBox::new(20.0, 20.0, 30.0, 30.0)).is_err());
    }

    #[test]
    fn crop_keeps_region_pixels() {
        let mut img = RgbaImage::from_pixel(20, 20, Rgba([255, 255, 255, 255]));
        img.put_pixel(5, 5, Rgba([255, 0, 0, 255]));
        let page = DynamicImage::ImageRgba8(img);
        let cropped = crop_region(&page, 1.0, &BBox::new(5.0, 5.0, 10.0, 10.0)).unwrap();
        assert_eq!(cropped.get_pixel(0, 0), Rgba([255, 0, 0, 255]));
    }
}
