//! Configuration types for page decomposition.
//!
//! All decomposition behaviour is controlled through [`DecomposeConfig`],
//! built via its [`DecomposeConfigBuilder`]. The numeric thresholds here are
//! the tunable surface of the clustering, merging and ordering heuristics;
//! none of them is hard-coded elsewhere in the pipeline.

use crate::error::DecomposeError;
use crate::progress::ProgressCallback;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Configuration for decomposing a PDF into ordered blocks.
///
/// Built via [`DecomposeConfig::builder()`] or using
/// [`DecomposeConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf_decomposer::DecomposeConfig;
///
/// let config = DecomposeConfig::builder()
///     .raster_dpi(150.0)
///     .proximity_threshold(4.0)
///     .min_fragment_area(1500.0)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct DecomposeConfig {
    /// Resolution used when rendering clusters and embedded rasters. Default: 144.
    ///
    /// 144 DPI is a 2x scale of the 72-unit page space, enough for a vision
    /// model to read chart labels without inflating payload size.
    pub raster_dpi: f32,

    /// Maximum per-axis gap, in page units, between two fragment boxes for
    /// them to belong to the same picture. Default: 6.0.
    pub proximity_threshold: f32,

    /// Minimum union area (page units squared) for a fragment component to
    /// become a picture. Smaller components are noise unless anchored to an
    /// embedded raster. Default: 2000.0.
    pub min_fragment_area: f32,

    /// Fraction of a text box that may be covered by an image before the
    /// text counts as "inside" the image. Default: 0.5.
    pub text_image_overlap_tolerance: f32,

    /// What to do with text inside an image. Default: [`TextOverlapPolicy::Suppress`].
    pub text_overlap_policy: TextOverlapPolicy,

    /// Maximum overlap ratio (intersection over the smaller area) allowed
    /// between two image blocks of a page; above it they are merged into
    /// one. Default: 0.0, so any shared area merges.
    pub image_overlap_tolerance: f32,

    /// Extra margin, in page units, rendered around every image region.
    /// Default: 0.0.
    pub region_padding: f32,

    /// Embedded rasters placed on less than this area are dropped. Default: 0.0.
    pub min_raster_area: f32,

    /// Keep only the N largest image blocks per page. Default: no limit.
    pub max_images_per_page: Option<usize>,

    /// Keep at most N image blocks across the whole run, spent in page
    /// order. Default: no limit.
    pub max_images_total: Option<usize>,

    /// Downscale encoded images whose longest edge exceeds this. Default: none.
    pub max_image_dim: Option<u32>,

    /// Safety cap on the longest edge of a full-page render, in pixels. Default: 8000.
    ///
    /// An A0 poster at 300 DPI would otherwise allocate a bitmap of roughly
    /// 10 000 x 14 000 pixels. When the cap applies the effective DPI drops
    /// and is recorded on each image block.
    pub max_rendered_pixels: u32,

    /// Page selection. Default: all pages.
    pub pages: PageSelection,

    /// PDF user password for encrypted documents.
    pub password: Option<String>,

    /// Optional progress callback.
    pub progress_callback: Option<ProgressCallback>,
}

impl Default for DecomposeConfig {
    fn default() -> Self {
        Self {
            raster_dpi: 144.0,
            proximity_threshold: 6.0,
            min_fragment_area: 2000.0,
            text_image_overlap_tolerance: 0.5,
            text_overlap_policy: TextOverlapPolicy::default(),
            image_overlap_tolerance: 0.0,
            region_padding: 0.0,
            min_raster_area: 0.0,
            max_images_per_page: None,
            max_images_total: None,
            max_image_dim: None,
            max_rendered_pixels: 8000,
            pages: PageSelection::default(),
            password: None,
            progress_callback: None,
        }
    }
}

impl fmt::Debug for DecomposeConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecomposeConfig")
            .field("raster_dpi", &self.raster_dpi)
            .field("proximity_threshold", &self.proximity_threshold)
            .field("min_fragment_area", &self.min_fragment_area)
            .field("text_image_overlap_tolerance", &self.text_image_overlap_tolerance)
            .field("text_overlap_policy", &self.text_overlap_policy)
            .field("image_overlap_tolerance", &self.image_overlap_tolerance)
            .field("region_padding", &self.region_padding)
            .field("min_raster_area", &self.min_raster_area)
            .field("max_images_per_page", &self.max_images_per_page)
            .field("max_images_total", &self.max_images_total)
            .field("max_image_dim", &self.max_image_dim)
            .field("max_rendered_pixels", &self.max_rendered_pixels)
            .field("pages", &self.pages)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<dyn DecomposeProgressCallback>"),
            )
            .finish()
    }
}

impl DecomposeConfig {
    /// Create a new builder for `DecomposeConfig`.
    pub fn builder() -> DecomposeConfigBuilder {
        DecomposeConfigBuilder {
            config: Self::default(),
        }
    }

    /// Check every numeric option. Called by [`DecomposeConfigBuilder::build`]
    /// and again by the decomposer, since the fields are public.
    pub fn validate(&self) -> Result<(), DecomposeError> {
        fn finite_non_negative(name: &str, v: f32) -> Result<(), DecomposeError> {
            if !v.is_finite() || v < 0.0 {
                return Err(DecomposeError::InvalidConfig(format!(
                    "{name} must be a finite value >= 0, got {v}"
                )));
            }
            Ok(())
        }

        fn unit_interval(name: &str, v: f32) -> Result<(), DecomposeError> {
            if !(0.0..=1.0).contains(&v) {
                return Err(DecomposeError::InvalidConfig(format!(
                    "{name} must be within 0.0–1.0, got {v}"
                )));
            }
            Ok(())
        }

        if !self.raster_dpi.is_finite() || self.raster_dpi <= 0.0 {
            return Err(DecomposeError::InvalidConfig(format!(
                "raster_dpi must be > 0, got {}",
                self.raster_dpi
            )));
        }
        finite_non_negative("proximity_threshold", self.proximity_threshold)?;
        finite_non_negative("min_fragment_area", self.min_fragment_area)?;
        finite_non_negative("region_padding", self.region_padding)?;
        finite_non_negative("min_raster_area", self.min_raster_area)?;
        unit_interval("text_image_overlap_tolerance", self.text_image_overlap_tolerance)?;
        unit_interval("image_overlap_tolerance", self.image_overlap_tolerance)?;

        if self.max_images_per_page == Some(0) {
            return Err(DecomposeError::InvalidConfig(
                "max_images_per_page must be ≥ 1 when set".into(),
            ));
        }
        if self.max_images_total == Some(0) {
            return Err(DecomposeError::InvalidConfig(
                "max_images_total must be ≥ 1 when set".into(),
            ));
        }
        if matches!(self.max_image_dim, Some(d) if d < 16) {
            return Err(DecomposeError::InvalidConfig(
                "max_image_dim must be ≥ 16 when set".into(),
            ));
        }
        if self.max_rendered_pixels < 100 {
            return Err(DecomposeError::InvalidConfig(format!(
                "max_rendered_pixels must be ≥ 100, got {}",
                self.max_rendered_pixels
            )));
        }
        Ok(())
    }
}

/// Builder for [`DecomposeConfig`].
///
/// Setters store values verbatim; out-of-range values are rejected by
/// [`DecomposeConfigBuilder::build`] rather than silently clamped.
#[derive(Debug)]
pub struct DecomposeConfigBuilder {
    config: DecomposeConfig,
}

impl DecomposeConfigBuilder {
    pub fn raster_dpi(mut self, dpi: f32) -> Self {
        self.config.raster_dpi = dpi;
        self
    }

    pub fn proximity_threshold(mut self, units: f32) -> Self {
        self.config.proximity_threshold = units;
        self
    }

    pub fn min_fragment_area(mut self, area: f32) -> Self {
        self.config.min_fragment_area = area;
        self
    }

    pub fn text_image_overlap_tolerance(mut self, fraction: f32) -> Self {
        self.config.text_image_overlap_tolerance = fraction;
        self
    }

    pub fn text_overlap_policy(mut self, policy: TextOverlapPolicy) -> Self {
        self.config.text_overlap_policy = policy;
        self
    }

    pub fn image_overlap_tolerance(mut self, ratio: f32) -> Self {
        self.config.image_overlap_tolerance = ratio;
        self
    }

    pub fn region_padding(mut self, units: f32) -> Self {
        self.config.region_padding = units;
        self
    }

    pub fn min_raster_area(mut self, area: f32) -> Self {
        self.config.min_raster_area = area;
        self
    }

    pub fn max_images_per_page(mut self, n: usize) -> Self {
        self.config.max_images_per_page = Some(n);
        self
    }

    pub fn max_images_total(mut self, n: usize) -> Self {
        self.config.max_images_total = Some(n);
        self
    }

    pub fn max_image_dim(mut self, px: u32) -> Self {
        self.config.max_image_dim = Some(px);
        self
    }

    pub fn max_rendered_pixels(mut self, px: u32) -> Self {
        self.config.max_rendered_pixels = px;
        self
    }

    pub fn pages(mut self, selection: PageSelection) -> Self {
        self.config.pages = selection;
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn progress_callback(mut self, cb: ProgressCallback) -> Self {
        self.config.progress_callback = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<DecomposeConfig, DecomposeError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Policy for text blocks whose box lies inside an image block.
///
/// Labels baked into a chart are usually also present as text objects;
/// emitting both duplicates the label and breaks reading order downstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TextOverlapPolicy {
    /// Drop the text block (default).
    #[default]
    Suppress,
    /// Keep the text block next to the image.
    Keep,
}

/// Specifies which pages of the PDF to decompose.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PageSelection {
    /// All pages (default).
    #[default]
    All,
    /// A single page (1-indexed).
    Single(usize),
    /// A contiguous range of pages (1-indexed, inclusive).
    Range(usize, usize),
    /// Specific pages (1-indexed, deduplicated).
    Set(Vec<usize>),
}

impl PageSelection {
    /// Expand the selection into a sorted, deduplicated list of 0-indexed page numbers.
    pub fn to_indices(&self, total_pages: usize) -> Vec<usize> {
        let mut indices: Vec<usize> = match self {
            PageSelection::All => (0..total_pages).collect(),
            PageSelection::Single(p) => {
                if *p >= 1 && *p <= total_pages {
                    vec![p - 1]
                } else {
                    vec![]
                }
            }
            PageSelection::Range(start, end) => {
                let s = (*start).max(1) - 1;
                let e = (*end).min(total_pages);
                (s..e).collect()
            }
            PageSelection::Set(pages) => pages
                .iter()
                .filter(|&&p| p >= 1 && p <= total_pages)
                .map(|p| p - 1)
                .collect(),
        };
        indices.sort_unstable();
        indices.dedup();
        indices
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        DecomposeConfig::default().validate().expect("defaults must validate");
    }

    #[test]
    fn negative_dpi_is_rejected() {
        let err = DecomposeConfig::builder().raster_dpi(-72.0).build().unwrap_err();
        assert!(matches!(err, DecomposeError::InvalidConfig(_)));
        assert!(err.to_string().contains("raster_dpi"));
    }

    #[test]
    fn zero_dpi_is_rejected() {
        assert!(DecomposeConfig::builder().raster_dpi(0.0).build().is_err());
    }

    #[test]
    fn negative_threshold_is_rejected() {
        let err = DecomposeConfig::builder()
            .proximity_threshold(-1.0)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("proximity_threshold"));
    }

    #[test]
    fn nan_area_is_rejected() {
        assert!(DecomposeConfig::builder()
            .min_fragment_area(f32::NAN)
            .build()
            .is_err());
    }

    #[test]
    fn tolerance_outside_unit_interval_is_rejected() {
        assert!(DecomposeConfig::builder()
            .text_image_overlap_tolerance(1.5)
            .build()
            .is_err());
        assert!(DecomposeConfig::builder()
            .image_overlap_tolerance(-0.1)
            .build()
            .is_err());
    }

    #[test]
    fn zero_image_limit_is_rejected() {
        assert!(DecomposeConfig::builder().max_images_per_page(0).build().is_err());
        assert!(DecomposeConfig::builder().max_images_total(0).build().is_err());
        let config = DecomposeConfig::builder().max_images_total(20).build().unwrap();
        assert_eq!(config.max_images_total, Some(20));
        assert_eq!(DecomposeConfig::default().max_images_total, None);
    }

    #[test]
    fn builder_sets_fields() {
        let c = DecomposeConfig::builder()
            .raster_dpi(300.0)
            .proximity_threshold(5.0)
            .min_fragment_area(100.0)
            .text_overlap_policy(TextOverlapPolicy::Keep)
            .max_image_dim(1400)
            .pages(PageSelection::Single(2))
            .build()
            .unwrap();
        assert_eq!(c.raster_dpi, 300.0);
        assert_eq!(c.proximity_threshold, 5.0);
        assert_eq!(c.min_fragment_area, 100.0);
        assert_eq!(c.text_overlap_policy, TextOverlapPolicy::Keep);
        assert_eq!(c.max_image_dim, Some(1400));
        assert_eq!(c.pages, PageSelection::Single(2));
    }

    #[test]
    fn debug_redacts_password() {
        let c = DecomposeConfig::builder().password("hunter2").build().unwrap();
        let dbg = format!("{c:?}");
        assert!(!dbg.contains("hunter2"));
        assert!(dbg.contains("redacted"));
    }

    #[test]
    fn page_selection_to_indices() {
        assert_eq!(PageSelection::All.to_indices(5), vec![0, 1, 2, 3, 4]);
        assert_eq!(PageSelection::Single(3).to_indices(5), vec![2]);
        assert_eq!(PageSelection::Single(6).to_indices(5), Vec::<usize>::new());
        assert_eq!(PageSelection::Range(2, 4).to_indices(5), vec![1, 2, 3]);
        assert_eq!(PageSelection::Range(3, 10).to_indices(4), vec![2, 3]);
        assert_eq!(PageSelection::Set(vec![3, 1, 3]).to_indices(5), vec![0, 2]);
    }
}
