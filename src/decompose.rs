//! Decomposition entry points.
//!
//! [`decompose_page`] is the per-page function: page content and
//! configuration in, ordered blocks and warnings out. It never touches
//! pdfium directly; rendering goes through a [`RegionRenderer`].
//!
//! [`Decomposer`] owns the pdfium binding. [`Decomposer::open`] yields an
//! [`OpenDocument`] whose [`OpenDocument::pages`] iterator decomposes one
//! selected page per `next()`; dropping the iterator stops the run before
//! the next page. [`decompose`] is the eager wrapper that collects every
//! page and computes [`DecomposeStats`].

use crate::config::{DecomposeConfig, PageSelection};
use crate::error::{DecomposeError, PageWarning};
use crate::geometry::BBox;
use crate::output::{
    Block, DecomposeStats, DecomposedDocument, ImageBlock, Page, RasterStatus, TextBlock,
};
use crate::pipeline::cluster::cluster_fragments;
use crate::pipeline::encode::{self, PNG_MIME};
use crate::pipeline::extract::{extract_page, PageContent, TextRun};
use crate::pipeline::input;
use crate::pipeline::order::reading_order;
use crate::pipeline::overlap::{self, ImageCandidate};
use crate::pipeline::render::{bind_pdfium, PdfiumPageRenderer, RegionRenderer};
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Decompose one page's extracted content into ordered blocks.
///
/// Never fails: a region that cannot be rendered becomes a placeholder
/// [`ImageBlock`] with [`RasterStatus::Failed`] and a
/// [`PageWarning::RasterizationFailure`] on the returned page.
pub fn decompose_page(
    content: &PageContent,
    config: &DecomposeConfig,
    renderer: &mut dyn RegionRenderer,
) -> Page {
    decompose_page_within(content, config, renderer, None)
}

/// [`decompose_page`] with at most `image_budget` image blocks, on top of
/// `max_images_per_page`.
///
/// Used to enforce `max_images_total` across a document: the largest
/// regions are kept and the fragments of dropped ones count as discarded.
pub fn decompose_page_within(
    content: &PageContent,
    config: &DecomposeConfig,
    renderer: &mut dyn RegionRenderer,
    image_budget: Option<usize>,
) -> Page {
    let page_num = content.index + 1;
    let (width, height) = (content.width, content.height);

    // ── Step 1: Cluster fragments that are visible on the page ───────────
    let (fragment_ids, off_page): (Vec<usize>, Vec<usize>) = (0..content.fragments.len())
        .partition(|&i| touches_page(&content.fragments[i].bbox, width, height));
    let fragment_boxes: Vec<BBox> = fragment_ids
        .iter()
        .map(|&i| content.fragments[i].bbox)
        .collect();

    let raster_ids = overlap::eligible_rasters(&content.rasters, width, height, config.min_raster_area);
    let raster_boxes: Vec<BBox> = raster_ids.iter().map(|&i| content.rasters[i].bbox).collect();

    let clustering = cluster_fragments(&fragment_boxes, &raster_boxes, config);
    let mut accounting = clustering.accounting;
    accounting.total += off_page.len();
    accounting.discarded += off_page.len();

    // ── Step 2: Merge rasters and clusters into image regions ────────────
    let candidates = overlap::build_candidates(
        content,
        &raster_ids,
        &fragment_ids,
        &clustering,
        config,
        &mut accounting,
    );
    let candidates = overlap::merge_candidates(candidates, config.image_overlap_tolerance);
    let limit = match (config.max_images_per_page, image_budget) {
        (Some(page), Some(budget)) => Some(page.min(budget)),
        (page, budget) => page.or(budget),
    };
    let candidates = overlap::cap_images(candidates, limit, &mut accounting);

    // ── Step 3: Drop text that sits inside an image ──────────────────────
    let texts: Vec<TextRun> = content
        .text_runs
        .iter()
        .filter(|run| touches_page(&run.bbox, width, height))
        .map(|run| TextRun {
            bbox: run.bbox.clamp_to(width, height),
            ..run.clone()
        })
        .collect();
    let image_boxes: Vec<BBox> = candidates.iter().map(|c| c.bbox).collect();
    let (kept_texts, suppressed) = overlap::partition_text(
        &texts,
        &image_boxes,
        config.text_image_overlap_tolerance,
        config.text_overlap_policy,
    );

    // ── Step 4: Render every image region once ───────────────────────────
    let mut images: Vec<(ImageBlock, usize, Option<String>)> = Vec::with_capacity(candidates.len());
    for candidate in &candidates {
        let (block, failure) = render_candidate(candidate, config, renderer);
        images.push((block, candidate.seq, failure));
    }

    // ── Step 5: Reading order ────────────────────────────────────────────
    let pending: Vec<(Block, usize, Option<String>)> = kept_texts
        .into_iter()
        .map(|run| {
            let block = Block::Text(TextBlock {
                bbox: run.bbox,
                text: run.text.clone(),
            });
            (block, run.seq, None)
        })
        .chain(
            images
                .into_iter()
                .map(|(img, seq, failure)| (Block::Image(img), seq, failure)),
        )
        .collect();

    let keys: Vec<(BBox, usize)> = pending.iter().map(|(b, seq, _)| (*b.bbox(), *seq)).collect();
    let order = reading_order(&keys);

    let mut slots: Vec<Option<(Block, usize, Option<String>)>> = pending.into_iter().map(Some).collect();
    let mut blocks = Vec::with_capacity(slots.len());
    let mut warnings = Vec::new();
    for idx in order {
        if let Some((block, _, failure)) = slots[idx].take() {
            if let Some(detail) = failure {
                let warning = PageWarning::RasterizationFailure {
                    page: page_num,
                    block: blocks.len(),
                    detail,
                };
                warn!("{}", warning);
                warnings.push(warning);
            }
            blocks.push(block);
        }
    }

    debug!(
        "Page {}: {} blocks ({} images, {} text suppressed), fragments {}/{}/{} of {}",
        page_num,
        blocks.len(),
        image_boxes.len(),
        suppressed,
        accounting.clustered,
        accounting.anchored,
        accounting.discarded,
        accounting.total
    );

    Page {
        index: content.index,
        width,
        height,
        blocks,
        warnings,
        fragments: accounting,
    }
}

/// Render, downscale and encode one region.
fn render_candidate(
    candidate: &ImageCandidate,
    config: &DecomposeConfig,
    renderer: &mut dyn RegionRenderer,
) -> (ImageBlock, Option<String>) {
    let mut block = ImageBlock {
        bbox: candidate.bbox,
        data: Vec::new(),
        mime_type: PNG_MIME.to_string(),
        width_px: 0,
        height_px: 0,
        dpi: config.raster_dpi,
        origin: candidate.origin(),
        fragment_count: candidate.fragments.len(),
        raster_count: candidate.rasters.len(),
        status: RasterStatus::Rendered,
    };

    let encoded = renderer
        .render_region(&candidate.bbox, config.raster_dpi)
        .and_then(|region| {
            let image = match config.max_image_dim {
                Some(max) => encode::downscale(region.image, max),
                None => region.image,
            };
            let bytes = encode::encode_png(&image).map_err(|e| format!("PNG encoding failed: {e}"))?;
            Ok((bytes, image.width(), image.height(), region.dpi))
        });

    match encoded {
        Ok((bytes, w, h, dpi)) => {
            block.data = bytes;
            block.width_px = w;
            block.height_px = h;
            block.dpi = dpi;
            (block, None)
        }
        Err(reason) => {
            block.status = RasterStatus::Failed {
                reason: reason.clone(),
            };
            (block, Some(reason))
        }
    }
}

/// True when `bbox` reaches inside the page; a box that only meets an edge
/// has nothing visible.
fn touches_page(bbox: &BBox, width: f32, height: f32) -> bool {
    bbox.right > 0.0 && bbox.left < width && bbox.bottom > 0.0 && bbox.top < height
}

/// Owns the pdfium binding and opens documents.
pub struct Decomposer {
    pdfium: Pdfium,
}

impl Decomposer {
    /// Bind pdfium (`PDFIUM_LIB_PATH`, then `./`, then the system library).
    pub fn new() -> Result<Self, DecomposeError> {
        Ok(Self {
            pdfium: bind_pdfium()?,
        })
    }

    /// Use an already bound pdfium instance.
    pub fn from_pdfium(pdfium: Pdfium) -> Self {
        Self { pdfium }
    }

    /// Open a PDF file for page-by-page decomposition.
    pub fn open<'a>(
        &'a self,
        path: &Path,
        config: &'a DecomposeConfig,
    ) -> Result<OpenDocument<'a>, DecomposeError> {
        config.validate()?;
        let path = input::validate_pdf_path(path)?;
        let password = config.password.as_deref();

        let document = self
            .pdfium
            .load_pdf_from_file(&path, password)
            .map_err(|e| load_error(&path, password, e))?;

        OpenDocument::new(document, config, path)
    }

    /// Open an in-memory PDF.
    pub fn open_bytes<'a>(
        &'a self,
        bytes: &'a [u8],
        config: &'a DecomposeConfig,
    ) -> Result<OpenDocument<'a>, DecomposeError> {
        config.validate()?;
        let label = PathBuf::from("<memory>");
        input::validate_pdf_bytes(bytes, &label)?;
        let password = config.password.as_deref();

        let document = self
            .pdfium
            .load_pdf_from_byte_slice(bytes, password)
            .map_err(|e| load_error(&label, password, e))?;

        OpenDocument::new(document, config, label)
    }

    /// Decompose every selected page of `path`.
    pub fn decompose(
        &self,
        path: &Path,
        config: &DecomposeConfig,
    ) -> Result<DecomposedDocument, DecomposeError> {
        let start = Instant::now();
        info!("Starting decomposition: {}", path.display());
        let document = self.open(path, config)?;
        Ok(document.collect(start))
    }

    /// Decompose every selected page of an in-memory PDF.
    pub fn decompose_bytes(
        &self,
        bytes: &[u8],
        config: &DecomposeConfig,
    ) -> Result<DecomposedDocument, DecomposeError> {
        let start = Instant::now();
        info!("Starting decomposition of {} in-memory bytes", bytes.len());
        let document = self.open_bytes(bytes, config)?;
        Ok(document.collect(start))
    }
}

fn load_error(path: &Path, password: Option<&str>, e: PdfiumError) -> DecomposeError {
    let err_str = format!("{:?}", e);
    if err_str.contains("Password") || err_str.contains("password") {
        if password.is_some() {
            DecomposeError::WrongPassword {
                path: path.to_path_buf(),
            }
        } else {
            DecomposeError::PasswordRequired {
                path: path.to_path_buf(),
            }
        }
    } else {
        DecomposeError::CorruptPdf {
            path: path.to_path_buf(),
            detail: err_str,
        }
    }
}

/// A loaded document with its page selection resolved.
pub struct OpenDocument<'a> {
    document: PdfDocument<'a>,
    config: &'a DecomposeConfig,
    source: PathBuf,
    page_count: usize,
    selected: Vec<usize>,
}

impl<'a> OpenDocument<'a> {
    fn new(
        document: PdfDocument<'a>,
        config: &'a DecomposeConfig,
        source: PathBuf,
    ) -> Result<Self, DecomposeError> {
        let page_count = document.pages().len() as usize;
        let selected = config.pages.to_indices(page_count);
        if selected.is_empty() && config.pages != PageSelection::All {
            return Err(DecomposeError::PageOutOfRange {
                page: first_requested(&config.pages),
                total: page_count,
            });
        }
        info!(
            "PDF loaded: {} pages, {} selected",
            page_count,
            selected.len()
        );
        Ok(Self {
            document,
            config,
            source,
            page_count,
            selected,
        })
    }

    /// Total pages in the document.
    pub fn page_count(&self) -> usize {
        self.page_count
    }

    /// 0-based indices of the pages that will be decomposed.
    pub fn selected(&self) -> &[usize] {
        &self.selected
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    /// Decompose a single page by 0-based index.
    ///
    /// A page that cannot be loaded or parsed comes back empty with a
    /// [`PageWarning::PageParseFailure`]. `max_images_total` spans a whole
    /// run and is applied by [`OpenDocument::pages`], not here.
    pub fn decompose_page_at(&self, index: usize) -> Page {
        self.decompose_page_budgeted(index, None)
    }

    fn decompose_page_budgeted(&self, index: usize, image_budget: Option<usize>) -> Page {
        let page_num = index + 1;
        let parse_failure = |detail: String, width: f32, height: f32| {
            let warning = PageWarning::PageParseFailure {
                page: page_num,
                detail,
            };
            warn!("{}", warning);
            Page::empty(index, width, height, warning)
        };

        let page_index = match PdfPageIndex::try_from(index) {
            Ok(i) => i,
            Err(_) => return parse_failure(format!("page index {index} exceeds pdfium's range"), 0.0, 0.0),
        };
        let page = match self.document.pages().get(page_index) {
            Ok(p) => p,
            Err(e) => return parse_failure(format!("{e:?}"), 0.0, 0.0),
        };
        let (width, height) = (page.width().value, page.height().value);

        let content = match extract_page(&page, index) {
            Ok(c) => c,
            Err(detail) => return parse_failure(detail, width, height),
        };

        let mut renderer = PdfiumPageRenderer::new(page, self.config.max_rendered_pixels);
        decompose_page_within(&content, self.config, &mut renderer, image_budget)
    }

    /// Lazily decompose the selected pages in page-index order.
    pub fn pages(&self) -> Pages<'_, 'a> {
        Pages {
            document: self,
            position: 0,
            warnings: 0,
            images_left: self.config.max_images_total,
            started: false,
            finished: false,
        }
    }

    fn collect(&self, start: Instant) -> DecomposedDocument {
        let mut stats = DecomposeStats {
            total_pages: self.page_count,
            ..Default::default()
        };
        let mut pages = Vec::with_capacity(self.selected.len());
        for page in self.pages() {
            stats.record_page(&page);
            pages.push(page);
        }
        stats.duration_ms = start.elapsed().as_millis() as u64;

        info!(
            "Decomposition complete: {}/{} pages, {} text blocks, {} images ({} failed), {}ms",
            stats.decomposed_pages,
            self.selected.len(),
            stats.text_blocks,
            stats.image_blocks,
            stats.failed_images,
            stats.duration_ms
        );

        DecomposedDocument {
            source: self.source.clone(),
            page_count: self.page_count,
            pages,
            stats,
        }
    }
}

/// Iterator over decomposed pages; see [`OpenDocument::pages`].
pub struct Pages<'d, 'a> {
    document: &'d OpenDocument<'a>,
    position: usize,
    warnings: usize,
    images_left: Option<usize>,
    started: bool,
    finished: bool,
}

impl Iterator for Pages<'_, '_> {
    type Item = Page;

    fn next(&mut self) -> Option<Page> {
        let document = self.document;
        let total = document.selected.len();
        let callback = document.config.progress_callback.as_ref();

        if !self.started {
            self.started = true;
            if let Some(cb) = callback {
                cb.on_document_start(total);
            }
        }

        let Some(&index) = document.selected.get(self.position) else {
            if !self.finished {
                self.finished = true;
                if let Some(cb) = callback {
                    cb.on_document_complete(total, self.warnings);
                }
            }
            return None;
        };
        self.position += 1;

        if let Some(cb) = callback {
            cb.on_page_start(index + 1, total);
        }
        let started = Instant::now();
        let page = document.decompose_page_budgeted(index, self.images_left);
        if let Some(left) = self.images_left.as_mut() {
            *left = left.saturating_sub(page.images().count());
        }
        debug!("Page {} decomposed in {}ms", index + 1, started.elapsed().as_millis());

        self.warnings += page.warnings.len();
        if let Some(cb) = callback {
            for warning in &page.warnings {
                cb.on_page_warning(index + 1, warning);
            }
            cb.on_page_complete(index + 1, total, page.texts().count(), page.images().count());
        }
        Some(page)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.document.selected.len().saturating_sub(self.position);
        (left, Some(left))
    }
}

fn first_requested(selection: &PageSelection) -> usize {
    match selection {
        PageSelection::All => 0,
        PageSelection::Single(p) => *p,
        PageSelection::Range(start, _) => *start,
        PageSelection::Set(pages) => pages.first().copied().unwrap_or(0),
    }
}

/// Decompose a PDF file with a freshly bound pdfium.
///
/// Returns `Err` only for fatal problems: unreadable document, invalid
/// configuration, a page selection matching nothing, or a missing pdfium
/// library. Page and image failures are reported as warnings on the pages.
///
/// # Example
/// ```rust,no_run
/// use pdf_decomposer::{decompose, DecomposeConfig};
///
/// let doc = decompose("report.pdf", &DecomposeConfig::default())?;
/// for page in &doc.pages {
///     println!("page {}: {} blocks", page.number(), page.blocks.len());
/// }
/// # Ok::<(), pdf_decomposer::DecomposeError>(())
/// ```
pub fn decompose(
    path: impl AsRef<Path>,
    config: &DecomposeConfig,
) -> Result<DecomposedDocument, DecomposeError> {
    Decomposer::new()?.decompose(path.as_ref(), config)
}

/// Decompose PDF bytes held in memory.
pub fn decompose_bytes(
    bytes: &[u8],
    config: &DecomposeConfig,
) -> Result<DecomposedDocument, DecomposeError> {
    Decomposer::new()?.decompose_bytes(bytes, config)
}

/// Write every rendered image of `doc` into `dir` as
/// `{stem}.page-NNN.{img|vector|merged}-NNN.png`, numbering each origin
/// across the whole document.
///
/// Failed placeholders are skipped. Each file is written to a temporary
/// name and renamed, so a crash never leaves a truncated PNG behind.
pub fn export_images(
    doc: &DecomposedDocument,
    dir: &Path,
    stem: &str,
) -> Result<Vec<PathBuf>, DecomposeError> {
    std::fs::create_dir_all(dir).map_err(|e| DecomposeError::OutputWriteFailed {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut written = Vec::new();
    let mut counters = [0usize; 3];
    for page in &doc.pages {
        for image in page.images().filter(|i| !i.is_failed()) {
            let counter = &mut counters[image.origin as usize];
            *counter += 1;
            let path = dir.join(format!(
                "{stem}.page-{:03}.{}-{:03}.png",
                page.number(),
                image.origin.label(),
                *counter
            ));
            let tmp_path = path.with_extension("png.tmp");
            std::fs::write(&tmp_path, &image.data)
                .and_then(|_| std::fs::rename(&tmp_path, &path))
                .map_err(|e| DecomposeError::OutputWriteFailed {
                    path: path.clone(),
                    source: e,
                })?;
            written.push(path);
        }
    }
    debug!("Exported {} images to {}", written.len(), dir.display());
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::{FragmentAccounting, ImageOrigin};

    #[test]
    fn touches_page_excludes_edges() {
        assert!(!touches_page(&BBox::new(0.0, 0.0, 0.0, 10.0), 100.0, 100.0));
        assert!(!touches_page(&BBox::new(100.0, 50.0, 120.0, 60.0), 100.0, 100.0));
        assert!(!touches_page(&BBox::new(-50.0, 10.0, 0.0, 60.0), 100.0, 100.0));
        assert!(touches_page(&BBox::new(99.0, 50.0, 120.0, 60.0), 100.0, 100.0));
        assert!(touches_page(&BBox::new(50.0, 0.0, 50.0, 10.0), 100.0, 100.0));
        assert!(!touches_page(&BBox::new(101.0, 50.0, 120.0, 60.0), 100.0, 100.0));
        assert!(!touches_page(&BBox::new(0.0, -20.0, 10.0, -1.0), 100.0, 100.0));
    }

    #[test]
    fn first_requested_page() {
        assert_eq!(first_requested(&PageSelection::Single(9)), 9);
        assert_eq!(first_requested(&PageSelection::Range(4, 8)), 4);
        assert_eq!(first_requested(&PageSelection::Set(vec![7, 2])), 7);
    }

    #[test]
    fn export_skips_failed_images() {
        let image = |origin, status| ImageBlock {
            bbox: BBox::new(0.0, 0.0, 10.0, 10.0),
            data: vec![1, 2, 3],
            mime_type: PNG_MIME.into(),
            width_px: 1,
            height_px: 1,
            dpi: 144.0,
            origin,
            fragment_count: 0,
            raster_count: 1,
            status,
        };
        let doc = DecomposedDocument {
            source: PathBuf::from("a.pdf"),
            page_count: 1,
            pages: vec![Page {
                index: 1,
                width: 100.0,
                height: 100.0,
                blocks: vec![
                    Block::Image(image(ImageOrigin::Embedded, RasterStatus::Rendered)),
                    Block::Image(image(
                        ImageOrigin::Vector,
                        RasterStatus::Failed {
                            reason: "x".into(),
                        },
                    )),
                    Block::Image(image(ImageOrigin::Vector, RasterStatus::Rendered)),
                    Block::Image(image(ImageOrigin::Embedded, RasterStatus::Rendered)),
                ],
                warnings: vec![],
                fragments: FragmentAccounting::default(),
            }],
            stats: DecomposeStats::default(),
        };

        let dir = tempfile::tempdir().unwrap();
        let written = export_images(&doc, dir.path(), "a").unwrap();
        let names: Vec<&str> = written
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap())
            .collect();
        assert_eq!(
            names,
            vec![
                "a.page-002.img-001.png",
                "a.page-002.vector-001.png",
                "a.page-002.img-002.png"
            ]
        );
        assert_eq!(std::fs::read(&written[0]).unwrap(), vec![1, 2, 3]);
    }
}
