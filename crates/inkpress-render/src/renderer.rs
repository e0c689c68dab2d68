//! Two-pass chapter renderer.
//!
//! Pass 1 walks every source page with the crop detector and scale planner to
//! learn the total output-image count up front (cheap preview renders only).
//! Pass 2 does the expensive full-resolution renders, slices long pages into
//! bands, encodes to WebP, and hands each image to the caller in strict
//! reading order.
//!
//! Everything here is synchronous and CPU-bound; callers are expected to run
//! it on a blocking thread (pdfium wraps a C++ library with thread-local
//! state and must not run on async worker threads).

use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};
use pdfium_render::prelude::*;
use tracing::{debug, info, warn};
use webp::Encoder as WebPEncoder;

use inkpress_core::defaults::{CHUNK_HEIGHT, DPI_MAX, WEBP_MAX_DIM};
use inkpress_core::{Error, RenderSettings, Result};

use crate::crop::detect_margins;
use crate::plan::{plan_page, PagePlan};

/// One encoded output image, in reading order.
#[derive(Debug, Clone)]
pub struct EncodedImage {
    pub bytes: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

/// Events emitted while rendering a chapter.
///
/// `Planned` arrives exactly once, before any `Image`, so the caller can
/// record the expected total before the slow pass begins.
#[derive(Debug)]
pub enum RenderEvent {
    Planned { total: u32 },
    Image(EncodedImage),
}

/// Final counts returned once the chapter is fully rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderSummary {
    /// Images actually emitted.
    pub emitted: u32,
    /// Images planned in pass 1.
    pub total: u32,
}

/// Render every page of a chapter PDF into ordered WebP images.
///
/// `emit` receives a `Planned` event followed by one `Image` event per output
/// image; an error returned from the sink aborts the render and propagates.
pub fn render_chapter(
    pdf_path: &Path,
    settings: &RenderSettings,
    emit: &mut dyn FnMut(RenderEvent) -> Result<()>,
) -> Result<RenderSummary> {
    let pdfium = Pdfium::default();
    let document = pdfium
        .load_pdf_from_file(pdf_path, None)
        .map_err(|e| Error::Pdf(format!("failed to open {}: {e:?}", pdf_path.display())))?;

    let pages = document.pages();
    let source_pages = pages.len();
    info!(
        subsystem = "render",
        op = "plan",
        source_pages,
        "PDF loaded"
    );

    // Pass 1: plan every page.
    let mut plans: Vec<PagePlan> = Vec::with_capacity(source_pages as usize);
    let mut total: u32 = 0;
    for idx in 0..source_pages {
        let page = pages
            .get(idx)
            .map_err(|e| Error::Pdf(format!("page {}: {e:?}", idx + 1)))?;
        let width_pt = page.width().value;
        let height_pt = page.height().value;

        let margins = detect_margins(&page, width_pt)?;
        let plan = plan_page(
            idx,
            width_pt,
            height_pt,
            margins,
            settings.max_width,
            settings.dpi,
            DPI_MAX,
            settings.split_long_pages,
        );
        debug!(
            subsystem = "render",
            op = "plan",
            page = idx + 1,
            scale = plan.scale,
            pieces = plan.piece_count,
            crop_left_pt = margins.left_pt,
            crop_right_pt = margins.right_pt,
            "Planned page"
        );
        total += plan.piece_count;
        plans.push(plan);
    }

    emit(RenderEvent::Planned { total })?;

    // Pass 2: render, crop, slice, encode.
    let mut emitted: u32 = 0;
    for plan in &plans {
        let page = pages
            .get(plan.page_index)
            .map_err(|e| Error::Pdf(format!("page {}: {e:?}", plan.page_index + 1)))?;
        let width_pt = page.width().value;

        let target_px = (width_pt * plan.scale).round().max(1.0) as i32;
        let config = PdfRenderConfig::new().set_target_width(target_px);
        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| Error::Pdf(format!("render page {}: {e:?}", plan.page_index + 1)))?;
        let image = bitmap.as_image();

        let cropped = apply_crop(
            image,
            width_pt,
            plan.margins.left_pt,
            plan.margins.right_pt,
        );
        let clamped = clamp_to_codec(cropped, plan.piece_count == 1);

        let bands = band_ranges(clamped.height(), plan.piece_count == 1);
        if bands.len() as u32 != plan.piece_count {
            // Estimation drift between the planned and rendered geometry.
            warn!(
                subsystem = "render",
                op = "slice",
                page = plan.page_index + 1,
                planned = plan.piece_count,
                actual = bands.len(),
                "Band count differs from plan"
            );
        }

        for (y, height) in bands {
            let band = clamped.crop_imm(0, y, clamped.width(), height);
            let encoded = encode_webp(&band.to_rgb8(), settings.quality)?;
            emit(RenderEvent::Image(encoded))?;
            emitted += 1;
        }
    }

    info!(
        subsystem = "render",
        op = "render",
        emitted,
        planned = total,
        "Chapter rendered"
    );
    Ok(RenderSummary { emitted, total })
}

/// Trim the detected left/right margins, converted back into pixels via the
/// scale the render actually used.
fn apply_crop(image: DynamicImage, page_width_pt: f32, left_pt: f32, right_pt: f32) -> DynamicImage {
    let width = image.width();
    if width == 0 || page_width_pt <= 0.0 || (left_pt <= 0.0 && right_pt <= 0.0) {
        return image;
    }
    let scale = width as f32 / page_width_pt;
    let left_px = (left_pt * scale).round() as u32;
    let right_px = (right_pt * scale).round() as u32;
    if left_px + right_px >= width {
        return image;
    }
    image.crop_imm(left_px, 0, width - left_px - right_px, image.height())
}

/// Dimensions after the codec-ceiling safety clamp, preserving aspect ratio.
/// Never upscales.
fn clamp_dimensions(width: u32, height: u32, clamp_height: bool) -> (u32, u32) {
    let mut ratio: f32 = 1.0;
    if width > WEBP_MAX_DIM {
        ratio = ratio.min(WEBP_MAX_DIM as f32 / width as f32);
    }
    if clamp_height && height > WEBP_MAX_DIM {
        ratio = ratio.min(WEBP_MAX_DIM as f32 / height as f32);
    }
    if ratio >= 1.0 {
        return (width, height);
    }
    (
        ((width as f32 * ratio) as u32).max(1),
        ((height as f32 * ratio) as u32).max(1),
    )
}

/// Uniformly downscale a rendered image that still exceeds the codec ceiling.
fn clamp_to_codec(image: DynamicImage, clamp_height: bool) -> DynamicImage {
    let (w, h) = clamp_dimensions(image.width(), image.height(), clamp_height);
    if (w, h) == (image.width(), image.height()) {
        return image;
    }
    debug!(
        subsystem = "render",
        op = "clamp",
        from_width = image.width(),
        from_height = image.height(),
        to_width = w,
        to_height = h,
        "Downscaling to codec ceiling"
    );
    image.resize_exact(w, h, FilterType::Lanczos3)
}

/// Top-to-bottom `(y, height)` bands of at most [`CHUNK_HEIGHT`] pixels.
///
/// Unsplit pages are always emitted whole: the planner's scale cap and the
/// codec clamp have already bounded their height, which may legally exceed
/// one band (up to [`WEBP_MAX_DIM`]).
fn band_ranges(height: u32, single_image: bool) -> Vec<(u32, u32)> {
    if single_image || height <= CHUNK_HEIGHT {
        return vec![(0, height.max(1))];
    }
    let mut bands = Vec::new();
    let mut y = 0;
    while y < height {
        let band_height = (height - y).min(CHUNK_HEIGHT);
        bands.push((y, band_height));
        y += band_height;
    }
    bands
}

/// Lossy WebP encode at the configured quality.
fn encode_webp(image: &RgbImage, quality: i32) -> Result<EncodedImage> {
    let (width, height) = image.dimensions();
    if width > WEBP_MAX_DIM || height > WEBP_MAX_DIM {
        return Err(Error::Image(format!(
            "image {width}x{height} exceeds WebP limit {WEBP_MAX_DIM}"
        )));
    }
    let encoder = WebPEncoder::from_rgb(image.as_raw(), width, height);
    let bytes = encoder.encode(quality as f32).to_vec();
    Ok(EncodedImage {
        bytes,
        width,
        height,
    })
}
