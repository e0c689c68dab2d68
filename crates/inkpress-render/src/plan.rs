//! Render scale planning.
//!
//! Pure geometry: given a page's post-crop content width, its height, and the
//! configured targets, pick the render scale and (when splitting is allowed)
//! the number of output bands. All decisions here exist to honor the WebP
//! single-dimension ceiling without visible quality loss.

use inkpress_core::defaults::{CHUNK_HEIGHT, RENDER_SCALE_MIN, WEBP_MAX_DIM};

use crate::crop::CropMargins;

/// Per-page render plan produced in pass 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PagePlan {
    /// Source page index within the document.
    pub page_index: u16,
    pub margins: CropMargins,
    /// Render scale (output px per document point).
    pub scale: f32,
    /// Number of output images this page produces (>= 1).
    pub piece_count: u32,
}

/// Compute the render scale for one page.
///
/// The scale starts from whichever is larger of the target-width requirement
/// and the minimum DPI, is capped by the maximum DPI and by the codec ceiling
/// on content width (and, for unsplit pages, on page height), and never drops
/// below [`RENDER_SCALE_MIN`].
pub fn plan_scale(
    content_width_pt: f32,
    page_height_pt: f32,
    target_width_px: i32,
    min_dpi: i32,
    max_dpi: i32,
    single_image: bool,
) -> f32 {
    let content_width_pt = content_width_pt.max(1.0);
    let page_height_pt = page_height_pt.max(1.0);

    let mut scale = (target_width_px as f32 / content_width_pt).max(min_dpi as f32 / 72.0);
    scale = scale.min(max_dpi as f32 / 72.0);
    scale = scale.min(WEBP_MAX_DIM as f32 / content_width_pt);
    if single_image {
        scale = scale.min(WEBP_MAX_DIM as f32 / page_height_pt);
    }
    scale.max(RENDER_SCALE_MIN)
}

/// Number of output images a page produces at the given scale.
pub fn piece_count(page_height_pt: f32, scale: f32, single_image: bool) -> u32 {
    if single_image {
        return 1;
    }
    let out_height = page_height_pt.max(1.0) * scale;
    ((out_height / CHUNK_HEIGHT as f32).ceil() as u32).max(1)
}

/// Build the full plan for one source page.
pub fn plan_page(
    page_index: u16,
    page_width_pt: f32,
    page_height_pt: f32,
    margins: CropMargins,
    target_width_px: i32,
    min_dpi: i32,
    max_dpi: i32,
    split_long_pages: bool,
) -> PagePlan {
    let content_width_pt = (page_width_pt - margins.left_pt - margins.right_pt).max(1.0);
    let single_image = !split_long_pages;
    let scale = plan_scale(
        content_width_pt,
        page_height_pt,
        target_width_px,
        min_dpi,
        max_dpi,
        single_image,
    );
    PagePlan {
        page_index,
        margins,
        scale,
        piece_count: piece_count(page_height_pt, scale, single_image),
    }
}
