//! Content-aware horizontal margin detection.
//!
//! A cheap low-resolution preview render is scanned for non-white pixels; the
//! left/right whitespace margins around the detected content box are trimmed
//! before final scaling. Only horizontal margins are ever cropped: manga
//! content flows vertically, and top/bottom whitespace is part of the reading
//! rhythm.

use image::GrayImage;
use pdfium_render::prelude::*;

use inkpress_core::defaults::{
    CROP_MAX_CONTENT_RATIO, CROP_MIN_CONTENT_RATIO, CROP_PAD_PX, CROP_WHITE_THRESHOLD,
    PREVIEW_SCALE_MAX, PREVIEW_SCALE_MIN, PREVIEW_TARGET_WIDTH,
};
use inkpress_core::{Error, Result};

/// Detected horizontal margins in document units (points), both >= 0.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CropMargins {
    pub left_pt: f32,
    pub right_pt: f32,
}

impl CropMargins {
    /// No trimming.
    pub const NONE: CropMargins = CropMargins {
        left_pt: 0.0,
        right_pt: 0.0,
    };
}

/// Preview render scale for a page of the given width.
pub fn preview_scale(page_width_pt: f32) -> f32 {
    (PREVIEW_TARGET_WIDTH / page_width_pt).clamp(PREVIEW_SCALE_MIN, PREVIEW_SCALE_MAX)
}

/// Inclusive column range `(min_x, max_x)` containing content pixels, or
/// `None` for a blank image.
///
/// A pixel is content when its luma differs from solid white by more than
/// [`CROP_WHITE_THRESHOLD`].
pub fn content_span(gray: &GrayImage) -> Option<(u32, u32)> {
    let threshold = 255 - CROP_WHITE_THRESHOLD;
    let mut min_x = None;
    let mut max_x = None;

    for (x, _, pixel) in gray.enumerate_pixels() {
        if pixel.0[0] < threshold {
            min_x = Some(min_x.map_or(x, |m: u32| m.min(x)));
            max_x = Some(max_x.map_or(x, |m: u32| m.max(x)));
        }
    }
    min_x.zip(max_x)
}

/// Convert a detected content span into pixel edge margins.
///
/// The span is padded outward by [`CROP_PAD_PX`] so content is never clipped.
/// Returns `(0, 0)` when:
/// - no span was found (blank page);
/// - the padded content is narrower than [`CROP_MIN_CONTENT_RATIO`] of the
///   page (detection failure on sparse content);
/// - the padded content is wider than [`CROP_MAX_CONTENT_RATIO`] of the page
///   (margins too thin to be worth trimming).
pub fn span_to_margins(span: Option<(u32, u32)>, width_px: u32) -> (u32, u32) {
    let Some((min_x, max_x)) = span else {
        return (0, 0);
    };
    if width_px == 0 {
        return (0, 0);
    }

    let left = min_x.saturating_sub(CROP_PAD_PX);
    let right = (width_px - 1 - max_x).saturating_sub(CROP_PAD_PX);
    let content_px = width_px - left - right;

    let ratio = content_px as f32 / width_px as f32;
    if ratio <= CROP_MIN_CONTENT_RATIO || ratio >= CROP_MAX_CONTENT_RATIO {
        return (0, 0);
    }
    (left, right)
}

/// Detect crop margins for one source page from a cheap preview render.
pub fn detect_margins(page: &PdfPage, page_width_pt: f32) -> Result<CropMargins> {
    if page_width_pt <= 0.0 {
        return Ok(CropMargins::NONE);
    }

    let scale = preview_scale(page_width_pt);
    let preview_px = (page_width_pt * scale).round().max(1.0) as i32;

    let config = PdfRenderConfig::new().set_target_width(preview_px);
    let bitmap = page
        .render_with_config(&config)
        .map_err(|e| Error::Pdf(format!("preview render failed: {e:?}")))?;
    let gray = bitmap.as_image().to_luma8();

    let (left_px, right_px) = span_to_margins(content_span(&gray), gray.width());

    // Pixel offsets back to document units via the actual preview scale,
    // which can differ slightly from the requested one after rounding.
    let actual_scale = gray.width() as f32 / page_width_pt;
    Ok(CropMargins {
        left_pt: left_px as f32 / actual_scale,
        right_pt: right_px as f32 / actual_scale,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn blank(width: u32, height: u32) -> GrayImage {
        GrayImage::from_pixel(width, height, Luma([255u8]))
    }

    /// Page with a solid content block spanning columns [from, to).
    fn with_content(width: u32, from: u32, to: u32) -> GrayImage {
        let mut img = blank(width, 100);
        for y in 0..100 {
            for x in from..to {
                img.put_pixel(x, y, Luma([0u8]));
            }
        }
        img
    }

    #[test]
    fn test_content_span_all_white_is_none() {
        assert_eq!(content_span(&blank(700, 100)), None);
    }

    #[test]
    fn test_content_span_finds_block() {
        let img = with_content(700, 200, 500);
        assert_eq!(content_span(&img), Some((200, 499)));
    }

    #[test]
    fn test_content_span_ignores_near_white_noise() {
        let mut img = blank(700, 100);
        // 240 is within the white threshold (255 - 18 = 237 cutoff)
        img.put_pixel(10, 10, Luma([240u8]));
        assert_eq!(content_span(&img), None);
        img.put_pixel(10, 10, Luma([230u8]));
        assert_eq!(content_span(&img), Some((10, 10)));
    }

    #[test]
    fn test_blank_page_no_margins() {
        assert_eq!(span_to_margins(None, 700), (0, 0));
    }

    #[test]
    fn test_centered_content_gets_padded_margins() {
        // Content spans columns 200..500: 300 px of 700 ≈ 43% of width,
        // inside the (35%, 65%) trim window.
        let img = with_content(700, 200, 500);
        let (l, r) = span_to_margins(content_span(&img), 700);
        assert_eq!(l, 200 - CROP_PAD_PX);
        assert_eq!(r, (700 - 500) - CROP_PAD_PX);
    }

    #[test]
    fn test_wide_content_is_not_cropped() {
        // Content spans 65% of the width: margins too thin to matter.
        let img = with_content(1000, 150, 800);
        assert_eq!(span_to_margins(content_span(&img), 1000), (0, 0));
    }

    #[test]
    fn test_sparse_content_is_not_trusted() {
        // Content spans 20% of the width: likely a detection failure.
        let img = with_content(1000, 400, 600);
        assert_eq!(span_to_margins(content_span(&img), 1000), (0, 0));
    }

    #[test]
    fn test_content_at_edge_does_not_underflow() {
        let img = with_content(700, 0, 350);
        let (l, _r) = span_to_margins(content_span(&img), 700);
        assert_eq!(l, 0);
    }

    #[test]
    fn test_preview_scale_clamps() {
        // 700 / 350 = 2.0 exactly at the upper clamp
        assert_eq!(preview_scale(350.0), 2.0);
        // Tiny page would need >2.0, clamped
        assert_eq!(preview_scale(100.0), 2.0);
        // Huge page would need <0.2, clamped
        assert_eq!(preview_scale(10_000.0), 0.2);
        // Typical page sits inside the clamp range
        let s = preview_scale(600.0);
        assert!((s - 700.0 / 600.0).abs() < 1e-6);
    }
}
