use image::{Rgba, RgbaImage};

pub(super) const OUTLINE_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);

/// Unfilled outline covering columns `[x0, x1]` over the full image height.
pub(super) fn outline_span(image: &mut RgbaImage, x0: u32, x1: u32, color: Rgba<u8>) {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return;
    }
    let x0 = x0.min(width - 1);
    let x1 = x1.clamp(x0, width - 1);
    for x in x0..=x1 {
        image.put_pixel(x, 0, color);
        image.put_pixel(x, height - 1, color);
    }
    for y in 0..height {
        image.put_pixel(x0, y, color);
        image.put_pixel(x1, y, color);
    }
}

/// Pixel columns spanned by samples `[start, end)` on an axis of `total` samples.
/// Outline columns match the columns of the frames they cover.
pub(super) fn sample_span_to_columns(
    start: u64,
    end: u64,
    total: u64,
    width: u32,
) -> Option<(u32, u32)> {
    if total == 0 || width == 0 || end <= start || start >= total {
        return None;
    }
    let width64 = width as u64;
    let x0 = start * width64 / total;
    let x1 = (end.min(total) * width64)
        .div_ceil(total)
        .saturating_sub(1)
        .max(x0);
    let last = width64 - 1;
    Some((x0.min(last) as u32, x1.min(last) as u32))
}
