use image::{Rgba, RgbaImage};

use super::colormap::ColorRamp;

const GAP: u32 = 4;
const BAR: u32 = 10;
const TICK: u32 = 4;
const MARGIN: u32 = 2;
/// Extra pixel columns the colour bar adds to the right of the spectrogram.
pub const COLORBAR_WIDTH: u32 = GAP + BAR + TICK + MARGIN;

const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const TICK_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Vertical ramp strip starting at column `x`, `value_max` at the top and
/// `value_min` at the bottom, with ticks at both ends and the midpoint.
pub(super) fn draw_colorbar(image: &mut RgbaImage, x: u32, ramp: &ColorRamp) {
    let (width, height) = image.dimensions();
    if height == 0 || x.saturating_add(COLORBAR_WIDTH) > width {
        return;
    }
    for dx in 0..COLORBAR_WIDTH {
        for y in 0..height {
            image.put_pixel(x + dx, y, BACKGROUND);
        }
    }
    let bar_x = x + GAP;
    for y in 0..height {
        let t = if height > 1 {
            1.0 - y as f32 / (height - 1) as f32
        } else {
            0.5
        };
        let color = ramp.sample(t);
        for dx in 0..BAR {
            image.put_pixel(bar_x + dx, y, color);
        }
    }
    let tick_x = bar_x + BAR;
    for y in tick_rows(height) {
        for dx in 0..TICK {
            image.put_pixel(tick_x + dx, y, TICK_COLOR);
        }
    }
}

/// Rows for the top, middle and bottom ticks.
fn tick_rows(height: u32) -> [u32; 3] {
    let last = height.saturating_sub(1);
    [0, last / 2, last]
}
