//! Colour-mapped rasters of a compressed spectrogram.

mod artifact;
mod axis;
mod colormap;
mod error;
mod legend;
mod overlay;

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use image::{Rgba, RgbaImage};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::segments::Segment;
use crate::spectrogram::SpectrogramMatrix;

pub use artifact::write_png_verified;
pub use axis::FrequencyScale;
pub use colormap::{ColorRamp, RAMP_NAMES, lighten};
pub use error::ArtifactError;
pub use legend::COLORBAR_WIDTH;

/// Which ramp to paint with and whether to lighten it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColorConfig {
    #[serde(default = "default_colormap")]
    pub colormap: String,
    /// Sample the ramp from this fraction upwards; `None` keeps the full ramp.
    #[serde(default)]
    pub lighten_floor: Option<f32>,
}

impl Default for ColorConfig {
    fn default() -> Self {
        Self {
            colormap: default_colormap(),
            lighten_floor: None,
        }
    }
}

fn default_colormap() -> String {
    "gray_r".to_string()
}

type RampKey = (String, u32);

/// Paints [`SpectrogramMatrix`] values into RGBA images.
///
/// Derived ramps are cached per `(name, floor)` for the renderer's lifetime.
pub struct Renderer {
    width: Option<u32>,
    height: Option<u32>,
    colorbar: bool,
    ramps: Mutex<HashMap<RampKey, Arc<ColorRamp>>>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new(None, None)
    }
}

impl Renderer {
    /// `None` dimensions use one pixel per matrix cell.
    pub fn new(width: Option<u32>, height: Option<u32>) -> Self {
        Self {
            width: width.filter(|w| *w > 0),
            height: height.filter(|h| *h > 0),
            colorbar: false,
            ramps: Mutex::new(HashMap::new()),
        }
    }

    /// Append a [`COLORBAR_WIDTH`]-pixel colour bar to the right of the plot.
    pub fn with_colorbar(mut self, enabled: bool) -> Self {
        self.colorbar = enabled;
        self
    }

    /// Resolve a ramp by name and optional lighten floor, falling back to
    /// viridis for unknown names.
    pub fn ramp(&self, config: &ColorConfig) -> Arc<ColorRamp> {
        let floor = config
            .lighten_floor
            .filter(|f| f.is_finite())
            .map(|f| f.clamp(0.0, 1.0))
            .unwrap_or(0.0);
        let key = (
            config.colormap.trim().to_ascii_lowercase(),
            (floor * 1000.0).round() as u32,
        );
        let mut cache = self.ramps.lock().unwrap_or_else(|poisoned| {
            warn!("colormap cache lock poisoned; recovering");
            poisoned.into_inner()
        });
        if let Some(ramp) = cache.get(&key) {
            return Arc::clone(ramp);
        }
        let base = match ColorRamp::named(&key.0) {
            Some(ramp) => ramp,
            None => {
                warn!(name = %config.colormap, "unknown colormap, using viridis");
                ColorRamp::fallback()
            }
        };
        let ramp = Arc::new(if key.1 == 0 { base } else { lighten(&base, floor) });
        cache.insert(key, Arc::clone(&ramp));
        ramp
    }

    /// Paint `matrix`, top row highest frequency, with optional segment outlines.
    ///
    /// The configured width covers the plot only; an enabled colour bar widens
    /// the image by [`COLORBAR_WIDTH`].
    pub fn render(
        &self,
        matrix: &SpectrogramMatrix,
        color: &ColorConfig,
        scale: FrequencyScale,
        segments: Option<&[Segment]>,
    ) -> RgbaImage {
        let ramp = self.ramp(color);
        let columns = matrix.columns();
        let width = self.width.unwrap_or(columns.max(1) as u32);
        let height = self.height.unwrap_or(matrix.rows().max(1) as u32);
        let image_width = if self.colorbar {
            width.saturating_add(COLORBAR_WIDTH)
        } else {
            width
        };
        let mut image = RgbaImage::from_pixel(image_width, height, ramp.floor_color());
        if !matrix.is_empty() {
            let rows = axis::row_lookup(&matrix.frequencies, height, scale);
            let cols: Vec<usize> = (0..width)
                .map(|x| ((x as u64 * columns as u64) / width as u64) as usize)
                .collect();
            for (y, &row) in rows.iter().enumerate() {
                for (x, &col) in cols.iter().enumerate() {
                    let value = matrix.values[[row, col.min(columns - 1)]];
                    let color = color_for(&ramp, value, matrix.value_min, matrix.value_max);
                    image.put_pixel(x as u32, y as u32, color);
                }
            }
        }
        if let Some(segments) = segments {
            let total = columns as u64 * matrix.hop_length as u64;
            for segment in segments {
                let span = overlay::sample_span_to_columns(
                    segment.start_sample as u64,
                    segment.end_sample as u64,
                    total,
                    width,
                );
                if let Some((x0, x1)) = span {
                    overlay::outline_span(&mut image, x0, x1, overlay::OUTLINE_COLOR);
                }
            }
        }
        if self.colorbar {
            legend::draw_colorbar(&mut image, width, &ramp);
        }
        image
    }
}

/// Map `value` into the ramp so `min` is the first entry and `max` the last.
fn color_for(ramp: &ColorRamp, value: f32, min: f32, max: f32) -> Rgba<u8> {
    let span = max - min;
    if !value.is_finite() {
        return if value == f32::INFINITY {
            ramp.ceiling_color()
        } else {
            ramp.floor_color()
        };
    }
    if span > 0.0 && span.is_finite() {
        ramp.sample((value - min) / span)
    } else if value <= min {
        ramp.floor_color()
    } else {
        ramp.ceiling_color()
    }
}
