//! Numeric core: transforms, adaptive normalisation and dynamic-range scaling.

mod error;
pub mod pcen;
pub mod scaling;
pub mod transform;

use ndarray::Array2;

pub use error::TransformError;
pub use pcen::PcenConfig;
pub use scaling::{ReferencePower, ScalingConfig, compress};
pub use transform::{
    BoundsAdjustment, FrequencyBounds, SpectrumScale, TransformConfig, TransformKind,
    TransformOutput, WindowKind, compute,
};

/// Display-ready matrix indexed `[frequency, frame]`.
///
/// Every value is at least `value_min`; values above `value_max` are kept and
/// saturate only when coloured.
#[derive(Clone, Debug, PartialEq)]
pub struct SpectrogramMatrix {
    pub frequencies: Vec<f32>,
    pub times: Vec<f32>,
    pub values: Array2<f32>,
    pub value_min: f32,
    pub value_max: f32,
    /// Samples between consecutive columns.
    pub hop_length: usize,
}

impl SpectrogramMatrix {
    pub fn rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn columns(&self) -> usize {
        self.values.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
