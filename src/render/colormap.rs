use image::Rgba;

pub(crate) const LUT_SIZE: usize = 256;

type Anchor = (f32, [u8; 3]);

const MAGMA: &[Anchor] = &[
    (0.0, [0, 0, 4]),
    (0.125, [28, 16, 68]),
    (0.25, [79, 18, 123]),
    (0.375, [129, 37, 129]),
    (0.5, [181, 54, 122]),
    (0.625, [229, 80, 100]),
    (0.75, [251, 135, 97]),
    (0.875, [254, 194, 135]),
    (1.0, [252, 253, 191]),
];

const INFERNO: &[Anchor] = &[
    (0.0, [0, 0, 4]),
    (0.125, [31, 12, 72]),
    (0.25, [85, 15, 109]),
    (0.375, [136, 34, 106]),
    (0.5, [186, 54, 85]),
    (0.625, [227, 89, 51]),
    (0.75, [249, 140, 10]),
    (0.875, [249, 201, 50]),
    (1.0, [252, 255, 164]),
];

const VIRIDIS: &[Anchor] = &[
    (0.0, [68, 1, 84]),
    (0.125, [71, 44, 122]),
    (0.25, [59, 81, 139]),
    (0.375, [44, 113, 142]),
    (0.5, [33, 144, 141]),
    (0.625, [39, 173, 129]),
    (0.75, [92, 200, 99]),
    (0.875, [170, 220, 50]),
    (1.0, [253, 231, 37]),
];

const PLASMA: &[Anchor] = &[
    (0.0, [13, 8, 135]),
    (0.25, [126, 3, 168]),
    (0.5, [204, 71, 120]),
    (0.75, [248, 149, 64]),
    (1.0, [240, 249, 33]),
];

const CIVIDIS: &[Anchor] = &[
    (0.0, [0, 34, 78]),
    (0.25, [65, 77, 107]),
    (0.5, [124, 123, 120]),
    (0.75, [188, 175, 111]),
    (1.0, [254, 232, 56]),
];

const GRAY: &[Anchor] = &[(0.0, [0, 0, 0]), (1.0, [255, 255, 255])];

const GRAY_R: &[Anchor] = &[(0.0, [255, 255, 255]), (1.0, [0, 0, 0])];

const HOT: &[Anchor] = &[
    (0.0, [11, 0, 0]),
    (0.365, [255, 0, 0]),
    (0.746, [255, 255, 0]),
    (1.0, [255, 255, 255]),
];

const JET: &[Anchor] = &[
    (0.0, [0, 0, 128]),
    (0.125, [0, 0, 255]),
    (0.375, [0, 255, 255]),
    (0.625, [255, 255, 0]),
    (0.875, [255, 0, 0]),
    (1.0, [128, 0, 0]),
];

/// Names accepted by [`ColorRamp::named`].
pub const RAMP_NAMES: &[&str] = &[
    "magma", "inferno", "viridis", "plasma", "cividis", "gray", "gray_r", "hot", "jet",
];

fn anchors(name: &str) -> Option<&'static [Anchor]> {
    let anchors = match name.trim().to_ascii_lowercase().as_str() {
        "magma" => MAGMA,
        "inferno" => INFERNO,
        "viridis" => VIRIDIS,
        "plasma" => PLASMA,
        "cividis" => CIVIDIS,
        "gray" | "grey" => GRAY,
        "gray_r" | "grey_r" => GRAY_R,
        "hot" => HOT,
        "jet" => JET,
        _ => return None,
    };
    Some(anchors)
}

/// A 256-entry colour lookup table, low values first.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ColorRamp {
    lut: Box<[[u8; 3]]>,
}

impl ColorRamp {
    /// Build a named ramp; `None` for unknown names.
    pub fn named(name: &str) -> Option<Self> {
        anchors(name).map(Self::from_anchors)
    }

    /// Ramp used when a requested name is unknown.
    pub fn fallback() -> Self {
        Self::from_anchors(VIRIDIS)
    }

    fn from_anchors(anchors: &[Anchor]) -> Self {
        let lut = (0..LUT_SIZE)
            .map(|i| interpolate(anchors, i as f32 / (LUT_SIZE - 1) as f32))
            .collect();
        Self { lut }
    }

    /// Colour at `t` in `[0, 1]`, rounded to the nearest table entry.
    pub fn sample(&self, t: f32) -> Rgba<u8> {
        let t = if t.is_finite() { t.clamp(0.0, 1.0) } else { 0.0 };
        self.at((t * (LUT_SIZE - 1) as f32).round() as usize)
    }

    pub fn at(&self, index: usize) -> Rgba<u8> {
        let [r, g, b] = self.lut[index.min(self.lut.len() - 1)];
        Rgba([r, g, b, 255])
    }

    pub fn floor_color(&self) -> Rgba<u8> {
        self.at(0)
    }

    pub fn ceiling_color(&self) -> Rgba<u8> {
        self.at(LUT_SIZE - 1)
    }
}

/// A lighter variant of `base` that samples only `[floor, 1]` of it.
///
/// `floor` is clamped to `[0, 1]`; `0` returns an identical ramp.
pub fn lighten(base: &ColorRamp, floor: f32) -> ColorRamp {
    let floor = if floor.is_finite() { floor.clamp(0.0, 1.0) } else { 0.0 };
    let lut = (0..LUT_SIZE)
        .map(|i| {
            let t = floor + (1.0 - floor) * i as f32 / (LUT_SIZE - 1) as f32;
            let Rgba([r, g, b, _]) = base.sample(t);
            [r, g, b]
        })
        .collect();
    ColorRamp { lut }
}

fn interpolate(anchors: &[Anchor], t: f32) -> [u8; 3] {
    let Some(&(_, first)) = anchors.first() else {
        return [0, 0, 0];
    };
    let mut prev = (0.0, first);
    for &(pos, color) in anchors {
        if t <= pos {
            let span = pos - prev.0;
            let frac = if span > 0.0 { (t - prev.0) / span } else { 1.0 };
            return mix(prev.1, color, frac);
        }
        prev = (pos, color);
    }
    prev.1
}

fn mix(a: [u8; 3], b: [u8; 3], frac: f32) -> [u8; 3] {
    let frac = frac.clamp(0.0, 1.0);
    let lerp = |x: u8, y: u8| (x as f32 + (y as f32 - x as f32) * frac).round() as u8;
    [lerp(a[0], b[0]), lerp(a[1], b[1]), lerp(a[2], b[2])]
}
