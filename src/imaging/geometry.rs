//! Pure crop geometry.
//!
//! Everything here is plain arithmetic over display and natural dimensions:
//! no decoding, no I/O. The crop manager and the extractor are thin layers on
//! top of these functions, so the interesting invariants (ratio, centring,
//! bounds, natural-resolution mapping) are all tested in this file.
//!
//! ## Coordinate spaces
//!
//! ```text
//! percent   0..100 of the displayed image (what the editor stores)
//! display   pixels of the image as rendered on screen
//! natural   pixels of the decoded bitmap (what gets extracted)
//! ```

use super::backend::{BackendError, Dimensions};
use super::params::{ExtractParams, PixelRect};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tolerance used when comparing a region's width/height to its aspect ratio.
pub const RATIO_TOLERANCE: f64 = 1e-3;

/// Unit of a [`CropRect`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CropUnit {
    /// Percentage (0–100) of the displayed image.
    Percent,
    /// Display pixels.
    #[default]
    Pixels,
}

/// A crop rectangle over the displayed image.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropRect {
    pub unit: CropUnit,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CropRect {
    /// The whole displayed image in the given unit.
    pub fn full(unit: CropUnit, display: Dimensions) -> Self {
        let (w, h) = match unit {
            CropUnit::Percent => (100.0, 100.0),
            CropUnit::Pixels => display.as_f64(),
        };
        Self {
            unit,
            x: 0.0,
            y: 0.0,
            width: w,
            height: h,
        }
    }

    /// Convert to display pixels.
    pub fn to_pixels(self, display: Dimensions) -> Self {
        match self.unit {
            CropUnit::Pixels => self,
            CropUnit::Percent => {
                let (dw, dh) = display.as_f64();
                Self {
                    unit: CropUnit::Pixels,
                    x: self.x * dw / 100.0,
                    y: self.y * dh / 100.0,
                    width: self.width * dw / 100.0,
                    height: self.height * dh / 100.0,
                }
            }
        }
    }

    /// Convert to percentages of the displayed image.
    pub fn to_percent(self, display: Dimensions) -> Self {
        match self.unit {
            CropUnit::Percent => self,
            CropUnit::Pixels => {
                let (dw, dh) = display.as_f64();
                Self {
                    unit: CropUnit::Percent,
                    x: self.x * 100.0 / dw,
                    y: self.y * 100.0 / dh,
                    width: self.width * 100.0 / dw,
                    height: self.height * 100.0 / dh,
                }
            }
        }
    }

    /// Width divided by height, in the rectangle's own unit.
    pub fn ratio(&self) -> f64 {
        self.width / self.height
    }
}

/// Aspect-ratio constraint for the crop region.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum AspectRatio {
    /// Unconstrained.
    #[default]
    Free,
    /// Fixed width/height ratio.
    Fixed(f64),
}

impl AspectRatio {
    pub const SQUARE: Self = Self::Fixed(1.0);
    pub const LANDSCAPE: Self = Self::Fixed(16.0 / 9.0);
    pub const PORTRAIT: Self = Self::Fixed(4.0 / 5.0);

    /// Toolbar presets, in display order.
    pub const PRESETS: [(&'static str, AspectRatio); 4] = [
        ("free", Self::Free),
        ("1:1", Self::SQUARE),
        ("16:9", Self::LANDSCAPE),
        ("4:5", Self::PORTRAIT),
    ];

    /// Ratio from `width:height` parts. Zero parts are rejected.
    pub fn from_parts(width: u32, height: u32) -> Option<Self> {
        (width > 0 && height > 0).then(|| Self::Fixed(f64::from(width) / f64::from(height)))
    }

    pub fn value(self) -> Option<f64> {
        match self {
            Self::Free => None,
            Self::Fixed(r) => Some(r),
        }
    }
}

impl FromStr for AspectRatio {
    type Err = String;

    /// Accepts `free`, `W:H` (e.g. `16:9`) or a decimal ratio (e.g. `1.5`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("free") {
            return Ok(Self::Free);
        }
        if let Some((w, h)) = s.split_once(':') {
            let w: u32 = w.trim().parse().map_err(|_| format!("invalid ratio '{s}'"))?;
            let h: u32 = h.trim().parse().map_err(|_| format!("invalid ratio '{s}'"))?;
            return Self::from_parts(w, h).ok_or_else(|| format!("ratio parts must be non-zero: '{s}'"));
        }
        match s.parse::<f64>() {
            Ok(r) if r.is_finite() && r > 0.0 => Ok(Self::Fixed(r)),
            _ => Err(format!("invalid ratio '{s}' (expected free, W:H or a positive number)")),
        }
    }
}

impl fmt::Display for AspectRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((name, _)) = Self::PRESETS.iter().find(|(_, preset)| preset == self) {
            return f.write_str(name);
        }
        match self {
            Self::Free => f.write_str("free"),
            Self::Fixed(r) => write!(f, "{r:.4}"),
        }
    }
}

/// Immutable display-pixel snapshot of the region at commit time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommittedCrop {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl CommittedCrop {
    pub fn from_rect(rect: CropRect, display: Dimensions) -> Self {
        let px = rect.to_pixels(display);
        Self {
            x: px.x,
            y: px.y,
            width: px.width,
            height: px.height,
        }
    }
}

/// Partial region change coming from a drag or resize.
///
/// Unset fields keep their current value. When only one of `width`/`height`
/// is set it is the driving dimension; when both are set `width` drives.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RegionUpdate {
    pub unit: CropUnit,
    pub x: Option<f64>,
    pub y: Option<f64>,
    pub width: Option<f64>,
    pub height: Option<f64>,
}

impl RegionUpdate {
    pub fn pixels() -> Self {
        Self::default()
    }

    pub fn percent() -> Self {
        Self {
            unit: CropUnit::Percent,
            ..Self::default()
        }
    }

    /// An update that replaces every field with those of `rect`.
    pub fn from_rect(rect: CropRect) -> Self {
        Self {
            unit: rect.unit,
            x: Some(rect.x),
            y: Some(rect.y),
            width: Some(rect.width),
            height: Some(rect.height),
        }
    }

    pub fn with_position(mut self, x: f64, y: f64) -> Self {
        self.x = Some(x);
        self.y = Some(y);
        self
    }

    pub fn with_width(mut self, width: f64) -> Self {
        self.width = Some(width);
        self
    }

    pub fn with_height(mut self, height: f64) -> Self {
        self.height = Some(height);
        self
    }
}

/// Largest rectangle of `ratio` that fits the display, centred.
///
/// Returned in display pixels.
pub fn centered_aspect_rect(display: Dimensions, ratio: f64) -> CropRect {
    let (w, h) = display.as_f64();
    let (crop_w, crop_h) = if w / h > ratio {
        // Display is wider than the target: full height
        (h * ratio, h)
    } else {
        (w, w / ratio)
    };
    CropRect {
        unit: CropUnit::Pixels,
        x: (w - crop_w) / 2.0,
        y: (h - crop_h) / 2.0,
        width: crop_w,
        height: crop_h,
    }
}

/// Apply a partial update to a display-pixel region.
///
/// With a fixed ratio the non-driving dimension is derived from the driving
/// one. The result is then scaled down to fit (preserving the ratio) and
/// translated back inside `[0, W] × [0, H]`.
pub fn apply_update(
    current: CropRect,
    update: RegionUpdate,
    display: Dimensions,
    aspect: AspectRatio,
) -> CropRect {
    let current = current.to_pixels(display);
    let (dw, dh) = display.as_f64();
    let (sx, sy) = match update.unit {
        CropUnit::Pixels => (1.0, 1.0),
        CropUnit::Percent => (dw / 100.0, dh / 100.0),
    };
    let finite = |v: Option<f64>| v.filter(|v| v.is_finite());
    let (upd_x, upd_y) = (finite(update.x), finite(update.y));
    let (upd_w, upd_h) = (finite(update.width), finite(update.height));

    let mut x = upd_x.map_or(current.x, |v| v * sx);
    let mut y = upd_y.map_or(current.y, |v| v * sy);
    let mut width = upd_w.map_or(current.width, |v| v * sx).max(0.0);
    let mut height = upd_h.map_or(current.height, |v| v * sy).max(0.0);

    match aspect.value() {
        Some(ratio) => {
            if upd_h.is_some() && upd_w.is_none() {
                width = height * ratio;
            } else {
                height = width / ratio;
            }
            let scale = (dw / width).min(dh / height).min(1.0);
            width *= scale;
            height *= scale;
        }
        None => {
            width = width.min(dw);
            height = height.min(dh);
        }
    }

    x = x.clamp(0.0, (dw - width).max(0.0));
    y = y.clamp(0.0, (dh - height).max(0.0));

    CropRect {
        unit: CropUnit::Pixels,
        x,
        y,
        width,
        height,
    }
}

/// On-screen size of an image shown inside a `max_width × max_height` box.
///
/// Never upscales; each side is at least one pixel.
pub fn fit_display(natural: Dimensions, max_width: u32, max_height: u32) -> Dimensions {
    let (nw, nh) = natural.as_f64();
    let scale = (f64::from(max_width) / nw)
        .min(f64::from(max_height) / nh)
        .min(1.0);
    Dimensions {
        width: ((nw * scale).round() as u32).max(1),
        height: ((nh * scale).round() as u32).max(1),
    }
}

/// Map a committed display-pixel crop onto the natural-resolution bitmap.
///
/// The source rectangle is `{x·sx, y·sy, w·sx, h·sy}` with
/// `sx = natural.width / display.width` (likewise `sy`); the output raster is
/// `round(w·sx) × round(h·sy)`. The origin is rounded and clamped so the
/// rectangle always lies inside the bitmap.
pub fn plan_extraction(
    crop: &CommittedCrop,
    display: Dimensions,
    natural: Dimensions,
) -> Result<ExtractParams, BackendError> {
    // Written as negations so NaN also counts as empty
    if !(crop.width > 0.0 && crop.height > 0.0) {
        return Err(BackendError::EmptyCrop {
            width: crop.width,
            height: crop.height,
        });
    }
    if display.width == 0 || display.height == 0 {
        return Err(BackendError::InvalidImage(
            "display dimensions must be non-zero".into(),
        ));
    }

    let scale_x = f64::from(natural.width) / f64::from(display.width);
    let scale_y = f64::from(natural.height) / f64::from(display.height);

    let out_w = (crop.width * scale_x).round().min(f64::from(natural.width));
    let out_h = (crop.height * scale_y).round().min(f64::from(natural.height));
    if !(out_w >= 1.0 && out_h >= 1.0) {
        return Err(BackendError::EmptyCrop {
            width: crop.width,
            height: crop.height,
        });
    }
    let (out_w, out_h) = (out_w as u32, out_h as u32);

    let x = (crop.x * scale_x)
        .round()
        .clamp(0.0, f64::from(natural.width - out_w)) as u32;
    let y = (crop.y * scale_y)
        .round()
        .clamp(0.0, f64::from(natural.height - out_h)) as u32;

    Ok(ExtractParams {
        source: PixelRect {
            x,
            y,
            width: out_w,
            height: out_h,
        },
    })
}
