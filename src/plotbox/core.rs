//! Core types for the plotting module: bounds, axes, styles and themes.

use std::ops::Range;

use plotters::prelude::*;

/// Bounds for plot data in 2D space
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlotBounds {
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

impl PlotBounds {
    pub const fn new(x_min: f64, x_max: f64, y_min: f64, y_max: f64) -> Self {
        Self {
            x_min,
            x_max,
            y_min,
            y_max,
        }
    }

    /// Smallest bounds containing every finite point, or `None` if there is none.
    pub fn from_points<I: IntoIterator<Item = (f64, f64)>>(points: I) -> Option<Self> {
        points
            .into_iter()
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .fold(None, |acc: Option<Self>, (x, y)| {
                let point = Self::new(x, x, y, y);
                Some(match acc {
                    Some(mut bounds) => {
                        bounds.expand_to_include(&point);
                        bounds
                    }
                    None => point,
                })
            })
    }

    pub fn expand_to_include(&mut self, other: &PlotBounds) {
        self.x_min = self.x_min.min(other.x_min);
        self.x_max = self.x_max.max(other.x_max);
        self.y_min = self.y_min.min(other.y_min);
        self.y_max = self.y_max.max(other.y_max);
    }

    pub fn with_margin(&self, margin_percent: f64) -> Self {
        let x_margin = (self.x_max - self.x_min) * margin_percent;
        let y_margin = (self.y_max - self.y_min) * margin_percent;
        Self {
            x_min: self.x_min - x_margin,
            x_max: self.x_max + x_margin,
            y_min: self.y_min - y_margin,
            y_max: self.y_max + y_margin,
        }
    }
}

/// Scaling applied to an axis.
///
/// Data is drawn in transformed coordinates and tick labels show the
/// original values.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum AxisScale {
    #[default]
    Linear,
    /// Base 10 logarithm. Non-positive values are not drawn.
    Log,
    /// Linear within `[-linthresh, linthresh]`, logarithmic outside.
    SymLog { linthresh: f64 },
}

impl AxisScale {
    /// Symmetric log scale with the usual threshold of 2.
    pub const fn symlog() -> Self {
        AxisScale::SymLog { linthresh: 2.0 }
    }

    /// Map a data value to drawing coordinates.
    pub fn forward(&self, v: f64) -> f64 {
        match *self {
            AxisScale::Linear => v,
            AxisScale::Log => {
                if v > 0.0 {
                    v.log10()
                } else {
                    f64::NAN
                }
            }
            AxisScale::SymLog { linthresh } => {
                if v.abs() <= linthresh {
                    v / linthresh
                } else {
                    v.signum() * (1.0 + (v.abs() / linthresh).log10())
                }
            }
        }
    }

    /// Map drawing coordinates back to a data value.
    pub fn inverse(&self, t: f64) -> f64 {
        match *self {
            AxisScale::Linear => t,
            AxisScale::Log => 10f64.powf(t),
            AxisScale::SymLog { linthresh } => {
                if t.abs() <= 1.0 {
                    t * linthresh
                } else {
                    t.signum() * linthresh * 10f64.powf(t.abs() - 1.0)
                }
            }
        }
    }
}

/// Optional fixed limits of an axis. `None` means autoscale.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AxisLimits {
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl AxisLimits {
    pub const fn new(min: Option<f64>, max: Option<f64>) -> Self {
        Self { min, max }
    }

    pub const fn fixed(min: f64, max: f64) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub const fn is_auto(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

/// Configuration for axis formatting
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AxisConfig {
    pub label: Option<String>,
    pub limits: AxisLimits,
    pub scale: AxisScale,
}

impl AxisConfig {
    /// Drawing range for data spanning `[lo, hi]` (already transformed).
    ///
    /// Fixed limits replace the matching autoscaled end, the margin is only
    /// added to autoscaled ends.
    pub fn range(&self, span: Option<(f64, f64)>, margin_percent: f64) -> Range<f64> {
        let (lo, hi) = span.unwrap_or((0.0, 1.0));
        let pad = (hi - lo) * margin_percent;
        let fixed = |v: Option<f64>| v.map(|v| self.scale.forward(v)).filter(|v| v.is_finite());

        let start = fixed(self.limits.min).unwrap_or(lo - pad);
        let end = fixed(self.limits.max).unwrap_or(hi + pad);
        widen(start, end)
    }
}

/// Turn a possibly empty interval into a drawable range.
pub fn widen(start: f64, end: f64) -> Range<f64> {
    if !(start.is_finite() && end.is_finite()) {
        return 0.0..1.0;
    }
    if end > start {
        start..end
    } else {
        let half = if start == 0.0 { 0.5 } else { start.abs() * 0.05 };
        (start - half)..(start + half)
    }
}

/// Finite minimum and maximum of some values.
pub fn finite_span<I: IntoIterator<Item = f64>>(values: I) -> Option<(f64, f64)> {
    values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            Some((lo, hi)) => Some((f64::min(lo, v), f64::max(hi, v))),
            None => Some((v, v)),
        })
}

/// Format an axis tick value.
pub fn format_tick(v: f64) -> String {
    let magnitude = v.abs();
    if v == 0.0 {
        "0".to_string()
    } else if !(1e-3..1e4).contains(&magnitude) {
        format!("{v:.1e}")
    } else {
        let text = format!("{v:.3}");
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Color palette for line series
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ColorPalette {
    #[default]
    Default,
    Custom(Vec<RGBColor>),
}

impl ColorPalette {
    pub fn get_color(&self, index: usize) -> RGBColor {
        const TABLEAU: [RGBColor; 8] = [
            RGBColor(0x1f, 0x77, 0xb4),
            RGBColor(0xff, 0x7f, 0x0e),
            RGBColor(0x2c, 0xa0, 0x2c),
            RGBColor(0xd6, 0x27, 0x28),
            RGBColor(0x94, 0x67, 0xbd),
            RGBColor(0x8c, 0x56, 0x4b),
            RGBColor(0xe3, 0x77, 0xc2),
            RGBColor(0x7f, 0x7f, 0x7f),
        ];
        match self {
            ColorPalette::Custom(colors) if !colors.is_empty() => colors[index % colors.len()],
            _ => TABLEAU[index % TABLEAU.len()],
        }
    }
}

/// Color of `h` in `[0, 1]` on the viridis colormap.
pub fn colormap(h: f64) -> RGBColor {
    let h = if h.is_finite() { h.clamp(0.0, 1.0) } else { 0.0 };
    ViridisRGB::get_color(h)
}

/// Theme configuration for plots
#[derive(Debug, Clone, PartialEq)]
pub struct PlotTheme {
    pub background_color: RGBColor,
    pub text_color: RGBColor,
    pub font_family: String,
    pub title_font_size: u32,
    pub caption_font_size: u32,
    pub label_font_size: u32,
    pub line_width: u32,
    pub color_palette: ColorPalette,
}

impl Default for PlotTheme {
    fn default() -> Self {
        Self {
            background_color: WHITE,
            text_color: BLACK,
            font_family: "sans-serif".to_string(),
            title_font_size: 22,
            caption_font_size: 16,
            label_font_size: 12,
            line_width: 1,
            color_palette: ColorPalette::Default,
        }
    }
}
