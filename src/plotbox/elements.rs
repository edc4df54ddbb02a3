//! Plot elements: the content of one subplot.
//!
//! A [`Panel`] is a declarative description of a subplot. Nothing is drawn
//! until the enclosing [`Figure`](super::Figure) is exported, so panels can
//! be inspected and modified freely.

use std::fmt;
use std::str::FromStr;

use ndarray::Array2;
use plotters::style::RGBColor;

use super::core::{AxisConfig, AxisLimits, AxisScale, PlotBounds, finite_span};
use crate::{ToolboxError, ToolboxResult};

/// How a two-dimensional kernel is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KernelStyle {
    /// 3-D wireframe.
    #[default]
    Wireframe,
    /// 3-D colored surface, with a colorbar on time kernels.
    Surface,
    /// Filled contour map, with a colorbar on time kernels.
    Contour,
}

impl fmt::Display for KernelStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            KernelStyle::Wireframe => "wireframe",
            KernelStyle::Surface => "surface",
            KernelStyle::Contour => "contour",
        })
    }
}

impl FromStr for KernelStyle {
    type Err = ToolboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wireframe" => Ok(KernelStyle::Wireframe),
            "surface" => Ok(KernelStyle::Surface),
            "contour" => Ok(KernelStyle::Contour),
            other => Err(ToolboxError::InvalidParameter(format!(
                "unknown kernel style '{other}', expected one of surface, contour, wireframe"
            ))),
        }
    }
}

/// A line series.
#[derive(Debug, Clone, PartialEq)]
pub struct LineData {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    /// Fixed color. `None` takes the next color of the theme palette.
    pub color: Option<RGBColor>,
}

impl LineData {
    pub fn new(x: Vec<f64>, y: Vec<f64>) -> ToolboxResult<Self> {
        if x.len() != y.len() {
            return Err(ToolboxError::DimensionMismatch(format!(
                "x has {} samples but y has {}",
                x.len(),
                y.len()
            )));
        }
        Ok(Self { x, y, color: None })
    }

    pub fn with_color(mut self, color: RGBColor) -> Self {
        self.color = Some(color);
        self
    }

    /// Points in drawing coordinates, skipping those a scale cannot show.
    pub fn points(&self, x_scale: &AxisScale, y_scale: &AxisScale) -> Vec<(f64, f64)> {
        self.x
            .iter()
            .zip(self.y.iter())
            .map(|(&x, &y)| (x_scale.forward(x), y_scale.forward(y)))
            .filter(|(x, y)| x.is_finite() && y.is_finite())
            .collect()
    }

    pub fn data_bounds(&self, x_scale: &AxisScale, y_scale: &AxisScale) -> Option<PlotBounds> {
        PlotBounds::from_points(self.points(x_scale, y_scale))
    }
}

/// Values sampled on a rectangular grid, indexed `[x, y]`.
#[derive(Debug, Clone, PartialEq)]
pub struct GridData {
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub values: Array2<f64>,
}

impl GridData {
    pub fn new(x: Vec<f64>, y: Vec<f64>, values: Array2<f64>) -> ToolboxResult<Self> {
        if values.dim() != (x.len(), y.len()) {
            return Err(ToolboxError::DimensionMismatch(format!(
                "grid values have shape {:?} but axes have lengths ({}, {})",
                values.shape(),
                x.len(),
                y.len()
            )));
        }
        Ok(Self { x, y, values })
    }

    /// Finite minimum and maximum of the values.
    pub fn value_span(&self) -> Option<(f64, f64)> {
        finite_span(self.values.iter().copied())
    }
}

/// Cell edges around sample positions, halfway between neighbours.
pub fn cell_edges(centers: &[f64]) -> Vec<f64> {
    match centers {
        [] => Vec::new(),
        [single] => vec![single - 0.5, single + 0.5],
        [first, second, ..] => {
            let n = centers.len();
            let mut edges = Vec::with_capacity(n + 1);
            edges.push(first - (second - first) / 2.0);
            edges.extend(centers.windows(2).map(|w| (w[0] + w[1]) / 2.0));
            edges.push(centers[n - 1] + (centers[n - 1] - centers[n - 2]) / 2.0);
            edges
        }
    }
}

/// What a panel draws.
#[derive(Debug, Clone, PartialEq)]
pub enum PanelContent {
    /// Line plot.
    Lines(Vec<LineData>),
    /// Color mesh. With `levels`, colors are quantized into that many bands.
    Heatmap { grid: GridData, levels: Option<usize> },
    /// 3-D surface over the grid, the value being the vertical axis.
    Surface { grid: GridData, wireframe: bool },
}

/// One subplot of a figure.
#[derive(Debug, Clone, PartialEq)]
pub struct Panel {
    pub title: Option<String>,
    pub x_axis: AxisConfig,
    pub y_axis: AxisConfig,
    /// Value axis: vertical axis of surfaces, color scale of heatmaps.
    pub z_axis: AxisConfig,
    pub colorbar: bool,
    pub content: PanelContent,
}

impl Panel {
    fn with_content(content: PanelContent) -> Self {
        Self {
            title: None,
            x_axis: AxisConfig::default(),
            y_axis: AxisConfig::default(),
            z_axis: AxisConfig::default(),
            colorbar: false,
            content,
        }
    }

    pub fn lines(series: Vec<LineData>) -> Self {
        Self::with_content(PanelContent::Lines(series))
    }

    pub fn heatmap(grid: GridData, levels: Option<usize>) -> Self {
        Self::with_content(PanelContent::Heatmap { grid, levels })
    }

    pub fn surface(grid: GridData, wireframe: bool) -> Self {
        Self::with_content(PanelContent::Surface { grid, wireframe })
    }

    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn with_x_label<S: Into<String>>(mut self, label: S) -> Self {
        self.x_axis.label = Some(label.into());
        self
    }

    pub fn with_y_label<S: Into<String>>(mut self, label: S) -> Self {
        self.y_axis.label = Some(label.into());
        self
    }

    pub fn with_z_label<S: Into<String>>(mut self, label: S) -> Self {
        self.z_axis.label = Some(label.into());
        self
    }

    pub fn with_x_limits(mut self, limits: AxisLimits) -> Self {
        self.x_axis.limits = limits;
        self
    }

    pub fn with_y_limits(mut self, limits: AxisLimits) -> Self {
        self.y_axis.limits = limits;
        self
    }

    pub fn with_z_limits(mut self, limits: AxisLimits) -> Self {
        self.z_axis.limits = limits;
        self
    }

    pub fn with_x_scale(mut self, scale: AxisScale) -> Self {
        self.x_axis.scale = scale;
        self
    }

    pub fn with_y_scale(mut self, scale: AxisScale) -> Self {
        self.y_axis.scale = scale;
        self
    }

    pub fn with_colorbar(mut self) -> Self {
        self.colorbar = true;
        self
    }

    /// Number of line series, zero for other contents.
    pub fn series_count(&self) -> usize {
        match &self.content {
            PanelContent::Lines(series) => series.len(),
            _ => 0,
        }
    }
}
