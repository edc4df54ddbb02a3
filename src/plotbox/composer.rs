//! Figures, animations and their rendering through `plotters`.
//!
//! A [`Figure`] is a grid of [`Panel`]s under a common title. An
//! [`Animation`] is an ordered list of figures shown one after the other.
//! Both implement [`Exportable`], choosing the backend from the extension of
//! the target file:
//!
//! - `png`, `jpg`, `jpeg`, `bmp`, `tif`, `tiff`: bitmap
//! - `svg`: vector
//! - `gif`: animated bitmap (animations only)

use std::path::Path;

use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::debug;

use super::core::{AxisScale, PlotBounds, PlotTheme, colormap, finite_span, format_tick, widen};
use super::elements::{GridData, LineData, Panel, PanelContent, cell_edges};
use crate::savebox::{Exportable, RenderOptions};
use crate::{ToolboxError, ToolboxResult};

/// Default time between animation frames, in milliseconds.
pub const DEFAULT_FRAME_INTERVAL_MS: u32 = 100;

const AUTOSCALE_MARGIN: f64 = 0.05;
const COLORBAR_STEPS: usize = 64;

/// A titled grid of panels.
#[derive(Debug, Clone, PartialEq)]
pub struct Figure {
    title: String,
    rows: usize,
    cols: usize,
    panels: Vec<Option<Panel>>,
    theme: PlotTheme,
}

impl Figure {
    /// Empty 1×1 figure.
    pub fn new<S: Into<String>>(title: S) -> Self {
        Self {
            title: title.into(),
            rows: 1,
            cols: 1,
            panels: vec![None],
            theme: PlotTheme::default(),
        }
    }

    /// Resize the grid. Panels already placed are discarded.
    pub fn with_grid(mut self, rows: usize, cols: usize) -> Self {
        self.rows = rows.max(1);
        self.cols = cols.max(1);
        self.panels = vec![None; self.rows * self.cols];
        self
    }

    /// Replace the default theme.
    pub fn with_theme(mut self, theme: PlotTheme) -> Self {
        self.theme = theme;
        self
    }

    /// Place a panel, replacing any panel at that position.
    pub fn set_panel(&mut self, row: usize, col: usize, panel: Panel) -> ToolboxResult<()> {
        let index = self.index(row, col).ok_or_else(|| {
            ToolboxError::InvalidParameter(format!(
                "subplot ({row}, {col}) is outside a {}x{} grid",
                self.rows, self.cols
            ))
        })?;
        self.panels[index] = Some(panel);
        Ok(())
    }

    /// Panel at `(row, col)`, if one was placed there.
    pub fn panel(&self, row: usize, col: usize) -> Option<&Panel> {
        self.index(row, col).and_then(|i| self.panels[i].as_ref())
    }

    /// Placed panels in row-major order.
    pub fn panels(&self) -> impl Iterator<Item = &Panel> {
        self.panels.iter().flatten()
    }

    /// Grid size as `(rows, cols)`.
    pub const fn layout(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Overall title drawn above the grid.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Colors and fonts used when rendering.
    pub const fn theme(&self) -> &PlotTheme {
        &self.theme
    }

    const fn index(&self, row: usize, col: usize) -> Option<usize> {
        if row < self.rows && col < self.cols {
            Some(row * self.cols + col)
        } else {
            None
        }
    }

    /// Draw the figure on a drawing area.
    pub fn render_on<DB: DrawingBackend>(
        &self,
        root: &DrawingArea<DB, Shift>,
        options: &RenderOptions,
    ) -> ToolboxResult<()> {
        root.fill(&self.theme.background_color)
            .map_err(ToolboxError::plotting)?;

        let areas = if self.title.is_empty() {
            root.split_evenly((self.rows, self.cols))
        } else {
            let style = (self.theme.font_family.as_str(), self.theme.title_font_size)
                .into_font()
                .color(&self.theme.text_color);
            root.titled(&self.title, style)
                .map_err(ToolboxError::plotting)?
                .split_evenly((self.rows, self.cols))
        };

        for (area, panel) in areas.iter().zip(self.panels.iter()) {
            if let Some(panel) = panel {
                draw_panel(area, panel, &self.theme, options.margin())?;
            }
        }
        Ok(())
    }
}

impl Exportable for Figure {
    fn export(&self, path: &Path, options: &RenderOptions) -> ToolboxResult<()> {
        match extension_of(path).as_str() {
            "png" | "jpg" | "jpeg" | "bmp" | "tif" | "tiff" => {
                let root = BitMapBackend::new(path, options.size).into_drawing_area();
                self.render_on(&root, options)?;
                root.present().map_err(ToolboxError::plotting)?;
            }
            "svg" => {
                let root = SVGBackend::new(path, options.size).into_drawing_area();
                self.render_on(&root, options)?;
                root.present().map_err(ToolboxError::plotting)?;
            }
            other => {
                return Err(ToolboxError::UnsupportedFormat {
                    extension: other.to_string(),
                    target: "figure",
                });
            }
        }
        debug!(path = %path.display(), title = %self.title, "rendered figure");
        Ok(())
    }
}

/// Figures shown one after the other.
#[derive(Debug, Clone, PartialEq)]
pub struct Animation {
    title: String,
    frames: Vec<Figure>,
    interval_ms: u32,
}

impl Animation {
    /// Empty animation advancing every `interval_ms` milliseconds.
    pub fn new<S: Into<String>>(title: S, interval_ms: u32) -> Self {
        Self {
            title: title.into(),
            frames: Vec::new(),
            interval_ms,
        }
    }

    /// Append a frame.
    pub fn push_frame(&mut self, frame: Figure) {
        self.frames.push(frame);
    }

    /// Frames in display order.
    pub fn frames(&self) -> &[Figure] {
        &self.frames
    }

    /// Title shared by every frame.
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Time between frames, in milliseconds.
    pub const fn interval_ms(&self) -> u32 {
        self.interval_ms
    }

    /// Number of frames.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns true when there is no frame.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl Exportable for Animation {
    fn export(&self, path: &Path, options: &RenderOptions) -> ToolboxResult<()> {
        let extension = extension_of(path);
        if extension != "gif" {
            return Err(ToolboxError::UnsupportedFormat {
                extension,
                target: "animation",
            });
        }
        if self.frames.is_empty() {
            return Err(ToolboxError::InvalidParameter(
                "an animation needs at least one frame".to_string(),
            ));
        }

        let delay = options
            .fps
            .map(|fps| 1000 / fps.max(1))
            .unwrap_or(self.interval_ms);
        let root = BitMapBackend::gif(path, options.size, delay)
            .map_err(ToolboxError::plotting)?
            .into_drawing_area();

        for frame in &self.frames {
            frame.render_on(&root, options)?;
            root.present().map_err(ToolboxError::plotting)?;
        }
        debug!(path = %path.display(), frames = self.frames.len(), delay, "rendered animation");
        Ok(())
    }
}

/// Either kind of plot returned by the plotting routines.
#[derive(Debug, Clone, PartialEq)]
pub enum PlotHandle {
    /// A still figure.
    Figure(Figure),
    /// An animated sequence of figures.
    Animation(Animation),
}

impl PlotHandle {
    /// The figure, unless this is an animation.
    pub const fn as_figure(&self) -> Option<&Figure> {
        match self {
            PlotHandle::Figure(fig) => Some(fig),
            PlotHandle::Animation(_) => None,
        }
    }

    /// The animation, unless this is a still figure.
    pub const fn as_animation(&self) -> Option<&Animation> {
        match self {
            PlotHandle::Animation(anim) => Some(anim),
            PlotHandle::Figure(_) => None,
        }
    }

    /// Title of the figure or animation.
    pub fn title(&self) -> &str {
        match self {
            PlotHandle::Figure(fig) => fig.title(),
            PlotHandle::Animation(anim) => anim.title(),
        }
    }
}

impl From<Figure> for PlotHandle {
    fn from(fig: Figure) -> Self {
        PlotHandle::Figure(fig)
    }
}

impl From<Animation> for PlotHandle {
    fn from(anim: Animation) -> Self {
        PlotHandle::Animation(anim)
    }
}

impl Exportable for PlotHandle {
    fn export(&self, path: &Path, options: &RenderOptions) -> ToolboxResult<()> {
        match self {
            PlotHandle::Figure(fig) => fig.export(path, options),
            PlotHandle::Animation(anim) => anim.export(path, options),
        }
    }
}

fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase()
}

fn draw_panel<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    panel: &Panel,
    theme: &PlotTheme,
    margin: u32,
) -> ToolboxResult<()> {
    match &panel.content {
        PanelContent::Lines(series) => draw_lines(area, panel, series, theme, margin),
        PanelContent::Heatmap { grid, levels } => {
            let span = color_span(panel, grid);
            if panel.colorbar {
                let (main, bar) = split_for_colorbar(area);
                draw_heatmap(&main, panel, grid, *levels, span, theme, margin)?;
                draw_colorbar(&bar, span, *levels, theme)
            } else {
                draw_heatmap(area, panel, grid, *levels, span, theme, margin)
            }
        }
        PanelContent::Surface { grid, wireframe } => {
            let span = color_span(panel, grid);
            if panel.colorbar && !*wireframe {
                let (main, bar) = split_for_colorbar(area);
                draw_surface(&main, panel, grid, *wireframe, span, theme, margin)?;
                draw_colorbar(&bar, span, None, theme)
            } else {
                draw_surface(area, panel, grid, *wireframe, span, theme, margin)
            }
        }
    }
}

fn split_for_colorbar<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
) -> (DrawingArea<DB, Shift>, DrawingArea<DB, Shift>) {
    let (width, _) = area.dim_in_pixel();
    area.split_horizontally(width * 85 / 100)
}

/// Value range mapped onto the colormap and the vertical axis of surfaces.
fn color_span(panel: &Panel, grid: &GridData) -> (f64, f64) {
    let (lo, hi) = grid.value_span().unwrap_or((0.0, 1.0));
    let lo = panel.z_axis.limits.min.unwrap_or(lo);
    let hi = panel.z_axis.limits.max.unwrap_or(hi);
    let range = widen(lo, hi);
    (range.start, range.end)
}

fn normalized(value: f64, (lo, hi): (f64, f64), levels: Option<usize>) -> f64 {
    let h = ((value - lo) / (hi - lo)).clamp(0.0, 1.0);
    match levels {
        Some(n) if n > 0 => {
            let band = ((h * n as f64).floor() as usize).min(n - 1);
            (band as f64 + 0.5) / n as f64
        }
        _ => h,
    }
}

fn caption_style(theme: &PlotTheme) -> TextStyle<'_> {
    (theme.font_family.as_str(), theme.caption_font_size)
        .into_font()
        .color(&theme.text_color)
}

fn draw_lines<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    panel: &Panel,
    series: &[LineData],
    theme: &PlotTheme,
    margin: u32,
) -> ToolboxResult<()> {
    let x_scale = panel.x_axis.scale;
    let y_scale = panel.y_axis.scale;

    let bounds = series
        .iter()
        .filter_map(|s| s.data_bounds(&x_scale, &y_scale))
        .reduce(|mut acc, b| {
            acc.expand_to_include(&b);
            acc
        });
    let x_span = bounds.map(|b: PlotBounds| (b.x_min, b.x_max));
    let y_span = bounds.map(|b: PlotBounds| (b.y_min, b.y_max));
    let x_range = panel.x_axis.range(x_span, AUTOSCALE_MARGIN);
    let y_range = panel.y_axis.range(y_span, AUTOSCALE_MARGIN);

    let mut builder = ChartBuilder::on(area);
    builder
        .margin(margin)
        .x_label_area_size(35)
        .y_label_area_size(55);
    if let Some(title) = &panel.title {
        builder.caption(title, caption_style(theme));
    }
    let mut chart = builder
        .build_cartesian_2d(x_range, y_range)
        .map_err(ToolboxError::plotting)?;

    let x_fmt = |v: &f64| format_tick(x_scale.inverse(*v));
    let y_fmt = |v: &f64| format_tick(y_scale.inverse(*v));
    let mut mesh = chart.configure_mesh();
    mesh.x_label_formatter(&x_fmt)
        .y_label_formatter(&y_fmt)
        .label_style((theme.font_family.as_str(), theme.label_font_size).into_font());
    if let Some(label) = &panel.x_axis.label {
        mesh.x_desc(label.as_str());
    }
    if let Some(label) = &panel.y_axis.label {
        mesh.y_desc(label.as_str());
    }
    mesh.draw().map_err(ToolboxError::plotting)?;

    for (idx, line) in series.iter().enumerate() {
        let color = line
            .color
            .unwrap_or_else(|| theme.color_palette.get_color(idx));
        chart
            .draw_series(LineSeries::new(
                line.points(&x_scale, &y_scale),
                color.stroke_width(theme.line_width),
            ))
            .map_err(ToolboxError::plotting)?;
    }
    Ok(())
}

fn draw_heatmap<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    panel: &Panel,
    grid: &GridData,
    levels: Option<usize>,
    span: (f64, f64),
    theme: &PlotTheme,
    margin: u32,
) -> ToolboxResult<()> {
    let x_scale = panel.x_axis.scale;
    let y_scale = panel.y_axis.scale;
    let x_edges = scaled(&cell_edges(&grid.x), &x_scale);
    let y_edges = scaled(&cell_edges(&grid.y), &y_scale);

    let x_range = panel
        .x_axis
        .range(finite_span(x_edges.iter().copied()), 0.0);
    let y_range = panel
        .y_axis
        .range(finite_span(y_edges.iter().copied()), 0.0);

    let mut builder = ChartBuilder::on(area);
    builder
        .margin(margin)
        .x_label_area_size(35)
        .y_label_area_size(55);
    if let Some(title) = &panel.title {
        builder.caption(title, caption_style(theme));
    }
    let mut chart = builder
        .build_cartesian_2d(x_range, y_range)
        .map_err(ToolboxError::plotting)?;

    let x_fmt = |v: &f64| format_tick(x_scale.inverse(*v));
    let y_fmt = |v: &f64| format_tick(y_scale.inverse(*v));
    let mut mesh = chart.configure_mesh();
    mesh.disable_mesh()
        .x_label_formatter(&x_fmt)
        .y_label_formatter(&y_fmt)
        .label_style((theme.font_family.as_str(), theme.label_font_size).into_font());
    if let Some(label) = &panel.x_axis.label {
        mesh.x_desc(label.as_str());
    }
    if let Some(label) = &panel.y_axis.label {
        mesh.y_desc(label.as_str());
    }
    mesh.draw().map_err(ToolboxError::plotting)?;

    let cells = grid.values.indexed_iter().filter_map(|((i, j), &value)| {
        let (x0, x1, y0, y1) = (x_edges[i], x_edges[i + 1], y_edges[j], y_edges[j + 1]);
        let drawable = value.is_finite() && [x0, x1, y0, y1].iter().all(|v| v.is_finite());
        drawable.then(|| {
            Rectangle::new(
                [(x0, y0), (x1, y1)],
                colormap(normalized(value, span, levels)).filled(),
            )
        })
    });
    chart.draw_series(cells).map_err(ToolboxError::plotting)?;
    Ok(())
}

fn draw_surface<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    panel: &Panel,
    grid: &GridData,
    wireframe: bool,
    span: (f64, f64),
    theme: &PlotTheme,
    margin: u32,
) -> ToolboxResult<()> {
    let x_scale = panel.x_axis.scale;
    let y_scale = panel.y_axis.scale;
    let xs = scaled(&grid.x, &x_scale);
    let ys = scaled(&grid.y, &y_scale);
    let x_range = panel.x_axis.range(finite_span(xs.iter().copied()), 0.0);
    let y_range = panel.y_axis.range(finite_span(ys.iter().copied()), 0.0);
    let z_range = panel
        .z_axis
        .range(grid.value_span(), AUTOSCALE_MARGIN);

    let mut builder = ChartBuilder::on(area);
    builder.margin(margin);
    if let Some(title) = &panel.title {
        builder.caption(title, caption_style(theme));
    }
    // plotters draws its second axis vertically, so the value goes there.
    let mut chart = builder
        .build_cartesian_3d(x_range, z_range, y_range)
        .map_err(ToolboxError::plotting)?;
    chart.with_projection(|mut pb| {
        pb.yaw = 0.6;
        pb.pitch = 0.35;
        pb.scale = 0.8;
        pb.into_matrix()
    });

    let x_fmt = |v: &f64| format_tick(x_scale.inverse(*v));
    let y_fmt = |v: &f64| format_tick(y_scale.inverse(*v));
    let z_fmt = |v: &f64| format_tick(*v);
    chart
        .configure_axes()
        .x_formatter(&x_fmt)
        .y_formatter(&z_fmt)
        .z_formatter(&y_fmt)
        .label_style((theme.font_family.as_str(), theme.label_font_size).into_font())
        .draw()
        .map_err(ToolboxError::plotting)?;

    let (nx, ny) = grid.values.dim();
    let point = |i: usize, j: usize| (xs[i], grid.values[[i, j]], ys[j]);
    let finite = |p: &(f64, f64, f64)| p.0.is_finite() && p.1.is_finite() && p.2.is_finite();

    if wireframe {
        let color = theme.color_palette.get_color(0);
        for i in 0..nx {
            let line: Vec<_> = (0..ny).map(|j| point(i, j)).filter(finite).collect();
            chart
                .draw_series(LineSeries::new(line, color.stroke_width(theme.line_width)))
                .map_err(ToolboxError::plotting)?;
        }
        for j in 0..ny {
            let line: Vec<_> = (0..nx).map(|i| point(i, j)).filter(finite).collect();
            chart
                .draw_series(LineSeries::new(line, color.stroke_width(theme.line_width)))
                .map_err(ToolboxError::plotting)?;
        }
    } else {
        let quads = (0..nx.saturating_sub(1))
            .flat_map(|i| (0..ny.saturating_sub(1)).map(move |j| (i, j)))
            .filter_map(|(i, j)| {
                let corners = vec![point(i, j), point(i + 1, j), point(i + 1, j + 1), point(i, j + 1)];
                if !corners.iter().all(finite) {
                    return None;
                }
                let mean = corners.iter().map(|c| c.1).sum::<f64>() / 4.0;
                Some(Polygon::new(corners, colormap(normalized(mean, span, None)).mix(0.9).filled()))
            });
        chart.draw_series(quads).map_err(ToolboxError::plotting)?;
    }
    Ok(())
}

fn draw_colorbar<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    span: (f64, f64),
    levels: Option<usize>,
    theme: &PlotTheme,
) -> ToolboxResult<()> {
    let (lo, hi) = span;
    let mut chart = ChartBuilder::on(area)
        .margin_top(30)
        .margin_bottom(40)
        .margin_right(5)
        .y_label_area_size(50)
        .build_cartesian_2d(0.0..1.0, lo..hi)
        .map_err(ToolboxError::plotting)?;

    chart
        .configure_mesh()
        .disable_mesh()
        .disable_x_axis()
        .y_label_formatter(&|v: &f64| format_tick(*v))
        .label_style((theme.font_family.as_str(), theme.label_font_size).into_font())
        .draw()
        .map_err(ToolboxError::plotting)?;

    let step = (hi - lo) / COLORBAR_STEPS as f64;
    chart
        .draw_series((0..COLORBAR_STEPS).map(|k| {
            let y0 = lo + k as f64 * step;
            let color = colormap(normalized(y0 + step / 2.0, span, levels));
            Rectangle::new([(0.0, y0), (1.0, y0 + step)], color.filled())
        }))
        .map_err(ToolboxError::plotting)?;
    Ok(())
}

fn scaled(values: &[f64], scale: &AxisScale) -> Vec<f64> {
    values.iter().map(|&v| scale.forward(v)).collect()
}
