//! Plotting routines for signals, spectrograms and Volterra kernels.
//!
//! Every routine builds a [`Figure`] (or, for third order time kernels, an
//! [`Animation`]) from plain arrays and returns it without drawing anything.
//! Pass the handle to [`save_figure`](crate::savebox::save_figure) or
//! [`save_animation`](crate::savebox::save_animation) to render it.

use ndarray::{Array, Array2, ArrayD, Axis, Dimension, Ix1, Ix2, s};
use num_complex::Complex64;
use plotters::style::{BLUE, RED};
use tracing::debug;

use super::composer::{Animation, DEFAULT_FRAME_INTERVAL_MS, Figure, PlotHandle};
use super::core::{AxisLimits, AxisScale, finite_span};
use super::elements::{GridData, KernelStyle, LineData, Panel};
use super::kernels::{FreqKernel, TimeKernel};
use crate::mathbox::{StftParams, safe_db_unit, stft, unwrap_phase, unwrap_phase_all};
use crate::repr::NdArray;
use crate::{ToolboxError, ToolboxResult};

const TIME_LABEL: &str = "Time (s)";
const FREQUENCY_LABEL: &str = "Frequency (Hz)";
const AMPLITUDE_LABEL: &str = "Amplitude";
const PHASE_LABEL: &str = "Phase (radians)";

/// Options for [`sig_io`].
#[derive(Debug, Clone, PartialEq)]
pub struct SigIoOptions {
    pub title: String,
    pub xlim: AxisLimits,
    pub ylim: AxisLimits,
}

impl Default for SigIoOptions {
    fn default() -> Self {
        Self {
            title: "Input and output signal of a system".to_string(),
            xlim: AxisLimits::default(),
            ylim: AxisLimits::default(),
        }
    }
}

impl SigIoOptions {
    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = title.into();
        self
    }

    pub const fn with_xlim(mut self, min: f64, max: f64) -> Self {
        self.xlim = AxisLimits::fixed(min, max);
        self
    }

    pub const fn with_ylim(mut self, min: f64, max: f64) -> Self {
        self.ylim = AxisLimits::fixed(min, max);
        self
    }
}

/// Options for [`time_sig`].
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSigOptions {
    pub title: String,
    /// One title per signal. Defaults to "Signal 1", "Signal 2", ...
    pub plot_titles: Option<Vec<String>>,
    pub xlim: AxisLimits,
    pub ylim: AxisLimits,
}

impl Default for TimeSigOptions {
    fn default() -> Self {
        Self {
            title: "Collection of signals".to_string(),
            plot_titles: None,
            xlim: AxisLimits::default(),
            ylim: AxisLimits::default(),
        }
    }
}

impl TimeSigOptions {
    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_plot_titles<I, S>(mut self, titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.plot_titles = Some(titles.into_iter().map(Into::into).collect());
        self
    }

    pub const fn with_xlim(mut self, min: f64, max: f64) -> Self {
        self.xlim = AxisLimits::fixed(min, max);
        self
    }

    pub const fn with_ylim(mut self, min: f64, max: f64) -> Self {
        self.ylim = AxisLimits::fixed(min, max);
        self
    }
}

/// Options for [`coll`].
#[derive(Debug, Clone, PartialEq)]
pub struct CollOptions {
    pub title: String,
    /// One title per array of the collection, shown above each column.
    pub column_titles: Option<Vec<String>>,
    /// One label per row, shown on the first column.
    pub row_titles: Option<Vec<String>>,
    pub xlim: AxisLimits,
    pub ylim: AxisLimits,
}

impl Default for CollOptions {
    fn default() -> Self {
        Self {
            title: "Collection of signals".to_string(),
            column_titles: None,
            row_titles: None,
            xlim: AxisLimits::default(),
            ylim: AxisLimits::default(),
        }
    }
}

impl CollOptions {
    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_column_titles<I, S>(mut self, titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.column_titles = Some(titles.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_row_titles<I, S>(mut self, titles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.row_titles = Some(titles.into_iter().map(Into::into).collect());
        self
    }

    pub const fn with_xlim(mut self, min: f64, max: f64) -> Self {
        self.xlim = AxisLimits::fixed(min, max);
        self
    }

    pub const fn with_ylim(mut self, min: f64, max: f64) -> Self {
        self.ylim = AxisLimits::fixed(min, max);
        self
    }
}

/// Options for [`spectrogram`].
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrogramOptions {
    pub title: String,
    /// Show the magnitude in decibels.
    pub db: bool,
    /// Symmetric log frequency axis.
    pub logscale: bool,
    /// Also build a figure of the phase.
    pub phase: bool,
    /// Unwrap the phase along the frequency axis.
    pub unwrap: bool,
    pub stft: StftParams,
}

impl Default for SpectrogramOptions {
    fn default() -> Self {
        Self {
            title: "Short-Time Fourier Transform".to_string(),
            db: true,
            logscale: false,
            phase: false,
            unwrap: true,
            stft: StftParams::default(),
        }
    }
}

impl SpectrogramOptions {
    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = title.into();
        self
    }

    pub const fn with_db(mut self, db: bool) -> Self {
        self.db = db;
        self
    }

    pub const fn with_logscale(mut self, logscale: bool) -> Self {
        self.logscale = logscale;
        self
    }

    pub const fn with_phase(mut self, phase: bool) -> Self {
        self.phase = phase;
        self
    }

    pub const fn with_unwrap(mut self, unwrap: bool) -> Self {
        self.unwrap = unwrap;
        self
    }

    pub fn with_stft(mut self, params: StftParams) -> Self {
        self.stft = params;
        self
    }
}

/// Figures built by [`spectrogram`].
#[derive(Debug, Clone, PartialEq)]
pub struct SpectrogramPlot {
    pub amplitude: Figure,
    /// Present when [`SpectrogramOptions::phase`] is set.
    pub phase: Option<Figure>,
}

/// Options for [`time_kernel`].
#[derive(Debug, Clone, PartialEq)]
pub struct TimeKernelOptions {
    pub style: KernelStyle,
    /// Overrides the title derived from the kernel order.
    pub title: Option<String>,
    /// Number of color levels of contour plots.
    pub nb_levels: usize,
    /// Keep the vertical axis fixed across the frames of an animation.
    pub set_zlim: bool,
}

impl Default for TimeKernelOptions {
    fn default() -> Self {
        Self {
            style: KernelStyle::Wireframe,
            title: None,
            nb_levels: 20,
            set_zlim: true,
        }
    }
}

impl TimeKernelOptions {
    pub const fn with_style(mut self, style: KernelStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = Some(title.into());
        self
    }

    pub const fn with_nb_levels(mut self, nb_levels: usize) -> Self {
        self.nb_levels = nb_levels;
        self
    }

    pub const fn with_set_zlim(mut self, set_zlim: bool) -> Self {
        self.set_zlim = set_zlim;
        self
    }
}

/// Options for [`freq_kernel`].
#[derive(Debug, Clone, PartialEq)]
pub struct FreqKernelOptions {
    pub style: KernelStyle,
    /// Overrides the title derived from the kernel order.
    pub title: Option<String>,
    pub db: bool,
    pub logscale: bool,
    /// Unwrap the phase along every axis.
    pub unwrap: bool,
    pub nb_levels: usize,
}

impl Default for FreqKernelOptions {
    fn default() -> Self {
        Self {
            style: KernelStyle::Wireframe,
            title: None,
            db: true,
            logscale: false,
            unwrap: true,
            nb_levels: 20,
        }
    }
}

impl FreqKernelOptions {
    pub const fn with_style(mut self, style: KernelStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_title<S: Into<String>>(mut self, title: S) -> Self {
        self.title = Some(title.into());
        self
    }

    pub const fn with_db(mut self, db: bool) -> Self {
        self.db = db;
        self
    }

    pub const fn with_logscale(mut self, logscale: bool) -> Self {
        self.logscale = logscale;
        self
    }

    pub const fn with_unwrap(mut self, unwrap: bool) -> Self {
        self.unwrap = unwrap;
        self
    }

    pub const fn with_nb_levels(mut self, nb_levels: usize) -> Self {
        self.nb_levels = nb_levels;
        self
    }
}

/// Plot the input and output of a system against `vec`.
///
/// Real signals give a 2×1 grid. If either signal is complex the grid is 2×2
/// with real parts on the left and imaginary parts on the right.
pub fn sig_io(vec: &[f64], input: &NdArray, output: &NdArray, options: &SigIoOptions) -> ToolboxResult<Figure> {
    let input = as_signal(input, "input")?;
    let output = as_signal(output, "output")?;
    let complex = input.is_complex() || output.is_complex();

    let cols = if complex { 2 } else { 1 };
    let mut fig = Figure::new(options.title.as_str()).with_grid(2, cols);
    let axes = |panel: Panel| panel.with_x_limits(options.xlim).with_y_limits(options.ylim);

    for (row, (signal, name)) in [(&input, "Input"), (&output, "Output")].into_iter().enumerate() {
        let real = single_line(vec, signal.real(), BLUE)?;
        if complex {
            let imag = single_line(vec, signal.imag(), RED)?;
            fig.set_panel(row, 0, axes(real).with_title(format!("{name} - Real part")))?;
            fig.set_panel(row, 1, axes(imag).with_title(format!("{name} - imaginary part")))?;
        } else {
            fig.set_panel(row, 0, axes(real).with_title(name))?;
        }
    }
    debug!(complex, "built input/output figure");
    Ok(fig)
}

/// Plot each row of `signal` in its own subplot.
///
/// A one dimensional signal is plotted as a single row.
///
/// # Errors
///
/// [`ToolboxError::DimensionMismatch`] for signals of more than two
/// dimensions, or when the number of plot titles differs from the number of
/// signals.
pub fn time_sig(vec: &[f64], signal: &NdArray, options: &TimeSigOptions) -> ToolboxResult<Figure> {
    let n = signal.ndim();
    if n > 2 {
        return Err(ToolboxError::DimensionMismatch(format!(
            "Signal has {n} dimensions, should be less or equal than 2."
        )));
    }
    let rows = signal_rows(signal)?;
    let nb_sig = rows.len();

    let titles: Vec<String> = match &options.plot_titles {
        Some(titles) if titles.len() != nb_sig => {
            return Err(ToolboxError::DimensionMismatch(format!(
                "{} plot titles given for {nb_sig} signals",
                titles.len()
            )));
        }
        Some(titles) => titles.clone(),
        None => (1..=nb_sig).map(|n| format!("Signal {n}")).collect(),
    };

    let complex = signal.is_complex();
    let mut fig = Figure::new(options.title.as_str()).with_grid(nb_sig, if complex { 2 } else { 1 });
    let axes = |panel: Panel| panel.with_x_limits(options.xlim).with_y_limits(options.ylim);

    for (row, (sig, title)) in rows.iter().zip(titles).enumerate() {
        let real = single_line(vec, sig.real(), BLUE)?;
        if complex {
            let imag = single_line(vec, sig.imag(), RED)?;
            fig.set_panel(row, 0, axes(real).with_title(format!("{title} - real part")))?;
            fig.set_panel(row, 1, axes(imag).with_title(format!("{title} - imaginary part")))?;
        } else {
            fig.set_panel(row, 0, axes(real).with_title(title))?;
        }
    }
    debug!(nb_sig, complex, "built signal collection figure");
    Ok(fig)
}

/// Plot a collection of signal arrays side by side.
///
/// Column `j` shows the rows of `collection[j]`, one per subplot row.
///
/// # Errors
///
/// [`ToolboxError::DimensionMismatch`] when the collection is empty, when
/// the arrays differ in row count, or when titles do not match the grid.
pub fn coll(vec: &[f64], collection: &[Array2<f64>], options: &CollOptions) -> ToolboxResult<Figure> {
    let Some(first) = collection.first() else {
        return Err(ToolboxError::DimensionMismatch(
            "the collection of signals is empty".to_string(),
        ));
    };
    let nb_x = collection.len();
    let nb_y = first.nrows();
    if let Some(pos) = collection.iter().position(|arr| arr.nrows() != nb_y) {
        return Err(ToolboxError::DimensionMismatch(format!(
            "array {pos} has {} rows, expected {nb_y}",
            collection[pos].nrows()
        )));
    }
    check_title_count(options.column_titles.as_deref(), nb_x, "column")?;
    check_title_count(options.row_titles.as_deref(), nb_y, "row")?;

    let mut fig = Figure::new(options.title.as_str()).with_grid(nb_y, nb_x);
    for (nx, arr) in collection.iter().enumerate() {
        for (ny, row) in arr.outer_iter().enumerate() {
            let mut panel = Panel::lines(vec![LineData::new(vec.to_vec(), row.to_vec())?])
                .with_x_limits(options.xlim)
                .with_y_limits(options.ylim);
            if ny == 0 {
                if let Some(titles) = &options.column_titles {
                    panel = panel.with_title(titles[nx].as_str());
                }
            }
            if nx == 0 {
                if let Some(titles) = &options.row_titles {
                    panel = panel.with_y_label(titles[ny].as_str());
                }
            }
            fig.set_panel(ny, nx, panel)?;
        }
    }
    debug!(rows = nb_y, cols = nb_x, "built signal grid figure");
    Ok(fig)
}

/// Spectrogram of a real signal.
///
/// The magnitude is drawn as a color mesh over time and frequency. With
/// [`SpectrogramOptions::phase`] a second figure shows the phase.
pub fn spectrogram(signal: &[f64], options: &SpectrogramOptions) -> ToolboxResult<SpectrogramPlot> {
    let result = stft(signal, &options.stft)?;
    let times = result.times.to_vec();
    let freqs = result.frequencies.to_vec();
    let freq_scale = if options.logscale {
        AxisScale::symlog()
    } else {
        AxisScale::Linear
    };

    let amplitude = result.values.mapv(|c| c.norm());
    let (amplitude, amp_label) = if options.db {
        (safe_db_unit(&amplitude), "STFT Magnitude (dB)")
    } else {
        (amplitude, "STFT Magnitude")
    };

    let mesh = |values: Array2<f64>, label: &str| -> ToolboxResult<Panel> {
        let grid = GridData::new(times.clone(), freqs.clone(), values.reversed_axes())?;
        Ok(Panel::heatmap(grid, None)
            .with_title(label)
            .with_x_label(TIME_LABEL)
            .with_y_label(FREQUENCY_LABEL)
            .with_z_label(label)
            .with_y_scale(freq_scale)
            .with_colorbar())
    };

    let mut amp_fig = Figure::new(format!("{} (amplitude)", options.title));
    amp_fig.set_panel(0, 0, mesh(amplitude, amp_label)?)?;

    let phase_fig = if options.phase {
        let phase = result.values.mapv(|c| c.arg());
        let phase = if options.unwrap {
            unwrap_phase(&phase, Axis(0))?
        } else {
            phase
        };
        let mut fig = Figure::new(format!("{} (phase)", options.title));
        fig.set_panel(0, 0, mesh(phase, PHASE_LABEL)?)?;
        Some(fig)
    } else {
        None
    };

    debug!(frames = times.len(), bins = freqs.len(), phase = options.phase, "built spectrogram");
    Ok(SpectrogramPlot {
        amplitude: amp_fig,
        phase: phase_fig,
    })
}

/// Plot a Volterra kernel in the time domain.
///
/// - order 1: line plot
/// - order 2: surface, wireframe or contour according to the style
/// - order 3: animation of wireframes over the last axis
///
/// # Errors
///
/// [`ToolboxError::OrderMismatch`] for kernels of order above 3, and
/// [`ToolboxError::DimensionMismatch`] when `vec` does not match the kernel.
pub fn time_kernel(vec: &[f64], kernel: &NdArray, options: &TimeKernelOptions) -> ToolboxResult<PlotHandle> {
    let kernel = TimeKernel::try_from(kernel)?;
    let title = |default: &str| options.title.clone().unwrap_or_else(|| default.to_string());

    let handle = match kernel {
        TimeKernel::Order1(values) => {
            let panel = Panel::lines(vec![LineData::new(vec.to_vec(), values.to_vec())?])
                .with_x_label(TIME_LABEL)
                .with_y_label(AMPLITUDE_LABEL)
                .with_x_limits(AxisLimits::new(vec.first().copied(), vec.last().copied()));
            let mut fig = Figure::new(title("Volterra kernel of order 1 (linear filter)"));
            fig.set_panel(0, 0, panel)?;
            PlotHandle::Figure(fig)
        }
        TimeKernel::Order2(values) => {
            let grid = GridData::new(vec.to_vec(), vec.to_vec(), values.reversed_axes())?;
            let panel = kernel_panel(grid, options.style, options.nb_levels, true)
                .with_x_label(TIME_LABEL)
                .with_y_label(TIME_LABEL)
                .with_z_label(AMPLITUDE_LABEL);
            let mut fig = Figure::new(title("Volterra kernel of order 2"));
            fig.set_panel(0, 0, panel)?;
            PlotHandle::Figure(fig)
        }
        TimeKernel::Order3(values) => {
            let zlim = if options.set_zlim {
                finite_span(values.iter().copied())
                    .map(|(lo, hi)| AxisLimits::fixed(lo, hi))
                    .unwrap_or_default()
            } else {
                AxisLimits::default()
            };
            let title = title("Volterra kernel of order 3");
            let mut anim = Animation::new(title.as_str(), DEFAULT_FRAME_INTERVAL_MS);
            for slice in values.axis_iter(Axis(2)) {
                let grid = GridData::new(vec.to_vec(), vec.to_vec(), slice.t().to_owned())?;
                let panel = Panel::surface(grid, true)
                    .with_x_label(TIME_LABEL)
                    .with_y_label(TIME_LABEL)
                    .with_z_label(AMPLITUDE_LABEL)
                    .with_z_limits(zlim);
                let mut frame = Figure::new(title.as_str());
                frame.set_panel(0, 0, panel)?;
                anim.push_frame(frame);
            }
            PlotHandle::Animation(anim)
        }
    };
    debug!(title = handle.title(), "built time kernel plot");
    Ok(handle)
}

/// Plot a Volterra kernel in the frequency domain.
///
/// `vec` is the fft-shifted frequency vector. Only its upper half (the
/// positive frequencies) is shown on the first axis. Amplitude and phase
/// are drawn one above the other.
///
/// # Errors
///
/// [`ToolboxError::OrderMismatch`] for kernels of order above 2, and
/// [`ToolboxError::DimensionMismatch`] when `vec` does not match the kernel.
pub fn freq_kernel(vec: &[f64], kernel: &NdArray, options: &FreqKernelOptions) -> ToolboxResult<Figure> {
    let kernel = FreqKernel::try_from(kernel)?;
    let n = vec.len();
    let half = n / 2;
    let upper = vec[half..].to_vec();
    let x_limits = AxisLimits::new(Some(0.0), vec.last().copied());
    let amp_label = if options.db {
        "Magnitude (dB)"
    } else {
        "Magnitude"
    };
    let title = |default: &str| options.title.clone().unwrap_or_else(|| default.to_string());

    let fig = match kernel {
        FreqKernel::Order1(values) => {
            check_axis_length(values.len(), n)?;
            let (amplitude, phase) = amplitude_and_phase(&values, options)?;
            let x_scale = if options.logscale {
                AxisScale::Log
            } else {
                AxisScale::Linear
            };
            let amp = amplitude.slice(s![half..]).to_vec();
            let phase = phase.slice(s![half..]).to_vec();

            let mut fig = Figure::new(title("Transfer kernel of order 1 (linear filter)")).with_grid(2, 1);
            fig.set_panel(
                0,
                0,
                Panel::lines(vec![LineData::new(upper.clone(), amp)?])
                    .with_y_label(amp_label)
                    .with_x_scale(x_scale)
                    .with_x_limits(x_limits),
            )?;
            fig.set_panel(
                1,
                0,
                Panel::lines(vec![LineData::new(upper, phase)?])
                    .with_x_label(FREQUENCY_LABEL)
                    .with_y_label(PHASE_LABEL)
                    .with_x_scale(x_scale)
                    .with_x_limits(x_limits),
            )?;
            fig
        }
        FreqKernel::Order2(values) => {
            check_axis_length(values.nrows(), n)?;
            let (amplitude, phase) = amplitude_and_phase(&values, options)?;
            let scale = if options.logscale {
                AxisScale::symlog()
            } else {
                AxisScale::Linear
            };
            let panel = |values: Array2<f64>, label: &str| -> ToolboxResult<Panel> {
                let grid = GridData::new(upper.clone(), vec.to_vec(), values)?;
                Ok(kernel_panel(grid, options.style, options.nb_levels, false)
                    .with_title(label)
                    .with_x_label(FREQUENCY_LABEL)
                    .with_y_label(FREQUENCY_LABEL)
                    .with_z_label(label)
                    .with_x_scale(scale)
                    .with_y_scale(scale)
                    .with_x_limits(x_limits))
            };

            let mut fig = Figure::new(title("Transfer kernel of order 2")).with_grid(2, 1);
            fig.set_panel(0, 0, panel(amplitude.slice(s![half.., ..]).to_owned(), amp_label)?)?;
            fig.set_panel(1, 0, panel(phase.slice(s![half.., ..]).to_owned(), PHASE_LABEL)?)?;
            fig
        }
    };
    debug!(title = fig.title(), "built transfer kernel plot");
    Ok(fig)
}

/// Rows of a one or two dimensional signal.
fn signal_rows(signal: &NdArray) -> ToolboxResult<Vec<NdArray>> {
    fn rows<T: Clone>(arr: &ArrayD<T>) -> ToolboxResult<Vec<ArrayD<T>>> {
        let arr = match arr.ndim() {
            1 => arr.clone().insert_axis(Axis(0)),
            _ => arr.clone(),
        };
        let arr = arr
            .into_dimensionality::<Ix2>()
            .map_err(|e| ToolboxError::DimensionMismatch(e.to_string()))?;
        Ok(arr.outer_iter().map(|row| row.to_owned().into_dyn()).collect())
    }
    Ok(match signal {
        NdArray::Real(arr) => rows(arr)?.into_iter().map(NdArray::Real).collect(),
        NdArray::Complex(arr) => rows(arr)?.into_iter().map(NdArray::Complex).collect(),
    })
}

fn as_signal(arr: &NdArray, name: &str) -> ToolboxResult<NdArray> {
    if arr.ndim() != 1 {
        return Err(ToolboxError::DimensionMismatch(format!(
            "the {name} signal has {} dimensions, expected 1",
            arr.ndim()
        )));
    }
    Ok(arr.clone())
}

fn single_line(vec: &[f64], values: ArrayD<f64>, color: plotters::style::RGBColor) -> ToolboxResult<Panel> {
    let values = values
        .into_dimensionality::<Ix1>()
        .map_err(|e| ToolboxError::DimensionMismatch(e.to_string()))?;
    Ok(Panel::lines(vec![LineData::new(vec.to_vec(), values.to_vec())?.with_color(color)]))
}

fn check_title_count(titles: Option<&[String]>, expected: usize, what: &str) -> ToolboxResult<()> {
    match titles {
        Some(titles) if titles.len() != expected => Err(ToolboxError::DimensionMismatch(format!(
            "{} {what} titles given for {expected} {what}s",
            titles.len()
        ))),
        _ => Ok(()),
    }
}

fn check_axis_length(kernel_len: usize, vec_len: usize) -> ToolboxResult<()> {
    if kernel_len == vec_len {
        Ok(())
    } else {
        Err(ToolboxError::DimensionMismatch(format!(
            "kernel has {kernel_len} samples along its first axis but the frequency vector has {vec_len}"
        )))
    }
}

// Wireframes never get a colorbar; filled styles get one when `colorbar` is set.
fn kernel_panel(grid: GridData, style: KernelStyle, nb_levels: usize, colorbar: bool) -> Panel {
    let panel = match style {
        KernelStyle::Wireframe => return Panel::surface(grid, true),
        KernelStyle::Surface => Panel::surface(grid, false),
        KernelStyle::Contour => Panel::heatmap(grid, Some(nb_levels)),
    };
    if colorbar {
        panel.with_colorbar()
    } else {
        panel
    }
}

fn amplitude_and_phase<D: Dimension>(
    values: &Array<Complex64, D>,
    options: &FreqKernelOptions,
) -> ToolboxResult<(Array<f64, D>, Array<f64, D>)> {
    let amplitude = values.mapv(|c| c.norm());
    let amplitude = if options.db {
        safe_db_unit(&amplitude)
    } else {
        amplitude
    };
    let phase = values.mapv(|c| c.arg());
    let phase = if options.unwrap {
        unwrap_phase_all(&phase)?
    } else {
        phase
    };
    Ok((amplitude, phase))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plotbox::elements::PanelContent;
    use approx_eq::assert_approx_eq;
    use ndarray::{Array, Array1, Array3, IxDyn, array};

    fn linspace(n: usize) -> Vec<f64> {
        (0..n).map(|i| i as f64).collect()
    }

    fn titles(fig: &Figure) -> Vec<String> {
        fig.panels().filter_map(|p| p.title.clone()).collect()
    }

    fn lines(panel: &Panel) -> &[LineData] {
        match &panel.content {
            PanelContent::Lines(series) => series,
            other => panic!("expected lines, got {other:?}"),
        }
    }

    #[test]
    fn test_sig_io_real_layout() {
        let vec = linspace(4);
        let input = NdArray::from(array![0.0, 1.0, 0.0, -1.0]);
        let output = NdArray::from(array![0.0, 0.5, 0.0, -0.5]);
        let fig = sig_io(&vec, &input, &output, &SigIoOptions::default()).unwrap();

        assert_eq!(fig.layout(), (2, 1));
        assert_eq!(fig.title(), "Input and output signal of a system");
        assert_eq!(titles(&fig), vec!["Input", "Output"]);
        let output_line = &lines(fig.panel(1, 0).unwrap())[0];
        assert_eq!(output_line.y, vec![0.0, 0.5, 0.0, -0.5]);
        assert_eq!(output_line.color, Some(BLUE));
    }

    #[test]
    fn test_sig_io_complex_layout() {
        let vec = linspace(2);
        let input = NdArray::from(array![1.0, 2.0]);
        let output = NdArray::from(array![Complex64::new(1.0, -1.0), Complex64::new(0.0, 2.0)]);
        let fig = sig_io(&vec, &input, &output, &SigIoOptions::default().with_ylim(-3.0, 3.0)).unwrap();

        assert_eq!(fig.layout(), (2, 2));
        assert_eq!(
            titles(&fig),
            vec![
                "Input - Real part",
                "Input - imaginary part",
                "Output - Real part",
                "Output - imaginary part"
            ]
        );
        let imag = fig.panel(1, 1).unwrap();
        assert_eq!(lines(imag)[0].y, vec![-1.0, 2.0]);
        assert_eq!(lines(imag)[0].color, Some(RED));
        assert_eq!(imag.y_axis.limits, AxisLimits::fixed(-3.0, 3.0));
        // The real input has a zero imaginary part.
        assert_eq!(lines(fig.panel(0, 1).unwrap())[0].y, vec![0.0, 0.0]);
    }

    #[test]
    fn test_sig_io_length_mismatch() {
        let input = NdArray::from(array![1.0, 2.0, 3.0]);
        assert!(sig_io(&linspace(2), &input, &input, &SigIoOptions::default()).is_err());
    }

    #[test]
    fn test_time_sig_rejects_rank_three() {
        let signal = NdArray::from(Array3::<f64>::zeros((2, 2, 2)));
        let err = time_sig(&linspace(2), &signal, &TimeSigOptions::default()).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Dimension mismatch error: Signal has 3 dimensions, should be less or equal than 2."
        );
    }

    #[test]
    fn test_time_sig_single_signal() {
        let signal = NdArray::from(array![1.0, 2.0, 3.0]);
        let fig = time_sig(&linspace(3), &signal, &TimeSigOptions::default()).unwrap();
        assert_eq!(fig.layout(), (1, 1));
        assert_eq!(fig.title(), "Collection of signals");
        assert_eq!(titles(&fig), vec!["Signal 1"]);
    }

    #[test]
    fn test_time_sig_complex_rows() {
        let signal = NdArray::from(Array::from_elem((3, 4), Complex64::new(1.0, 2.0)));
        let options = TimeSigOptions::default().with_plot_titles(["a", "b", "c"]);
        let fig = time_sig(&linspace(4), &signal, &options).unwrap();
        assert_eq!(fig.layout(), (3, 2));
        assert_eq!(fig.panel(2, 1).and_then(|p| p.title.as_deref()), Some("c - imaginary part"));
        assert_eq!(lines(fig.panel(1, 1).unwrap())[0].y, vec![2.0; 4]);

        let wrong = TimeSigOptions::default().with_plot_titles(["only one"]);
        assert!(time_sig(&linspace(4), &signal, &wrong).is_err());
    }

    #[test]
    fn test_coll_grid() {
        let a = array![[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]];
        let b = a.mapv(|v| -v);
        let options = CollOptions::default()
            .with_column_titles(["first", "second"])
            .with_row_titles(["r1", "r2", "r3"]);
        let fig = coll(&linspace(2), &[a, b], &options).unwrap();

        assert_eq!(fig.layout(), (3, 2));
        assert_eq!(fig.panel(0, 1).and_then(|p| p.title.as_deref()), Some("second"));
        assert!(fig.panel(1, 1).unwrap().title.is_none());
        assert_eq!(fig.panel(2, 0).unwrap().y_axis.label.as_deref(), Some("r3"));
        assert!(fig.panel(2, 1).unwrap().y_axis.label.is_none());
        assert_eq!(lines(fig.panel(1, 1).unwrap())[0].y, vec![-3.0, -4.0]);
    }

    #[test]
    fn test_coll_rejects_mismatched_rows() {
        let a = Array2::<f64>::zeros((2, 3));
        let b = Array2::<f64>::zeros((3, 3));
        assert!(coll(&linspace(3), &[a, b], &CollOptions::default()).is_err());
        assert!(coll(&linspace(3), &[], &CollOptions::default()).is_err());
    }

    #[test]
    fn test_spectrogram_figures() {
        let signal: Vec<f64> = (0..128).map(|n| (n as f64 * 0.3).sin()).collect();
        let options = SpectrogramOptions::default()
            .with_stft(StftParams::default().with_nperseg(32).with_fs(100.0))
            .with_phase(true)
            .with_logscale(true);
        let plot = spectrogram(&signal, &options).unwrap();

        assert_eq!(plot.amplitude.title(), "Short-Time Fourier Transform (amplitude)");
        let panel = plot.amplitude.panel(0, 0).unwrap();
        assert_eq!(panel.title.as_deref(), Some("STFT Magnitude (dB)"));
        assert_eq!(panel.y_axis.scale, AxisScale::symlog());
        assert!(panel.colorbar);
        match &panel.content {
            // 128 samples with 16 boundary zeros on each side and a hop of 16.
            PanelContent::Heatmap { grid, .. } => {
                assert_eq!(grid.values.dim(), (9, 17));
                assert_eq!(grid.y.len(), 17);
                assert_approx_eq!(grid.y[16], 50.0, 1e-12);
            }
            other => panic!("expected a heatmap, got {other:?}"),
        }

        let phase = plot.phase.unwrap();
        assert_eq!(phase.title(), "Short-Time Fourier Transform (phase)");
        assert_eq!(phase.panel(0, 0).and_then(|p| p.title.as_deref()), Some("Phase (radians)"));
    }

    #[test]
    fn test_spectrogram_without_db_or_phase() {
        let signal = vec![1.0; 64];
        let options = SpectrogramOptions::default()
            .with_db(false)
            .with_stft(StftParams::default().with_nperseg(16));
        let plot = spectrogram(&signal, &options).unwrap();
        assert!(plot.phase.is_none());
        let panel = plot.amplitude.panel(0, 0).unwrap();
        assert_eq!(panel.title.as_deref(), Some("STFT Magnitude"));
        assert_eq!(panel.y_axis.scale, AxisScale::Linear);
    }

    #[test]
    fn test_time_kernel_order_one() {
        let vec = vec![0.0, 0.1, 0.2];
        let kernel = NdArray::from(array![1.0, 0.5, 0.25]);
        let handle = time_kernel(&vec, &kernel, &TimeKernelOptions::default()).unwrap();
        let fig = handle.as_figure().unwrap();
        assert_eq!(fig.title(), "Volterra kernel of order 1 (linear filter)");
        let panel = fig.panel(0, 0).unwrap();
        assert_eq!(panel.x_axis.limits, AxisLimits::fixed(0.0, 0.2));
        assert_eq!(panel.y_axis.label.as_deref(), Some("Amplitude"));
    }

    #[test]
    fn test_time_kernel_order_two_styles() {
        let vec = linspace(3);
        let kernel = NdArray::from(array![[0.0, 1.0, 2.0], [3.0, 4.0, 5.0], [6.0, 7.0, 8.0]]);

        let contour = TimeKernelOptions::default().with_style(KernelStyle::Contour).with_nb_levels(7);
        let handle = time_kernel(&vec, &kernel, &contour).unwrap();
        let fig = handle.as_figure().unwrap();
        assert_eq!(fig.title(), "Volterra kernel of order 2");
        let panel = fig.panel(0, 0).unwrap();
        assert!(panel.colorbar);
        match &panel.content {
            PanelContent::Heatmap { grid, levels } => {
                assert_eq!(*levels, Some(7));
                // Grid values are indexed [x, y]: x follows the kernel's second axis.
                assert_eq!(grid.values[[2, 0]], 2.0);
                assert_eq!(grid.values[[0, 2]], 6.0);
            }
            other => panic!("expected a heatmap, got {other:?}"),
        }

        let wire = time_kernel(&vec, &kernel, &TimeKernelOptions::default()).unwrap();
        let panel = wire.as_figure().unwrap().panel(0, 0).unwrap();
        assert!(matches!(panel.content, PanelContent::Surface { wireframe: true, .. }));
        assert!(!panel.colorbar);

        let surface = TimeKernelOptions::default().with_style(KernelStyle::Surface);
        let handle = time_kernel(&vec, &kernel, &surface).unwrap();
        let panel = handle.as_figure().unwrap().panel(0, 0).unwrap();
        assert!(matches!(panel.content, PanelContent::Surface { wireframe: false, .. }));
        assert!(panel.colorbar);
    }

    #[test]
    fn test_time_kernel_order_three_animation() {
        let vec = linspace(2);
        let values = Array3::from_shape_fn((2, 2, 4), |(i, j, k)| (i + j + k) as f64);
        let kernel = NdArray::from(values);

        let handle = time_kernel(&vec, &kernel, &TimeKernelOptions::default()).unwrap();
        let anim = handle.as_animation().unwrap();
        assert_eq!(anim.len(), 4);
        assert_eq!(anim.interval_ms(), 100);
        assert_eq!(anim.title(), "Volterra kernel of order 3");
        let last = anim.frames()[3].panel(0, 0).unwrap();
        assert_eq!(last.z_axis.limits, AxisLimits::fixed(0.0, 5.0));

        let free = TimeKernelOptions::default().with_set_zlim(false);
        let handle = time_kernel(&vec, &kernel, &free).unwrap();
        let first = handle.as_animation().unwrap().frames()[0].panel(0, 0).unwrap();
        assert!(first.z_axis.limits.is_auto());
    }

    #[test]
    fn test_time_kernel_order_four_fails() {
        let kernel = NdArray::from(Array::<f64, _>::zeros(IxDyn(&[10, 10, 10, 10])));
        let err = time_kernel(&linspace(10), &kernel, &TimeKernelOptions::default()).unwrap_err();
        assert!(matches!(err, ToolboxError::OrderMismatch { order: 4, max: 3 }));
    }

    #[test]
    fn test_freq_kernel_order_one() {
        let vec = vec![-2.0, -1.0, 0.0, 1.0];
        let kernel = NdArray::from(Array1::from_elem(4, Complex64::new(0.0, 10.0)));
        let fig = freq_kernel(&vec, &kernel, &FreqKernelOptions::default().with_logscale(true)).unwrap();

        assert_eq!(fig.layout(), (2, 1));
        assert_eq!(fig.title(), "Transfer kernel of order 1 (linear filter)");
        let amp = fig.panel(0, 0).unwrap();
        assert_eq!(amp.y_axis.label.as_deref(), Some("Magnitude (dB)"));
        assert_eq!(amp.x_axis.scale, AxisScale::Log);
        assert_eq!(amp.x_axis.limits, AxisLimits::fixed(0.0, 1.0));
        let line = &lines(amp)[0];
        assert_eq!(line.x, vec![0.0, 1.0]);
        assert_approx_eq!(line.y[0], 20.0, 1e-12);

        let phase = fig.panel(1, 0).unwrap();
        assert_eq!(phase.x_axis.label.as_deref(), Some("Frequency (Hz)"));
        assert_approx_eq!(lines(phase)[0].y[1], std::f64::consts::FRAC_PI_2, 1e-12);
    }

    #[test]
    fn test_freq_kernel_order_two() {
        let vec = vec![-1.0, 0.0, 1.0, 2.0];
        let kernel = NdArray::from(Array2::from_elem((4, 4), Complex64::new(1.0, 0.0)));
        let options = FreqKernelOptions::default()
            .with_db(false)
            .with_style(KernelStyle::Surface)
            .with_logscale(true);
        let fig = freq_kernel(&vec, &kernel, &options).unwrap();

        assert_eq!(fig.title(), "Transfer kernel of order 2");
        let amp = fig.panel(0, 0).unwrap();
        assert_eq!(amp.title.as_deref(), Some("Magnitude"));
        assert_eq!(amp.x_axis.scale, AxisScale::symlog());
        assert_eq!(amp.y_axis.scale, AxisScale::symlog());
        match &amp.content {
            PanelContent::Surface { grid, wireframe } => {
                assert!(!wireframe);
                assert_eq!(grid.x, vec![1.0, 2.0]);
                assert_eq!(grid.y, vec);
                assert_eq!(grid.values.dim(), (2, 4));
            }
            other => panic!("expected a surface, got {other:?}"),
        }
        assert!(!amp.colorbar);
        assert_eq!(fig.panel(1, 0).and_then(|p| p.title.as_deref()), Some("Phase (radians)"));

        let contour = FreqKernelOptions::default().with_style(KernelStyle::Contour);
        let fig = freq_kernel(&vec, &kernel, &contour).unwrap();
        assert!(fig.panels().all(|p| !p.colorbar));
        assert!(matches!(fig.panel(0, 0).unwrap().content, PanelContent::Heatmap { .. }));
    }

    #[test]
    fn test_freq_kernel_order_three_fails() {
        let kernel = NdArray::from(Array3::<Complex64>::zeros((2, 2, 2)));
        let err = freq_kernel(&linspace(2), &kernel, &FreqKernelOptions::default()).unwrap_err();
        assert!(matches!(err, ToolboxError::OrderMismatch { order: 3, max: 2 }));
    }
}
