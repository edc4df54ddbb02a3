//! Short-Time Fourier Transform.
//!
//! The defaults of [`StftParams`] reproduce `scipy.signal.stft`: a periodic
//! Hann window of 256 samples, 50 % overlap, zero extension of half a window
//! on both ends, zero padding to a whole number of frames, a one-sided
//! spectrum and "spectrum" scaling (division by the window sum).

use std::f64::consts::PI;

use ndarray::{Array1, Array2};
use num_complex::Complex;
use num_traits::Zero;
use rustfft::FftPlanner;
use tracing::warn;

use crate::{ToolboxError, ToolboxResult};

/// Window function applied to each segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WindowType {
    /// Rectangular window (no windowing).
    Rectangular,
    /// Hann window.
    #[default]
    Hann,
    /// Hamming window.
    Hamming,
    /// Blackman window.
    Blackman,
}

/// Generate window function coefficients.
///
/// Windows are periodic (DFT-even), as used for spectral analysis.
pub fn generate_window(size: usize, window_type: WindowType) -> Vec<f64> {
    if size <= 1 {
        return vec![1.0; size];
    }
    let n_max = size as f64;
    match window_type {
        WindowType::Rectangular => vec![1.0; size],
        WindowType::Hann => (0..size)
            .map(|i| 0.5 - 0.5 * (2.0 * PI * i as f64 / n_max).cos())
            .collect(),
        WindowType::Hamming => (0..size)
            .map(|i| 0.54 - 0.46 * (2.0 * PI * i as f64 / n_max).cos())
            .collect(),
        WindowType::Blackman => (0..size)
            .map(|i| {
                let n = i as f64;
                0.42 - 0.5 * (2.0 * PI * n / n_max).cos() + 0.08 * (4.0 * PI * n / n_max).cos()
            })
            .collect(),
    }
}

/// Parameters of [`stft`].
#[derive(Debug, Clone, PartialEq)]
pub struct StftParams {
    /// Sampling frequency of the signal, in Hz.
    pub fs: f64,
    /// Window applied to each segment.
    pub window: WindowType,
    /// Length of each segment.
    pub nperseg: usize,
    /// Number of overlapping samples. Defaults to `nperseg / 2`.
    pub noverlap: Option<usize>,
    /// FFT length. Defaults to `nperseg`.
    pub nfft: Option<usize>,
    /// Extend the signal with `nperseg / 2` zeros on both ends.
    pub boundary: bool,
    /// Zero-pad the end of the signal to fit a whole number of segments.
    pub padded: bool,
}

impl Default for StftParams {
    fn default() -> Self {
        Self {
            fs: 1.0,
            window: WindowType::Hann,
            nperseg: 256,
            noverlap: None,
            nfft: None,
            boundary: true,
            padded: true,
        }
    }
}

impl StftParams {
    /// Set the sampling frequency.
    pub const fn with_fs(mut self, fs: f64) -> Self {
        self.fs = fs;
        self
    }

    /// Set the segment length.
    pub const fn with_nperseg(mut self, nperseg: usize) -> Self {
        self.nperseg = nperseg;
        self
    }

    /// Set the overlap between segments.
    pub const fn with_noverlap(mut self, noverlap: usize) -> Self {
        self.noverlap = Some(noverlap);
        self
    }

    /// Set the window.
    pub const fn with_window(mut self, window: WindowType) -> Self {
        self.window = window;
        self
    }
}

/// Result of [`stft`].
#[derive(Debug, Clone)]
pub struct Stft {
    /// Frequency of each row, in Hz.
    pub frequencies: Array1<f64>,
    /// Time of each column, in seconds.
    pub times: Array1<f64>,
    /// Complex spectrum, frequency bins × time frames.
    pub values: Array2<Complex<f64>>,
}

/// Computes the Short-Time Fourier Transform of a real signal.
///
/// When `nperseg` exceeds the signal length it is reduced to that length.
///
/// # Errors
///
/// [`ToolboxError::InvalidParameter`] for an empty signal, a non-positive
/// sampling frequency, `noverlap >= nperseg` or `nfft < nperseg`.
pub fn stft(signal: &[f64], params: &StftParams) -> ToolboxResult<Stft> {
    if signal.is_empty() {
        return Err(ToolboxError::InvalidParameter(
            "cannot compute the STFT of an empty signal".to_string(),
        ));
    }
    if !(params.fs.is_finite() && params.fs > 0.0) {
        return Err(ToolboxError::InvalidParameter(format!(
            "sampling frequency must be positive, got {}",
            params.fs
        )));
    }
    if params.nperseg == 0 {
        return Err(ToolboxError::InvalidParameter(
            "nperseg must be greater than 0".to_string(),
        ));
    }

    let nperseg = if params.nperseg > signal.len() {
        warn!(
            "nperseg = {} is greater than input length = {}, using nperseg = {}",
            params.nperseg,
            signal.len(),
            signal.len()
        );
        signal.len()
    } else {
        params.nperseg
    };

    let noverlap = params.noverlap.unwrap_or(nperseg / 2);
    if noverlap >= nperseg {
        return Err(ToolboxError::InvalidParameter(format!(
            "noverlap ({noverlap}) must be less than nperseg ({nperseg})"
        )));
    }
    let nfft = params.nfft.unwrap_or(nperseg);
    if nfft < nperseg {
        return Err(ToolboxError::InvalidParameter(format!(
            "nfft ({nfft}) must be greater than or equal to nperseg ({nperseg})"
        )));
    }
    let hop = nperseg - noverlap;

    let edge = if params.boundary { nperseg / 2 } else { 0 };
    let mut samples = Vec::with_capacity(signal.len() + 2 * edge + hop);
    samples.resize(edge, 0.0);
    samples.extend_from_slice(signal);
    samples.resize(samples.len() + edge, 0.0);

    if params.padded {
        let remainder = (samples.len() - nperseg) % hop;
        if remainder != 0 {
            samples.resize(samples.len() + hop - remainder, 0.0);
        }
    }

    let num_frames = (samples.len() - nperseg) / hop + 1;
    let num_bins = nfft / 2 + 1;

    let window = generate_window(nperseg, params.window);
    let scale = 1.0 / window.iter().sum::<f64>();

    let mut values = Array2::zeros((num_bins, num_frames));
    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(nfft);
    let mut frame_buffer = vec![Complex::zero(); nfft];

    for frame_idx in 0..num_frames {
        let start = frame_idx * hop;
        for (slot, (&sample, &w)) in frame_buffer
            .iter_mut()
            .zip(samples[start..start + nperseg].iter().zip(window.iter()))
        {
            *slot = Complex::new(sample * w, 0.0);
        }
        frame_buffer[nperseg..].fill(Complex::zero());

        fft.process(&mut frame_buffer);

        for (freq_idx, &value) in frame_buffer.iter().take(num_bins).enumerate() {
            values[[freq_idx, frame_idx]] = value * scale;
        }
    }

    let frequencies = Array1::from_iter((0..num_bins).map(|k| k as f64 * params.fs / nfft as f64));
    let offset = edge as f64 / params.fs;
    let times = Array1::from_iter(
        (0..num_frames).map(|k| (nperseg as f64 / 2.0 + (k * hop) as f64) / params.fs - offset),
    );

    Ok(Stft {
        frequencies,
        times,
        values,
    })
}
