//! Rank dispatch of Volterra kernels.
//!
//! The order of a kernel is its number of dimensions. Plotting routines
//! resolve it once into one of the tagged types below and match on that.

use ndarray::{Array1, Array2, Array3, Ix1, Ix2, Ix3};
use num_complex::Complex64;
use tracing::warn;

use crate::repr::NdArray;
use crate::{ToolboxError, ToolboxResult};

/// Highest order [`TimeKernel`] supports.
pub const MAX_TIME_KERNEL_ORDER: usize = 3;

/// Highest order [`FreqKernel`] supports.
pub const MAX_FREQ_KERNEL_ORDER: usize = 2;

/// A real kernel in the time domain.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeKernel {
    /// Impulse response of a linear filter.
    Order1(Array1<f64>),
    /// Second order kernel, drawn as a surface or contour map.
    Order2(Array2<f64>),
    /// Third order kernel, animated along its first axis.
    Order3(Array3<f64>),
}

impl TimeKernel {
    /// Number of dimensions of the kernel.
    pub fn order(&self) -> usize {
        match self {
            TimeKernel::Order1(_) => 1,
            TimeKernel::Order2(_) => 2,
            TimeKernel::Order3(_) => 3,
        }
    }
}

impl TryFrom<&NdArray> for TimeKernel {
    type Error = ToolboxError;

    /// Complex kernels are reduced to their real part.
    fn try_from(kernel: &NdArray) -> ToolboxResult<Self> {
        let order = kernel.ndim();
        if order == 0 || order > MAX_TIME_KERNEL_ORDER {
            return Err(ToolboxError::OrderMismatch {
                order,
                max: MAX_TIME_KERNEL_ORDER,
            });
        }
        if kernel.is_complex() {
            warn!("time kernel has complex values, only the real part is plotted");
        }
        let real = kernel.real();
        let mismatch = |e: ndarray::ShapeError| ToolboxError::DimensionMismatch(e.to_string());
        Ok(match order {
            1 => TimeKernel::Order1(real.into_dimensionality::<Ix1>().map_err(mismatch)?),
            2 => TimeKernel::Order2(real.into_dimensionality::<Ix2>().map_err(mismatch)?),
            _ => TimeKernel::Order3(real.into_dimensionality::<Ix3>().map_err(mismatch)?),
        })
    }
}

/// A complex kernel in the frequency domain.
#[derive(Debug, Clone, PartialEq)]
pub enum FreqKernel {
    /// Transfer function of a linear filter.
    Order1(Array1<Complex64>),
    /// Second order transfer kernel.
    Order2(Array2<Complex64>),
}

impl FreqKernel {
    /// Number of dimensions of the kernel.
    pub fn order(&self) -> usize {
        match self {
            FreqKernel::Order1(_) => 1,
            FreqKernel::Order2(_) => 2,
        }
    }
}

impl TryFrom<&NdArray> for FreqKernel {
    type Error = ToolboxError;

    fn try_from(kernel: &NdArray) -> ToolboxResult<Self> {
        let order = kernel.ndim();
        if order == 0 || order > MAX_FREQ_KERNEL_ORDER {
            return Err(ToolboxError::OrderMismatch {
                order,
                max: MAX_FREQ_KERNEL_ORDER,
            });
        }
        let values = kernel.to_complex();
        let mismatch = |e: ndarray::ShapeError| ToolboxError::DimensionMismatch(e.to_string());
        Ok(match order {
            1 => FreqKernel::Order1(values.into_dimensionality::<Ix1>().map_err(mismatch)?),
            _ => FreqKernel::Order2(values.into_dimensionality::<Ix2>().map_err(mismatch)?),
        })
    }
}
