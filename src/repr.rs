//! Core array representation shared by the plotting and persistence modules.
//!
//! Signals and kernels handled by this crate are dense, dynamically ranked
//! arrays whose elements are either real (`f64`) or complex (`Complex<f64>`).
//! [`NdArray`] captures that choice once so that callers can hand either kind
//! to a plotting routine, and the routine can decide on its layout (for
//! instance real/imaginary columns) from [`NdArray::is_complex`].
//!
//! # Examples
//!
//! ```rust
//! use signal_toolbox::NdArray;
//! use ndarray::array;
//! use num_complex::Complex64;
//!
//! let real = NdArray::from(array![1.0, 2.0, 3.0]);
//! assert!(!real.is_complex());
//! assert_eq!(real.shape(), &[3]);
//!
//! let complex = NdArray::from(array![[Complex64::new(0.0, 1.0)]]);
//! assert!(complex.is_complex());
//! assert_eq!(complex.ndim(), 2);
//! ```

use ndarray::{Array, ArrayD, Dimension, IxDyn};
use num_complex::Complex64;
use serde::{Deserialize, Serialize};

/// A dense array of dynamic rank holding real or complex samples.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NdArray {
    /// Real valued samples.
    Real(ArrayD<f64>),
    /// Complex valued samples.
    Complex(ArrayD<Complex64>),
}

impl NdArray {
    /// Number of dimensions (the order of a kernel).
    pub fn ndim(&self) -> usize {
        match self {
            NdArray::Real(arr) => arr.ndim(),
            NdArray::Complex(arr) => arr.ndim(),
        }
    }

    /// Shape of the array.
    pub fn shape(&self) -> &[usize] {
        match self {
            NdArray::Real(arr) => arr.shape(),
            NdArray::Complex(arr) => arr.shape(),
        }
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        match self {
            NdArray::Real(arr) => arr.len(),
            NdArray::Complex(arr) => arr.len(),
        }
    }

    /// Returns true when the array holds no element.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns true when the elements are complex.
    pub const fn is_complex(&self) -> bool {
        matches!(self, NdArray::Complex(_))
    }

    /// NumPy style name of the element type.
    pub const fn dtype(&self) -> &'static str {
        match self {
            NdArray::Real(_) => "float64",
            NdArray::Complex(_) => "complex128",
        }
    }

    /// Real part of every element.
    pub fn real(&self) -> ArrayD<f64> {
        match self {
            NdArray::Real(arr) => arr.clone(),
            NdArray::Complex(arr) => arr.mapv(|c| c.re),
        }
    }

    /// Imaginary part of every element (zeros for a real array).
    pub fn imag(&self) -> ArrayD<f64> {
        match self {
            NdArray::Real(arr) => ArrayD::zeros(arr.raw_dim()),
            NdArray::Complex(arr) => arr.mapv(|c| c.im),
        }
    }

    /// Magnitude of every element.
    pub fn abs(&self) -> ArrayD<f64> {
        match self {
            NdArray::Real(arr) => arr.mapv(f64::abs),
            NdArray::Complex(arr) => arr.mapv(|c| c.norm()),
        }
    }

    /// Phase angle of every element, in radians within `(-pi, pi]`.
    pub fn angle(&self) -> ArrayD<f64> {
        match self {
            NdArray::Real(arr) => arr.mapv(|x| if x < 0.0 { std::f64::consts::PI } else { 0.0 }),
            NdArray::Complex(arr) => arr.mapv(|c| c.arg()),
        }
    }

    /// Copy of the data promoted to complex elements.
    pub fn to_complex(&self) -> ArrayD<Complex64> {
        match self {
            NdArray::Real(arr) => arr.mapv(|x| Complex64::new(x, 0.0)),
            NdArray::Complex(arr) => arr.clone(),
        }
    }

    /// Borrow the shape as an `IxDyn` dimension.
    pub fn raw_dim(&self) -> IxDyn {
        match self {
            NdArray::Real(arr) => arr.raw_dim(),
            NdArray::Complex(arr) => arr.raw_dim(),
        }
    }
}

impl<D: Dimension> From<Array<f64, D>> for NdArray {
    fn from(arr: Array<f64, D>) -> Self {
        NdArray::Real(arr.into_dyn())
    }
}

impl<D: Dimension> From<Array<Complex64, D>> for NdArray {
    fn from(arr: Array<Complex64, D>) -> Self {
        NdArray::Complex(arr.into_dyn())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx_eq::assert_approx_eq;
    use ndarray::array;

    #[test]
    fn test_real_array_introspection() {
        let arr = NdArray::from(array![[1.0, -2.0, 3.0], [4.0, 5.0, 6.0]]);
        assert_eq!(arr.ndim(), 2);
        assert_eq!(arr.shape(), &[2, 3]);
        assert_eq!(arr.len(), 6);
        assert!(!arr.is_complex());
        assert_eq!(arr.dtype(), "float64");
        assert!(arr.imag().iter().all(|&v| v == 0.0));
        assert_eq!(arr.abs()[[0, 1]], 2.0);
    }

    #[test]
    fn test_complex_decomposition() {
        let arr = NdArray::from(array![Complex64::new(3.0, 4.0), Complex64::new(0.0, -1.0)]);
        assert!(arr.is_complex());
        assert_eq!(arr.dtype(), "complex128");
        assert_eq!(arr.real()[[0]], 3.0);
        assert_eq!(arr.imag()[[1]], -1.0);
        assert_approx_eq!(arr.abs()[[0]], 5.0, 1e-12);
        assert_approx_eq!(arr.angle()[[1]], -std::f64::consts::FRAC_PI_2, 1e-12);
    }

    #[test]
    fn test_real_angle_matches_sign() {
        let arr = NdArray::from(array![-1.0, 0.0, 2.0]);
        let angle = arr.angle();
        assert_approx_eq!(angle[[0]], std::f64::consts::PI, 1e-12);
        assert_eq!(angle[[1]], 0.0);
        assert_eq!(angle[[2]], 0.0);
    }
}
