//! Numerical helpers used by the plotting routines.
//!
//! - [`safe_db`]: decibel conversion that never produces infinities
//! - [`unwrap_phase`]: removal of 2π jumps along one axis
//! - [`stft`]: short-time Fourier transform with SciPy compatible defaults

pub mod stft;

use std::f64::consts::PI;

use ndarray::{Array, Axis, Dimension, Zip};

use crate::{ToolboxError, ToolboxResult};

pub use stft::{Stft, StftParams, WindowType, generate_window, stft};

/// Converts the ratio `amplitude / reference` to decibels.
///
/// Uses `20 * log10(amplitude / reference)`. Entries where either operand is
/// zero, or where the ratio is not a positive finite number, are floored to
/// 0 dB so the result can always be plotted.
///
/// # Errors
///
/// [`ToolboxError::DimensionMismatch`] when the two arrays differ in shape.
///
/// # Examples
///
/// ```rust
/// use signal_toolbox::mathbox::safe_db;
/// use ndarray::array;
///
/// let db = safe_db(&array![10.0, 0.0, 1.0], &array![1.0, 1.0, 1.0]).unwrap();
/// assert_eq!(db, array![20.0, 0.0, 0.0]);
/// ```
pub fn safe_db<D: Dimension>(
    amplitude: &Array<f64, D>,
    reference: &Array<f64, D>,
) -> ToolboxResult<Array<f64, D>> {
    if amplitude.shape() != reference.shape() {
        return Err(ToolboxError::DimensionMismatch(format!(
            "amplitude has shape {:?} but reference has shape {:?}",
            amplitude.shape(),
            reference.shape()
        )));
    }

    Ok(Zip::from(amplitude)
        .and(reference)
        .map_collect(|&num, &den| {
            let ratio = num / den;
            if num == 0.0 || den == 0.0 || !ratio.is_finite() || ratio <= 0.0 {
                0.0
            } else {
                20.0 * ratio.log10()
            }
        }))
}

/// Decibels relative to a unit reference.
pub fn safe_db_unit<D: Dimension>(amplitude: &Array<f64, D>) -> Array<f64, D> {
    amplitude.mapv(|a| if a > 0.0 && a.is_finite() { 20.0 * a.log10() } else { 0.0 })
}

/// Unwraps a phase signal along `axis`.
///
/// Whenever two consecutive samples differ by more than π, multiples of 2π
/// are added to the remainder of the lane so that the jump disappears.
///
/// # Errors
///
/// [`ToolboxError::InvalidParameter`] when `axis` does not exist.
pub fn unwrap_phase<D: Dimension>(phase: &Array<f64, D>, axis: Axis) -> ToolboxResult<Array<f64, D>> {
    if axis.index() >= phase.ndim() {
        return Err(ToolboxError::InvalidParameter(format!(
            "axis {} is out of bounds for an array of {} dimensions",
            axis.index(),
            phase.ndim()
        )));
    }

    let mut out = phase.clone();
    for mut lane in out.lanes_mut(axis) {
        let Some(mut prev) = lane.get(0).copied() else {
            continue;
        };
        let mut correction = 0.0;
        for value in lane.iter_mut().skip(1) {
            let original = *value;
            let delta = original - prev;
            let mut wrapped = (delta + PI).rem_euclid(2.0 * PI) - PI;
            if wrapped == -PI && delta > 0.0 {
                wrapped = PI;
            }
            if delta.abs() >= PI {
                correction += wrapped - delta;
            }
            prev = original;
            *value = original + correction;
        }
    }
    Ok(out)
}

/// Unwraps a phase array successively along every axis.
pub fn unwrap_phase_all<D: Dimension>(phase: &Array<f64, D>) -> ToolboxResult<Array<f64, D>> {
    (0..phase.ndim()).try_fold(phase.clone(), |acc, ax| unwrap_phase(&acc, Axis(ax)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx_eq::assert_approx_eq;
    use ndarray::{Array1, array};

    #[test]
    fn test_safe_db_floors_zero_entries() {
        let db = safe_db(&array![[100.0, 0.0], [1.0, 5.0]], &array![[1.0, 1.0], [0.0, 5.0]]).unwrap();
        assert_approx_eq!(db[[0, 0]], 40.0, 1e-12);
        assert_eq!(db[[0, 1]], 0.0);
        assert_eq!(db[[1, 0]], 0.0);
        assert_eq!(db[[1, 1]], 0.0);
        assert!(db.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_safe_db_shape_mismatch() {
        let err = safe_db(&array![1.0, 2.0], &array![1.0]).unwrap_err();
        assert!(matches!(err, ToolboxError::DimensionMismatch(_)));
    }

    #[test]
    fn test_safe_db_unit_matches_reference_of_ones() {
        let amp = array![0.5, 0.0, 2.0];
        let ones = Array1::ones(3);
        assert_eq!(safe_db_unit(&amp), safe_db(&amp, &ones).unwrap());
    }

    #[test]
    fn test_unwrap_removes_jumps() {
        // Linearly increasing phase, wrapped into (-pi, pi].
        let truth: Array1<f64> = Array1::from_iter((0..20).map(|i| i as f64 * 0.9));
        let wrapped = truth.mapv(|p| (p + PI).rem_euclid(2.0 * PI) - PI);
        let unwrapped = unwrap_phase(&wrapped, Axis(0)).unwrap();
        for (u, t) in unwrapped.iter().zip(truth.iter()) {
            assert_approx_eq!(*u, *t, 1e-9);
        }
    }

    #[test]
    fn test_unwrap_along_second_axis_only() {
        let phase = array![[0.0, 3.0, -3.0], [0.0, 0.1, -2.5]];
        let along_rows = unwrap_phase(&phase, Axis(1)).unwrap();
        assert_approx_eq!(along_rows[[0, 2]], -3.0 + 2.0 * PI, 1e-12);
        assert_eq!(along_rows.row(1), phase.row(1));

        let along_cols = unwrap_phase(&phase, Axis(0)).unwrap();
        assert_eq!(along_cols, phase);
    }

    #[test]
    fn test_unwrap_invalid_axis() {
        assert!(unwrap_phase(&array![0.0, 1.0], Axis(1)).is_err());
    }

    #[test]
    fn test_unwrap_all_axes_keeps_shape() {
        let phase = array![[0.0, 3.0], [-3.0, 0.0]];
        let unwrapped = unwrap_phase_all(&phase).unwrap();
        assert_eq!(unwrapped.shape(), phase.shape());
    }
}
