//! Projection onto the unit sphere along the trailing axis.
//!
//! Both mixture components live on a sphere: the CACG on the complex unit
//! sphere (modulo phase) and the vMF on the real one. Every vector handed to a
//! density or fitter goes through these helpers first.
//!
//! Norms are floored at [`TINY`], so a zero vector stays a zero vector instead
//! of turning into NaNs.

use ndarray::{Array, ArrayView, Axis, Dimension};
use num_complex::Complex64;

/// Smallest positive normal `f64`; the floor for every norm and denominator.
pub const TINY: f64 = f64::MIN_POSITIVE;

/// L2-normalize real vectors along the last axis.
pub fn unit_norm<D: Dimension>(x: ArrayView<'_, f64, D>) -> Array<f64, D> {
    let mut out = x.to_owned();
    if out.ndim() == 0 {
        return out;
    }
    let last = Axis(out.ndim() - 1);
    for mut lane in out.lanes_mut(last) {
        let norm = lane.iter().map(|v| v * v).sum::<f64>().sqrt().max(TINY);
        lane.mapv_inplace(|v| v / norm);
    }
    out
}

/// L2-normalize complex vectors along the last axis.
pub fn unit_norm_complex<D: Dimension>(x: ArrayView<'_, Complex64, D>) -> Array<Complex64, D> {
    let mut out = x.to_owned();
    if out.ndim() == 0 {
        return out;
    }
    let last = Axis(out.ndim() - 1);
    for mut lane in out.lanes_mut(last) {
        let norm = lane
            .iter()
            .map(|z| z.norm_sqr())
            .sum::<f64>()
            .sqrt()
            .max(TINY);
        lane.mapv_inplace(|z| z / norm);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array3};

    #[test]
    fn real_rows_become_unit() {
        let x = array![[3.0, 4.0], [0.0, 2.0]];
        let y = unit_norm(x.view());
        assert_abs_diff_eq!(y[[0, 0]], 0.6, epsilon = 1e-12);
        assert_abs_diff_eq!(y[[0, 1]], 0.8, epsilon = 1e-12);
        assert_abs_diff_eq!(y[[1, 1]], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn zero_vector_stays_zero() {
        let x = Array3::<Complex64>::zeros((1, 2, 3));
        let y = unit_norm_complex(x.view());
        assert!(y.iter().all(|z| z.re == 0.0 && z.im == 0.0));
    }

    #[test]
    fn complex_norm_uses_modulus() {
        let x = array![[Complex64::new(0.0, 3.0), Complex64::new(4.0, 0.0)]];
        let y = unit_norm_complex(x.view());
        let norm: f64 = y.row(0).iter().map(|z| z.norm_sqr()).sum();
        assert_abs_diff_eq!(norm, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(y[[0, 0]].im, 0.6, epsilon = 1e-12);
    }
}
