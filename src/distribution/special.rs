//! Modified Bessel function of the first kind, in the log domain.
//!
//! The vMF normalizer needs `ln I_ν(κ)` for `ν = E/2 - 1` and `κ` anywhere
//! between ~0 and a few hundred. Evaluating `I_ν` directly overflows long
//! before `κ = 500`, so the power series
//!
//! ```text
//! I_ν(x) = (x/2)^ν Σⱼ (x²/4)ʲ / (j! Γ(ν + j + 1))
//! ```
//!
//! is summed as log-terms with a running maximum. The terms are log-concave
//! in `j`, so once they start falling and drop [`SERIES_CUTOFF`] nats below
//! the peak the remainder is negligible.

use statrs::function::gamma::ln_gamma;

const SERIES_CUTOFF: f64 = 40.0;
const MAX_TERMS: usize = 20_000;

/// `ln Σⱼ (x²/4)ʲ / (j! Γ(ν + j + 1))`, i.e. `ln(I_ν(x) / (x/2)^ν)`.
///
/// Finite at `x = 0`, where it equals `-ln Γ(ν + 1)`.
pub(crate) fn ln_bessel_series(order: f64, x: f64) -> f64 {
    if x <= 0.0 {
        return -ln_gamma(order + 1.0);
    }

    let ln_quarter_sq = 2.0 * (0.5 * x).ln();
    let mut terms = Vec::with_capacity(64);
    let mut peak = f64::NEG_INFINITY;
    let mut previous = f64::NEG_INFINITY;

    for j in 0..MAX_TERMS {
        let jf = j as f64;
        let term = jf * ln_quarter_sq - ln_gamma(jf + 1.0) - ln_gamma(order + jf + 1.0);
        peak = peak.max(term);
        terms.push(term);
        if term < previous && term < peak - SERIES_CUTOFF {
            break;
        }
        previous = term;
    }

    peak + terms.iter().map(|t| (t - peak).exp()).sum::<f64>().ln()
}

/// Log normalizer of a `dim`-dimensional von Mises-Fisher distribution.
///
/// ```text
/// ln c_E(κ) = (E/2) ln 2π + ln I_{E/2-1}(κ) - (E/2 - 1) ln κ
/// ```
///
/// The `ln κ` terms cancel analytically, which keeps `κ → 0` finite: the
/// limit is the log surface area of the sphere.
pub fn vmf_log_normalizer(dim: usize, kappa: f64) -> f64 {
    let d = dim as f64;
    let order = 0.5 * d - 1.0;
    0.5 * d * std::f64::consts::TAU.ln() - order * std::f64::consts::LN_2
        + ln_bessel_series(order, kappa.max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    /// `ln I_ν(x)` for `x > 0`.
    fn log_bessel_i(order: f64, x: f64) -> f64 {
        order * (0.5 * x).ln() + ln_bessel_series(order, x)
    }

    #[test]
    fn bessel_matches_reference_values() {
        let cases = [
            (0.0, 1.0, 1.266_065_877_752_008_4_f64),
            (1.0, 1.0, 0.565_159_103_992_485_1),
            (0.0, 10.0, 2_815.716_628_466_254),
        ];
        for (order, x, expected) in cases {
            assert_relative_eq!(log_bessel_i(order, x), expected.ln(), max_relative = 1e-10);
        }
    }

    #[test]
    fn bessel_large_argument_is_finite() {
        // ln I_0(x) ~ x - ln(2πx)/2 for large x.
        let x = 500.0;
        let asymptotic = x - 0.5 * (2.0 * PI * x).ln();
        assert_relative_eq!(log_bessel_i(0.0, x), asymptotic, max_relative = 1e-6);
    }

    #[test]
    fn normalizer_three_dimensions() {
        // c_3(κ)⁻¹ = 4π sinh(κ) / κ
        for kappa in [0.5_f64, 1.0, 7.0] {
            let expected = (4.0 * PI * kappa.sinh() / kappa).ln();
            assert_relative_eq!(vmf_log_normalizer(3, kappa), expected, max_relative = 1e-10);
        }
    }

    #[test]
    fn normalizer_zero_concentration_is_surface_area() {
        assert_relative_eq!(vmf_log_normalizer(3, 0.0), (4.0 * PI).ln(), max_relative = 1e-12);
        assert_relative_eq!(vmf_log_normalizer(2, 1e-10), (2.0 * PI).ln(), max_relative = 1e-9);
    }
}
