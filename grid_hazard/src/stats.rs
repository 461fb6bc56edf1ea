//! Closed-form distribution helpers
//!
//! Normal, log-normal and skew-normal CDFs and quantiles used by the
//! fragility curves and the scenario projections. The normal layer goes
//! through statrs' complementary error function so the tails keep their
//! relative accuracy; the skew-normal CDF adds Owen's T on top of it.

use crate::error::{GridHazardError, Result};
use rand::Rng;
use rand_distr::StandardNormal;
use statrs::function::erf::{erfc, erfc_inv};
use std::f64::consts::{PI, SQRT_2};

/// Percentiles are kept this far away from 0 and 1 so quantiles stay finite
const PERCENTILE_EPS: f64 = 1e-12;

/// Standard normal CDF Φ(x)
pub fn normal_cdf(x: f64) -> f64 {
    0.5 * erfc(-x / SQRT_2)
}

/// Log-normal CDF with shape `sigma` and median `scale` (scipy's `lognorm(s, scale)`)
pub fn lognormal_cdf(x: f64, sigma: f64, scale: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    normal_cdf((x / scale).ln() / sigma)
}

/// Mean and standard deviation of a log-normal with log-space `mu`, `sigma`
pub fn lognormal_moments(mu: f64, sigma: f64) -> (f64, f64) {
    let s2 = sigma * sigma;
    let mean = (mu + s2 / 2.0).exp();
    let std = ((s2.exp() - 1.0) * (2.0 * mu + s2).exp()).sqrt();
    (mean, std)
}

/// Log-space `mu`, `sigma` of the log-normal with the given mean and std
pub fn lognormal_params(mean: f64, std: f64) -> Result<(f64, f64)> {
    if mean.is_nan() || mean <= 0.0 || std.is_nan() || std < 0.0 {
        return Err(GridHazardError::invalid(format!(
            "log-normal needs mean > 0 and std >= 0, got mean={} std={}",
            mean, std
        )));
    }
    let mu = (mean * mean / (std * std + mean * mean).sqrt()).ln();
    let sigma = (std * std / (mean * mean) + 1.0).ln().sqrt();
    Ok((mu, sigma))
}

/// Maximum-likelihood log-normal fit with the location fixed at zero.
///
/// Returns `(mu, sigma)` of `ln x`, with `sigma` the population standard
/// deviation.
pub fn fit_lognormal(data: &[f64]) -> Result<(f64, f64)> {
    if data.is_empty() {
        return Err(GridHazardError::invalid("cannot fit a log-normal to no data"));
    }
    if let Some(bad) = data.iter().find(|x| x.is_nan() || **x <= 0.0) {
        return Err(GridHazardError::invalid(format!(
            "log-normal fit needs positive samples, found {}",
            bad
        )));
    }
    let n = data.len() as f64;
    let mu = data.iter().map(|x| x.ln()).sum::<f64>() / n;
    let var = data.iter().map(|x| (x.ln() - mu).powi(2)).sum::<f64>() / n;
    Ok((mu, var.sqrt()))
}

/// Owen's T function T(h, a)
pub fn owens_t(h: f64, a: f64) -> f64 {
    if a == 0.0 {
        return 0.0;
    }
    if a < 0.0 {
        return -owens_t(h, -a);
    }
    let h = h.abs();
    if a > 1.0 {
        let ah = a * h;
        let ph = normal_cdf(h);
        let pah = normal_cdf(ah);
        return 0.5 * ph + 0.5 * pah - ph * pah - owens_t(ah, 1.0 / a);
    }

    // Composite Simpson on [0, a] with a <= 1, where the integrand is smooth
    let n = 100;
    let step = a / n as f64;
    let f = |x: f64| (-0.5 * h * h * (1.0 + x * x)).exp() / (1.0 + x * x);
    let mut sum = f(0.0) + f(a);
    for i in 1..n {
        let weight = if i % 2 == 1 { 4.0 } else { 2.0 };
        sum += weight * f(i as f64 * step);
    }
    sum * step / 3.0 / (2.0 * PI)
}

/// Skew-normal CDF with location `xi`, scale `omega` and shape `alpha`
pub fn skew_normal_cdf(x: f64, xi: f64, omega: f64, alpha: f64) -> f64 {
    let z = (x - xi) / omega;
    (normal_cdf(z) - 2.0 * owens_t(z, alpha)).clamp(0.0, 1.0)
}

/// Inverse of a monotone CDF by bracketing and bisection
fn invert_cdf(p: f64, centre: f64, spread: f64, cdf: impl Fn(f64) -> f64) -> f64 {
    let p = p.clamp(PERCENTILE_EPS, 1.0 - PERCENTILE_EPS);
    let mut step = spread;
    let mut lo = centre - step;
    while cdf(lo) > p && step < spread * 1e12 {
        step *= 2.0;
        lo = centre - step;
    }
    step = spread;
    let mut hi = centre + step;
    while cdf(hi) < p && step < spread * 1e12 {
        step *= 2.0;
        hi = centre + step;
    }

    for _ in 0..200 {
        let mid = 0.5 * (lo + hi);
        if cdf(mid) < p {
            lo = mid;
        } else {
            hi = mid;
        }
        if hi - lo <= 1e-12 * (1.0 + mid.abs()) {
            break;
        }
    }
    0.5 * (lo + hi)
}

/// Standard normal quantile Φ⁻¹(p), with `p` kept inside `(0, 1)`
pub fn normal_ppf(p: f64) -> f64 {
    let p = p.clamp(PERCENTILE_EPS, 1.0 - PERCENTILE_EPS);
    -SQRT_2 * erfc_inv(2.0 * p)
}

/// Skew-normal quantile (scipy's `skewnorm.ppf(p, alpha, xi, omega)`)
pub fn skew_normal_ppf(p: f64, xi: f64, omega: f64, alpha: f64) -> Result<f64> {
    if omega.is_nan() || omega <= 0.0 || !xi.is_finite() || !alpha.is_finite() {
        return Err(GridHazardError::invalid(format!(
            "skew-normal needs finite xi/alpha and omega > 0, got xi={} omega={} alpha={}",
            xi, omega, alpha
        )));
    }
    Ok(invert_cdf(p, xi, 4.0 * omega, |x| {
        skew_normal_cdf(x, xi, omega, alpha)
    }))
}

/// Uniform percentile correlated with `first` through a Gaussian copula.
///
/// `independent_normal` is a standard normal draw supplied by the caller.
pub fn dependent_uniform(first: f64, correlation: f64, independent_normal: f64) -> f64 {
    let first_normal = normal_ppf(first);
    let second =
        correlation * first_normal + (1.0 - correlation * correlation).sqrt() * independent_normal;
    normal_cdf(second)
}

/// Draw from N(mean, std²). `std` is expected to be non-negative.
pub fn normal_draw<R: Rng + ?Sized>(rng: &mut R, mean: f64, std: f64) -> f64 {
    let z: f64 = rng.sample(StandardNormal);
    mean + std * z
}

/// Draw from U[lo, hi), or `lo` when the range is empty
pub fn uniform_draw<R: Rng + ?Sized>(rng: &mut R, lo: f64, hi: f64) -> f64 {
    if hi > lo {
        rng.gen_range(lo..hi)
    } else {
        lo
    }
}
