use crate::error::{GridHazardError, Result};
use crate::stats::{lognormal_moments, lognormal_params};
use crate::Occurrence;
use rand::Rng;
use rand_distr::{Distribution, Exp, LogNormal};
use serde::Serialize;

/// Generates hurricane occurrences as a marked Poisson process: exponential
/// inter-arrival times and log-normal peak wind speeds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HazardGenerator {
    /// Historical occurrences per year
    pub base_rate: f64,
    /// Log-space parameters of the historical wind-speed distribution
    pub mu: f64,
    pub sigma: f64,
}

impl HazardGenerator {
    pub fn new(base_rate: f64, mu: f64, sigma: f64) -> Self {
        HazardGenerator {
            base_rate,
            mu,
            sigma,
        }
    }

    /// Draw one hazard realization over `[min_year, max_year)`.
    ///
    /// `intensity_multiplier` scales the mean wind speed (its standard
    /// deviation is kept) and `frequency_multiplier` scales the rate.
    pub fn generate<R: Rng + ?Sized>(
        &self,
        min_year: f64,
        max_year: f64,
        frequency_multiplier: f64,
        intensity_multiplier: f64,
        rng: &mut R,
    ) -> Result<Vec<Occurrence>> {
        generate(
            min_year,
            max_year,
            self.base_rate,
            self.mu,
            self.sigma,
            frequency_multiplier,
            intensity_multiplier,
            rng,
        )
    }
}

/// Log-space wind-speed parameters after scaling the mean by `intensity_multiplier`
pub fn shifted_wind_params(mu: f64, sigma: f64, intensity_multiplier: f64) -> Result<(f64, f64)> {
    let (mean, std) = lognormal_moments(mu, sigma);
    lognormal_params(mean * intensity_multiplier, std)
}

/// Occurrences in `[min_year, max_year)`, ordered by year.
///
/// Returns an empty list when the window is empty or the adjusted rate is
/// not positive.
#[allow(clippy::too_many_arguments)]
pub fn generate<R: Rng + ?Sized>(
    min_year: f64,
    max_year: f64,
    base_rate: f64,
    mu: f64,
    sigma: f64,
    frequency_multiplier: f64,
    intensity_multiplier: f64,
    rng: &mut R,
) -> Result<Vec<Occurrence>> {
    let mut occurrences = Vec::new();

    if max_year <= min_year {
        return Ok(occurrences);
    }

    let rate = base_rate * frequency_multiplier;
    // Exp::new requires a positive rate
    if !rate.is_finite() || rate <= 0.0 {
        return Ok(occurrences);
    }

    let (mu, sigma) = shifted_wind_params(mu, sigma, intensity_multiplier)?;
    let inter_arrival = Exp::new(rate).map_err(GridHazardError::invalid)?;
    let wind_speed =
        LogNormal::new(mu, sigma).map_err(|e| GridHazardError::invalid(format!("wind speed: {}", e)))?;

    let mut current_year = min_year;
    loop {
        current_year += inter_arrival.sample(rng);
        if current_year >= max_year {
            break;
        }
        occurrences.push(Occurrence {
            year: current_year,
            wind_speed: wind_speed.sample(rng),
        });
    }

    Ok(occurrences)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn puerto_rico() -> HazardGenerator {
        HazardGenerator::new(0.6, 3.5, 0.4)
    }

    #[test]
    fn test_generates_occurrences_inside_window() {
        let mut rng = StdRng::seed_from_u64(42);
        let occurrences = puerto_rico()
            .generate(2000.0, 2100.0, 1.0, 1.0, &mut rng)
            .unwrap();

        assert!(!occurrences.is_empty());
        for pair in occurrences.windows(2) {
            assert!(pair[0].year <= pair[1].year);
        }
        for occ in &occurrences {
            assert!(occ.year >= 2000.0 && occ.year < 2100.0);
            assert!(occ.wind_speed > 0.0);
        }
    }

    #[test]
    fn test_no_occurrences_with_zero_rate() {
        let mut rng = StdRng::seed_from_u64(42);
        let occurrences = HazardGenerator::new(0.0, 3.5, 0.4)
            .generate(2000.0, 2100.0, 1.0, 1.0, &mut rng)
            .unwrap();
        assert!(occurrences.is_empty());
    }

    #[test]
    fn test_empty_window() {
        let mut rng = StdRng::seed_from_u64(42);
        let hazard = puerto_rico();
        assert!(hazard.generate(2050.0, 2050.0, 1.0, 1.0, &mut rng).unwrap().is_empty());
        assert!(hazard.generate(2050.0, 2049.0, 1.0, 1.0, &mut rng).unwrap().is_empty());
    }

    #[test]
    fn test_same_seed_same_sequence() {
        let hazard = puerto_rico();
        let a = hazard
            .generate(2049.0, 2060.0, 1.2, 1.1, &mut StdRng::seed_from_u64(7))
            .unwrap();
        let b = hazard
            .generate(2049.0, 2060.0, 1.2, 1.1, &mut StdRng::seed_from_u64(7))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_frequency_multiplier_scales_count() {
        let hazard = puerto_rico();
        let mut rng = StdRng::seed_from_u64(3);
        let base = hazard.generate(0.0, 5000.0, 1.0, 1.0, &mut rng).unwrap().len() as f64;
        let doubled = hazard.generate(0.0, 5000.0, 2.0, 1.0, &mut rng).unwrap().len() as f64;
        assert!((base / 5000.0 - 0.6).abs() < 0.05);
        assert!((doubled / base - 2.0).abs() < 0.2);
    }

    #[test]
    fn test_intensity_multiplier_shifts_mean_keeps_std() {
        let (mean, std) = lognormal_moments(3.5, 0.4);
        let (mu, sigma) = shifted_wind_params(3.5, 0.4, 1.1).unwrap();
        let (new_mean, new_std) = lognormal_moments(mu, sigma);
        assert_relative_eq!(new_mean, 1.1 * mean, epsilon = 1e-9);
        assert_relative_eq!(new_std, std, epsilon = 1e-9);
    }

    #[test]
    fn test_non_positive_intensity_is_an_error() {
        let mut rng = StdRng::seed_from_u64(1);
        let result = puerto_rico().generate(2049.0, 2050.0, 1.0, 0.0, &mut rng);
        assert!(matches!(result, Err(GridHazardError::InvalidParameter(_))));
    }
}
