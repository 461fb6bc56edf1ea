//! Annual weather regimes and their effect on renewable output
//!
//! A regime is the fraction of the year spent in each sky condition (sunny,
//! partly cloudy, overcast) and in each wind-speed band. Day counts are
//! climatological means for Puerto Rico; a sampled regime perturbs every count
//! with a 20% coefficient of variation.

use crate::stats::normal_draw;
use crate::DAYS_PER_YEAR;
use rand::Rng;
use serde::{Deserialize, Serialize};

pub const WIND_BANDS: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherParams {
    pub sunny_days: f64,
    pub partly_cloudy_days: f64,
    /// Days per year in the 7-12, 12-17, 17-24, 24-31 and 31-38 mph bands
    pub wind_band_days: [f64; WIND_BANDS],
    /// Representative speed of each band in mph
    pub wind_band_speeds: [f64; WIND_BANDS],
    pub coefficient_of_variation: f64,
    /// Sunny + partly cloudy is rescaled to this when it reaches a full year
    pub sky_rescale: f64,
    /// Wind bands are rescaled to this when they reach a full year
    pub wind_rescale: f64,
    /// Share of a partly cloudy day counted as sunny
    pub partly_cloudy_weight: f64,
    pub mph_to_kmh: f64,
    pub cut_in_kmh: f64,
    pub rated_kmh: f64,
}

impl Default for WeatherParams {
    fn default() -> Self {
        WeatherParams {
            sunny_days: 101.2,
            partly_cloudy_days: 214.9,
            wind_band_days: [110.7, 197.3, 30.1, 0.7, 0.1],
            wind_band_speeds: [9.5, 14.5, 20.5, 27.5, 34.5],
            coefficient_of_variation: 0.2,
            sky_rescale: 0.9,
            wind_rescale: 0.95,
            partly_cloudy_weight: 0.5,
            mph_to_kmh: 1.609,
            cut_in_kmh: 3.0 * 3.6,
            rated_kmh: 13.0 * 3.6,
        }
    }
}

impl WeatherParams {
    pub fn power_curve(&self) -> WindPowerCurve {
        WindPowerCurve::new(self.cut_in_kmh, self.rated_kmh)
    }
}

/// Fractions of one year
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct WeatherRegime {
    pub sunny: f64,
    pub partly_cloudy: f64,
    pub wind_bands: [f64; WIND_BANDS],
}

impl WeatherRegime {
    /// Climatological regime, used as the reference the dispatch was solved for
    pub fn mean(params: &WeatherParams) -> Self {
        Self::from_days(
            params,
            params.sunny_days,
            params.partly_cloudy_days,
            params.wind_band_days,
        )
    }

    pub fn sample<R: Rng + ?Sized>(params: &WeatherParams, rng: &mut R) -> Self {
        let cv = params.coefficient_of_variation;
        let sunny = normal_draw(rng, params.sunny_days, cv * params.sunny_days);
        let partly_cloudy =
            normal_draw(rng, params.partly_cloudy_days, cv * params.partly_cloudy_days);
        let mut wind = [0.0; WIND_BANDS];
        for (days, mean) in wind.iter_mut().zip(params.wind_band_days) {
            *days = normal_draw(rng, mean, cv * mean);
        }
        Self::from_days(params, sunny, partly_cloudy, wind)
    }

    fn from_days(
        params: &WeatherParams,
        sunny_days: f64,
        partly_cloudy_days: f64,
        wind_days: [f64; WIND_BANDS],
    ) -> Self {
        let fraction = |days: f64| (days.min(DAYS_PER_YEAR) / DAYS_PER_YEAR).max(0.0);

        let mut sunny = fraction(sunny_days);
        let mut partly_cloudy = fraction(partly_cloudy_days);
        let sky = sunny + partly_cloudy;
        if sky >= 1.0 {
            let coef = params.sky_rescale / sky;
            sunny *= coef;
            partly_cloudy *= coef;
        }

        let mut wind_bands = wind_days.map(fraction);
        let windy: f64 = wind_bands.iter().sum();
        if windy >= 1.0 {
            let coef = params.wind_rescale / windy;
            for band in wind_bands.iter_mut() {
                *band *= coef;
            }
        }

        WeatherRegime {
            sunny,
            partly_cloudy,
            wind_bands,
        }
    }

    pub fn overcast(&self) -> f64 {
        1.0 - self.sunny - self.partly_cloudy
    }

    pub fn calm(&self) -> f64 {
        1.0 - self.wind_bands.iter().sum::<f64>()
    }

    /// Effective sunny fraction
    pub fn solar_exposure(&self, partly_cloudy_weight: f64) -> f64 {
        self.sunny + partly_cloudy_weight * self.partly_cloudy
    }

    /// Time-weighted wind speed in mph; calm days contribute nothing
    pub fn average_wind_mph(&self, band_speeds: &[f64; WIND_BANDS]) -> f64 {
        self.wind_bands
            .iter()
            .zip(band_speeds)
            .map(|(share, speed)| share * speed)
            .sum()
    }
}

/// Cubic turbine power curve: zero output and slope at cut-in, full output
/// and zero slope at the rated speed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindPowerCurve {
    pub cut_in: f64,
    pub rated: f64,
}

impl WindPowerCurve {
    pub fn new(cut_in: f64, rated: f64) -> Self {
        WindPowerCurve { cut_in, rated }
    }

    /// Relative output at `speed`. The cubic is evaluated as is, outside
    /// `[cut_in, rated]` too.
    pub fn output(&self, speed: f64) -> f64 {
        let t = (speed - self.cut_in) / (self.rated - self.cut_in);
        t * t * (3.0 - 2.0 * t)
    }
}

/// Ratio of solar output under `sampled` to output under `reference`
pub fn solar_change(sampled: &WeatherRegime, reference: &WeatherRegime, params: &WeatherParams) -> f64 {
    let weight = params.partly_cloudy_weight;
    ratio(
        sampled.solar_exposure(weight),
        reference.solar_exposure(weight),
    )
}

/// Ratio of wind output under `sampled` to output under `reference`
pub fn wind_change(sampled: &WeatherRegime, reference: &WeatherRegime, params: &WeatherParams) -> f64 {
    let curve = params.power_curve();
    let speed = |regime: &WeatherRegime| {
        regime.average_wind_mph(&params.wind_band_speeds) * params.mph_to_kmh
    };
    ratio(curve.output(speed(sampled)), curve.output(speed(reference)))
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        1.0
    } else {
        numerator / denominator
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_mean_regime_fractions() {
        let regime = WeatherRegime::mean(&WeatherParams::default());
        assert_relative_eq!(regime.sunny, 101.2 / 365.0);
        assert_relative_eq!(regime.partly_cloudy, 214.9 / 365.0);
        assert_relative_eq!(regime.calm(), 1.0 - 338.9 / 365.0, epsilon = 1e-12);
        assert!(regime.overcast() > 0.0);
    }

    #[test]
    fn test_sampled_regime_stays_within_a_year() {
        let params = WeatherParams::default();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..500 {
            let regime = WeatherRegime::sample(&params, &mut rng);
            assert!(regime.sunny >= 0.0 && regime.partly_cloudy >= 0.0);
            assert!(regime.sunny + regime.partly_cloudy < 1.0 + 1e-12);
            assert!(regime.wind_bands.iter().all(|b| *b >= 0.0));
            assert!(regime.wind_bands.iter().sum::<f64>() < 1.0 + 1e-12);
        }
    }

    #[test]
    fn test_full_sky_is_rescaled() {
        let params = WeatherParams {
            sunny_days: 200.0,
            partly_cloudy_days: 200.0,
            ..WeatherParams::default()
        };
        let regime = WeatherRegime::mean(&params);
        assert_relative_eq!(regime.sunny + regime.partly_cloudy, 0.9, epsilon = 1e-12);
        assert_relative_eq!(regime.sunny, regime.partly_cloudy);
    }

    #[test]
    fn test_power_curve_shape() {
        let curve = WindPowerCurve::new(10.8, 46.8);
        assert_eq!(curve.output(10.8), 0.0);
        assert_relative_eq!(curve.output(46.8), 1.0, epsilon = 1e-12);
        assert_relative_eq!(curve.output(28.8), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn test_reference_regime_has_no_change() {
        let params = WeatherParams::default();
        let reference = WeatherRegime::mean(&params);
        assert_relative_eq!(solar_change(&reference, &reference, &params), 1.0);
        assert_relative_eq!(wind_change(&reference, &reference, &params), 1.0);
    }

    #[test]
    fn test_sunnier_year_raises_solar() {
        let params = WeatherParams::default();
        let reference = WeatherRegime::mean(&params);
        let mut sunnier = reference;
        sunnier.sunny += 0.05;
        assert!(solar_change(&sunnier, &reference, &params) > 1.0);
    }
}
