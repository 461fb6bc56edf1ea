//! Per-occurrence damage sampling and the failure record of one realization

use crate::fragility::FragilityModel;
use crate::stats::{normal_draw, uniform_draw};
use crate::Component;
use rand::Rng;

/// Failure probability and binary damage state of every component for one
/// occurrence, in component order
#[derive(Debug, Clone, PartialEq)]
pub struct DamageDraw {
    pub failure_probabilities: Vec<f64>,
    pub damage_states: Vec<bool>,
}

/// Sample the damage one hurricane does to `components`.
///
/// For each component the failure probability is drawn from
/// `Normal(mean, std)` given by the fragility model and clamped to `[0, 1]`,
/// then a uniform draw decides whether it is damaged. Cost and restoration
/// use the probability; the state is kept for reporting.
pub fn sample_damage<F, R>(
    wind_speed: f64,
    components: &[Component],
    fragility: &F,
    rng: &mut R,
) -> DamageDraw
where
    F: FragilityModel + ?Sized,
    R: Rng + ?Sized,
{
    let mut failure_probabilities = Vec::with_capacity(components.len());
    let mut damage_states = Vec::with_capacity(components.len());

    for component in components {
        let (mean, std) = fragility.failure_mean_std(wind_speed, component.component_type);
        let p = normal_draw(rng, mean, std).clamp(0.0, 1.0);
        let damaged = uniform_draw(rng, 0.0, 1.0) < p;
        failure_probabilities.push(p);
        damage_states.push(damaged);
    }

    DamageDraw {
        failure_probabilities,
        damage_states,
    }
}

/// Failure probabilities of one hazard realization: one row per component,
/// one column per occurrence.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FailureRecord {
    /// `columns[j][i]` is the probability that component `i` failed in occurrence `j`
    columns: Vec<Vec<f64>>,
}

impl FailureRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, failure_probabilities: Vec<f64>) {
        self.columns.push(failure_probabilities);
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn occurrences(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, occurrence: usize) -> &[f64] {
        &self.columns[occurrence]
    }

    pub fn get(&self, component: usize, occurrence: usize) -> f64 {
        self.columns[occurrence][component]
    }

    /// Probability that occurrence `j` cut at least one line, for every `j`:
    /// `1 - Π_lines (1 - p)`
    pub fn line_unavailability(&self, components: &[Component]) -> Vec<f64> {
        self.columns
            .iter()
            .map(|column| {
                let intact: f64 = components
                    .iter()
                    .zip(column)
                    .filter(|(c, _)| c.component_type.is_line())
                    .map(|(_, p)| 1.0 - p)
                    .product();
                1.0 - intact
            })
            .collect()
    }
}
