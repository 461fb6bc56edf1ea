//! Hurricane cost-risk simulation for an island electric grid
//!
//! Nested Monte Carlo estimate of the annual cost of running a power system
//! exposed to hurricanes:
//! - Hurricanes arrive as a marked Poisson process (`hazard`)
//! - Each grid component fails with a wind-dependent probability (`fragility`, `damage`)
//! - Pooled repair crews restore the grid (`restoration`)
//! - Damage, operational and lost-load costs are combined (`cost`)
//! - Techno-economic scenarios are resampled in the outer loop and hazard
//!   realizations in the inner loop (`scenario`, `driver`)

pub mod catalog;
pub mod config;
pub mod cost;
pub mod damage;
pub mod dispatch;
pub mod driver;
pub mod error;
pub mod fragility;
pub mod hazard;
pub mod inventory;
pub mod logging;
pub mod output;
pub mod projection;
pub mod restoration;
pub mod scenario;
pub mod stats;
pub mod technology;
pub mod weather;

use serde::{Deserialize, Serialize};
use std::fmt;

pub use error::{GridHazardError, Result};
pub use technology::{TechMap, Technology};

pub const DAYS_PER_YEAR: f64 = 365.0;

/// Conversion from m/s to mph used by the fragility curves
pub const MS_TO_MPH: f64 = 2.237;

/// Megawatt-hours per petajoule, used to normalize costs per unit of demand
pub const MWH_PER_PJ: f64 = 277_777.778;

/// Grid asset classes exposed to hurricane winds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ComponentType {
    #[serde(rename = "Transmission Line")]
    TransmissionLine,
    #[serde(rename = "Distribution Line")]
    DistributionLine,
    #[serde(rename = "Tower")]
    Tower,
    #[serde(rename = "Substation")]
    Substation,
    #[serde(rename = "Solar Generator")]
    SolarGenerator,
    #[serde(rename = "Wind Generator")]
    WindGenerator,
}

impl ComponentType {
    pub const ALL: [ComponentType; 6] = [
        ComponentType::TransmissionLine,
        ComponentType::DistributionLine,
        ComponentType::Tower,
        ComponentType::Substation,
        ComponentType::SolarGenerator,
        ComponentType::WindGenerator,
    ];

    /// Lines whose failure disconnects load
    pub fn is_line(self) -> bool {
        matches!(
            self,
            ComponentType::TransmissionLine | ComponentType::DistributionLine
        )
    }
}

impl fmt::Display for ComponentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComponentType::TransmissionLine => "Transmission Line",
            ComponentType::DistributionLine => "Distribution Line",
            ComponentType::Tower => "Tower",
            ComponentType::Substation => "Substation",
            ComponentType::SolarGenerator => "Solar Generator",
            ComponentType::WindGenerator => "Wind Generator",
        };
        f.write_str(name)
    }
}

/// One aggregated grid asset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Component {
    pub component_type: ComponentType,
    pub replacement_cost: f64,
    /// Metres, lines only
    pub line_length: Option<f64>,
}

impl Component {
    pub fn new(component_type: ComponentType, replacement_cost: f64) -> Self {
        Component {
            component_type,
            replacement_cost,
            line_length: None,
        }
    }

    pub fn line(component_type: ComponentType, replacement_cost: f64, line_length: f64) -> Self {
        Component {
            component_type,
            replacement_cost,
            line_length: Some(line_length),
        }
    }
}

/// One simulated hurricane
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Occurrence {
    /// Fractional calendar year of landfall
    pub year: f64,
    /// Peak wind speed in m/s
    pub wind_speed: f64,
}
