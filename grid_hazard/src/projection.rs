//! Skew-normal projections of the uncertain techno-economic quantities
//!
//! Each row of the projection table names a quantity and the skew-normal
//! `(location, scale, shape)` fitted to its forecast spread for the target
//! year. A scenario draws one uniform percentile per quantity and reads the
//! value off the inverse CDF, multiplied by the row's `unit_scale`.
//!
//! The electricity price percentile is not drawn independently: it is tied to
//! the per-capita consumption percentile through a Gaussian copula.

use crate::error::{GridHazardError, Result};
use crate::stats::{dependent_uniform, normal_draw, skew_normal_ppf, uniform_draw};
use crate::technology::Technology;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::Read;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectedQuantity {
    Population,
    PerCapitaConsumption,
    ElectricityPriceChange,
    GasPrice,
    UraniumPrice,
    CoalPrice,
    DieselPrice,
    OilPrice,
    SolarInvestment,
    SolarFixed,
    WindInvestment,
    WindFixed,
    BatteryInvestment,
    BatteryFixed,
    HydroInvestment,
    HydroFixed,
    CoalInvestment,
    CoalFixed,
    CoalVariable,
}

/// Where a projected cost lands in the operational cost model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CostSlot {
    Fixed(Technology),
    Variable(Technology),
    Investment(Technology),
}

impl ProjectedQuantity {
    pub fn cost_slot(self) -> Option<CostSlot> {
        use ProjectedQuantity::*;
        let slot = match self {
            Population | PerCapitaConsumption | ElectricityPriceChange => return None,
            GasPrice => CostSlot::Variable(Technology::ImportNaturalGas),
            UraniumPrice => CostSlot::Variable(Technology::ImportUranium),
            CoalPrice => CostSlot::Variable(Technology::ImportCoal),
            DieselPrice => CostSlot::Variable(Technology::ImportDiesel),
            OilPrice => CostSlot::Variable(Technology::ImportOil),
            SolarInvestment => CostSlot::Investment(Technology::SolarPv),
            SolarFixed => CostSlot::Fixed(Technology::SolarPv),
            WindInvestment => CostSlot::Investment(Technology::Wind),
            WindFixed => CostSlot::Fixed(Technology::Wind),
            BatteryInvestment => CostSlot::Investment(Technology::Battery),
            BatteryFixed => CostSlot::Fixed(Technology::Battery),
            HydroInvestment => CostSlot::Investment(Technology::Hydro),
            HydroFixed => CostSlot::Fixed(Technology::Hydro),
            CoalInvestment => CostSlot::Investment(Technology::Coal),
            CoalFixed => CostSlot::Fixed(Technology::Coal),
            CoalVariable => CostSlot::Variable(Technology::Coal),
        };
        Some(slot)
    }
}

impl fmt::Display for ProjectedQuantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // serde's snake_case name doubles as the display name
        let name = serde_json::to_value(self)
            .ok()
            .and_then(|v| v.as_str().map(str::to_owned))
            .unwrap_or_default();
        f.write_str(&name)
    }
}

fn unit() -> f64 {
    1.0
}

/// One row of the projection table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Projection {
    pub quantity: ProjectedQuantity,
    pub location: f64,
    pub scale: f64,
    pub shape: f64,
    #[serde(default = "unit")]
    pub unit_scale: f64,
}

impl Projection {
    pub fn value_at(&self, percentile: f64) -> Result<f64> {
        Ok(skew_normal_ppf(percentile, self.location, self.scale, self.shape)? * self.unit_scale)
    }
}

/// Percentile and value drawn for one quantity
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProjectedValue {
    pub quantity: ProjectedQuantity,
    pub percentile: f64,
    pub value: f64,
}

/// Quantities drawn for one scenario, in table order with the electricity
/// price last
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectionDraw {
    pub values: Vec<ProjectedValue>,
}

impl ProjectionDraw {
    pub fn get(&self, quantity: ProjectedQuantity) -> Option<&ProjectedValue> {
        self.values.iter().find(|v| v.quantity == quantity)
    }

    pub fn value(&self, quantity: ProjectedQuantity) -> Result<f64> {
        self.get(quantity)
            .map(|v| v.value)
            .ok_or_else(|| GridHazardError::MissingInput(format!("projection for {}", quantity)))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProjectionTable {
    rows: Vec<Projection>,
}

impl ProjectionTable {
    /// Table with the population, consumption and electricity-price rows
    /// every scenario needs
    pub fn new(rows: Vec<Projection>) -> Result<Self> {
        for required in [
            ProjectedQuantity::Population,
            ProjectedQuantity::PerCapitaConsumption,
            ProjectedQuantity::ElectricityPriceChange,
        ] {
            let count = rows.iter().filter(|r| r.quantity == required).count();
            if count != 1 {
                return Err(GridHazardError::MissingInput(format!(
                    "projection table needs exactly one '{}' row, found {}",
                    required, count
                )));
            }
        }
        for row in &rows {
            if row.scale.is_nan() || row.scale <= 0.0 {
                return Err(GridHazardError::invalid(format!(
                    "projection '{}' has non-positive scale {}",
                    row.quantity, row.scale
                )));
            }
        }
        Ok(ProjectionTable { rows })
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = std::fs::File::open(path).map_err(|e| {
            GridHazardError::MissingInput(format!("projection table {}: {}", path.display(), e))
        })?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        let mut csv_reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
        let rows = csv_reader
            .deserialize()
            .collect::<std::result::Result<Vec<Projection>, _>>()?;
        Self::new(rows)
    }

    pub fn rows(&self) -> &[Projection] {
        &self.rows
    }

    /// Quantities drawn independently, in table order
    pub fn independent(&self) -> impl Iterator<Item = &Projection> {
        self.rows
            .iter()
            .filter(|r| r.quantity != ProjectedQuantity::ElectricityPriceChange)
    }

    fn row(&self, quantity: ProjectedQuantity) -> Result<&Projection> {
        self.rows
            .iter()
            .find(|r| r.quantity == quantity)
            .ok_or_else(|| GridHazardError::MissingInput(format!("projection for {}", quantity)))
    }

    /// Draw every quantity once. `price_correlation` couples the electricity
    /// price percentile to the per-capita consumption percentile.
    pub fn sample<R: Rng + ?Sized>(
        &self,
        price_correlation: f64,
        rng: &mut R,
    ) -> Result<ProjectionDraw> {
        let mut values = Vec::with_capacity(self.rows.len());
        for row in self.independent() {
            let percentile = uniform_draw(rng, 0.0, 1.0);
            values.push(ProjectedValue {
                quantity: row.quantity,
                percentile,
                value: row.value_at(percentile)?,
            });
        }

        let consumption = values
            .iter()
            .find(|v| v.quantity == ProjectedQuantity::PerCapitaConsumption)
            .map(|v| v.percentile)
            .ok_or_else(|| GridHazardError::MissingInput("per-capita consumption".to_string()))?;
        let price = self.row(ProjectedQuantity::ElectricityPriceChange)?;
        let percentile = dependent_uniform(consumption, price_correlation, normal_draw(rng, 0.0, 1.0));
        values.push(ProjectedValue {
            quantity: price.quantity,
            percentile,
            value: price.value_at(percentile)?,
        });

        Ok(ProjectionDraw { values })
    }
}
