//! Technologies of the capacity-expansion model and an enum-indexed map
//!
//! The codes (`E_SOLPV`, `S_IMPNG`, ...) are the technology names used in the
//! dispatch tables produced by the energy-system solver.

use crate::error::GridHazardError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Technology {
    // Generation and storage
    #[serde(rename = "E_SOLPV")]
    SolarPv,
    #[serde(rename = "E_WIND")]
    Wind,
    #[serde(rename = "E_BATT")]
    Battery,
    #[serde(rename = "E_HYDRO")]
    Hydro,
    #[serde(rename = "E_NUCLEAR")]
    Nuclear,
    #[serde(rename = "E_NGCC")]
    Ngcc,
    #[serde(rename = "E_BIO")]
    Biomass,
    #[serde(rename = "E_COAL")]
    Coal,
    #[serde(rename = "E_DSL")]
    Diesel,
    #[serde(rename = "E_OIL")]
    Oil,
    // Grid
    #[serde(rename = "E_TRANS")]
    Transmission,
    #[serde(rename = "E_COND")]
    Distribution,
    #[serde(rename = "E_SUB")]
    Substation,
    #[serde(rename = "E_TWR")]
    Tower,
    // Fuel imports
    #[serde(rename = "S_IMPNG")]
    ImportNaturalGas,
    #[serde(rename = "S_IMPURN")]
    ImportUranium,
    #[serde(rename = "S_IMPBIO")]
    ImportBiofuel,
    #[serde(rename = "S_IMPCOAL")]
    ImportCoal,
    #[serde(rename = "S_IMPDSL")]
    ImportDiesel,
    #[serde(rename = "S_IMPOIL")]
    ImportOil,
}

impl Technology {
    pub const COUNT: usize = 20;

    pub const ALL: [Technology; Technology::COUNT] = [
        Technology::SolarPv,
        Technology::Wind,
        Technology::Battery,
        Technology::Hydro,
        Technology::Nuclear,
        Technology::Ngcc,
        Technology::Biomass,
        Technology::Coal,
        Technology::Diesel,
        Technology::Oil,
        Technology::Transmission,
        Technology::Distribution,
        Technology::Substation,
        Technology::Tower,
        Technology::ImportNaturalGas,
        Technology::ImportUranium,
        Technology::ImportBiofuel,
        Technology::ImportCoal,
        Technology::ImportDiesel,
        Technology::ImportOil,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn code(self) -> &'static str {
        match self {
            Technology::SolarPv => "E_SOLPV",
            Technology::Wind => "E_WIND",
            Technology::Battery => "E_BATT",
            Technology::Hydro => "E_HYDRO",
            Technology::Nuclear => "E_NUCLEAR",
            Technology::Ngcc => "E_NGCC",
            Technology::Biomass => "E_BIO",
            Technology::Coal => "E_COAL",
            Technology::Diesel => "E_DSL",
            Technology::Oil => "E_OIL",
            Technology::Transmission => "E_TRANS",
            Technology::Distribution => "E_COND",
            Technology::Substation => "E_SUB",
            Technology::Tower => "E_TWR",
            Technology::ImportNaturalGas => "S_IMPNG",
            Technology::ImportUranium => "S_IMPURN",
            Technology::ImportBiofuel => "S_IMPBIO",
            Technology::ImportCoal => "S_IMPCOAL",
            Technology::ImportDiesel => "S_IMPDSL",
            Technology::ImportOil => "S_IMPOIL",
        }
    }

    /// Fuel import consumed by a generator, if any
    pub fn fuel(self) -> Option<Technology> {
        match self {
            Technology::Nuclear => Some(Technology::ImportUranium),
            Technology::Ngcc => Some(Technology::ImportNaturalGas),
            Technology::Biomass => Some(Technology::ImportBiofuel),
            Technology::Coal => Some(Technology::ImportCoal),
            Technology::Diesel => Some(Technology::ImportDiesel),
            Technology::Oil => Some(Technology::ImportOil),
            _ => None,
        }
    }

    /// Generator that burns this fuel import, if any
    pub fn consumer(self) -> Option<Technology> {
        Technology::ALL.into_iter().find(|t| t.fuel() == Some(self))
    }

    pub fn is_fuel_import(self) -> bool {
        self.consumer().is_some()
    }
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Technology {
    type Err = GridHazardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim();
        Technology::ALL
            .into_iter()
            .find(|t| t.code() == code)
            .ok_or_else(|| GridHazardError::MissingInput(format!("unknown technology '{}'", code)))
    }
}

/// One value per [`Technology`], stored densely
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TechMap<T> {
    values: [T; Technology::COUNT],
}

impl<T: Copy + Default> Default for TechMap<T> {
    fn default() -> Self {
        TechMap {
            values: [T::default(); Technology::COUNT],
        }
    }
}

impl<T: Copy + Default> TechMap<T> {
    pub fn from_pairs(pairs: impl IntoIterator<Item = (Technology, T)>) -> Self {
        let mut map = TechMap::default();
        for (tech, value) in pairs {
            map[tech] = value;
        }
        map
    }

    pub fn iter(&self) -> impl Iterator<Item = (Technology, T)> + '_ {
        Technology::ALL.into_iter().map(move |t| (t, self.values[t.index()]))
    }
}

/// Written as a table keyed by technology code, e.g. `{ E_WIND = 31.4 }`.
/// Codes absent from the table are zero.
impl Serialize for TechMap<f64> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(
            self.iter()
                .filter(|(_, value)| *value != 0.0)
                .map(|(tech, value)| (tech.code(), value)),
        )
    }
}

impl<'de> Deserialize<'de> for TechMap<f64> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, f64>::deserialize(deserializer)?;
        let mut map = TechMap::default();
        for (code, value) in raw {
            let tech: Technology = code.parse().map_err(serde::de::Error::custom)?;
            map[tech] = value;
        }
        Ok(map)
    }
}

impl<T> Index<Technology> for TechMap<T> {
    type Output = T;

    fn index(&self, tech: Technology) -> &T {
        &self.values[tech.index()]
    }
}

impl<T> IndexMut<Technology> for TechMap<T> {
    fn index_mut(&mut self, tech: Technology) -> &mut T {
        &mut self.values[tech.index()]
    }
}
