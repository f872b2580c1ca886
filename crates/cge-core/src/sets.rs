//! Index sets of the steel model: technologies, factors and plants.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use crate::error::CgeError;

/// Steelmaking route. Every plant is assigned exactly one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Technology {
    /// Basic oxygen furnace
    Bof,
    /// Electric arc furnace
    Eaf,
    /// Direct reduced iron
    Dri,
}

impl Technology {
    pub const ALL: [Technology; 3] = [Technology::Bof, Technology::Eaf, Technology::Dri];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Lower-case code used in raw tables and datasets.
    pub fn code(self) -> &'static str {
        match self {
            Technology::Bof => "bof",
            Technology::Eaf => "eaf",
            Technology::Dri => "dri",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Technology::Bof => "BOF",
            Technology::Eaf => "EAF",
            Technology::Dri => "DRI",
        }
    }

    /// Block assignment: the first third of the plants are BOF, the next EAF,
    /// the last DRI.
    pub fn for_plant(position: usize, plant_count: usize) -> Technology {
        let per_block = (plant_count / Technology::ALL.len()).max(1);
        let block = (position / per_block).min(Technology::ALL.len() - 1);
        Technology::ALL[block]
    }
}

impl fmt::Display for Technology {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Technology {
    type Err = CgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "bof" => Ok(Technology::Bof),
            "eaf" => Ok(Technology::Eaf),
            "dri" => Ok(Technology::Dri),
            other => Err(CgeError::Parse(format!("unknown technology '{other}'"))),
        }
    }
}

/// Production factor with a market price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Factor {
    Iore,
    Coal,
    Scrp,
    Elec,
    Ngas,
}

impl Factor {
    pub const ALL: [Factor; 5] = [
        Factor::Iore,
        Factor::Coal,
        Factor::Scrp,
        Factor::Elec,
        Factor::Ngas,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn code(self) -> &'static str {
        match self {
            Factor::Iore => "iore",
            Factor::Coal => "coal",
            Factor::Scrp => "scrp",
            Factor::Elec => "elec",
            Factor::Ngas => "ngas",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Factor::Iore => "iron ore",
            Factor::Coal => "coal",
            Factor::Scrp => "scrap",
            Factor::Elec => "electricity",
            Factor::Ngas => "natural gas",
        }
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Factor {
    type Err = CgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        Factor::ALL
            .into_iter()
            .find(|f| f.code() == key || f.label() == key)
            .ok_or_else(|| CgeError::Parse(format!("unknown factor '{}'", s.trim())))
    }
}

/// One value per [`Factor`], stored in `Factor::ALL` order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FactorTable<T>(pub [T; 5]);

impl<T> FactorTable<T> {
    pub fn from_fn(mut f: impl FnMut(Factor) -> T) -> Self {
        FactorTable(std::array::from_fn(|i| f(Factor::ALL[i])))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Factor, &T)> {
        Factor::ALL.into_iter().zip(self.0.iter())
    }
}

impl<T: Default> Default for FactorTable<T> {
    fn default() -> Self {
        FactorTable::from_fn(|_| T::default())
    }
}

impl<T> Index<Factor> for FactorTable<T> {
    type Output = T;

    fn index(&self, factor: Factor) -> &T {
        &self.0[factor.index()]
    }
}

impl<T> IndexMut<Factor> for FactorTable<T> {
    fn index_mut(&mut self, factor: Factor) -> &mut T {
        &mut self.0[factor.index()]
    }
}

/// One value per [`Technology`], stored in `Technology::ALL` order.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TechTable<T>(pub [T; 3]);

impl<T> TechTable<T> {
    pub fn from_fn(mut f: impl FnMut(Technology) -> T) -> Self {
        TechTable(std::array::from_fn(|i| f(Technology::ALL[i])))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Technology, &T)> {
        Technology::ALL.into_iter().zip(self.0.iter())
    }
}

impl<T: Default> Default for TechTable<T> {
    fn default() -> Self {
        TechTable::from_fn(|_| T::default())
    }
}

impl<T> Index<Technology> for TechTable<T> {
    type Output = T;

    fn index(&self, tech: Technology) -> &T {
        &self.0[tech.index()]
    }
}

impl<T> IndexMut<Technology> for TechTable<T> {
    fn index_mut(&mut self, tech: Technology) -> &mut T {
        &mut self.0[tech.index()]
    }
}

/// Plant identifier, displayed as `i1`, `i2`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlantId(u16);

impl PlantId {
    pub fn new(number: u16) -> Self {
        PlantId(number)
    }

    pub fn number(self) -> u16 {
        self.0
    }
}

impl fmt::Display for PlantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "i{}", self.0)
    }
}

impl FromStr for PlantId {
    type Err = CgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        trimmed
            .strip_prefix('i')
            .and_then(|n| n.parse::<u16>().ok())
            .filter(|n| *n > 0)
            .map(PlantId)
            .ok_or_else(|| CgeError::Parse(format!("invalid plant id '{trimmed}'")))
    }
}

impl TryFrom<String> for PlantId {
    type Error = CgeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<PlantId> for String {
    fn from(id: PlantId) -> Self {
        id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn block_assignment_matches_fifteen_plants() {
        let techs: Vec<_> = (0..15).map(|i| Technology::for_plant(i, 15)).collect();
        assert!(techs[..5].iter().all(|t| *t == Technology::Bof));
        assert!(techs[5..10].iter().all(|t| *t == Technology::Eaf));
        assert!(techs[10..].iter().all(|t| *t == Technology::Dri));
    }

    #[test]
    fn factor_parses_code_and_label() {
        assert_eq!("scrp".parse::<Factor>().unwrap(), Factor::Scrp);
        assert_eq!("Natural Gas".parse::<Factor>().unwrap(), Factor::Ngas);
        assert!("oil".parse::<Factor>().is_err());
    }

    #[test]
    fn plant_id_round_trips_through_string() {
        let id: PlantId = "i12".parse().unwrap();
        assert_eq!(id.number(), 12);
        assert_eq!(id.to_string(), "i12");
        assert!("12".parse::<PlantId>().is_err());
        assert!("i0".parse::<PlantId>().is_err());
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"i12\"");
    }

    #[test]
    fn tables_index_by_set_member() {
        let mut table = FactorTable::from_fn(|f| f.index() as f64);
        table[Factor::Elec] += 10.0;
        assert_eq!(table[Factor::Elec], 13.0);
        let tech = TechTable::from_fn(|t| t.label());
        assert_eq!(tech[Technology::Dri], "DRI");
    }
}
