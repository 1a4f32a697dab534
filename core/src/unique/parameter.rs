use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};

/// Declared type of a placeholder in a unique template, e.g. `[relativeAmount]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParameterType {
    Amount,
    RelativeAmount,
    Stats,
    Stat,
    CityFilter,
    BaseUnitFilter,
    MapUnitFilter,
    CombatantFilter,
    BuildingFilter,
    BuildingName,
    Unit,
    Policy,
    PopulationFilter,
}

impl ParameterType {
    pub fn iter() -> impl Iterator<Item = ParameterType> {
        [
            ParameterType::Amount,
            ParameterType::RelativeAmount,
            ParameterType::Stats,
            ParameterType::Stat,
            ParameterType::CityFilter,
            ParameterType::BaseUnitFilter,
            ParameterType::MapUnitFilter,
            ParameterType::CombatantFilter,
            ParameterType::BuildingFilter,
            ParameterType::BuildingName,
            ParameterType::Unit,
            ParameterType::Policy,
            ParameterType::PopulationFilter,
        ]
        .into_iter()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ParameterType::Amount => "amount",
            ParameterType::RelativeAmount => "relativeAmount",
            ParameterType::Stats => "stats",
            ParameterType::Stat => "stat",
            ParameterType::CityFilter => "cityFilter",
            ParameterType::BaseUnitFilter => "baseUnitFilter",
            ParameterType::MapUnitFilter => "mapUnitFilter",
            ParameterType::CombatantFilter => "combatantFilter",
            ParameterType::BuildingFilter => "buildingFilter",
            ParameterType::BuildingName => "buildingName",
            ParameterType::Unit => "unit",
            ParameterType::Policy => "policy",
            ParameterType::PopulationFilter => "populationFilter",
        }
    }

    /// Placeholder names are matched exactly; anything else in a template bracket is a fixed segment.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::iter().find(|ty| ty.as_str() == name)
    }

    pub fn accepts(self, value: &str) -> bool {
        self.decode(value).is_some()
    }

    /// Decodes a raw parameter into its structured form, `None` when the value does not fit the type.
    pub fn decode(self, value: &str) -> Option<ParameterValue> {
        let value = value.trim();
        match self {
            ParameterType::Amount => {
                if value.is_empty() || !value.chars().all(|ch| ch.is_ascii_digit()) {
                    return None;
                }
                value.parse().ok().map(ParameterValue::Amount)
            }
            ParameterType::RelativeAmount => value.parse().ok().map(ParameterValue::Delta),
            ParameterType::Stats => parse_stat_list(value).map(ParameterValue::Stats),
            ParameterType::Stat => value.parse().ok().map(ParameterValue::Stat),
            _ if value.is_empty() => None,
            _ => Some(ParameterValue::Text(value.to_string())),
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Stat {
    Production,
    Food,
    Gold,
    Science,
    Culture,
    Happiness,
    Faith,
}

impl Stat {
    pub fn as_str(self) -> &'static str {
        match self {
            Stat::Production => "Production",
            Stat::Food => "Food",
            Stat::Gold => "Gold",
            Stat::Science => "Science",
            Stat::Culture => "Culture",
            Stat::Happiness => "Happiness",
            Stat::Faith => "Faith",
        }
    }
}

impl fmt::Display for Stat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Stat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "Production" => Ok(Stat::Production),
            "Food" => Ok(Stat::Food),
            "Gold" => Ok(Stat::Gold),
            "Science" => Ok(Stat::Science),
            "Culture" => Ok(Stat::Culture),
            "Happiness" => Ok(Stat::Happiness),
            "Faith" => Ok(Stat::Faith),
            other => bail!("未知のステータスです: {}", other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatAmount {
    pub stat: Stat,
    pub amount: i32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterValue {
    Amount(u32),
    Delta(i32),
    Stats(Vec<StatAmount>),
    Stat(Stat),
    Text(String),
}

fn parse_stat_list(value: &str) -> Option<Vec<StatAmount>> {
    let mut stats = Vec::new();
    for item in value.split(',') {
        let (amount, stat) = item.trim().split_once(' ')?;
        stats.push(StatAmount {
            stat: stat.parse().ok()?,
            amount: amount.parse().ok()?,
        });
    }
    Some(stats)
}
