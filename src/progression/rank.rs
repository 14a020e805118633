use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Named progression tiers, lowest first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Difficulty {
    Easy,
    Average,
    Advanced,
    Superstar,
    Elite,
    Strategist,
    Grandmaster,
    Warlord,
    Titan,
    Legend,
    Immortal,
    Ascendant,
    Demigod,
}

impl Difficulty {
    pub const ALL: [Difficulty; 13] = [
        Difficulty::Easy,
        Difficulty::Average,
        Difficulty::Advanced,
        Difficulty::Superstar,
        Difficulty::Elite,
        Difficulty::Strategist,
        Difficulty::Grandmaster,
        Difficulty::Warlord,
        Difficulty::Titan,
        Difficulty::Legend,
        Difficulty::Immortal,
        Difficulty::Ascendant,
        Difficulty::Demigod,
    ];

    pub const LOWEST: Difficulty = Difficulty::Easy;
    pub const SECOND_LOWEST: Difficulty = Difficulty::Average;

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "Easy",
            Difficulty::Average => "Average",
            Difficulty::Advanced => "Advanced",
            Difficulty::Superstar => "Superstar",
            Difficulty::Elite => "Elite",
            Difficulty::Strategist => "Strategist",
            Difficulty::Grandmaster => "Grandmaster",
            Difficulty::Warlord => "Warlord",
            Difficulty::Titan => "Titan",
            Difficulty::Legend => "Legend",
            Difficulty::Immortal => "Immortal",
            Difficulty::Ascendant => "Ascendant",
            Difficulty::Demigod => "Demigod",
        }
    }
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::LOWEST
    }
}

impl FromStr for Difficulty {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Difficulty::ALL
            .into_iter()
            .find(|tier| tier.as_str().eq_ignore_ascii_case(wanted))
            .ok_or(())
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum ConfigError {
    #[error("{table} table is empty")]
    EmptyTable { table: String },
    #[error("{table} table must be strictly descending (entry {position})")]
    NotDescending { table: String, position: usize },
    #[error("{table} table must end with a zero threshold")]
    MissingFloor { table: String },
    #[error("loss penalty for {tier} is below a lower tier's")]
    PenaltyNotMonotonic { tier: Difficulty },
    #[error("invalid progression config: {message}")]
    Malformed { message: String },
}

/// Checks a threshold sequence scanned highest first.
pub(crate) fn validate_thresholds(
    table: &str,
    thresholds: impl IntoIterator<Item = u32>,
) -> Result<(), ConfigError> {
    let mut previous: Option<u32> = None;
    for (position, threshold) in thresholds.into_iter().enumerate() {
        if let Some(previous) = previous {
            if threshold >= previous {
                return Err(ConfigError::NotDescending {
                    table: table.to_owned(),
                    position,
                });
            }
        }
        previous = Some(threshold);
    }
    match previous {
        None => Err(ConfigError::EmptyTable {
            table: table.to_owned(),
        }),
        Some(0) => Ok(()),
        Some(_) => Err(ConfigError::MissingFloor {
            table: table.to_owned(),
        }),
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RankThreshold {
    pub label: Difficulty,
    pub score: u32,
}

/// Score thresholds scanned from the highest tier down.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(transparent)]
pub struct RankTable {
    thresholds: Vec<RankThreshold>,
}

static STANDARD_RANKS: Lazy<RankTable> = Lazy::new(|| RankTable {
    thresholds: [
        (Difficulty::Demigod, 6000),
        (Difficulty::Ascendant, 5500),
        (Difficulty::Immortal, 5000),
        (Difficulty::Legend, 4500),
        (Difficulty::Titan, 4000),
        (Difficulty::Warlord, 3500),
        (Difficulty::Grandmaster, 3000),
        (Difficulty::Strategist, 2500),
        (Difficulty::Elite, 2000),
        (Difficulty::Superstar, 1500),
        (Difficulty::Advanced, 500),
        (Difficulty::Easy, 0),
    ]
    .into_iter()
    .map(|(label, score)| RankThreshold { label, score })
    .collect(),
});

impl RankTable {
    pub fn new(thresholds: Vec<RankThreshold>) -> Result<Self, ConfigError> {
        let table = Self { thresholds };
        table.validate()?;
        Ok(table)
    }

    pub fn standard() -> &'static RankTable {
        &STANDARD_RANKS
    }

    pub fn thresholds(&self) -> &[RankThreshold] {
        &self.thresholds
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_thresholds("rank", self.thresholds.iter().map(|entry| entry.score))
    }

    /// Highest tier whose threshold is at or below `score`.
    pub fn resolve(&self, score: u32) -> Difficulty {
        self.thresholds
            .iter()
            .find(|entry| score >= entry.score)
            .map(|entry| entry.label)
            .unwrap_or(Difficulty::LOWEST)
    }
}

impl Default for RankTable {
    fn default() -> Self {
        STANDARD_RANKS.clone()
    }
}
