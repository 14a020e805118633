//! Player progression: rank tiers, score policy and record storage.

pub mod policy;
pub mod rank;
pub mod record;
pub mod service;

pub use policy::{
    DowngradeRules, ProgressionConfig, ProgressionPolicy, ProgressionUpdate, ScoreBonus,
    TierPenalty,
};
pub use rank::{ConfigError, Difficulty, RankTable, RankThreshold};
pub use record::{InMemoryRecordStore, PlayerRecord, RecordStore, StoreError};
pub use service::ProgressionService;
