use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;

use super::rank::Difficulty;

/// A player's persistent progression, in the shape the UI stores it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRecord {
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "clamped_score")]
    pub score: u32,
    #[serde(default)]
    pub preferred_difficulty: Difficulty,
    #[serde(default, rename = "lossesCount")]
    pub loss_count: u32,
    #[serde(default, rename = "drawsCount")]
    pub draw_count: u32,
    /// Fields owned by the UI (avatar and friends), carried through untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PlayerRecord {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            score: 0,
            preferred_difficulty: Difficulty::LOWEST,
            loss_count: 0,
            draw_count: 0,
            extra: Map::new(),
        }
    }
}

// `as` saturates: negatives and NaN land on 0, fractions truncate.
fn clamped_score<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(f64::deserialize(deserializer)? as u32)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Error)]
#[serde(tag = "type")]
pub enum StoreError {
    #[error("record store serialization failed: {message}")]
    Serialization { message: String },
}

/// Storage capability for player records, keyed by player name.
pub trait RecordStore {
    fn load(&self, name: &str) -> Result<Option<PlayerRecord>, StoreError>;

    fn save(&mut self, record: &PlayerRecord) -> Result<(), StoreError>;
}

/// Map-backed store. Reads and writes the UI's `{ [name]: record }` blob.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InMemoryRecordStore {
    records: BTreeMap<String, PlayerRecord>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_json(json: &str) -> Result<Self, StoreError> {
        if json.trim().is_empty() {
            return Ok(Self::new());
        }
        let mut records: BTreeMap<String, PlayerRecord> =
            serde_json::from_str(json).map_err(|err| StoreError::Serialization {
                message: err.to_string(),
            })?;
        for (name, record) in records.iter_mut() {
            if record.name.is_empty() {
                record.name = name.clone();
            }
        }
        Ok(Self { records })
    }

    pub fn to_json(&self) -> Result<String, StoreError> {
        serde_json::to_string(&self.records).map_err(|err| StoreError::Serialization {
            message: err.to_string(),
        })
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl RecordStore for InMemoryRecordStore {
    fn load(&self, name: &str) -> Result<Option<PlayerRecord>, StoreError> {
        Ok(self.records.get(name).cloned())
    }

    fn save(&mut self, record: &PlayerRecord) -> Result<(), StoreError> {
        self.records.insert(record.name.clone(), record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ui_blob_round_trips_with_unknown_fields() {
        let json = r#"{
            "ada": { "name": "ada", "score": 730, "avatar": "female", "preferredDifficulty": "Advanced", "lossesCount": 2 },
            "bob": { "score": 15, "avatar": "male", "preferredDifficulty": "Easy" }
        }"#;
        let store = InMemoryRecordStore::from_json(json).expect("blob should parse");

        let ada = store.load("ada").expect("load").expect("ada exists");
        assert_eq!(ada.score, 730);
        assert_eq!(ada.preferred_difficulty, Difficulty::Advanced);
        assert_eq!(ada.loss_count, 2);
        assert_eq!(ada.draw_count, 0);
        assert_eq!(ada.extra.get("avatar"), Some(&Value::from("female")));

        let bob = store.load("bob").expect("load").expect("bob exists");
        assert_eq!(bob.name, "bob");

        let written = store.to_json().expect("blob should serialize");
        let value: Value = serde_json::from_str(&written).expect("valid json");
        assert_eq!(value["ada"]["avatar"], "female");
        assert_eq!(value["ada"]["lossesCount"], 2);
        assert_eq!(value["bob"]["preferredDifficulty"], "Easy");
    }

    #[test]
    fn out_of_range_scores_are_clamped_on_read() {
        let negative: PlayerRecord =
            serde_json::from_str(r#"{ "name": "eve", "score": -40 }"#).expect("parses");
        let fractional: PlayerRecord =
            serde_json::from_str(r#"{ "name": "eve", "score": 12.7 }"#).expect("parses");

        assert_eq!(negative.score, 0);
        assert_eq!(fractional.score, 12);
    }

    #[test]
    fn empty_blob_is_an_empty_store() {
        let store = InMemoryRecordStore::from_json("").expect("empty is fine");
        assert!(store.is_empty());
        assert!(InMemoryRecordStore::from_json("not json").is_err());
    }
}
