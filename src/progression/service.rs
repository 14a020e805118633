use tracing::{debug, info, instrument};

use super::policy::{ProgressionPolicy, ProgressionUpdate};
use super::record::{PlayerRecord, RecordStore, StoreError};
use crate::game::{GameMode, MatchResult, MatchSession};

/// Get-or-create and match recording on top of an injected [`RecordStore`].
#[derive(Debug, Clone)]
pub struct ProgressionService<S> {
    store: S,
    policy: ProgressionPolicy,
}

impl<S: RecordStore> ProgressionService<S> {
    pub fn new(store: S, policy: ProgressionPolicy) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Returns the stored record, creating a fresh one on first appearance.
    #[instrument(skip(self))]
    pub fn get_or_create(&mut self, name: &str) -> Result<PlayerRecord, StoreError> {
        if let Some(record) = self.store.load(name)? {
            debug!(score = record.score, "existing player found");
            return Ok(record);
        }

        info!("creating new player record");
        let record = PlayerRecord::new(name);
        self.store.save(&record)?;
        Ok(record)
    }

    #[instrument(skip(self))]
    pub fn record_match(
        &mut self,
        name: &str,
        result: MatchResult,
        mode: GameMode,
    ) -> Result<ProgressionUpdate, StoreError> {
        let record = self.get_or_create(name)?;
        let update = self.policy.apply(result, mode, &record);
        self.store.save(&update.record)?;
        Ok(update)
    }

    /// Records every seat of a finished session.
    ///
    /// `player_one` holds the session's player symbol; `player_two` the other
    /// seat in two-player matches. Unfinished sessions record nothing.
    pub fn record_session(
        &mut self,
        session: &MatchSession,
        player_one: &str,
        player_two: Option<&str>,
    ) -> Result<Vec<ProgressionUpdate>, StoreError> {
        let mut updates = Vec::new();
        for (symbol, result) in session.results() {
            let name = if symbol == session.player_symbol() {
                Some(player_one)
            } else {
                player_two
            };
            if let Some(name) = name {
                updates.push(self.record_match(name, result, session.mode())?);
            }
        }
        Ok(updates)
    }
}
