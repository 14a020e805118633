use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::rank::{validate_thresholds, ConfigError, Difficulty, RankTable};
use super::record::PlayerRecord;
use crate::game::{GameMode, MatchResult};

/// Win bonus granted from `score` upwards.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoreBonus {
    pub score: u32,
    pub bonus: u32,
}

/// Points lost to the AI while ranked at `tier`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TierPenalty {
    pub tier: Difficulty,
    pub points: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DowngradeRules {
    /// Consecutive losses that force the lowest tier.
    pub loss_limit: u32,
    /// Losses plus draws that force the lowest tier.
    pub struggle_limit: u32,
    /// Losses plus draws that soften play to the second-lowest tier.
    pub soften_limit: u32,
}

impl Default for DowngradeRules {
    fn default() -> Self {
        Self {
            loss_limit: 10,
            struggle_limit: 5,
            soften_limit: 3,
        }
    }
}

/// Tuning tables for scoring. Missing JSON fields fall back to the standard values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct ProgressionConfig {
    pub ranks: RankTable,
    pub win_bonus: Vec<ScoreBonus>,
    pub loss_penalties: Vec<TierPenalty>,
    pub fallback_loss_penalty: u32,
    pub draw_bonus: u32,
    pub two_player_win_bonus: u32,
    pub two_player_draw_bonus: u32,
    pub downgrade: DowngradeRules,
}

static STANDARD_CONFIG: Lazy<ProgressionConfig> = Lazy::new(|| ProgressionConfig {
    ranks: RankTable::standard().clone(),
    win_bonus: [(6000, 200), (4500, 175), (3000, 150), (1500, 120), (0, 100)]
        .into_iter()
        .map(|(score, bonus)| ScoreBonus { score, bonus })
        .collect(),
    loss_penalties: [
        (Difficulty::Demigod, 200),
        (Difficulty::Ascendant, 150),
        (Difficulty::Immortal, 100),
        (Difficulty::Legend, 50),
        (Difficulty::Titan, 50),
        (Difficulty::Warlord, 50),
        (Difficulty::Grandmaster, 50),
        (Difficulty::Strategist, 50),
        (Difficulty::Elite, 50),
        (Difficulty::Superstar, 50),
        (Difficulty::Advanced, 20),
        (Difficulty::Easy, 20),
    ]
    .into_iter()
    .map(|(tier, points)| TierPenalty { tier, points })
    .collect(),
    fallback_loss_penalty: 20,
    draw_bonus: 20,
    two_player_win_bonus: 100,
    two_player_draw_bonus: 20,
    downgrade: DowngradeRules::default(),
});

impl ProgressionConfig {
    pub fn standard() -> &'static ProgressionConfig {
        &STANDARD_CONFIG
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: ProgressionConfig =
            serde_json::from_str(json).map_err(|err| ConfigError::Malformed {
                message: err.to_string(),
            })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.ranks.validate()?;
        validate_thresholds("win bonus", self.win_bonus.iter().map(|entry| entry.score))?;
        self.validate_loss_penalties()
    }

    /// Higher tiers never lose fewer points than lower ones.
    fn validate_loss_penalties(&self) -> Result<(), ConfigError> {
        let mut by_tier: Vec<&TierPenalty> = self.loss_penalties.iter().collect();
        by_tier.sort_by_key(|entry| entry.tier);
        for pair in by_tier.windows(2) {
            if pair[1].points < pair[0].points {
                return Err(ConfigError::PenaltyNotMonotonic { tier: pair[1].tier });
            }
        }
        Ok(())
    }

    pub fn win_bonus_for(&self, score: u32) -> u32 {
        self.win_bonus
            .iter()
            .find(|entry| score >= entry.score)
            .map(|entry| entry.bonus)
            .unwrap_or(0)
    }

    pub fn loss_penalty_for(&self, tier: Difficulty) -> u32 {
        self.loss_penalties
            .iter()
            .find(|entry| entry.tier == tier)
            .map(|entry| entry.points)
            .unwrap_or(self.fallback_loss_penalty)
    }
}

impl Default for ProgressionConfig {
    fn default() -> Self {
        STANDARD_CONFIG.clone()
    }
}

/// Record after one match plus what changed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProgressionUpdate {
    pub record: PlayerRecord,
    /// Applied change, after the zero floor.
    pub score_delta: i64,
    pub rank: Difficulty,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub downgraded_to: Option<Difficulty>,
}

/// Turns a match result into a new player record.
#[derive(Debug, Clone, Default)]
pub struct ProgressionPolicy {
    config: ProgressionConfig,
}

impl ProgressionPolicy {
    pub fn new(config: ProgressionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProgressionConfig {
        &self.config
    }

    pub fn rank_of(&self, score: u32) -> Difficulty {
        self.config.ranks.resolve(score)
    }

    pub fn apply(
        &self,
        result: MatchResult,
        mode: GameMode,
        record: &PlayerRecord,
    ) -> ProgressionUpdate {
        let mut next = record.clone();
        let before = record.score;

        let downgraded_to = match mode {
            GameMode::SinglePlayer => self.apply_single_player(result, &mut next),
            GameMode::TwoPlayer => {
                self.apply_two_player(result, &mut next);
                None
            }
        };

        let update = ProgressionUpdate {
            score_delta: i64::from(next.score) - i64::from(before),
            rank: self.rank_of(next.score),
            downgraded_to,
            record: next,
        };
        info!(
            player = %update.record.name,
            ?result,
            ?mode,
            score = update.record.score,
            delta = update.score_delta,
            rank = %update.rank,
            "progression applied"
        );
        update
    }

    fn apply_single_player(
        &self,
        result: MatchResult,
        record: &mut PlayerRecord,
    ) -> Option<Difficulty> {
        match result {
            MatchResult::Win => {
                let bonus = self.config.win_bonus_for(record.score);
                record.score = record.score.saturating_add(bonus);
                record.loss_count = 0;
                record.draw_count = 0;
                None
            }
            MatchResult::Loss => {
                let tier = self.rank_of(record.score);
                let penalty = self.config.loss_penalty_for(tier);
                debug!(%tier, penalty, "loss penalty");
                record.score = record.score.saturating_sub(penalty);
                record.loss_count = record.loss_count.saturating_add(1);
                self.evaluate_downgrade(record)
            }
            MatchResult::Draw => {
                record.score = record.score.saturating_add(self.config.draw_bonus);
                record.draw_count = record.draw_count.saturating_add(1);
                self.evaluate_downgrade(record)
            }
        }
    }

    fn apply_two_player(&self, result: MatchResult, record: &mut PlayerRecord) {
        let bonus = match result {
            MatchResult::Win => self.config.two_player_win_bonus,
            MatchResult::Draw => self.config.two_player_draw_bonus,
            MatchResult::Loss => 0,
        };
        record.score = record.score.saturating_add(bonus);
    }

    /// Demotes the preferred difficulty of a struggling player. Never promotes.
    fn evaluate_downgrade(&self, record: &mut PlayerRecord) -> Option<Difficulty> {
        let rules = &self.config.downgrade;
        let struggling = record.loss_count.saturating_add(record.draw_count);

        let target = if record.loss_count >= rules.loss_limit || struggling >= rules.struggle_limit {
            Some(Difficulty::LOWEST)
        } else if struggling >= rules.soften_limit
            && record.preferred_difficulty != Difficulty::LOWEST
        {
            Some(Difficulty::SECOND_LOWEST)
        } else {
            None
        };

        match target {
            Some(tier) if tier != record.preferred_difficulty => {
                info!(
                    player = %record.name,
                    from = %record.preferred_difficulty,
                    to = %tier,
                    losses = record.loss_count,
                    draws = record.draw_count,
                    "difficulty downgraded"
                );
                record.preferred_difficulty = tier;
                Some(tier)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(score: u32, losses: u32, draws: u32, preferred: Difficulty) -> PlayerRecord {
        let mut record = PlayerRecord::new("ada");
        record.score = score;
        record.loss_count = losses;
        record.draw_count = draws;
        record.preferred_difficulty = preferred;
        record
    }

    #[test]
    fn win_adds_score_scaled_bonus_and_clears_streaks() {
        let policy = ProgressionPolicy::default();
        let update = policy.apply(
            MatchResult::Win,
            GameMode::SinglePlayer,
            &record(3200, 2, 1, Difficulty::Advanced),
        );

        assert_eq!(update.record.score, 3350);
        assert_eq!(update.score_delta, 150);
        assert_eq!(update.record.loss_count, 0);
        assert_eq!(update.record.draw_count, 0);
        assert_eq!(update.record.preferred_difficulty, Difficulty::Advanced);
        assert_eq!(update.downgraded_to, None);
    }

    #[test]
    fn draw_after_two_losses_softens_to_average() {
        let policy = ProgressionPolicy::default();
        let update = policy.apply(
            MatchResult::Draw,
            GameMode::SinglePlayer,
            &record(800, 2, 0, Difficulty::Advanced),
        );

        assert_eq!(update.record.draw_count, 1);
        assert_eq!(update.record.loss_count, 2);
        assert_eq!(update.record.score, 820);
        assert_eq!(update.record.preferred_difficulty, Difficulty::Average);
        assert_eq!(update.downgraded_to, Some(Difficulty::Average));
    }

    #[test]
    fn loss_penalty_is_floored_at_zero() {
        let policy = ProgressionPolicy::default();
        assert_eq!(policy.config().loss_penalty_for(Difficulty::Easy), 20);

        let update = policy.apply(
            MatchResult::Loss,
            GameMode::SinglePlayer,
            &record(5, 0, 0, Difficulty::Easy),
        );

        assert_eq!(update.record.score, 0);
        assert_eq!(update.score_delta, -5);
        assert_eq!(update.record.loss_count, 1);
    }

    #[test]
    fn loss_penalty_scales_with_rank() {
        let policy = ProgressionPolicy::default();
        let top = policy.apply(
            MatchResult::Loss,
            GameMode::SinglePlayer,
            &record(6100, 0, 0, Difficulty::Demigod),
        );
        let mid = policy.apply(
            MatchResult::Loss,
            GameMode::SinglePlayer,
            &record(2100, 0, 0, Difficulty::Elite),
        );

        assert_eq!(top.score_delta, -200);
        assert_eq!(mid.score_delta, -50);
        assert_eq!(top.rank, Difficulty::Ascendant);
    }

    #[test]
    fn ten_losses_force_lowest_tier_regardless_of_draws() {
        let policy = ProgressionPolicy::new(ProgressionConfig {
            downgrade: DowngradeRules {
                loss_limit: 10,
                struggle_limit: u32::MAX,
                soften_limit: u32::MAX,
            },
            ..ProgressionConfig::default()
        });
        let update = policy.apply(
            MatchResult::Loss,
            GameMode::SinglePlayer,
            &record(4000, 9, 0, Difficulty::Titan),
        );

        assert_eq!(update.record.loss_count, 10);
        assert_eq!(update.record.preferred_difficulty, Difficulty::Easy);
        assert_eq!(update.record.draw_count, 0);

        let standard = ProgressionPolicy::default().apply(
            MatchResult::Loss,
            GameMode::SinglePlayer,
            &record(4000, 9, 7, Difficulty::Titan),
        );
        assert_eq!(standard.record.preferred_difficulty, Difficulty::Easy);
        assert_eq!(standard.record.draw_count, 7);
    }

    #[test]
    fn loss_keeps_draw_count() {
        let policy = ProgressionPolicy::default();
        let update = policy.apply(
            MatchResult::Loss,
            GameMode::SinglePlayer,
            &record(900, 0, 1, Difficulty::Advanced),
        );

        assert_eq!(update.record.draw_count, 1);
        assert_eq!(update.record.loss_count, 1);
        assert_eq!(update.record.score, 880);
        assert_eq!(update.downgraded_to, None);
    }

    #[test]
    fn five_struggles_force_lowest_tier() {
        let policy = ProgressionPolicy::default();
        let update = policy.apply(
            MatchResult::Draw,
            GameMode::SinglePlayer,
            &record(100, 1, 3, Difficulty::Average),
        );

        assert_eq!(update.record.preferred_difficulty, Difficulty::Easy);
        assert_eq!(update.downgraded_to, Some(Difficulty::Easy));
    }

    #[test]
    fn lowest_tier_is_not_raised_to_average() {
        let policy = ProgressionPolicy::default();
        let update = policy.apply(
            MatchResult::Loss,
            GameMode::SinglePlayer,
            &record(100, 2, 0, Difficulty::Easy),
        );

        assert_eq!(update.record.preferred_difficulty, Difficulty::Easy);
        assert_eq!(update.downgraded_to, None);
    }

    #[test]
    fn short_streak_keeps_preference() {
        let policy = ProgressionPolicy::default();
        let update = policy.apply(
            MatchResult::Loss,
            GameMode::SinglePlayer,
            &record(900, 1, 0, Difficulty::Advanced),
        );

        assert_eq!(update.record.preferred_difficulty, Difficulty::Advanced);
        assert_eq!(update.downgraded_to, None);
    }

    #[test]
    fn two_player_uses_flat_bonuses_and_ignores_streaks() {
        let policy = ProgressionPolicy::default();
        let base = record(40, 3, 1, Difficulty::Advanced);

        let win = policy.apply(MatchResult::Win, GameMode::TwoPlayer, &base);
        let loss = policy.apply(MatchResult::Loss, GameMode::TwoPlayer, &base);
        let draw = policy.apply(MatchResult::Draw, GameMode::TwoPlayer, &base);

        assert_eq!(win.record.score, 140);
        assert_eq!(loss.record, base);
        assert_eq!(loss.score_delta, 0);
        assert_eq!(draw.record.score, 60);
        for update in [win, loss, draw] {
            assert_eq!(update.record.loss_count, 3);
            assert_eq!(update.record.draw_count, 1);
            assert_eq!(update.record.preferred_difficulty, Difficulty::Advanced);
        }
    }

    #[test]
    fn partial_json_config_keeps_standard_tables() {
        let config = ProgressionConfig::from_json(r#"{ "drawBonus": 35 }"#)
            .expect("partial config should parse");

        assert_eq!(config.draw_bonus, 35);
        assert_eq!(config.two_player_win_bonus, 100);
        assert_eq!(config.win_bonus_for(0), 100);
    }

    #[test]
    fn standard_penalties_rise_with_tier() {
        assert_eq!(ProgressionConfig::standard().validate(), Ok(()));
    }

    #[test]
    fn json_config_with_falling_penalties_is_rejected() {
        let json = r#"{ "lossPenalties": [
            { "tier": "Demigod", "points": 10 },
            { "tier": "Advanced", "points": 40 }
        ] }"#;
        assert_eq!(
            ProgressionConfig::from_json(json),
            Err(ConfigError::PenaltyNotMonotonic {
                tier: Difficulty::Demigod
            })
        );

        let rising = r#"{ "lossPenalties": [
            { "tier": "Easy", "points": 5 },
            { "tier": "Legend", "points": 90 }
        ] }"#;
        assert!(ProgressionConfig::from_json(rising).is_ok());
    }

    #[test]
    fn json_config_with_unordered_bonus_curve_is_rejected() {
        let json = r#"{ "winBonus": [ { "score": 0, "bonus": 10 }, { "score": 50, "bonus": 20 } ] }"#;
        assert!(matches!(
            ProgressionConfig::from_json(json),
            Err(ConfigError::NotDescending { .. })
        ));
    }
}
