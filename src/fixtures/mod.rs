//! Synthetic data for environments without real records.
//!
//! Three admin actions are exposed: wipe every player, generate players with
//! skill progress and a goal, and simulate training sessions. Randomness is
//! always passed in, so a seeded RNG reproduces a run.

pub mod catalog;
pub mod generator;
pub mod random;
pub mod teardown;

pub use catalog::*;
pub use generator::*;
pub use teardown::*;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::{Pool, Sqlite};
use tracing::instrument;

use crate::error::AppError;

pub const MAX_GENERATED_PLAYERS: usize = 100;
pub const MAX_SIMULATED_TRAININGS: usize = 200;
pub const DEFAULT_GENERATED_PLAYERS: usize = 10;
pub const DEFAULT_SIMULATED_TRAININGS: usize = 20;

#[derive(Debug, Clone, Deserialize)]
pub struct FixtureRequest {
    pub action: String,
    pub count: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FixtureAction {
    WipePlayers,
    GeneratePlayers { count: usize },
    SimulateTrainings { count: usize },
}

impl FixtureAction {
    /// Resolves an action name and optional count. The count is ignored for
    /// `wipe_players`.
    pub fn parse(action: &str, count: Option<i64>) -> Result<Self, AppError> {
        match action.trim() {
            "wipe_players" => Ok(FixtureAction::WipePlayers),
            "generate_players" => Ok(FixtureAction::GeneratePlayers {
                count: checked_count(count, DEFAULT_GENERATED_PLAYERS, MAX_GENERATED_PLAYERS)?,
            }),
            "simulate_trainings" => Ok(FixtureAction::SimulateTrainings {
                count: checked_count(count, DEFAULT_SIMULATED_TRAININGS, MAX_SIMULATED_TRAININGS)?,
            }),
            other => Err(AppError::validation(
                "action",
                format!(
                    "Unknown action '{}': expected wipe_players, generate_players or simulate_trainings",
                    other
                ),
            )),
        }
    }
}

impl TryFrom<&FixtureRequest> for FixtureAction {
    type Error = AppError;

    fn try_from(request: &FixtureRequest) -> Result<Self, Self::Error> {
        FixtureAction::parse(&request.action, request.count)
    }
}

fn checked_count(count: Option<i64>, default: usize, max: usize) -> Result<usize, AppError> {
    let Some(count) = count else {
        return Ok(default);
    };

    match usize::try_from(count) {
        Ok(count) if (1..=max).contains(&count) => Ok(count),
        _ => Err(AppError::validation(
            "count",
            format!("Count must be between 1 and {}", max),
        )),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WipeSummary {
    pub deleted_players: u64,
    pub deleted_training_sessions: u64,
    pub deleted_player_skill_progress: u64,
    pub deleted_goals: u64,
    pub deleted_test_results: u64,
    pub detached_accounts: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateSummary {
    pub requested_count: u64,
    pub created_players: u64,
    pub created_skill_links: u64,
    pub created_goals: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulateSummary {
    pub requested_count: u64,
    pub created_trainings: u64,
    pub touched_player_skill_progress: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum FixtureOutcome {
    WipePlayers(WipeSummary),
    GeneratePlayers(GenerateSummary),
    SimulateTrainings(SimulateSummary),
}

#[instrument(skip(pool, rng))]
pub async fn run_fixture_action<R: Rng + ?Sized>(
    pool: &Pool<Sqlite>,
    rng: &mut R,
    action: FixtureAction,
    now: DateTime<Utc>,
) -> Result<FixtureOutcome, AppError> {
    match action {
        FixtureAction::WipePlayers => Ok(FixtureOutcome::WipePlayers(
            wipe_all_players(pool, now).await?,
        )),
        FixtureAction::GeneratePlayers { count } => Ok(FixtureOutcome::GeneratePlayers(
            generate_players(pool, rng, count, now.date_naive()).await?,
        )),
        FixtureAction::SimulateTrainings { count } => Ok(FixtureOutcome::SimulateTrainings(
            simulate_trainings(pool, rng, count, now).await?,
        )),
    }
}
