use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::auth::{Identity, Redact};
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum GoalStatus {
    Planned,
    InProgress,
    Done,
}

impl GoalStatus {
    pub const ALL: [GoalStatus; 3] = [GoalStatus::Planned, GoalStatus::InProgress, GoalStatus::Done];

    pub fn as_str(&self) -> &'static str {
        match self {
            GoalStatus::Planned => "planned",
            GoalStatus::InProgress => "in_progress",
            GoalStatus::Done => "done",
        }
    }
}

impl FromStr for GoalStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GoalStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == s.trim())
            .ok_or_else(|| {
                AppError::validation("status", format!("Unknown goal status: {}", s.trim()))
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum ProgressStatus {
    Plan,
    InProgress,
    Done,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Player {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    pub age: Option<i64>,
    pub club: String,
    pub position: String,
    pub dominant_foot: String,
    pub photo_url: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct AccountRef {
    pub id: i64,
    pub email: String,
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlayerRef {
    pub id: i64,
    pub first_name: String,
    pub last_name: String,
    pub club: String,
}

/// A player with its trainer and account references resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerDetail {
    #[serde(flatten)]
    pub player: Player,
    pub trainers: Vec<AccountRef>,
    pub account: Option<AccountRef>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct PlayerInput {
    #[validate(length(min = 1, max = 80, message = "First name is required"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 80, message = "Last name is required"))]
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    #[validate(range(min = 3, max = 40, message = "Age must be between 3 and 40"))]
    pub age: Option<i64>,
    #[serde(default)]
    #[validate(length(max = 120))]
    pub club: String,
    #[serde(default)]
    #[validate(length(max = 60))]
    pub position: String,
    #[serde(default)]
    #[validate(length(max = 20))]
    pub dominant_foot: String,
    #[validate(url(message = "Photo must be a URL"))]
    pub photo_url: Option<String>,
    #[serde(default)]
    pub trainer_ids: Vec<i64>,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Skill {
    pub id: i64,
    pub name: String,
    pub category: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SubSkill {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub difficulty: i64,
    pub active: bool,
}

/// A skill with its sub-skills resolved in catalog order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillDetail {
    #[serde(flatten)]
    pub skill: Skill,
    pub sub_skills: Vec<SubSkill>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SkillInput {
    #[validate(length(min = 1, max = 80, message = "Skill name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 60))]
    pub category: String,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SubSkillInput {
    #[validate(length(min = 1, max = 80, message = "Sub-skill name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 500))]
    pub description: String,
    #[validate(range(min = 1, max = 3, message = "Difficulty must be 1, 2 or 3"))]
    pub difficulty: i64,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TrainingSession {
    pub id: i64,
    pub trainer_id: Option<i64>,
    pub date: DateTime<Utc>,
    pub duration_minutes: i64,
    pub location: String,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TrainingEntry {
    pub id: i64,
    pub session_id: i64,
    pub position: i64,
    pub skill_id: i64,
    pub skill_name: String,
    pub sub_skill_id: Option<i64>,
    pub sub_skill_name: Option<String>,
    pub volume: Option<i64>,
    pub quality: Option<i64>,
    pub notes: Option<String>,
}

/// A session with players, trainer and entry skills resolved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSessionView {
    pub id: i64,
    pub date: DateTime<Utc>,
    pub duration_minutes: i64,
    pub location: String,
    pub notes: String,
    pub trainer: Option<AccountRef>,
    pub players: Vec<PlayerRef>,
    pub entries: Vec<TrainingEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactedTrainingEntry {
    pub id: i64,
    pub skill_id: i64,
    pub skill_name: String,
    pub sub_skill_id: Option<i64>,
    pub sub_skill_name: Option<String>,
    pub volume: Option<i64>,
    pub quality: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactedTrainingSession {
    pub id: i64,
    pub date: DateTime<Utc>,
    pub duration_minutes: i64,
    pub location: String,
    pub trainer: Option<AccountRef>,
    /// Only the viewer's own player; the rest of the group is a count.
    pub players: Vec<PlayerRef>,
    pub players_count: usize,
    pub entries: Vec<RedactedTrainingEntry>,
}

impl Redact for TrainingSessionView {
    type Redacted = RedactedTrainingSession;

    fn redact(self, viewer: &Identity) -> RedactedTrainingSession {
        RedactedTrainingSession {
            id: self.id,
            date: self.date,
            duration_minutes: self.duration_minutes,
            location: self.location,
            trainer: self.trainer,
            players_count: self.players.len(),
            players: self
                .players
                .into_iter()
                .filter(|player| viewer.player_id == Some(player.id))
                .collect(),
            entries: self
                .entries
                .into_iter()
                .map(|entry| RedactedTrainingEntry {
                    id: entry.id,
                    skill_id: entry.skill_id,
                    skill_name: entry.skill_name,
                    sub_skill_id: entry.sub_skill_id,
                    sub_skill_name: entry.sub_skill_name,
                    volume: entry.volume,
                    quality: entry.quality,
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TrainingEntryInput {
    pub skill_id: i64,
    pub sub_skill_id: Option<i64>,
    #[validate(range(min = 0, max = 10000))]
    pub volume: Option<i64>,
    #[validate(range(min = 1, max = 5, message = "Quality must be between 1 and 5"))]
    pub quality: Option<i64>,
    #[validate(length(max = 1000))]
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TrainingInput {
    #[validate(length(min = 1, message = "A training needs at least one player"))]
    pub player_ids: Vec<i64>,
    pub trainer_id: Option<i64>,
    pub date: DateTime<Utc>,
    #[validate(range(min = 1, max = 600, message = "Duration must be between 1 and 600 minutes"))]
    pub duration_minutes: i64,
    #[serde(default)]
    #[validate(length(max = 120))]
    pub location: String,
    #[serde(default)]
    #[validate(length(max = 4000))]
    pub notes: String,
    #[serde(default)]
    #[validate(nested)]
    pub entries: Vec<TrainingEntryInput>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Goal {
    pub id: i64,
    pub player_id: i64,
    pub title: String,
    pub description: String,
    pub due_date: Option<NaiveDate>,
    pub status: GoalStatus,
    pub skill_id: Option<i64>,
    pub skill_name: Option<String>,
    pub sub_skill_id: Option<i64>,
    pub sub_skill_name: Option<String>,
    pub created_by: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct GoalInput {
    pub player_id: i64,
    #[validate(length(min = 1, max = 120, message = "Goal title is required"))]
    pub title: String,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: String,
    pub due_date: Option<NaiveDate>,
    pub status: Option<GoalStatus>,
    pub skill_id: Option<i64>,
    pub sub_skill_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct PlayerSkillProgress {
    pub id: i64,
    pub player_id: i64,
    pub skill_id: i64,
    pub skill_name: String,
    pub sub_skill_id: Option<i64>,
    pub sub_skill_name: Option<String>,
    pub planned_date: Option<NaiveDate>,
    pub done_date: Option<NaiveDate>,
    pub status: ProgressStatus,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactedPlayerSkillProgress {
    pub id: i64,
    pub player_id: i64,
    pub skill_id: i64,
    pub skill_name: String,
    pub sub_skill_id: Option<i64>,
    pub sub_skill_name: Option<String>,
    pub planned_date: Option<NaiveDate>,
    pub done_date: Option<NaiveDate>,
    pub status: ProgressStatus,
    pub updated_at: DateTime<Utc>,
}

impl Redact for PlayerSkillProgress {
    type Redacted = RedactedPlayerSkillProgress;

    fn redact(self, _viewer: &Identity) -> RedactedPlayerSkillProgress {
        RedactedPlayerSkillProgress {
            id: self.id,
            player_id: self.player_id,
            skill_id: self.skill_id,
            skill_name: self.skill_name,
            sub_skill_id: self.sub_skill_id,
            sub_skill_name: self.sub_skill_name,
            planned_date: self.planned_date,
            done_date: self.done_date,
            status: self.status,
            updated_at: self.updated_at,
        }
    }
}

/// The key and new state of one progress row. Writing the same
/// (player, skill, sub-skill) key again updates the existing row.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct ProgressInput {
    pub player_id: i64,
    pub skill_id: i64,
    pub sub_skill_id: Option<i64>,
    pub status: ProgressStatus,
    pub planned_date: Option<NaiveDate>,
    pub done_date: Option<NaiveDate>,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub notes: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct FitnessTest {
    pub id: i64,
    pub name: String,
    pub unit: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct FitnessTestInput {
    #[validate(length(min = 1, max = 80, message = "Test name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 20))]
    pub unit: String,
    #[serde(default)]
    #[validate(length(max = 1000))]
    pub description: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct TestResult {
    pub id: i64,
    pub player_id: i64,
    pub test_id: i64,
    pub test_name: String,
    pub unit: String,
    pub date: NaiveDate,
    pub value: f64,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedactedTestResult {
    pub id: i64,
    pub player_id: i64,
    pub test_id: i64,
    pub test_name: String,
    pub unit: String,
    pub date: NaiveDate,
    pub value: f64,
}

impl Redact for TestResult {
    type Redacted = RedactedTestResult;

    fn redact(self, _viewer: &Identity) -> RedactedTestResult {
        RedactedTestResult {
            id: self.id,
            player_id: self.player_id,
            test_id: self.test_id,
            test_name: self.test_name,
            unit: self.unit,
            date: self.date,
            value: self.value,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct TestResultInput {
    pub player_id: i64,
    pub test_id: i64,
    pub date: NaiveDate,
    pub value: f64,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub notes: String,
}
