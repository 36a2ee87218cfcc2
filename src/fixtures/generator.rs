use chrono::{DateTime, Datelike, Days, Duration, NaiveDate, Utc};
use fake::Fake;
use fake::faker::name::raw::{FirstName, LastName};
use fake::locales::EN;
use rand::Rng;
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::auth::Role;
use crate::db::{
    PlayerFilter, create_training, insert_goal, insert_player, list_accounts_by_role, list_players,
    list_skills, upsert_progress_row,
};
use crate::error::AppError;
use crate::models::{
    GoalInput, GoalStatus, PlayerInput, ProgressInput, ProgressStatus, SkillDetail,
    TrainingEntryInput, TrainingInput,
};

use super::random::{chance, pick_between, pick_one};
use super::{GenerateSummary, MAX_GENERATED_PLAYERS, MAX_SIMULATED_TRAININGS, SimulateSummary};

const MIN_AGE: i32 = 10;
const MAX_AGE: i32 = 18;

const MIN_TRAINERS: usize = 1;
const MAX_TRAINERS: usize = 2;

const MIN_PLAYER_SKILLS: usize = 4;
const MAX_PLAYER_SKILLS: usize = 9;

const MIN_SUB_SKILLS: usize = 1;
const MAX_SUB_SKILLS: usize = 3;

/// Share of progress rows still open (plan or in progress).
const OPEN_PROGRESS_PERCENT: u32 = 55;

const MIN_SESSION_PLAYERS: usize = 1;
const MAX_SESSION_PLAYERS: usize = 8;

const MIN_SESSION_SKILLS: usize = 2;
const MAX_SESSION_SKILLS: usize = 6;

const SUB_SKILL_PERCENT: u32 = 85;
const PROGRESS_TOUCH_PERCENT: u32 = 80;
const MAX_DAYS_BACK: i64 = 75;

const CLUBS: [&str; 6] = [
    "FC Riverside",
    "Northside United",
    "Harbour Rovers",
    "Valley Athletic",
    "Old Town Juniors",
    "",
];
const POSITIONS: [&str; 4] = ["goalkeeper", "defender", "midfielder", "forward"];
const FEET: [&str; 3] = ["right", "left", "both"];
const LOCATIONS: [&str; 4] = ["Main pitch", "Training ground", "Indoor hall", "Artificial turf"];
const DURATIONS: [i64; 5] = [45, 60, 75, 90, 120];

/// A birth date for which the player is exactly `age` years old on `today`.
pub fn birth_date_for_age<R: Rng + ?Sized>(rng: &mut R, age: i32, today: NaiveDate) -> NaiveDate {
    let year = today.year() - age;
    let latest = NaiveDate::from_ymd_opt(year, today.month(), today.day())
        .or_else(|| NaiveDate::from_ymd_opt(year, today.month(), 28))
        .unwrap_or(today);

    latest - Days::new(rng.random_range(0..=364))
}

fn random_player<R: Rng + ?Sized>(
    rng: &mut R,
    today: NaiveDate,
    trainer_ids: Vec<i64>,
) -> PlayerInput {
    let age = rng.random_range(MIN_AGE..=MAX_AGE);
    let first_name: String = FirstName(EN).fake_with_rng(rng);
    let last_name: String = LastName(EN).fake_with_rng(rng);

    PlayerInput {
        first_name,
        last_name,
        birth_date: Some(birth_date_for_age(rng, age, today)),
        age: Some(i64::from(age)),
        club: pick_one(rng, &CLUBS).copied().unwrap_or_default().to_string(),
        position: pick_one(rng, &POSITIONS).copied().unwrap_or_default().to_string(),
        dominant_foot: pick_one(rng, &FEET).copied().unwrap_or_default().to_string(),
        photo_url: None,
        trainer_ids,
        active: Some(true),
    }
}

/// A fresh status with its matching date: open rows are planned ahead,
/// done rows are dated on or before `reference`.
fn random_progress_state<R: Rng + ?Sized>(
    rng: &mut R,
    reference: NaiveDate,
) -> (ProgressStatus, Option<NaiveDate>, Option<NaiveDate>) {
    if chance(rng, OPEN_PROGRESS_PERCENT) {
        let status = if rng.random_bool(0.5) {
            ProgressStatus::Plan
        } else {
            ProgressStatus::InProgress
        };
        let planned = reference + Days::new(rng.random_range(1..=60));
        (status, Some(planned), None)
    } else {
        let done = reference - Days::new(rng.random_range(0..=120));
        let planned = done - Days::new(rng.random_range(0..=30));
        (ProgressStatus::Done, Some(planned), Some(done))
    }
}

/// Sub-skill slots for one assigned skill: 1 to 3 of its sub-skills, or a
/// single skill-level slot when it has none.
fn sub_skill_slots<R: Rng + ?Sized>(rng: &mut R, skill: &SkillDetail) -> Vec<Option<i64>> {
    if skill.sub_skills.is_empty() {
        return vec![None];
    }

    let ids: Vec<i64> = skill.sub_skills.iter().map(|sub| sub.id).collect();
    pick_between(rng, &ids, MIN_SUB_SKILLS, MAX_SUB_SKILLS)
        .into_iter()
        .map(Some)
        .collect()
}

async fn trainer_ids(pool: &Pool<Sqlite>) -> Result<Vec<i64>, AppError> {
    Ok(list_accounts_by_role(pool, Role::Trainer)
        .await?
        .into_iter()
        .map(|account| account.id)
        .collect())
}

/// Creates `count` players, each with trainers, 4 to 9 distinct skills of
/// progress and one goal.
///
/// Each player commits on its own; a storage fault stops the batch and
/// leaves earlier players in place.
#[instrument(skip(pool, rng))]
pub async fn generate_players<R: Rng + ?Sized>(
    pool: &Pool<Sqlite>,
    rng: &mut R,
    count: usize,
    today: NaiveDate,
) -> Result<GenerateSummary, AppError> {
    if !(1..=MAX_GENERATED_PLAYERS).contains(&count) {
        return Err(AppError::validation(
            "count",
            format!("Count must be between 1 and {}", MAX_GENERATED_PLAYERS),
        ));
    }

    let skills = list_skills(pool, false).await?;
    if skills.is_empty() {
        return Err(AppError::PrecursorMissing(
            "the skill catalog is empty; seed or create skills first".to_string(),
        ));
    }
    let trainers = trainer_ids(pool).await?;

    let mut summary = GenerateSummary {
        requested_count: count as u64,
        ..GenerateSummary::default()
    };

    for _ in 0..count {
        let assigned_trainers = pick_between(rng, &trainers, MIN_TRAINERS, MAX_TRAINERS);
        let player = random_player(rng, today, assigned_trainers);
        let assigned_skills = pick_between(rng, &skills, MIN_PLAYER_SKILLS, MAX_PLAYER_SKILLS);

        let mut tx = pool.begin().await?;
        let player_id = insert_player(&mut tx, &player).await?;

        for skill in &assigned_skills {
            for sub_skill_id in sub_skill_slots(rng, skill) {
                let (status, planned_date, done_date) = random_progress_state(rng, today);
                let upsert = upsert_progress_row(
                    &mut tx,
                    &ProgressInput {
                        player_id,
                        skill_id: skill.skill.id,
                        sub_skill_id,
                        status,
                        planned_date,
                        done_date,
                        notes: String::new(),
                    },
                )
                .await?;
                if upsert.created {
                    summary.created_skill_links += 1;
                }
            }
        }

        if let Some(goal_skill) = pick_one(rng, &assigned_skills) {
            let status = GoalStatus::ALL[rng.random_range(0..GoalStatus::ALL.len())];
            insert_goal(
                &mut tx,
                &GoalInput {
                    player_id,
                    title: format!("Improve {}", goal_skill.skill.name),
                    description: String::new(),
                    due_date: Some(today + Days::new(rng.random_range(7..=120))),
                    status: Some(status),
                    skill_id: Some(goal_skill.skill.id),
                    sub_skill_id: None,
                },
                None,
            )
            .await?;
            summary.created_goals += 1;
        }

        tx.commit().await?;
        summary.created_players += 1;
    }

    info!(?summary, "Players generated");
    Ok(summary)
}

/// Records `count` random past sessions and touches the progress of the
/// players who took part.
#[instrument(skip(pool, rng))]
pub async fn simulate_trainings<R: Rng + ?Sized>(
    pool: &Pool<Sqlite>,
    rng: &mut R,
    count: usize,
    now: DateTime<Utc>,
) -> Result<SimulateSummary, AppError> {
    if !(1..=MAX_SIMULATED_TRAININGS).contains(&count) {
        return Err(AppError::validation(
            "count",
            format!("Count must be between 1 and {}", MAX_SIMULATED_TRAININGS),
        ));
    }

    let player_ids: Vec<i64> = list_players(pool, &PlayerFilter::default())
        .await?
        .into_iter()
        .map(|player| player.id)
        .collect();
    if player_ids.is_empty() {
        return Err(AppError::PrecursorMissing(
            "there are no players; generate players first".to_string(),
        ));
    }

    let skills = list_skills(pool, false).await?;
    if skills.is_empty() {
        return Err(AppError::PrecursorMissing(
            "the skill catalog is empty; seed or create skills first".to_string(),
        ));
    }
    let trainers = trainer_ids(pool).await?;

    let mut summary = SimulateSummary {
        requested_count: count as u64,
        ..SimulateSummary::default()
    };

    for _ in 0..count {
        let participants =
            pick_between(rng, &player_ids, MIN_SESSION_PLAYERS, MAX_SESSION_PLAYERS);
        let session_skills = pick_between(rng, &skills, MIN_SESSION_SKILLS, MAX_SESSION_SKILLS);

        let mut entries = Vec::with_capacity(session_skills.len());
        for skill in &session_skills {
            let sub_skill_id = if chance(rng, SUB_SKILL_PERCENT) {
                pick_one(rng, &skill.sub_skills).map(|sub| sub.id)
            } else {
                None
            };
            entries.push(TrainingEntryInput {
                skill_id: skill.skill.id,
                sub_skill_id,
                volume: Some(rng.random_range(5..=60)),
                quality: Some(rng.random_range(1..=5)),
                notes: None,
            });
        }

        let minutes_back = rng.random_range(0..=MAX_DAYS_BACK * 24 * 60);
        let date = now - Duration::minutes(minutes_back);

        let training = TrainingInput {
            player_ids: participants.clone(),
            trainer_id: pick_one(rng, &trainers).copied(),
            date,
            duration_minutes: pick_one(rng, &DURATIONS).copied().unwrap_or(60),
            location: pick_one(rng, &LOCATIONS).copied().unwrap_or_default().to_string(),
            notes: String::new(),
            entries,
        };
        create_training(pool, &training).await?;
        summary.created_trainings += 1;

        let mut tx = pool.begin().await?;
        for player_id in &participants {
            for entry in &training.entries {
                if !chance(rng, PROGRESS_TOUCH_PERCENT) {
                    continue;
                }
                let (status, planned_date, done_date) =
                    random_progress_state(rng, date.date_naive());
                upsert_progress_row(
                    &mut tx,
                    &ProgressInput {
                        player_id: *player_id,
                        skill_id: entry.skill_id,
                        sub_skill_id: entry.sub_skill_id,
                        status,
                        planned_date,
                        done_date,
                        notes: String::new(),
                    },
                )
                .await?;
                summary.touched_player_skill_progress += 1;
            }
        }
        tx.commit().await?;
    }

    info!(?summary, "Trainings simulated");
    Ok(summary)
}
