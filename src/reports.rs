//! Dashboard aggregation.
//!
//! [`build_report`] loads a [`ReportSnapshot`] and folds it with
//! [`fold_report`]. The fold is pure and takes `now` in any time zone, so
//! buckets follow the calendar of that zone: the service passes
//! `chrono::Local`, tests pin `Utc`.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Datelike, Days, NaiveDate, TimeZone, Utc};
use serde::Serialize;
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::db::{ReportSnapshot, load_report_snapshot};
use crate::error::AppError;
use crate::models::GoalStatus;

pub const TREND_DAYS: usize = 14;
pub const MONTHS: usize = 12;
pub const TOP_PLAYERS: usize = 10;
pub const NO_CLUB: &str = "no club";

const WEEKDAYS: [&str; 7] = ["Mon", "Tue", "Wed", "Thu", "Fri", "Sat", "Sun"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCount {
    pub date: NaiveDate,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthCount {
    pub month: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekdayCount {
    pub weekday: &'static str,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: GoalStatus,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkillCount {
    pub name: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerTrainingCount {
    pub player_id: i64,
    pub name: String,
    pub club: String,
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClubReport {
    pub club: String,
    pub players_count: u64,
    pub trainings_count: u64,
    pub skills: Vec<SkillCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardReport {
    pub players_count: u64,
    pub trainings_count: u64,
    pub open_goals_count: u64,
    pub trainings_last7_days: u64,
    pub training_trend: Vec<DayCount>,
    pub trainings_by_month: Vec<MonthCount>,
    pub goals_by_status: Vec<StatusCount>,
    pub trainings_by_weekday: Vec<WeekdayCount>,
    pub skills_distribution: Vec<SkillCount>,
    pub top_players_by_training_count: Vec<PlayerTrainingCount>,
    pub per_club_reports: Vec<ClubReport>,
}

/// Trims a club name and collapses inner whitespace. Blank names share the
/// `"no club"` bucket.
pub fn normalize_club(club: &str) -> String {
    let normalized = club.split_whitespace().collect::<Vec<_>>().join(" ");
    if normalized.is_empty() {
        NO_CLUB.to_string()
    } else {
        normalized
    }
}

fn month_index(date: NaiveDate) -> i64 {
    i64::from(date.year()) * 12 + i64::from(date.month0())
}

fn month_label(index: i64) -> String {
    format!("{:04}-{:02}", index.div_euclid(12), index.rem_euclid(12) + 1)
}

fn sorted_counts(counts: HashMap<String, u64>) -> Vec<SkillCount> {
    let mut counts: Vec<SkillCount> = counts
        .into_iter()
        .map(|(name, count)| SkillCount { name, count })
        .collect();
    counts.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    counts
}

pub fn fold_report<Tz: TimeZone>(snapshot: &ReportSnapshot, now: &DateTime<Tz>) -> DashboardReport {
    let zone = now.timezone();
    let today = now.date_naive();
    let local_day = |date: &DateTime<Utc>| date.with_timezone(&zone).date_naive();

    let trend_start = today - Days::new(TREND_DAYS as u64 - 1);
    let week_start = today - Days::new(6);
    let current_month = month_index(today);
    let first_month = current_month - (MONTHS as i64 - 1);

    let mut trend = [0u64; TREND_DAYS];
    let mut months = [0u64; MONTHS];
    let mut weekdays = [0u64; 7];
    let mut last_7_days = 0;

    for session in &snapshot.sessions {
        let day = local_day(&session.date);

        if day >= trend_start && day <= today {
            trend[(day - trend_start).num_days() as usize] += 1;
        }
        if day >= week_start && day <= today {
            last_7_days += 1;
        }
        let month = month_index(day);
        if month >= first_month && month <= current_month {
            months[(month - first_month) as usize] += 1;
        }
        weekdays[day.weekday().num_days_from_monday() as usize] += 1;
    }

    let training_trend = trend
        .iter()
        .enumerate()
        .map(|(offset, count)| DayCount {
            date: trend_start + Days::new(offset as u64),
            count: *count,
        })
        .collect();

    let trainings_by_month = months
        .iter()
        .enumerate()
        .map(|(offset, count)| MonthCount {
            month: month_label(first_month + offset as i64),
            count: *count,
        })
        .collect();

    let trainings_by_weekday = WEEKDAYS
        .into_iter()
        .zip(weekdays)
        .map(|(weekday, count)| WeekdayCount { weekday, count })
        .collect();

    let goals_by_status: Vec<StatusCount> = GoalStatus::ALL
        .iter()
        .map(|status| StatusCount {
            status: *status,
            count: snapshot
                .goal_statuses
                .iter()
                .filter(|goal| *goal == status)
                .count() as u64,
        })
        .collect();
    let open_goals_count = snapshot
        .goal_statuses
        .iter()
        .filter(|status| **status != GoalStatus::Done)
        .count() as u64;

    let clubs: HashMap<i64, String> = snapshot
        .players
        .iter()
        .map(|player| (player.id, normalize_club(&player.club)))
        .collect();

    let mut participants: HashMap<i64, Vec<i64>> = HashMap::new();
    for participant in &snapshot.participants {
        participants
            .entry(participant.session_id)
            .or_default()
            .push(participant.player_id);
    }

    // Touches: every player of a session counts once per entry.
    let mut skills: HashMap<String, u64> = HashMap::new();
    let mut club_skills: HashMap<&str, HashMap<String, u64>> = HashMap::new();
    for entry in &snapshot.entries {
        let Some(players) = participants.get(&entry.session_id) else {
            continue;
        };
        *skills.entry(entry.skill_name.clone()).or_default() += players.len() as u64;

        for player_id in players {
            if let Some(club) = clubs.get(player_id) {
                *club_skills
                    .entry(club.as_str())
                    .or_default()
                    .entry(entry.skill_name.clone())
                    .or_default() += 1;
            }
        }
    }

    let mut player_sessions: HashMap<i64, u64> = HashMap::new();
    let mut club_sessions: HashMap<&str, u64> = HashMap::new();
    for session in &snapshot.sessions {
        let Some(players) = participants.get(&session.id) else {
            continue;
        };
        let mut represented = BTreeSet::new();
        for player_id in players {
            *player_sessions.entry(*player_id).or_default() += 1;
            if let Some(club) = clubs.get(player_id) {
                represented.insert(club.as_str());
            }
        }
        for club in represented {
            *club_sessions.entry(club).or_default() += 1;
        }
    }

    let mut top_players: Vec<PlayerTrainingCount> = snapshot
        .players
        .iter()
        .filter_map(|player| {
            let count = *player_sessions.get(&player.id)?;
            Some(PlayerTrainingCount {
                player_id: player.id,
                name: format!("{} {}", player.first_name, player.last_name),
                club: normalize_club(&player.club),
                count,
            })
        })
        .collect();
    top_players.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.player_id.cmp(&b.player_id))
    });
    top_players.truncate(TOP_PLAYERS);

    let mut club_players: BTreeMap<&str, u64> = BTreeMap::new();
    for club in clubs.values() {
        *club_players.entry(club.as_str()).or_default() += 1;
    }
    let per_club_reports = club_players
        .into_iter()
        .map(|(club, players_count)| ClubReport {
            club: club.to_string(),
            players_count,
            trainings_count: club_sessions.get(club).copied().unwrap_or_default(),
            skills: sorted_counts(club_skills.remove(club).unwrap_or_default()),
        })
        .collect();

    DashboardReport {
        players_count: snapshot.players.len() as u64,
        trainings_count: snapshot.sessions.len() as u64,
        open_goals_count,
        trainings_last7_days: last_7_days,
        training_trend,
        trainings_by_month,
        goals_by_status,
        trainings_by_weekday,
        skills_distribution: sorted_counts(skills),
        top_players_by_training_count: top_players,
        per_club_reports,
    }
}

/// Builds the dashboard. Any read failure is reported as
/// `ReportUnavailable`; no partial report is returned.
#[instrument(skip(pool, now))]
pub async fn build_report<Tz: TimeZone>(
    pool: &Pool<Sqlite>,
    now: DateTime<Tz>,
) -> Result<DashboardReport, AppError> {
    let snapshot = load_report_snapshot(pool)
        .await
        .map_err(|err| AppError::ReportUnavailable(err.to_string()))?;

    let report = fold_report(&snapshot, &now);
    info!(
        players = report.players_count,
        trainings = report.trainings_count,
        "Dashboard report built"
    );

    Ok(report)
}
