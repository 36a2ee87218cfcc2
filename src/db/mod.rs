pub mod accounts;
pub mod dashboard;
pub mod fitness_tests;
pub mod goals;
pub mod players;
pub mod progress;
pub mod sessions;
pub mod skills;
pub mod trainings;

pub use accounts::*;
pub use dashboard::*;
pub use fitness_tests::*;
pub use goals::*;
pub use players::*;
pub use progress::*;
pub use sessions::*;
pub use skills::*;
pub use trainings::*;

use sqlx::SqliteConnection;

use crate::error::AppError;

/// Tables whose rows other records point at by id.
#[derive(Debug, Clone, Copy)]
pub enum Referenced {
    Player,
    Skill,
    SubSkill,
    Account,
    FitnessTest,
}

impl Referenced {
    fn table(self) -> &'static str {
        match self {
            Referenced::Player => "players",
            Referenced::Skill => "skills",
            Referenced::SubSkill => "sub_skills",
            Referenced::Account => "accounts",
            Referenced::FitnessTest => "tests",
        }
    }

    fn label(self) -> &'static str {
        match self {
            Referenced::Player => "Player",
            Referenced::Skill => "Skill",
            Referenced::SubSkill => "Sub-skill",
            Referenced::Account => "Account",
            Referenced::FitnessTest => "Test",
        }
    }
}

/// Fails with `NotFound` when `id` has no row in the referenced table.
pub async fn ensure_exists(
    conn: &mut SqliteConnection,
    referenced: Referenced,
    id: i64,
) -> Result<(), AppError> {
    let sql = format!("SELECT COUNT(*) FROM {} WHERE id = ?", referenced.table());
    let count: i64 = sqlx::query_scalar(&sql).bind(id).fetch_one(conn).await?;

    if count == 0 {
        return Err(AppError::NotFound(format!(
            "{} with id {} not found in database",
            referenced.label(),
            id
        )));
    }

    Ok(())
}
