use std::collections::HashMap;

use chrono::Utc;
use sqlx::{Pool, QueryBuilder, Sqlite, SqliteConnection};
use tracing::{info, instrument};

use crate::error::AppError;
use crate::models::{Skill, SkillDetail, SkillInput, SubSkill, SubSkillInput};

use super::{Referenced, ensure_exists};

const SKILL_COLUMNS: &str = "id, name, category, active, created_at, updated_at";

#[derive(sqlx::FromRow)]
struct AttachedSubSkillRow {
    skill_id: i64,
    #[sqlx(flatten)]
    sub_skill: SubSkill,
}

#[instrument(skip(pool))]
pub async fn list_skills(
    pool: &Pool<Sqlite>,
    include_inactive: bool,
) -> Result<Vec<SkillDetail>, AppError> {
    info!("Listing skills");
    let sql = if include_inactive {
        format!("SELECT {} FROM skills ORDER BY name", SKILL_COLUMNS)
    } else {
        format!(
            "SELECT {} FROM skills WHERE active = TRUE ORDER BY name",
            SKILL_COLUMNS
        )
    };
    let skills = sqlx::query_as::<_, Skill>(&sql).fetch_all(pool).await?;

    resolve_skill_references(pool, skills).await
}

#[instrument(skip(pool))]
pub async fn get_skill_detail(pool: &Pool<Sqlite>, id: i64) -> Result<SkillDetail, AppError> {
    info!("Fetching skill by ID");
    let sql = format!("SELECT {} FROM skills WHERE id = ?", SKILL_COLUMNS);
    let skill = sqlx::query_as::<_, Skill>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Skill with id {} not found in database", id)))?;

    let mut details = resolve_skill_references(pool, vec![skill]).await?;
    details
        .pop()
        .ok_or_else(|| AppError::Internal(format!("Skill {} vanished while resolving", id)))
}

/// Attaches each skill's sub-skills in their stored order.
#[instrument(skip_all, fields(count = skills.len()))]
pub async fn resolve_skill_references(
    pool: &Pool<Sqlite>,
    skills: Vec<Skill>,
) -> Result<Vec<SkillDetail>, AppError> {
    if skills.is_empty() {
        return Ok(Vec::new());
    }

    let mut query = QueryBuilder::<Sqlite>::new(
        "SELECT sss.skill_id, ss.id, ss.name, ss.description, ss.difficulty, ss.active
         FROM skill_sub_skills sss JOIN sub_skills ss ON ss.id = sss.sub_skill_id
         WHERE sss.skill_id IN (",
    );
    let mut ids = query.separated(", ");
    for skill in &skills {
        ids.push_bind(skill.id);
    }
    query.push(") ORDER BY sss.skill_id, sss.position");

    let rows = query
        .build_query_as::<AttachedSubSkillRow>()
        .fetch_all(pool)
        .await?;

    let mut sub_skills: HashMap<i64, Vec<SubSkill>> = HashMap::new();
    for row in rows {
        sub_skills.entry(row.skill_id).or_default().push(row.sub_skill);
    }

    Ok(skills
        .into_iter()
        .map(|skill| SkillDetail {
            sub_skills: sub_skills.remove(&skill.id).unwrap_or_default(),
            skill,
        })
        .collect())
}

async fn ensure_skill_name_available(
    conn: &mut SqliteConnection,
    name: &str,
    except_skill: Option<i64>,
) -> Result<(), AppError> {
    let existing: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM skills WHERE name = ? COLLATE NOCASE AND id IS NOT ?",
    )
    .bind(name)
    .bind(except_skill)
    .fetch_optional(&mut *conn)
    .await?;

    if existing.is_some() {
        return Err(AppError::validation(
            "name",
            format!("Skill '{}' already exists", name),
        ));
    }

    Ok(())
}

pub async fn insert_skill(conn: &mut SqliteConnection, input: &SkillInput) -> Result<i64, AppError> {
    let name = input.name.trim();
    ensure_skill_name_available(&mut *conn, name, None).await?;

    let now = Utc::now();
    let res = sqlx::query(
        "INSERT INTO skills (name, category, active, created_at, updated_at) VALUES (?, ?, ?, ?, ?)",
    )
    .bind(name)
    .bind(input.category.trim())
    .bind(input.active.unwrap_or(true))
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(res.last_insert_rowid())
}

#[instrument(skip(pool, input), fields(name = %input.name))]
pub async fn create_skill(pool: &Pool<Sqlite>, input: &SkillInput) -> Result<i64, AppError> {
    info!("Creating skill");
    let mut conn = pool.acquire().await?;
    insert_skill(&mut conn, input).await
}

#[instrument(skip(pool, input))]
pub async fn update_skill(pool: &Pool<Sqlite>, id: i64, input: &SkillInput) -> Result<(), AppError> {
    info!("Updating skill");
    let name = input.name.trim();
    let mut conn = pool.acquire().await?;
    ensure_exists(&mut conn, Referenced::Skill, id).await?;
    ensure_skill_name_available(&mut conn, name, Some(id)).await?;

    sqlx::query("UPDATE skills SET name = ?, category = ?, active = ?, updated_at = ? WHERE id = ?")
        .bind(name)
        .bind(input.category.trim())
        .bind(input.active.unwrap_or(true))
        .bind(Utc::now())
        .bind(id)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

/// Finds a sub-skill with the same name and difficulty, so shared parts
/// like "Inside of the foot" are stored once.
pub async fn find_sub_skill(
    conn: &mut SqliteConnection,
    name: &str,
    difficulty: i64,
) -> Result<Option<i64>, AppError> {
    let id: Option<i64> = sqlx::query_scalar(
        "SELECT id FROM sub_skills WHERE name = ? COLLATE NOCASE AND difficulty = ? ORDER BY id LIMIT 1",
    )
    .bind(name.trim())
    .bind(difficulty)
    .fetch_optional(&mut *conn)
    .await?;

    Ok(id)
}

pub async fn insert_sub_skill(
    conn: &mut SqliteConnection,
    input: &SubSkillInput,
) -> Result<i64, AppError> {
    let now = Utc::now();
    let res = sqlx::query(
        "INSERT INTO sub_skills (name, description, difficulty, active, created_at, updated_at)
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(input.name.trim())
    .bind(input.description.trim())
    .bind(input.difficulty)
    .bind(input.active.unwrap_or(true))
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(res.last_insert_rowid())
}

/// Attaches `sub_skill_id` at the end of the skill's list. Already attached
/// sub-skills keep their place.
pub async fn attach_sub_skill(
    conn: &mut SqliteConnection,
    skill_id: i64,
    sub_skill_id: i64,
) -> Result<bool, AppError> {
    let next_position: i64 = sqlx::query_scalar(
        "SELECT COALESCE(MAX(position), -1) + 1 FROM skill_sub_skills WHERE skill_id = ?",
    )
    .bind(skill_id)
    .fetch_one(&mut *conn)
    .await?;

    let res = sqlx::query(
        "INSERT OR IGNORE INTO skill_sub_skills (skill_id, sub_skill_id, position) VALUES (?, ?, ?)",
    )
    .bind(skill_id)
    .bind(sub_skill_id)
    .bind(next_position)
    .execute(&mut *conn)
    .await?;

    Ok(res.rows_affected() > 0)
}

/// Creates (or reuses) a sub-skill and attaches it to `skill_id`.
#[instrument(skip(pool, input), fields(name = %input.name, difficulty = input.difficulty))]
pub async fn create_sub_skill_for_skill(
    pool: &Pool<Sqlite>,
    skill_id: i64,
    input: &SubSkillInput,
) -> Result<i64, AppError> {
    info!("Creating sub-skill for skill");
    let mut tx = pool.begin().await?;
    ensure_exists(&mut tx, Referenced::Skill, skill_id).await?;

    let sub_skill_id = match find_sub_skill(&mut tx, &input.name, input.difficulty).await? {
        Some(existing) => {
            info!(sub_skill_id = existing, "Reusing existing sub-skill");
            existing
        }
        None => insert_sub_skill(&mut tx, input).await?,
    };

    attach_sub_skill(&mut tx, skill_id, sub_skill_id).await?;
    tx.commit().await?;

    Ok(sub_skill_id)
}

#[instrument(skip(pool))]
pub async fn detach_sub_skill(
    pool: &Pool<Sqlite>,
    skill_id: i64,
    sub_skill_id: i64,
) -> Result<(), AppError> {
    info!("Detaching sub-skill from skill");
    let res = sqlx::query("DELETE FROM skill_sub_skills WHERE skill_id = ? AND sub_skill_id = ?")
        .bind(skill_id)
        .bind(sub_skill_id)
        .execute(pool)
        .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Sub-skill {} is not attached to skill {}",
            sub_skill_id, skill_id
        )));
    }

    Ok(())
}

#[instrument(skip(pool, input))]
pub async fn update_sub_skill(
    pool: &Pool<Sqlite>,
    id: i64,
    input: &SubSkillInput,
) -> Result<SubSkill, AppError> {
    info!("Updating sub-skill");
    let res = sqlx::query(
        "UPDATE sub_skills SET name = ?, description = ?, difficulty = ?, active = ?, updated_at = ? WHERE id = ?",
    )
    .bind(input.name.trim())
    .bind(input.description.trim())
    .bind(input.difficulty)
    .bind(input.active.unwrap_or(true))
    .bind(Utc::now())
    .bind(id)
    .execute(pool)
    .await?;

    if res.rows_affected() == 0 {
        return Err(AppError::NotFound(format!(
            "Sub-skill with id {} not found in database",
            id
        )));
    }

    let sub_skill = sqlx::query_as::<_, SubSkill>(
        "SELECT id, name, description, difficulty, active FROM sub_skills WHERE id = ?",
    )
    .bind(id)
    .fetch_one(pool)
    .await?;

    Ok(sub_skill)
}

/// Checks a (skill, sub-skill) reference: the skill must exist and the
/// sub-skill, when given, must be attached to it.
pub async fn ensure_skill_reference(
    conn: &mut SqliteConnection,
    skill_id: i64,
    sub_skill_id: Option<i64>,
) -> Result<(), AppError> {
    ensure_exists(&mut *conn, Referenced::Skill, skill_id).await?;

    let Some(sub_skill_id) = sub_skill_id else {
        return Ok(());
    };

    ensure_exists(&mut *conn, Referenced::SubSkill, sub_skill_id).await?;

    let attached: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM skill_sub_skills WHERE skill_id = ? AND sub_skill_id = ?",
    )
    .bind(skill_id)
    .bind(sub_skill_id)
    .fetch_one(&mut *conn)
    .await?;

    if attached == 0 {
        return Err(AppError::validation(
            "sub_skill_id",
            format!("Sub-skill {} does not belong to skill {}", sub_skill_id, skill_id),
        ));
    }

    Ok(())
}

pub async fn find_skill_by_name(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Option<i64>, AppError> {
    let id: Option<i64> = sqlx::query_scalar("SELECT id FROM skills WHERE name = ? COLLATE NOCASE")
        .bind(name.trim())
        .fetch_optional(&mut *conn)
        .await?;
    Ok(id)
}
