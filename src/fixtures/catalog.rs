use serde::Serialize;
use sqlx::{Pool, Sqlite};
use tracing::{info, instrument};

use crate::db::{attach_sub_skill, find_skill_by_name, find_sub_skill, insert_skill, insert_sub_skill};
use crate::error::AppError;
use crate::models::{SkillInput, SubSkillInput};

struct CatalogSkill {
    name: &'static str,
    category: &'static str,
    sub_skills: &'static [(&'static str, &'static str, i64)],
}

const DEFAULT_CATALOG: &[CatalogSkill] = &[
    CatalogSkill {
        name: "Passing",
        category: "technique",
        sub_skills: &[
            ("Inside-foot pass", "Short pass with the inside of the foot", 1),
            ("First-time pass", "Pass without controlling the ball first", 2),
            ("Long ball", "Driven or lofted pass over 30 metres", 3),
        ],
    },
    CatalogSkill {
        name: "Ball control",
        category: "technique",
        sub_skills: &[
            ("Inside-foot control", "Cushion the ball with the inside of the foot", 1),
            ("Chest control", "Take a high ball down with the chest", 2),
            ("Control under pressure", "First touch away from a closing defender", 3),
        ],
    },
    CatalogSkill {
        name: "Dribbling",
        category: "technique",
        sub_skills: &[
            ("Close control", "Keep the ball within a stride while moving", 1),
            ("Change of direction", "Cut inside or outside at pace", 2),
            ("Feints", "Step-overs and body feints to beat a defender", 3),
        ],
    },
    CatalogSkill {
        name: "Shooting",
        category: "technique",
        sub_skills: &[
            ("Placed finish", "Side-foot finish into the corner", 1),
            ("Instep drive", "Power shot with the laces", 2),
            ("Volley", "Strike the ball before it bounces", 3),
        ],
    },
    CatalogSkill {
        name: "Heading",
        category: "technique",
        sub_skills: &[
            ("Standing header", "Forehead contact from a standing position", 1),
            ("Defensive header", "Clear the ball high and wide", 2),
        ],
    },
    CatalogSkill {
        name: "Defending",
        category: "tactics",
        sub_skills: &[
            ("Jockeying", "Delay the attacker without diving in", 1),
            ("Tackling", "Win the ball with a block or poke tackle", 2),
            ("Covering", "Support the pressing teammate", 2),
        ],
    },
    CatalogSkill {
        name: "Positioning",
        category: "tactics",
        sub_skills: &[
            ("Scanning", "Check surroundings before receiving", 1),
            ("Covering", "Support the pressing teammate", 2),
        ],
    },
    CatalogSkill {
        name: "Goalkeeping",
        category: "technique",
        sub_skills: &[
            ("Basic handling", "Catch and gather shots at the body", 1),
            ("Diving save", "Low and high dives to both sides", 2),
            ("Distribution", "Throws and kicks to start attacks", 2),
        ],
    },
    CatalogSkill {
        name: "Speed",
        category: "athletics",
        sub_skills: &[],
    },
    CatalogSkill {
        name: "Endurance",
        category: "athletics",
        sub_skills: &[],
    },
];

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogSeedSummary {
    pub created_skills: u64,
    pub created_sub_skills: u64,
    pub attached_sub_skills: u64,
}

/// Installs the default football catalog. Existing skills are kept and
/// sub-skills are shared by (name, difficulty), so running it again changes
/// nothing.
#[instrument(skip(pool))]
pub async fn seed_default_catalog(pool: &Pool<Sqlite>) -> Result<CatalogSeedSummary, AppError> {
    info!("Seeding default skill catalog");
    let mut summary = CatalogSeedSummary::default();
    let mut tx = pool.begin().await?;

    for skill in DEFAULT_CATALOG {
        let skill_id = match find_skill_by_name(&mut tx, skill.name).await? {
            Some(id) => id,
            None => {
                summary.created_skills += 1;
                insert_skill(
                    &mut tx,
                    &SkillInput {
                        name: skill.name.to_string(),
                        category: skill.category.to_string(),
                        active: Some(true),
                    },
                )
                .await?
            }
        };

        for (name, description, difficulty) in skill.sub_skills {
            let sub_skill_id = match find_sub_skill(&mut tx, name, *difficulty).await? {
                Some(id) => id,
                None => {
                    summary.created_sub_skills += 1;
                    insert_sub_skill(
                        &mut tx,
                        &SubSkillInput {
                            name: name.to_string(),
                            description: description.to_string(),
                            difficulty: *difficulty,
                            active: Some(true),
                        },
                    )
                    .await?
                }
            };

            if attach_sub_skill(&mut tx, skill_id, sub_skill_id).await? {
                summary.attached_sub_skills += 1;
            }
        }
    }

    tx.commit().await?;
    info!(?summary, "Catalog seeded");

    Ok(summary)
}
