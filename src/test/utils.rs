#[cfg(test)]
pub mod test_db {
    use crate::auth::Role;
    use crate::db::{NewAccount, create_account, create_player, create_skill, create_sub_skill_for_skill};
    use crate::error::AppError;
    use crate::models::{PlayerInput, SkillInput, SubSkillInput};
    use sqlx::sqlite::SqlitePoolOptions;
    use sqlx::{Pool, Sqlite};
    use std::collections::HashMap;
    use std::sync::Once;

    static INIT: Once = Once::new();
    pub static STANDARD_PASSWORD: &str = "password123";

    #[derive(Default)]
    pub struct TestDbBuilder {
        players: Vec<TestPlayer>,
        accounts: Vec<TestAccount>,
        skills: Vec<TestSkill>,
    }

    pub struct TestPlayer {
        pub key: String,
        pub first_name: String,
        pub last_name: String,
        pub club: String,
    }

    pub struct TestAccount {
        pub email: String,
        pub role: Role,
        pub player_key: Option<String>,
    }

    pub struct TestSkill {
        pub name: String,
        pub sub_skills: Vec<(String, i64)>,
    }

    impl TestDbBuilder {
        pub fn new() -> Self {
            Self::default()
        }

        /// A player addressed as `key` in [`TestDb::player_id`].
        pub fn player(mut self, key: &str, club: &str) -> Self {
            self.players.push(TestPlayer {
                key: key.to_string(),
                first_name: key.to_string(),
                last_name: "Tester".to_string(),
                club: club.to_string(),
            });
            self
        }

        pub fn admin(self, email: &str) -> Self {
            self.account(email, Role::Admin, None)
        }

        pub fn trainer(self, email: &str) -> Self {
            self.account(email, Role::Trainer, None)
        }

        pub fn viewer(self, email: &str) -> Self {
            self.account(email, Role::Viewer, None)
        }

        /// A player-role account, linked to the player `player_key` when given.
        pub fn player_account(self, email: &str, player_key: Option<&str>) -> Self {
            self.account(email, Role::Player, player_key)
        }

        pub fn account(mut self, email: &str, role: Role, player_key: Option<&str>) -> Self {
            self.accounts.push(TestAccount {
                email: email.to_string(),
                role,
                player_key: player_key.map(String::from),
            });
            self
        }

        pub fn skill(mut self, name: &str, sub_skills: &[(&str, i64)]) -> Self {
            self.skills.push(TestSkill {
                name: name.to_string(),
                sub_skills: sub_skills
                    .iter()
                    .map(|(name, difficulty)| (name.to_string(), *difficulty))
                    .collect(),
            });
            self
        }

        pub async fn build(self) -> Result<TestDb, AppError> {
            INIT.call_once(|| {
                let _ = env_logger::builder()
                    .parse_filters("debug")
                    .is_test(true)
                    .try_init();
            });

            // A single connection keeps every query on the same in-memory database.
            let pool = SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect("sqlite::memory:")
                .await?;

            sqlx::migrate!("./migrations").run(&pool).await?;

            let mut player_id_map: HashMap<String, i64> = HashMap::new();
            let mut account_id_map: HashMap<String, i64> = HashMap::new();
            let mut skill_id_map: HashMap<String, i64> = HashMap::new();

            for player in &self.players {
                let id = create_player(
                    &pool,
                    &PlayerInput {
                        first_name: player.first_name.clone(),
                        last_name: player.last_name.clone(),
                        birth_date: None,
                        age: Some(12),
                        club: player.club.clone(),
                        position: "midfielder".to_string(),
                        dominant_foot: "right".to_string(),
                        photo_url: None,
                        trainer_ids: Vec::new(),
                        active: Some(true),
                    },
                )
                .await?;
                player_id_map.insert(player.key.clone(), id);
            }

            for account in &self.accounts {
                let player_id = match &account.player_key {
                    Some(key) => Some(player_id_map.get(key).copied().ok_or_else(|| {
                        AppError::NotFound(format!("test player '{}' was not declared", key))
                    })?),
                    None => None,
                };

                let id = create_account(
                    &pool,
                    &NewAccount {
                        email: account.email.clone(),
                        display_name: account.email.clone(),
                        password: STANDARD_PASSWORD.to_string(),
                        role: account.role,
                        player_id,
                    },
                )
                .await?;
                account_id_map.insert(account.email.clone(), id);
            }

            for skill in &self.skills {
                let id = create_skill(
                    &pool,
                    &SkillInput {
                        name: skill.name.clone(),
                        category: "technique".to_string(),
                        active: Some(true),
                    },
                )
                .await?;

                for (name, difficulty) in &skill.sub_skills {
                    create_sub_skill_for_skill(
                        &pool,
                        id,
                        &SubSkillInput {
                            name: name.clone(),
                            description: String::new(),
                            difficulty: *difficulty,
                            active: Some(true),
                        },
                    )
                    .await?;
                }
                skill_id_map.insert(skill.name.clone(), id);
            }

            Ok(TestDb {
                pool,
                player_id_map,
                account_id_map,
                skill_id_map,
            })
        }
    }

    pub struct TestDb {
        pub pool: Pool<Sqlite>,
        pub player_id_map: HashMap<String, i64>,
        pub account_id_map: HashMap<String, i64>,
        pub skill_id_map: HashMap<String, i64>,
    }

    impl TestDb {
        pub fn player_id(&self, key: &str) -> i64 {
            self.player_id_map[key]
        }

        pub fn account_id(&self, email: &str) -> i64 {
            self.account_id_map[email]
        }

        pub fn skill_id(&self, name: &str) -> i64 {
            self.skill_id_map[name]
        }

        pub async fn sub_skill_id(&self, skill: &str, name: &str) -> i64 {
            sqlx::query_scalar(
                "SELECT ss.id FROM sub_skills ss
                 JOIN skill_sub_skills l ON l.sub_skill_id = ss.id
                 WHERE l.skill_id = ? AND ss.name = ?",
            )
            .bind(self.skill_id(skill))
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .expect("Sub-skill not found")
        }

        pub async fn count(&self, table: &str) -> i64 {
            sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table))
                .fetch_one(&self.pool)
                .await
                .expect("Failed to count rows")
        }
    }
}

#[cfg(test)]
pub mod test_utils {
    use rocket::http::{ContentType, Status};
    use rocket::local::asynchronous::Client;
    use serde_json::json;

    use super::test_db::{STANDARD_PASSWORD, TestDb, TestDbBuilder};
    use crate::env::{AppConfig, DEFAULT_SESSION_HOURS};
    use crate::init_rocket;

    pub fn test_config() -> AppConfig {
        AppConfig {
            database_url: "sqlite::memory:".to_string(),
            session_hours: DEFAULT_SESSION_HOURS,
            bootstrap_admin: None,
            otlp_endpoint: None,
        }
    }

    /// Two clubs, one player account per linked player, one account per
    /// other role and a small catalog.
    pub async fn create_standard_test_db() -> TestDb {
        TestDbBuilder::new()
            .player("alice", "FC Riverside")
            .player("bruno", "Northside United")
            .player("carla", "  FC   Riverside ")
            .admin("admin@example.com")
            .trainer("trainer@example.com")
            .viewer("viewer@example.com")
            .player_account("alice@example.com", Some("alice"))
            .player_account("bruno@example.com", Some("bruno"))
            .player_account("unlinked@example.com", None)
            .skill("Passing", &[("Inside-foot pass", 1), ("First-time pass", 2)])
            .skill("Dribbling", &[("Close control", 1)])
            .skill("Speed", &[])
            .build()
            .await
            .expect("Failed to build test database")
    }

    pub async fn setup_test_client(test_db: TestDb) -> (Client, TestDb) {
        let rocket = init_rocket(test_db.pool.clone(), test_config());
        let client = Client::tracked(rocket)
            .await
            .expect("Failed to build Rocket client");

        (client, test_db)
    }

    pub async fn login_test_user(client: &Client, email: &str) {
        let response = client
            .post("/api/login")
            .header(ContentType::JSON)
            .body(
                json!({
                    "email": email,
                    "password": STANDARD_PASSWORD
                })
                .to_string(),
            )
            .dispatch()
            .await;

        assert_eq!(
            response.status(),
            Status::Ok,
            "Login failed for {}",
            email
        );
    }
}
