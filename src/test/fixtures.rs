#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use chrono::{NaiveDate, TimeZone, Utc};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use crate::db::{PlayerFilter, get_account, list_players, list_progress};
    use crate::error::AppError;
    use crate::fixtures::random::{pick_between, pick_distinct};
    use crate::fixtures::{
        FixtureAction, FixtureOutcome, WipeSummary, birth_date_for_age, generate_players,
        run_fixture_action, seed_default_catalog, simulate_trainings, wipe_all_players,
    };
    use crate::test::test_db::TestDbBuilder;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 15).unwrap()
    }

    #[test]
    fn test_fixture_action_parsing() {
        assert_eq!(
            FixtureAction::parse("generate_players", None).unwrap(),
            FixtureAction::GeneratePlayers { count: 10 }
        );
        assert_eq!(
            FixtureAction::parse("simulate_trainings", None).unwrap(),
            FixtureAction::SimulateTrainings { count: 20 }
        );
        assert_eq!(
            FixtureAction::parse("wipe_players", Some(5000)).unwrap(),
            FixtureAction::WipePlayers
        );

        for (action, count) in [
            ("generate_players", Some(0)),
            ("generate_players", Some(101)),
            ("simulate_trainings", Some(-3)),
            ("simulate_trainings", Some(201)),
            ("drop_everything", None),
        ] {
            assert!(
                matches!(
                    FixtureAction::parse(action, count),
                    Err(AppError::Validation { .. })
                ),
                "{} {:?} should be rejected",
                action,
                count
            );
        }
    }

    #[test]
    fn test_birth_date_matches_requested_age() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for age in 10..=18 {
            for _ in 0..20 {
                let birth_date = birth_date_for_age(&mut rng, age, today());
                assert_eq!(today().years_since(birth_date), Some(age as u32));
            }
        }
    }

    #[rocket::async_test]
    async fn test_generate_players_requires_catalog() {
        let test_db = TestDbBuilder::new().build().await.unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(1);

        let result = generate_players(&test_db.pool, &mut rng, 5, today()).await;

        assert!(matches!(result, Err(AppError::PrecursorMissing(_))));
        assert_eq!(test_db.count("players").await, 0);
    }

    #[rocket::async_test]
    async fn test_generate_players_assigns_distinct_skills() {
        let test_db = TestDbBuilder::new()
            .trainer("trainer@example.com")
            .build()
            .await
            .unwrap();
        seed_default_catalog(&test_db.pool).await.unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(42);

        let summary = generate_players(&test_db.pool, &mut rng, 5, today())
            .await
            .unwrap();

        assert_eq!(summary.requested_count, 5);
        assert_eq!(summary.created_players, 5);
        assert_eq!(summary.created_goals, 5);

        let players = list_players(&test_db.pool, &PlayerFilter::default())
            .await
            .unwrap();
        assert_eq!(players.len(), 5);

        let progress = list_progress(&test_db.pool, None).await.unwrap();
        let mut skills_per_player: HashMap<i64, HashSet<i64>> = HashMap::new();
        for row in &progress {
            skills_per_player
                .entry(row.player_id)
                .or_default()
                .insert(row.skill_id);
        }

        for player in &players {
            let skills = skills_per_player
                .get(&player.id)
                .map(HashSet::len)
                .unwrap_or_default();
            assert!(
                (4..=9).contains(&skills),
                "player {} has {} skills",
                player.id,
                skills
            );

            let age = player.age.unwrap();
            assert!((10..=18).contains(&age));
            assert_eq!(
                today().years_since(player.birth_date.unwrap()),
                Some(age as u32)
            );
        }

        let trainer_links = test_db.count("player_trainers").await;
        assert!(trainer_links >= 5, "every player gets a trainer");
    }

    #[rocket::async_test]
    async fn test_simulate_trainings_requires_players() {
        let test_db = TestDbBuilder::new().build().await.unwrap();
        seed_default_catalog(&test_db.pool).await.unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(3);

        let result = simulate_trainings(&test_db.pool, &mut rng, 3, Utc::now()).await;

        assert!(matches!(result, Err(AppError::PrecursorMissing(_))));
        assert_eq!(test_db.count("training_sessions").await, 0);
    }

    #[rocket::async_test]
    async fn test_simulate_trainings_records_sessions() {
        let test_db = TestDbBuilder::new()
            .player("alice", "FC Riverside")
            .player("bruno", "Harbour Rovers")
            .build()
            .await
            .unwrap();
        seed_default_catalog(&test_db.pool).await.unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(9);
        let now = Utc.with_ymd_and_hms(2025, 3, 15, 18, 0, 0).unwrap();

        let summary = simulate_trainings(&test_db.pool, &mut rng, 6, now)
            .await
            .unwrap();

        assert_eq!(summary.created_trainings, 6);
        assert_eq!(test_db.count("training_sessions").await, 6);

        let empty_sessions: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM training_sessions s
             WHERE NOT EXISTS (SELECT 1 FROM training_session_players p WHERE p.session_id = s.id)",
        )
        .fetch_one(&test_db.pool)
        .await
        .unwrap();
        assert_eq!(empty_sessions, 0);

        let future_sessions: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM training_sessions WHERE date > ?")
                .bind(now)
                .fetch_one(&test_db.pool)
                .await
                .unwrap();
        assert_eq!(future_sessions, 0);

        let entries = test_db.count("training_entries").await;
        assert!(entries >= 12, "each session has at least two entries");
    }

    #[rocket::async_test]
    async fn test_wipe_all_players_is_idempotent() {
        let test_db = TestDbBuilder::new()
            .player("alice", "FC Riverside")
            .player_account("alice@example.com", Some("alice"))
            .build()
            .await
            .unwrap();
        seed_default_catalog(&test_db.pool).await.unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        generate_players(&test_db.pool, &mut rng, 4, today())
            .await
            .unwrap();
        simulate_trainings(&test_db.pool, &mut rng, 5, Utc::now())
            .await
            .unwrap();

        let summary = wipe_all_players(&test_db.pool, Utc::now()).await.unwrap();
        assert_eq!(summary.deleted_players, 5);
        assert_eq!(summary.deleted_training_sessions, 5);
        assert_eq!(summary.deleted_goals, 4);
        assert_eq!(summary.detached_accounts, 1);

        for table in [
            "players",
            "player_trainers",
            "training_sessions",
            "training_session_players",
            "training_entries",
            "player_skill_progress",
            "goals",
            "test_results",
        ] {
            assert_eq!(test_db.count(table).await, 0, "{} should be empty", table);
        }

        let account = get_account(&test_db.pool, test_db.account_id("alice@example.com"))
            .await
            .unwrap();
        assert_eq!(account.player_id, None);
        assert!(test_db.count("skills").await > 0, "catalog survives a wipe");

        let again = wipe_all_players(&test_db.pool, Utc::now()).await.unwrap();
        assert_eq!(again, WipeSummary::default());
    }

    #[rocket::async_test]
    async fn test_seed_default_catalog_is_idempotent() {
        let test_db = TestDbBuilder::new()
            .skill("Passing", &[("Inside-foot pass", 1)])
            .build()
            .await
            .unwrap();

        let first = seed_default_catalog(&test_db.pool).await.unwrap();
        assert_eq!(first.created_skills, 9, "Passing already existed");
        assert!(first.attached_sub_skills > 0);

        let skills = test_db.count("skills").await;
        let sub_skills = test_db.count("sub_skills").await;
        let links = test_db.count("skill_sub_skills").await;
        assert!(links > sub_skills, "shared sub-skills link to several skills");

        let second = seed_default_catalog(&test_db.pool).await.unwrap();
        assert_eq!(second.created_skills, 0);
        assert_eq!(second.created_sub_skills, 0);
        assert_eq!(second.attached_sub_skills, 0);
        assert_eq!(test_db.count("skills").await, skills);
        assert_eq!(test_db.count("sub_skills").await, sub_skills);
    }

    #[rocket::async_test]
    async fn test_run_fixture_action_reports_outcome() {
        let test_db = TestDbBuilder::new().build().await.unwrap();
        seed_default_catalog(&test_db.pool).await.unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(17);

        let outcome = run_fixture_action(
            &test_db.pool,
            &mut rng,
            FixtureAction::GeneratePlayers { count: 2 },
            Utc::now(),
        )
        .await
        .unwrap();

        let FixtureOutcome::GeneratePlayers(summary) = &outcome else {
            panic!("unexpected outcome {:?}", outcome);
        };
        assert_eq!(summary.created_players, 2);

        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["action"], "generate_players");
        assert_eq!(json["createdPlayers"], 2);
    }

    #[test]
    fn test_pick_distinct_never_duplicates() {
        let mut rng = ChaCha8Rng::seed_from_u64(21);
        let candidates: Vec<i64> = (1..=10).collect();

        for count in 0..=10 {
            let picked = pick_distinct(&mut rng, &candidates, count);
            let unique: HashSet<i64> = picked.iter().copied().collect();
            assert_eq!(picked.len(), count);
            assert_eq!(unique.len(), count, "{:?} has duplicates", picked);
        }

        let capped = pick_distinct(&mut rng, &candidates, 25);
        assert_eq!(capped.len(), 10);
        assert!(pick_distinct(&mut rng, &Vec::<i64>::new(), 3).is_empty());
    }

    #[test]
    fn test_pick_between_caps_silently() {
        let mut rng = ChaCha8Rng::seed_from_u64(22);
        let candidates = ["Passing", "Dribbling", "Speed"];

        for _ in 0..50 {
            let picked = pick_between(&mut rng, &candidates, 4, 9);
            assert_eq!(picked.len(), 3, "both bounds clamp to the candidates");

            let picked = pick_between(&mut rng, &candidates, 1, 2);
            assert!((1..=2).contains(&picked.len()));
            let unique: HashSet<&str> = picked.iter().copied().collect();
            assert_eq!(unique.len(), picked.len());
        }

        assert!(pick_between(&mut rng, &Vec::<i64>::new(), 1, 2).is_empty());
    }

    #[rocket::async_test]
    async fn test_small_catalog_caps_assignments() {
        let test_db = TestDbBuilder::new()
            .skill("Passing", &[("Inside-foot pass", 1)])
            .skill("Dribbling", &[])
            .build()
            .await
            .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(8);

        let summary = generate_players(&test_db.pool, &mut rng, 3, today())
            .await
            .unwrap();
        assert_eq!(summary.created_players, 3);

        let progress = list_progress(&test_db.pool, None).await.unwrap();
        let mut skills_per_player: HashMap<i64, HashSet<i64>> = HashMap::new();
        for row in &progress {
            skills_per_player
                .entry(row.player_id)
                .or_default()
                .insert(row.skill_id);
        }
        assert_eq!(skills_per_player.len(), 3);
        assert!(
            skills_per_player.values().all(|skills| skills.len() == 2),
            "every player gets the whole two-skill catalog"
        );
    }

    #[rocket::async_test]
    async fn test_simulate_with_single_skill_caps_entries() {
        let test_db = TestDbBuilder::new()
            .player("alice", "FC Riverside")
            .skill("Passing", &[])
            .build()
            .await
            .unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(13);

        let summary = simulate_trainings(&test_db.pool, &mut rng, 4, Utc::now())
            .await
            .unwrap();

        assert_eq!(summary.created_trainings, 4);
        assert_eq!(test_db.count("training_entries").await, 4);
        assert_eq!(test_db.count("training_session_players").await, 4);
    }

    #[rocket::async_test]
    async fn test_wipe_stamps_detached_accounts_with_given_time() {
        let test_db = TestDbBuilder::new()
            .player("alice", "FC Riverside")
            .player_account("alice@example.com", Some("alice"))
            .build()
            .await
            .unwrap();
        let now = Utc.with_ymd_and_hms(2025, 3, 15, 18, 0, 0).unwrap();

        let summary = wipe_all_players(&test_db.pool, now).await.unwrap();
        assert_eq!(summary.detached_accounts, 1);

        let account = get_account(&test_db.pool, test_db.account_id("alice@example.com"))
            .await
            .unwrap();
        assert_eq!(account.updated_at, now);
    }
}
