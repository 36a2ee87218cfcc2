#[cfg(test)]
mod tests {
    use chrono::{Days, NaiveDate, TimeZone, Utc};

    use crate::db::{
        GoalFilter, PlayerFilter, TrainingFilter, create_goal, create_test, create_training,
        delete_player, get_account, get_player_detail, list_goals, list_players, list_trainings,
        record_test_result, update_player, upsert_progress,
    };
    use crate::error::AppError;
    use crate::models::{
        FitnessTestInput, GoalInput, PlayerInput, ProgressInput, ProgressStatus, TestResultInput,
        TrainingInput,
    };
    use crate::test::test_db::{TestDb, TestDbBuilder};

    async fn squad() -> TestDb {
        TestDbBuilder::new()
            .player("alice", "FC Riverside")
            .player("bruno", "FC Riverside")
            .trainer("trainer@example.com")
            .viewer("viewer@example.com")
            .player_account("alice@example.com", Some("alice"))
            .skill("Passing", &[])
            .build()
            .await
            .expect("Failed to build test database")
    }

    fn training(player_ids: Vec<i64>) -> TrainingInput {
        TrainingInput {
            player_ids,
            trainer_id: None,
            date: Utc::now(),
            duration_minutes: 90,
            location: "Training ground".to_string(),
            notes: String::new(),
            entries: Vec::new(),
        }
    }

    fn player_input(first_name: &str, trainer_ids: Vec<i64>) -> PlayerInput {
        PlayerInput {
            first_name: first_name.to_string(),
            last_name: "Tester".to_string(),
            birth_date: NaiveDate::from_ymd_opt(2013, 5, 1),
            age: None,
            club: "Harbour Rovers".to_string(),
            position: "forward".to_string(),
            dominant_foot: "left".to_string(),
            photo_url: None,
            trainer_ids,
            active: Some(true),
        }
    }

    #[rocket::async_test]
    async fn test_delete_player_cascades() {
        let test_db = squad().await;
        let alice = test_db.player_id("alice");
        let bruno = test_db.player_id("bruno");

        create_training(&test_db.pool, &training(vec![alice])).await.unwrap();
        create_training(&test_db.pool, &training(vec![alice, bruno])).await.unwrap();
        upsert_progress(
            &test_db.pool,
            &ProgressInput {
                player_id: alice,
                skill_id: test_db.skill_id("Passing"),
                sub_skill_id: None,
                status: ProgressStatus::InProgress,
                planned_date: None,
                done_date: None,
                notes: String::new(),
            },
        )
        .await
        .unwrap();
        create_goal(
            &test_db.pool,
            &GoalInput {
                player_id: alice,
                title: "Scan before receiving".to_string(),
                description: String::new(),
                due_date: None,
                status: None,
                skill_id: None,
                sub_skill_id: None,
            },
            None,
        )
        .await
        .unwrap();
        let test_id = create_test(
            &test_db.pool,
            &FitnessTestInput {
                name: "30m sprint".to_string(),
                unit: "s".to_string(),
                description: String::new(),
            },
        )
        .await
        .unwrap();
        record_test_result(
            &test_db.pool,
            &TestResultInput {
                player_id: alice,
                test_id,
                date: Utc::now().date_naive(),
                value: 4.9,
                notes: String::new(),
            },
        )
        .await
        .unwrap();

        let deleted_at = Utc.with_ymd_and_hms(2025, 3, 15, 18, 0, 0).unwrap();
        let deletion = delete_player(&test_db.pool, alice, deleted_at).await.unwrap();

        assert_eq!(deletion.deleted_training_sessions, 1);
        assert_eq!(deletion.detached_training_sessions, 1);
        assert_eq!(deletion.deleted_player_skill_progress, 1);
        assert_eq!(deletion.deleted_goals, 1);
        assert_eq!(deletion.deleted_test_results, 1);
        assert_eq!(deletion.detached_accounts, 1);

        let remaining = list_trainings(&test_db.pool, &TrainingFilter::default())
            .await
            .unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].players.len(), 1);
        assert_eq!(remaining[0].players[0].id, bruno);

        let account = get_account(&test_db.pool, test_db.account_id("alice@example.com"))
            .await
            .unwrap();
        assert_eq!(account.player_id, None);
        assert_eq!(account.updated_at, deleted_at);
        assert!(list_goals(&test_db.pool, &GoalFilter::default())
            .await
            .unwrap()
            .is_empty());

        let again = delete_player(&test_db.pool, alice, Utc::now()).await;
        assert!(matches!(again, Err(AppError::NotFound(_))));
    }

    #[rocket::async_test]
    async fn test_player_detail_resolves_trainers_and_account() {
        let test_db = squad().await;
        let trainer = test_db.account_id("trainer@example.com");
        let alice = test_db.player_id("alice");

        update_player(&test_db.pool, alice, &player_input("Alice", vec![trainer]))
            .await
            .unwrap();

        let detail = get_player_detail(&test_db.pool, alice).await.unwrap();
        assert_eq!(detail.player.first_name, "Alice");
        assert_eq!(detail.trainers.len(), 1);
        assert_eq!(detail.trainers[0].id, trainer);
        assert_eq!(
            detail.account.map(|account| account.email),
            Some("alice@example.com".to_string())
        );
    }

    #[rocket::async_test]
    async fn test_trainer_links_require_coaching_role() {
        let test_db = squad().await;
        let viewer = test_db.account_id("viewer@example.com");

        let result = update_player(
            &test_db.pool,
            test_db.player_id("bruno"),
            &player_input("Bruno", vec![viewer]),
        )
        .await;
        assert!(matches!(result, Err(AppError::Validation { .. })));

        let result = update_player(
            &test_db.pool,
            test_db.player_id("bruno"),
            &player_input("Bruno", vec![9999]),
        )
        .await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[rocket::async_test]
    async fn test_birth_date_cannot_be_in_the_future() {
        let test_db = squad().await;
        let mut input = player_input("Future", Vec::new());
        input.birth_date = Some(Utc::now().date_naive() + Days::new(1));

        let result = update_player(&test_db.pool, test_db.player_id("bruno"), &input).await;
        assert!(matches!(result, Err(AppError::Validation { .. })));
    }

    #[rocket::async_test]
    async fn test_list_players_filters() {
        let test_db = squad().await;
        let mut inactive = player_input("Bruno", Vec::new());
        inactive.active = Some(false);
        update_player(&test_db.pool, test_db.player_id("bruno"), &inactive)
            .await
            .unwrap();

        let active = list_players(&test_db.pool, &PlayerFilter::default())
            .await
            .unwrap();
        assert_eq!(active.len(), 1);

        let everyone = list_players(
            &test_db.pool,
            &PlayerFilter {
                include_inactive: true,
                ..PlayerFilter::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(everyone.len(), 2);

        let riverside = list_players(
            &test_db.pool,
            &PlayerFilter {
                club: Some(" FC Riverside ".to_string()),
                include_inactive: true,
                ..PlayerFilter::default()
            },
        )
        .await
        .unwrap();
        assert_eq!(riverside.len(), 1, "Bruno moved to Harbour Rovers");
    }
}
