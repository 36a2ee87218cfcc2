#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};

    use crate::db::{delete_progress, get_progress, list_progress, upsert_progress};
    use crate::error::AppError;
    use crate::models::{ProgressInput, ProgressStatus};
    use crate::test::test_db::{TestDb, TestDbBuilder};

    async fn progress_db() -> TestDb {
        TestDbBuilder::new()
            .player("alice", "FC Riverside")
            .skill("Passing", &[("Inside-foot pass", 1), ("First-time pass", 2)])
            .skill("Dribbling", &[("Close control", 1)])
            .build()
            .await
            .expect("Failed to build test database")
    }

    fn input(player_id: i64, skill_id: i64, sub_skill_id: Option<i64>) -> ProgressInput {
        ProgressInput {
            player_id,
            skill_id,
            sub_skill_id,
            status: ProgressStatus::Plan,
            planned_date: NaiveDate::from_ymd_opt(2025, 4, 1),
            done_date: None,
            notes: String::new(),
        }
    }

    #[rocket::async_test]
    async fn test_double_upsert_keeps_one_row() {
        let test_db = progress_db().await;
        let alice = test_db.player_id("alice");
        let passing = test_db.skill_id("Passing");
        let inside = test_db.sub_skill_id("Passing", "Inside-foot pass").await;

        let first = upsert_progress(&test_db.pool, &input(alice, passing, Some(inside)))
            .await
            .unwrap();
        assert!(first.created);

        let mut second_input = input(alice, passing, Some(inside));
        second_input.status = ProgressStatus::InProgress;
        second_input.notes = "Good weight of pass".to_string();
        let second = upsert_progress(&test_db.pool, &second_input).await.unwrap();

        assert!(!second.created);
        assert_eq!(second.id, first.id);
        assert_eq!(test_db.count("player_skill_progress").await, 1);

        let row = get_progress(&test_db.pool, first.id).await.unwrap();
        assert_eq!(row.status, ProgressStatus::InProgress);
        assert_eq!(row.notes, "Good weight of pass");
        assert_eq!(row.sub_skill_name.as_deref(), Some("Inside-foot pass"));
    }

    #[rocket::async_test]
    async fn test_skill_level_rows_are_keyed_separately() {
        let test_db = progress_db().await;
        let alice = test_db.player_id("alice");
        let passing = test_db.skill_id("Passing");
        let inside = test_db.sub_skill_id("Passing", "Inside-foot pass").await;

        upsert_progress(&test_db.pool, &input(alice, passing, None))
            .await
            .unwrap();
        let again = upsert_progress(&test_db.pool, &input(alice, passing, None))
            .await
            .unwrap();
        assert!(!again.created, "a missing sub-skill is part of the key");

        upsert_progress(&test_db.pool, &input(alice, passing, Some(inside)))
            .await
            .unwrap();

        let rows = list_progress(&test_db.pool, Some(alice)).await.unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[rocket::async_test]
    async fn test_done_without_date_is_stamped_today() {
        let test_db = progress_db().await;
        let mut done = input(test_db.player_id("alice"), test_db.skill_id("Dribbling"), None);
        done.status = ProgressStatus::Done;

        let upsert = upsert_progress(&test_db.pool, &done).await.unwrap();
        let row = get_progress(&test_db.pool, upsert.id).await.unwrap();

        assert_eq!(row.done_date, Some(Utc::now().date_naive()));
    }

    #[rocket::async_test]
    async fn test_upsert_rejects_bad_references() {
        let test_db = progress_db().await;
        let alice = test_db.player_id("alice");
        let passing = test_db.skill_id("Passing");
        let close_control = test_db.sub_skill_id("Dribbling", "Close control").await;

        let missing_player = upsert_progress(&test_db.pool, &input(9999, passing, None)).await;
        assert!(matches!(missing_player, Err(AppError::NotFound(_))));

        let missing_skill = upsert_progress(&test_db.pool, &input(alice, 9999, None)).await;
        assert!(matches!(missing_skill, Err(AppError::NotFound(_))));

        let foreign_sub_skill =
            upsert_progress(&test_db.pool, &input(alice, passing, Some(close_control))).await;
        assert!(matches!(foreign_sub_skill, Err(AppError::Validation { .. })));

        assert_eq!(test_db.count("player_skill_progress").await, 0);
    }

    #[rocket::async_test]
    async fn test_delete_progress() {
        let test_db = progress_db().await;
        let upsert = upsert_progress(
            &test_db.pool,
            &input(test_db.player_id("alice"), test_db.skill_id("Passing"), None),
        )
        .await
        .unwrap();

        delete_progress(&test_db.pool, upsert.id).await.unwrap();
        assert_eq!(test_db.count("player_skill_progress").await, 0);

        let again = delete_progress(&test_db.pool, upsert.id).await;
        assert!(matches!(again, Err(AppError::NotFound(_))));
    }
}
