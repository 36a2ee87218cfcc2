pub mod accounts;
pub mod admin;
pub mod auth;
pub mod dashboard;
pub mod fitness_tests;
pub mod goals;
pub mod players;
pub mod progress;
pub mod skills;
pub mod trainings;

pub use accounts::*;
pub use admin::*;
pub use auth::*;
pub use dashboard::*;
pub use fitness_tests::*;
pub use goals::*;
pub use players::*;
pub use progress::*;
pub use skills::*;
pub use trainings::*;

use rocket::Route;

/// Every JSON route, mounted under `/api`.
pub fn api_routes() -> Vec<Route> {
    routes![
        health,
        api_login,
        api_logout,
        api_me,
        api_change_password,
        api_list_accounts,
        api_create_account,
        api_update_account,
        api_delete_account,
        api_run_fixtures,
        api_seed_catalog,
        api_list_players,
        api_get_player,
        api_create_player,
        api_update_player,
        api_delete_player,
        api_list_skills,
        api_get_skill,
        api_create_skill,
        api_update_skill,
        api_add_sub_skill,
        api_detach_sub_skill,
        api_update_sub_skill,
        api_list_trainings,
        api_get_training,
        api_create_training,
        api_update_training,
        api_delete_training,
        api_list_goals,
        api_create_goal,
        api_update_goal,
        api_delete_goal,
        api_list_progress,
        api_upsert_progress,
        api_delete_progress,
        api_list_tests,
        api_create_test,
        api_update_test,
        api_delete_test,
        api_list_test_results,
        api_record_test_result,
        api_delete_test_result,
        api_dashboard,
    ]
}
