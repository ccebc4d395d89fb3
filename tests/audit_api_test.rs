// ==========================================
// Audit trail API integration tests
// ==========================================

mod helpers;

use chrono::{Duration, Local};
use estrich_manager::domain::ActionType;
use helpers::api_test_helper::*;
use helpers::test_data_builder::*;

#[test]
fn test_entity_history_follows_recipe_lifecycle() {
    let env = ApiTestEnv::new().expect("test environment");
    let recipe = env.locked_recipe("CT25");
    env.recipe_api.archive_recipe(&recipe.id, "qs.schmidt").unwrap();

    let history = env.audit_api.entity_history(" recipe ", &recipe.id).unwrap();
    let types: Vec<&str> = history.iter().map(|l| l.action_type.as_str()).collect();
    assert_eq!(
        types,
        vec![
            ActionType::CreateRecipe.as_str(),
            ActionType::LockRecipe.as_str(),
            ActionType::ArchiveRecipe.as_str(),
        ]
    );

    let entry = env.audit_api.get_entry(&history[2].action_id).unwrap();
    assert_eq!(entry.actor, "qs.schmidt");

    let err = env.audit_api.get_entry("unbekannt").unwrap_err();
    assert_eq!(error_kind(&err), "NotFound");

    let err = env.audit_api.entity_history("recipe", " ").unwrap_err();
    assert_eq!(error_kind(&err), "InvalidInput");
}

#[test]
fn test_activity_by_actor_and_type() {
    let env = ApiTestEnv::new().expect("test environment");
    let recipe = env.locked_recipe("CT25");
    for _ in 0..3 {
        env.batch_api
            .create_batch(BatchBuilder::new(&recipe.id, date(2025, 6, 2)).build(), "werk.nord")
            .unwrap();
    }

    let by_actor = env.audit_api.actor_activity("werk.nord", 10).unwrap();
    assert_eq!(by_actor.len(), 3);
    assert!(by_actor.iter().all(|l| l.entity_type == "batch"));
    assert_eq!(env.audit_api.actor_activity("werk.nord", 2).unwrap().len(), 2);

    let created = env
        .audit_api
        .actions_of_type(ActionType::CreateBatch, 10)
        .unwrap();
    assert_eq!(created.len(), 3);
    assert!(env
        .audit_api
        .actions_of_type(ActionType::ReleaseBatch, 10)
        .unwrap()
        .is_empty());

    let recent = env.audit_api.recent_activity(1).unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].action_type, ActionType::CreateBatch.as_str());
}

#[test]
fn test_activity_window_and_limits() {
    let env = ApiTestEnv::new().expect("test environment");
    env.locked_recipe("CT25");

    let now = Local::now().naive_local();
    let window = env
        .audit_api
        .activity_between(now - Duration::hours(1), now + Duration::hours(1))
        .unwrap();
    assert_eq!(window.len(), 2);

    assert!(env
        .audit_api
        .activity_between(now + Duration::days(1), now + Duration::days(2))
        .unwrap()
        .is_empty());

    let err = env
        .audit_api
        .activity_between(now, now - Duration::seconds(1))
        .unwrap_err();
    assert_eq!(error_kind(&err), "InvalidInput");

    for limit in [0, -5, 1001] {
        let err = env.audit_api.recent_activity(limit).unwrap_err();
        assert_eq!(error_kind(&err), "InvalidInput", "limit {}", limit);
    }
    assert_eq!(env.audit_api.recent_activity(1000).unwrap().len(), 2);
}
