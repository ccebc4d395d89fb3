// ==========================================
// Config API integration tests
// ==========================================

mod helpers;

use estrich_manager::api::ConfigItem;
use estrich_manager::domain::ActionType;
use helpers::api_test_helper::*;

#[test]
fn test_update_get_and_list() {
    let env = ApiTestEnv::new().expect("test environment");
    assert!(env.config_api.list_configs().unwrap().is_empty());
    assert!(env.config_api.get_config("itt_validity_years").unwrap().is_none());

    env.config_api
        .update_config("itt_validity_years", " 5 ", ACTOR, "neue Norm-Auslegung")
        .unwrap();
    env.config_api
        .update_config("calendar_horizon_days", "45", ACTOR, "längere Vorschau")
        .unwrap();

    assert_eq!(
        env.config_api.get_config("itt_validity_years").unwrap(),
        Some(ConfigItem {
            key: "itt_validity_years".to_string(),
            value: "5".to_string(),
        })
    );

    let keys: Vec<String> = env
        .config_api
        .list_configs()
        .unwrap()
        .into_iter()
        .map(|c| c.key)
        .collect();
    assert_eq!(keys, vec!["calendar_horizon_days", "itt_validity_years"]);

    let log = env
        .action_log_repo
        .find_by_entity("config", "itt_validity_years")
        .unwrap();
    assert_eq!(log.len(), 1);
    assert_eq!(log[0].action_type, ActionType::UpdateConfig.as_str());
}

#[test]
fn test_invalid_values_are_rejected() {
    let env = ApiTestEnv::new().expect("test environment");

    for bad in ["0", "-3", "drei"] {
        let err = env
            .config_api
            .update_config("itt_validity_years", bad, ACTOR, "Test")
            .unwrap_err();
        assert_eq!(error_kind(&err), "InvalidInput", "value {}", bad);
    }

    let err = env
        .config_api
        .update_config("itt_validity_years", "4", ACTOR, " ")
        .unwrap_err();
    assert_eq!(error_kind(&err), "InvalidInput");
    assert!(env.config_api.get_config("itt_validity_years").unwrap().is_none());
}

#[tokio::test]
async fn test_snapshot_restore_feeds_readers() {
    let env = ApiTestEnv::new().expect("test environment");
    env.config_api
        .update_config("calendar_horizon_days", "7", ACTOR, "Ausgangswert")
        .unwrap();
    let snapshot = env.config_api.snapshot().unwrap();

    env.config_api
        .update_config("calendar_horizon_days", "90", ACTOR, "Versuch")
        .unwrap();
    assert_eq!(
        env.config_api.restore_snapshot(&snapshot, ACTOR, "Rücksetzen").unwrap(),
        1
    );

    // the calendar uses the restored window
    let recipe = env.locked_recipe("CT25");
    let today = helpers::test_data_builder::date(2025, 5, 1);
    env.test_report_api
        .create_test_report(
            helpers::test_data_builder::itt_report(
                &recipe.id,
                "ITT-2022-020",
                helpers::test_data_builder::date(2022, 5, 20),
            ),
            ACTOR,
        )
        .await
        .unwrap();
    assert!(env.calendar_api.get_calendar(today, None).await.unwrap().is_empty());

    let err = env
        .config_api
        .restore_snapshot("not json", ACTOR, "kaputt")
        .unwrap_err();
    assert_eq!(error_kind(&err), "InvalidInput");
}

#[test]
fn test_out_of_range_values_are_rejected() {
    let env = ApiTestEnv::new().expect("test environment");
    env.config_api
        .update_config("effectiveness_check_lead_days", "120", ACTOR, "Ausgangswert")
        .unwrap();

    for (key, value) in [
        ("effectiveness_check_lead_days", "4000000000"),
        ("effectiveness_check_lead_days", "3651"),
        ("calendar_horizon_days", "99999999999"),
        ("itt_validity_years", "51"),
        ("itt_validity_years", "1000000"),
    ] {
        let err = env
            .config_api
            .update_config(key, value, ACTOR, "Test")
            .unwrap_err();
        assert_eq!(error_kind(&err), "InvalidInput", "{} = {}", key, value);
    }

    // the upper bounds themselves are accepted
    env.config_api
        .update_config("itt_validity_years", "50", ACTOR, "Grenzwert")
        .unwrap();
    env.config_api
        .update_config("calendar_horizon_days", "3650", ACTOR, "Grenzwert")
        .unwrap();

    assert_eq!(
        env.config_api
            .get_config("effectiveness_check_lead_days")
            .unwrap()
            .map(|c| c.value),
        Some("120".to_string())
    );
}

#[test]
fn test_restore_rejects_out_of_range_snapshot() {
    let env = ApiTestEnv::new().expect("test environment");
    env.config_api
        .update_config("itt_validity_years", "4", ACTOR, "Ausgangswert")
        .unwrap();
    env.config_api
        .update_config("calendar_horizon_days", "14", ACTOR, "Ausgangswert")
        .unwrap();

    let snapshot = r#"{"calendar_horizon_days":"60","itt_validity_years":"1000000"}"#;
    let err = env
        .config_api
        .restore_snapshot(snapshot, ACTOR, "Import")
        .unwrap_err();
    assert_eq!(error_kind(&err), "InvalidInput");

    // nothing from the rejected snapshot was written
    let value = |key: &str| env.config_api.get_config(key).unwrap().map(|c| c.value);
    assert_eq!(value("itt_validity_years"), Some("4".to_string()));
    assert_eq!(value("calendar_horizon_days"), Some("14".to_string()));

    let restores = env
        .action_log_repo
        .find_by_entity("config", "global")
        .unwrap();
    assert!(restores.is_empty());
}
