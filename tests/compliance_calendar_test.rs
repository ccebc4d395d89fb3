// ==========================================
// Compliance calendar / calibration integration tests
// ==========================================

mod helpers;

use std::sync::{Arc, Mutex};

use chrono::{Duration, Local};
use estrich_manager::api::CalendarApi;
use estrich_manager::db;
use estrich_manager::domain::{
    ActionKind, CalendarEntryKind, DeviationSeverity, DeviationSource, DeviationType,
    NewCorrectiveAction, NewDeviation, RootCauseAnalysis, RootCauseMethod,
};
use estrich_manager::repository::{CalibrationRepository, DeviationRepository, TestReportRepository};
use helpers::api_test_helper::*;
use helpers::mock_config::MockConfig;
use helpers::test_data_builder::*;

#[test]
fn test_calibration_next_due_and_latest() {
    let env = ApiTestEnv::new().expect("test environment");

    let first = env
        .calibration_api
        .record_calibration(calibration("DPM-01", date(2024, 1, 31), 12), ACTOR)
        .unwrap();
    assert_eq!(first.next_due, date(2025, 1, 31));

    let second = env
        .calibration_api
        .record_calibration(calibration("DPM-01", date(2025, 1, 31), 1), ACTOR)
        .unwrap();
    assert_eq!(second.next_due, date(2025, 2, 28));

    let latest = env.calibration_api.latest_calibration("DPM-01").unwrap();
    assert_eq!(latest.id, second.id);
    assert_eq!(env.calibration_api.calibration_history("DPM-01").unwrap().len(), 2);
    assert_eq!(env.calibration_api.list_equipment_status().unwrap().len(), 1);

    let err = env
        .calibration_api
        .record_calibration(calibration("DPM-02", date(2025, 1, 1), 0), ACTOR)
        .unwrap_err();
    assert_eq!(error_kind(&err), "InvalidInput");
    assert_eq!(
        error_kind(&env.calibration_api.latest_calibration("DPM-02").unwrap_err()),
        "NotFound"
    );
}

#[tokio::test]
async fn test_calendar_collects_all_sources() {
    let env = ApiTestEnv::new().expect("test environment");
    let today = date(2025, 5, 1);
    let recipe = env.locked_recipe("CT25");

    // ITT expiring 2025-05-10 (in window)
    let itt = env
        .test_report_api
        .create_test_report(itt_report(&recipe.id, "ITT-2022-009", date(2022, 5, 10)), ACTOR)
        .await
        .unwrap();
    // ITT expiring 2027 (outside window)
    env.test_report_api
        .create_test_report(itt_report(&recipe.id, "ITT-2024-010", date(2024, 5, 10)), ACTOR)
        .await
        .unwrap();

    // calibration overdue since 2025-04-15; an older record of the same scale is ignored
    env.calibration_api
        .record_calibration(calibration("WAAGE-3", date(2023, 4, 15), 12), ACTOR)
        .unwrap();
    let calib = env
        .calibration_api
        .record_calibration(calibration("WAAGE-3", date(2024, 4, 15), 12), ACTOR)
        .unwrap();

    // open corrective action due 2025-05-20
    let deviation = env
        .deviation_api
        .open_deviation(
            NewDeviation {
                title: "Fließmaß zu gering".to_string(),
                description: "Fließmaß 180 mm statt 220 mm".to_string(),
                deviation_type: DeviationType::Process,
                severity: DeviationSeverity::Minor,
                source: DeviationSource::InternalQc,
                recipe_id: Some(recipe.id.clone()),
                batch_id: None,
            },
            ACTOR,
        )
        .unwrap();
    env.deviation_api
        .record_root_cause(
            &deviation.id,
            RootCauseAnalysis {
                method: RootCauseMethod::Ishikawa,
                summary: "Fließmitteldosierung".to_string(),
                contributing_factors: vec![],
                analysed_by: "QS".to_string(),
                analysed_on: date(2025, 4, 20),
            },
            ACTOR,
        )
        .unwrap();
    let action = env
        .deviation_api
        .add_corrective_action(
            &deviation.id,
            NewCorrectiveAction {
                kind: ActionKind::Corrective,
                description: "Dosierpumpe tauschen".to_string(),
                responsible_person: "Instandhaltung".to_string(),
                planned_start: date(2025, 4, 21),
                planned_due: date(2025, 5, 20),
            },
            ACTOR,
        )
        .unwrap();

    let entries = env.calendar_api.get_calendar(today, None).await.unwrap();
    let summary: Vec<(CalendarEntryKind, String, bool)> = entries
        .iter()
        .map(|e| (e.kind, e.reference_id.clone(), e.overdue))
        .collect();

    assert_eq!(
        summary,
        vec![
            (CalendarEntryKind::CalibrationDue, calib.id.clone(), true),
            (CalendarEntryKind::TestReportExpiry, itt.id.clone(), false),
            (CalendarEntryKind::CorrectiveActionDue, action.id.clone(), false),
        ]
    );
    assert!(entries[2].title.contains(&deviation.deviation_number));

    // shorter horizon drops the action
    let short = env.calendar_api.get_calendar(today, Some(10)).await.unwrap();
    assert_eq!(short.len(), 2);

    let err = env.calendar_api.get_calendar(today, Some(-1)).await.unwrap_err();
    assert_eq!(error_kind(&err), "InvalidInput");
}

#[tokio::test]
async fn test_calendar_includes_pending_effectiveness_checks() {
    let env = ApiTestEnv::new().expect("test environment");
    let today = Local::now().date_naive();

    let deviation = env
        .deviation_api
        .open_deviation(
            NewDeviation {
                title: "Audit-Feststellung".to_string(),
                description: "WPK-Aufzeichnungen unvollständig".to_string(),
                deviation_type: DeviationType::Documentation,
                severity: DeviationSeverity::Minor,
                source: DeviationSource::Audit,
                recipe_id: None,
                batch_id: None,
            },
            ACTOR,
        )
        .unwrap();
    env.deviation_api
        .record_root_cause(
            &deviation.id,
            RootCauseAnalysis {
                method: RootCauseMethod::FiveWhy,
                summary: "Formular veraltet".to_string(),
                contributing_factors: vec![],
                analysed_by: "QS".to_string(),
                analysed_on: today,
            },
            ACTOR,
        )
        .unwrap();
    env.deviation_api
        .add_corrective_action(
            &deviation.id,
            NewCorrectiveAction {
                kind: ActionKind::Preventive,
                description: "Formular überarbeiten".to_string(),
                responsible_person: "QS".to_string(),
                planned_start: today,
                planned_due: today + Duration::days(60),
            },
            ACTOR,
        )
        .unwrap();
    let check = env
        .deviation_api
        .schedule_effectiveness_check(
            &deviation.id,
            "nächstes Audit ohne Feststellung",
            Some(today + Duration::days(5)),
            ACTOR,
        )
        .await
        .unwrap();

    let entries = env.calendar_api.get_calendar(today, None).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].kind, CalendarEntryKind::EffectivenessCheck);
    assert_eq!(entries[0].reference_id, check.id);
    assert!(!entries[0].overdue);
}

#[tokio::test]
async fn test_calendar_horizon_bounds() {
    let env = ApiTestEnv::new().expect("test environment");
    let today = date(2025, 4, 15);
    let itt = env.locked_recipe("CT30");
    env.test_report_api
        .create_test_report(itt_report(&itt.id, "ITT-2015-001", date(2015, 1, 10)), ACTOR)
        .await
        .unwrap();

    for horizon in [i64::MAX, i64::MIN, 3651, 4_000_000_000] {
        let err = env
            .calendar_api
            .get_calendar(today, Some(horizon))
            .await
            .unwrap_err();
        assert_eq!(error_kind(&err), "InvalidInput", "horizon {}", horizon);
    }

    let entries = env.calendar_api.get_calendar(today, Some(3650)).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert!(entries[0].overdue);
}

#[tokio::test]
async fn test_configured_horizon_out_of_range() {
    let env = ApiTestEnv::new().expect("test environment");
    let conn = Arc::new(Mutex::new(db::open_sqlite_connection(&env.db_path).unwrap()));
    let api = CalendarApi::new(
        Arc::new(TestReportRepository::new(conn.clone())),
        Arc::new(CalibrationRepository::new(conn.clone())),
        Arc::new(DeviationRepository::new(conn)),
        Arc::new(MockConfig {
            calendar_horizon_days: i64::MAX,
            ..Default::default()
        }),
    );

    let err = api.get_calendar(date(2025, 4, 15), None).await.unwrap_err();
    assert_eq!(error_kind(&err), "ConfigError");
}
