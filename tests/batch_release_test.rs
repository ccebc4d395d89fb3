// ==========================================
// Batch lifecycle / release gate integration tests
// ==========================================
// Scope:
// 1. numbering of new batches
// 2. release blocked by QC values and open deviations
// 3. block / unblock / consume transitions
// ==========================================

mod helpers;

use estrich_manager::api::ApiError;
use estrich_manager::domain::{ActionType, BatchStatus, QcData};
use helpers::api_test_helper::*;
use helpers::test_data_builder::*;

// ==========================================
// creation
// ==========================================

#[test]
fn test_batch_numbers_follow_day_and_recipe() {
    let env = ApiTestEnv::new().expect("test environment");
    let recipe = env.locked_recipe("ct25");
    let day = date(2025, 3, 14);

    let first = env.produced_batch(&recipe.id, day, 27.0, 5.0);
    let second = env.produced_batch(&recipe.id, day, 27.0, 5.0);
    let next_day = env.produced_batch(&recipe.id, date(2025, 3, 15), 27.0, 5.0);

    assert_eq!(first.batch_number, "20250314-CT25-001");
    assert_eq!(second.batch_number, "20250314-CT25-002");
    assert_eq!(next_day.batch_number, "20250315-CT25-001");
    assert_eq!(first.status, BatchStatus::Produced);
}

#[test]
fn test_create_batch_requires_locked_recipe() {
    let env = ApiTestEnv::new().expect("test environment");
    let draft = env
        .recipe_api
        .create_recipe(RecipeBuilder::new("CT30").classes("C30", "F5").build(), ACTOR)
        .unwrap();

    let err = env
        .batch_api
        .create_batch(BatchBuilder::new(&draft.id, date(2025, 3, 14)).build(), ACTOR)
        .unwrap_err();
    assert_eq!(error_kind(&err), "BusinessRuleViolation");
}

#[test]
fn test_create_batch_rejects_bad_quantity_and_qc() {
    let env = ApiTestEnv::new().expect("test environment");
    let recipe = env.locked_recipe("CT25");

    let err = env
        .batch_api
        .create_batch(
            BatchBuilder::new(&recipe.id, date(2025, 3, 14)).quantity(0.0).build(),
            ACTOR,
        )
        .unwrap_err();
    assert_eq!(error_kind(&err), "InvalidInput");

    let err = env
        .batch_api
        .create_batch(
            BatchBuilder::new(&recipe.id, date(2025, 3, 14))
                .strengths(-1.0, 4.0)
                .build(),
            ACTOR,
        )
        .unwrap_err();
    assert!(err.to_string().contains("compressive_strength_28d"));
}

// ==========================================
// release gate
// ==========================================

#[test]
fn test_release_blocked_below_declared_class() {
    let env = ApiTestEnv::new().expect("test environment");
    let recipe = env.locked_recipe("CT25");
    let batch = env.produced_batch(&recipe.id, date(2025, 3, 14), 23.0, 4.5);

    let err = env.batch_api.release_batch(&batch.id, ACTOR).unwrap_err();
    match &err {
        ApiError::ReleaseBlocked {
            batch_number,
            reasons,
        } => {
            assert_eq!(batch_number, &batch.batch_number);
            assert_eq!(reasons.len(), 1);
            assert!(reasons[0].contains("23"));
            assert!(reasons[0].contains("25"));
        }
        other => panic!("expected ReleaseBlocked, got {:?}", other),
    }

    // nothing changed
    let stored = env.batch_api.get_batch(&batch.id).unwrap();
    assert_eq!(stored.status, BatchStatus::Produced);
    assert!(stored.released_by.is_none());
}

#[test]
fn test_release_requires_test_results() {
    let env = ApiTestEnv::new().expect("test environment");
    let recipe = env.locked_recipe("CT25");
    let batch = env
        .batch_api
        .create_batch(BatchBuilder::new(&recipe.id, date(2025, 3, 14)).build(), ACTOR)
        .unwrap();

    let validation = env.batch_api.validate_batch(&batch.id).unwrap();
    assert!(!validation.is_valid);
    assert_eq!(validation.issues.len(), 2);

    let err = env.batch_api.release_batch(&batch.id, ACTOR).unwrap_err();
    assert_eq!(error_kind(&err), "ReleaseBlocked");
}

#[test]
fn test_release_after_recording_qc() {
    let env = ApiTestEnv::new().expect("test environment");
    let recipe = env.locked_recipe("CT25");
    let batch = env
        .batch_api
        .create_batch(BatchBuilder::new(&recipe.id, date(2025, 3, 14)).build(), ACTOR)
        .unwrap();

    env.batch_api
        .record_qc(
            &batch.id,
            QcData {
                compressive_strength_28d: Some(26.8),
                ..Default::default()
            },
            ACTOR,
        )
        .unwrap();
    let updated = env
        .batch_api
        .record_qc(
            &batch.id,
            QcData {
                flexural_strength_28d: Some(4.3),
                ..Default::default()
            },
            ACTOR,
        )
        .unwrap();
    assert_eq!(updated.qc_data.compressive_strength_28d, Some(26.8));

    let released = env.batch_api.release_batch(&batch.id, ACTOR).unwrap();
    assert_eq!(released.status, BatchStatus::Released);
    assert_eq!(released.released_by.as_deref(), Some(ACTOR));
    assert!(released.released_at.is_some());

    // QC values are frozen once released
    let err = env
        .batch_api
        .record_qc(
            &batch.id,
            QcData {
                density: Some(2100.0),
                ..Default::default()
            },
            ACTOR,
        )
        .unwrap_err();
    assert_eq!(error_kind(&err), "InvalidTransition");

    let log = env
        .action_log_repo
        .find_by_entity("batch", &batch.id)
        .unwrap();
    assert!(log
        .iter()
        .any(|l| l.action_type == ActionType::ReleaseBatch.as_str()));
}

#[test]
fn test_open_deviation_blocks_release_until_closed() {
    let env = ApiTestEnv::new().expect("test environment");
    let recipe = env.locked_recipe("CT25");
    let batch = env.produced_batch(&recipe.id, date(2025, 3, 14), 22.0, 4.2);

    let deviation = env.batch_api.raise_deviation_from_qc(&batch.id, ACTOR).unwrap();
    assert_eq!(deviation.batch_id.as_deref(), Some(batch.id.as_str()));
    assert_eq!(deviation.recipe_id.as_deref(), Some(recipe.id.as_str()));

    // retest passes, but the deviation is still open
    env.batch_api
        .record_qc(
            &batch.id,
            QcData {
                compressive_strength_28d: Some(25.4),
                ..Default::default()
            },
            ACTOR,
        )
        .unwrap();

    let decision = env.batch_api.evaluate_release(&batch.id).unwrap();
    assert!(!decision.allowed);
    assert!(decision.validation.is_valid);
    assert_eq!(decision.blocking_deviations, vec![deviation.deviation_number.clone()]);

    let err = env.batch_api.release_batch(&batch.id, ACTOR).unwrap_err();
    assert!(err.to_string().contains(&deviation.deviation_number));
}

#[test]
fn test_raise_deviation_rejected_for_passing_batch() {
    let env = ApiTestEnv::new().expect("test environment");
    let recipe = env.locked_recipe("CT25");
    let batch = env.produced_batch(&recipe.id, date(2025, 3, 14), 27.0, 4.5);

    let err = env.batch_api.raise_deviation_from_qc(&batch.id, ACTOR).unwrap_err();
    assert_eq!(error_kind(&err), "BusinessRuleViolation");
}

// ==========================================
// block / unblock / consume
// ==========================================

#[test]
fn test_block_unblock_and_consume() {
    let env = ApiTestEnv::new().expect("test environment");
    let recipe = env.locked_recipe("CT25");
    let batch = env.produced_batch(&recipe.id, date(2025, 3, 14), 27.0, 4.5);

    let err = env.batch_api.block_batch(&batch.id, "  ", ACTOR).unwrap_err();
    assert_eq!(error_kind(&err), "InvalidInput");

    let blocked = env
        .batch_api
        .block_batch(&batch.id, "Kundenreklamation Risse", ACTOR)
        .unwrap();
    assert_eq!(blocked.status, BatchStatus::Blocked);
    assert_eq!(blocked.blocked_reason.as_deref(), Some("Kundenreklamation Risse"));

    // a blocked batch is never released directly
    let err = env.batch_api.release_batch(&batch.id, ACTOR).unwrap_err();
    assert_eq!(error_kind(&err), "InvalidTransition");
    assert_eq!(
        err.to_string(),
        "Batch cannot be released from status: blocked"
    );

    let unblocked = env
        .batch_api
        .unblock_batch(&batch.id, "Reklamation unbegründet", ACTOR)
        .unwrap();
    assert_eq!(unblocked.status, BatchStatus::Produced);
    assert!(unblocked.blocked_reason.is_none());

    env.batch_api.release_batch(&batch.id, ACTOR).unwrap();
    let consumed = env.batch_api.consume_batch(&batch.id, ACTOR).unwrap();
    assert_eq!(consumed.status, BatchStatus::Consumed);

    let err = env.batch_api.block_batch(&batch.id, "zu spät", ACTOR).unwrap_err();
    assert_eq!(error_kind(&err), "InvalidTransition");
}

#[test]
fn test_consume_requires_release() {
    let env = ApiTestEnv::new().expect("test environment");
    let recipe = env.locked_recipe("CT25");
    let batch = env.produced_batch(&recipe.id, date(2025, 3, 14), 27.0, 4.5);

    let err = env.batch_api.consume_batch(&batch.id, ACTOR).unwrap_err();
    assert_eq!(error_kind(&err), "InvalidTransition");
}

#[test]
fn test_list_and_lookup_by_number() {
    let env = ApiTestEnv::new().expect("test environment");
    let recipe = env.locked_recipe("CT25");
    let a = env.produced_batch(&recipe.id, date(2025, 3, 14), 27.0, 4.5);
    let b = env.produced_batch(&recipe.id, date(2025, 3, 15), 20.0, 4.5);
    env.batch_api.release_batch(&a.id, ACTOR).unwrap();

    let found = env.batch_api.get_batch_by_number(&b.batch_number).unwrap();
    assert_eq!(found.id, b.id);

    let released = env
        .batch_api
        .list_batches(Some(&recipe.id), Some(BatchStatus::Released))
        .unwrap();
    assert_eq!(released.len(), 1);
    assert_eq!(released[0].id, a.id);

    assert_eq!(env.batch_api.list_batches(None, None).unwrap().len(), 2);
    assert_eq!(
        error_kind(&env.batch_api.get_batch("missing").unwrap_err()),
        "NotFound"
    );
}
