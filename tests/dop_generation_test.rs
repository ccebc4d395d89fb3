// ==========================================
// Declaration of Performance integration tests
// ==========================================

mod helpers;

use estrich_manager::api::ApiError;
use estrich_manager::domain::{AvcpSystem, DopStatus};
use estrich_manager::engine::DopPrerequisiteError;
use helpers::api_test_helper::*;
use helpers::test_data_builder::*;

#[tokio::test]
async fn test_generate_dop_for_locked_recipe_with_itt() {
    let env = ApiTestEnv::new().expect("test environment");
    let recipe = env.locked_recipe_from(RecipeBuilder::new("CT30").classes("C30", "F5").wear("AR1").build());
    env.test_report_api
        .create_test_report(itt_report(&recipe.id, "ITT-2024-017", date(2024, 9, 1)), ACTOR)
        .await
        .unwrap();

    let dop = env
        .dop_api
        .generate_dop(&recipe.id, None, date(2025, 2, 10), "en", ACTOR)
        .unwrap();

    assert_eq!(dop.dop_number, "DoP-2025-CT30-0001");
    assert_eq!(dop.product_designation, "CT-C30-F5-AR1");
    assert_eq!(dop.recipe_version, recipe.version);
    assert_eq!(dop.status, DopStatus::Issued);
    assert_eq!(dop.test_report_numbers, vec!["ITT-2024-017".to_string()]);

    let keys: Vec<&str> = dop.characteristics.iter().map(|c| c.key.as_str()).collect();
    assert_eq!(
        keys,
        vec![
            "reaction_to_fire",
            "release_of_corrosive_substances",
            "compressive_strength",
            "flexural_strength",
            "wear_resistance",
        ]
    );
    let performances: Vec<&str> = dop
        .characteristics
        .iter()
        .map(|c| c.performance.as_str())
        .collect();
    assert_eq!(performances, vec!["A1fl", "CT", "C30", "F5", "AR1"]);

    // sequence continues within the year
    let second = env
        .dop_api
        .generate_dop(&recipe.id, None, date(2025, 3, 1), "de", ACTOR)
        .unwrap();
    assert_eq!(second.dop_number, "DoP-2025-CT30-0002");
    assert_eq!(second.title, "Leistungserklärung");
    assert_eq!(second.language, "de");
}

#[tokio::test]
async fn test_dop_requires_valid_itt() {
    let env = ApiTestEnv::new().expect("test environment");
    let recipe = env.locked_recipe("CT25");

    let err = env
        .dop_api
        .generate_dop(&recipe.id, None, date(2025, 2, 10), "en", ACTOR)
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::DopPrerequisite(DopPrerequisiteError::MissingInitialTypeTest { .. })
    ));

    // ITT from 2020 expired after three years
    env.test_report_api
        .create_test_report(itt_report(&recipe.id, "ITT-2020-003", date(2020, 1, 15)), ACTOR)
        .await
        .unwrap();
    let err = env
        .dop_api
        .generate_dop(&recipe.id, None, date(2025, 2, 10), "en", ACTOR)
        .unwrap_err();
    assert_eq!(error_kind(&err), "DopPrerequisite");
}

#[tokio::test]
async fn test_dop_requires_locked_recipe() {
    let env = ApiTestEnv::new().expect("test environment");
    let draft = env
        .recipe_api
        .create_recipe(RecipeBuilder::new("CT25").build(), ACTOR)
        .unwrap();
    env.test_report_api
        .create_test_report(itt_report(&draft.id, "ITT-2024-001", date(2024, 9, 1)), ACTOR)
        .await
        .unwrap();

    let err = env
        .dop_api
        .generate_dop(&draft.id, None, date(2025, 2, 10), "en", ACTOR)
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::DopPrerequisite(DopPrerequisiteError::RecipeNotLocked { .. })
    ));
}

#[test]
fn test_avcp_2plus_requires_notified_body_to_lock() {
    let env = ApiTestEnv::new().expect("test environment");
    let recipe = env
        .recipe_api
        .create_recipe(RecipeBuilder::new("SR40").avcp(AvcpSystem::System2Plus).build(), ACTOR)
        .unwrap();

    let err = env.recipe_api.lock_recipe(&recipe.id, ACTOR).unwrap_err();
    assert_eq!(error_kind(&err), "BusinessRuleViolation");

    let with_nb = env.locked_recipe_from(
        RecipeBuilder::new("SR41")
            .avcp(AvcpSystem::System2Plus)
            .notified_body("NB 0432")
            .build(),
    );
    assert!(with_nb.locked_at.is_some());
}

#[tokio::test]
async fn test_batch_dop_requires_released_batch() {
    let env = ApiTestEnv::new().expect("test environment");
    let recipe = env.locked_recipe("CT25");
    env.test_report_api
        .create_test_report(itt_report(&recipe.id, "ITT-2024-009", date(2024, 9, 1)), ACTOR)
        .await
        .unwrap();
    let batch = env.produced_batch(&recipe.id, date(2025, 2, 3), 27.0, 4.6);

    let err = env
        .dop_api
        .generate_dop(&recipe.id, Some(&batch.id), date(2025, 2, 10), "en", ACTOR)
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::DopPrerequisite(DopPrerequisiteError::BatchNotReleased { .. })
    ));

    env.batch_api.release_batch(&batch.id, ACTOR).unwrap();
    let dop = env
        .dop_api
        .generate_dop(&recipe.id, Some(&batch.id), date(2025, 2, 10), "en", ACTOR)
        .unwrap();
    assert_eq!(dop.batch_id.as_deref(), Some(batch.id.as_str()));
}

#[tokio::test]
async fn test_revoked_dop_is_not_public() {
    let env = ApiTestEnv::new().expect("test environment");
    let recipe = env.locked_recipe("CT25");
    env.test_report_api
        .create_test_report(itt_report(&recipe.id, "ITT-2024-010", date(2024, 9, 1)), ACTOR)
        .await
        .unwrap();
    let dop = env
        .dop_api
        .generate_dop(&recipe.id, None, date(2025, 2, 10), "en", ACTOR)
        .unwrap();

    let public = env.dop_api.get_public_dop(&dop.dop_number).unwrap();
    assert_eq!(public.id, dop.id);

    let revoked = env
        .dop_api
        .revoke_dop(&dop.id, "falsche Verschleißklasse", ACTOR)
        .unwrap();
    assert_eq!(revoked.status, DopStatus::Revoked);
    assert_eq!(
        error_kind(&env.dop_api.get_public_dop(&dop.dop_number).unwrap_err()),
        "NotFound"
    );
    assert_eq!(
        error_kind(&env.dop_api.revoke_dop(&dop.id, "nochmal", ACTOR).unwrap_err()),
        "BusinessRuleViolation"
    );

    // still listed internally
    assert_eq!(env.dop_api.list_dops(&recipe.id).unwrap().len(), 1);
}
