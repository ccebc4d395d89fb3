// ==========================================
// EstrichManager - Recipe API
// ==========================================
// Lifecycle: draft -> locked -> archived
// Drafts are editable (each edit bumps `version`); locked recipes
// are immutable and can only be revised into a new draft.
// ==========================================

use std::sync::Arc;

use chrono::Local;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::api::error::{optional, required, ApiError, ApiResult};
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::recipe::{
    compressive_minimum, flexural_minimum, is_known_fire_class, NewRecipe, Recipe, RecipeUpdate,
    COMPRESSIVE_CLASSES, DEFAULT_FIRE_CLASS, FLEXURAL_CLASSES,
};
use crate::domain::types::RecipeStatus;
use crate::engine::numbering::normalize_recipe_code;
use crate::engine::transition::TransitionError;
use crate::repository::action_log_repo::ActionLogRepository;
use crate::repository::recipe_repo::RecipeRepository;

// ==========================================
// RecipeApi
// ==========================================

/// Recipe registry
///
/// Responsibilities:
/// 1. create / edit drafts (class strings checked against EN 13813 tables)
/// 2. lock, archive, revise
/// 3. ActionLog for every write
pub struct RecipeApi {
    recipe_repo: Arc<RecipeRepository>,
    action_log_repo: Arc<ActionLogRepository>,
}

impl RecipeApi {
    pub fn new(recipe_repo: Arc<RecipeRepository>, action_log_repo: Arc<ActionLogRepository>) -> Self {
        Self {
            recipe_repo,
            action_log_repo,
        }
    }

    // ==========================================
    // writes
    // ==========================================

    /// Register a new recipe as draft version 1
    pub fn create_recipe(&self, input: NewRecipe, actor: &str) -> ApiResult<Recipe> {
        let actor = required(actor, "actor")?;
        let recipe_code = normalize_recipe_code(&input.recipe_code).ok_or_else(|| {
            ApiError::InvalidInput(format!(
                "recipe code '{}' must be 1-32 characters of A-Z, 0-9, '-' or '_'",
                input.recipe_code
            ))
        })?;

        if self.recipe_repo.find_by_code(&recipe_code)?.is_some() {
            return Err(ApiError::BusinessRuleViolation(format!(
                "recipe code {} already exists",
                recipe_code
            )));
        }

        let now = Local::now().naive_local();
        let recipe = Recipe {
            id: uuid::Uuid::new_v4().to_string(),
            recipe_code,
            name: required(&input.name, "name")?,
            binder_type: input.binder_type,
            compressive_strength_class: input.compressive_strength_class.trim().to_uppercase(),
            flexural_strength_class: input.flexural_strength_class.trim().to_uppercase(),
            wear_resistance_class: optional(input.wear_resistance_class.as_deref())
                .map(|w| w.to_uppercase()),
            fire_class: optional(input.fire_class.as_deref())
                .unwrap_or_else(|| DEFAULT_FIRE_CLASS.to_string()),
            avcp_system: input.avcp_system,
            manufacturer_name: required(&input.manufacturer_name, "manufacturer_name")?,
            manufacturer_address: required(&input.manufacturer_address, "manufacturer_address")?,
            notified_body: optional(input.notified_body.as_deref()),
            version: 1,
            status: RecipeStatus::Draft,
            previous_version_id: None,
            created_by: actor.clone(),
            created_at: now,
            updated_at: now,
            locked_at: None,
        };
        validate_classes(&recipe)?;

        self.recipe_repo.insert(&recipe)?;
        self.action_log_repo.insert(
            &ActionLog::new(ActionType::CreateRecipe, "recipe", &recipe.id, &actor)
                .with_payload(&recipe)
                .with_detail(format!("created recipe {}", recipe.recipe_code)),
        )?;

        info!(recipe_code = %recipe.recipe_code, designation = %recipe.designation(), "recipe created");
        Ok(recipe)
    }

    /// Edit a draft; bumps `version`
    pub fn update_recipe(&self, id: &str, update: RecipeUpdate, actor: &str) -> ApiResult<Recipe> {
        let actor = required(actor, "actor")?;
        if update.is_empty() {
            return Err(ApiError::InvalidInput("update contains no changes".to_string()));
        }

        let mut recipe = self.load(id)?;
        if !recipe.is_editable() {
            warn!(recipe_code = %recipe.recipe_code, status = %recipe.status, "edit of non-draft recipe rejected");
            return Err(ApiError::RecipeLocked(format!(
                "{} is {} and cannot be edited",
                recipe.recipe_code, recipe.status
            )));
        }

        update.apply_to(&mut recipe);
        recipe.name = required(&recipe.name, "name")?;
        recipe.compressive_strength_class = recipe.compressive_strength_class.trim().to_uppercase();
        recipe.flexural_strength_class = recipe.flexural_strength_class.trim().to_uppercase();
        recipe.wear_resistance_class =
            optional(recipe.wear_resistance_class.as_deref()).map(|w| w.to_uppercase());
        recipe.fire_class = required(&recipe.fire_class, "fire_class")?;
        recipe.manufacturer_name = required(&recipe.manufacturer_name, "manufacturer_name")?;
        recipe.manufacturer_address = required(&recipe.manufacturer_address, "manufacturer_address")?;
        recipe.notified_body = optional(recipe.notified_body.as_deref());
        validate_classes(&recipe)?;

        recipe.version += 1;
        recipe.updated_at = Local::now().naive_local();

        if !self.recipe_repo.update_draft(&recipe)? {
            return Err(ApiError::ConcurrentModification(format!(
                "recipe {} is no longer a draft",
                recipe.recipe_code
            )));
        }
        self.action_log_repo.insert(
            &ActionLog::new(ActionType::UpdateRecipe, "recipe", &recipe.id, &actor)
                .with_payload(&update)
                .with_detail(format!("{} -> version {}", recipe.recipe_code, recipe.version)),
        )?;

        info!(recipe_code = %recipe.recipe_code, version = recipe.version, "recipe updated");
        Ok(recipe)
    }

    /// Freeze a draft; required before DoPs can be issued
    ///
    /// AVCP 1 / 1+ / 2+ recipes must name a notified body.
    pub fn lock_recipe(&self, id: &str, actor: &str) -> ApiResult<Recipe> {
        let actor = required(actor, "actor")?;
        let mut recipe = self.load(id)?;

        if recipe.status != RecipeStatus::Draft {
            return Err(TransitionError::new("Recipe", "locked", recipe.status).into());
        }
        if recipe.avcp_system.requires_notified_body() && recipe.notified_body.is_none() {
            return Err(ApiError::BusinessRuleViolation(format!(
                "AVCP system {} requires a notified body",
                recipe.avcp_system
            )));
        }

        let now = Local::now().naive_local();
        if !self
            .recipe_repo
            .update_status(&recipe.id, RecipeStatus::Draft, RecipeStatus::Locked, now)?
        {
            return Err(ApiError::ConcurrentModification(format!(
                "recipe {} changed while locking",
                recipe.recipe_code
            )));
        }
        recipe.status = RecipeStatus::Locked;
        recipe.locked_at = Some(now);
        recipe.updated_at = now;

        self.action_log_repo.insert(
            &ActionLog::new(ActionType::LockRecipe, "recipe", &recipe.id, &actor)
                .with_detail(format!("locked {} version {}", recipe.recipe_code, recipe.version)),
        )?;

        info!(recipe_code = %recipe.recipe_code, version = recipe.version, "recipe locked");
        Ok(recipe)
    }

    /// Retire a recipe; archived recipes are kept but accept no new batches
    pub fn archive_recipe(&self, id: &str, actor: &str) -> ApiResult<Recipe> {
        let actor = required(actor, "actor")?;
        let mut recipe = self.load(id)?;

        if recipe.status == RecipeStatus::Archived {
            return Err(TransitionError::new("Recipe", "archived", recipe.status).into());
        }

        let now = Local::now().naive_local();
        if !self
            .recipe_repo
            .update_status(&recipe.id, recipe.status, RecipeStatus::Archived, now)?
        {
            return Err(ApiError::ConcurrentModification(format!(
                "recipe {} changed while archiving",
                recipe.recipe_code
            )));
        }
        let from = recipe.status;
        recipe.status = RecipeStatus::Archived;
        recipe.updated_at = now;

        self.action_log_repo.insert(
            &ActionLog::new(ActionType::ArchiveRecipe, "recipe", &recipe.id, &actor)
                .with_payload(&json!({ "from": from.as_str() }))
                .with_detail(format!("archived {}", recipe.recipe_code)),
        )?;

        info!(recipe_code = %recipe.recipe_code, "recipe archived");
        Ok(recipe)
    }

    /// Clone a locked recipe into a new draft revision
    ///
    /// The revision gets `version + 1`, a link to its predecessor and
    /// the code `{base}-V{version}`.
    pub fn revise_recipe(&self, id: &str, actor: &str) -> ApiResult<Recipe> {
        let actor = required(actor, "actor")?;
        let previous = self.load(id)?;

        if previous.status != RecipeStatus::Locked {
            return Err(TransitionError::new("Recipe", "revised", previous.status).into());
        }

        let version = previous.version + 1;
        let recipe_code = revision_code(&previous.recipe_code, version);
        if self.recipe_repo.find_by_code(&recipe_code)?.is_some() {
            return Err(ApiError::BusinessRuleViolation(format!(
                "revision {} already exists",
                recipe_code
            )));
        }

        let now = Local::now().naive_local();
        let recipe = Recipe {
            id: uuid::Uuid::new_v4().to_string(),
            recipe_code,
            version,
            status: RecipeStatus::Draft,
            previous_version_id: Some(previous.id.clone()),
            created_by: actor.clone(),
            created_at: now,
            updated_at: now,
            locked_at: None,
            ..previous.clone()
        };

        self.recipe_repo.insert(&recipe)?;
        self.action_log_repo.insert(
            &ActionLog::new(ActionType::ReviseRecipe, "recipe", &recipe.id, &actor)
                .with_payload(&json!({ "previous_id": previous.id, "version": version }))
                .with_detail(format!("{} revised as {}", previous.recipe_code, recipe.recipe_code)),
        )?;

        info!(from = %previous.recipe_code, to = %recipe.recipe_code, "recipe revised");
        Ok(recipe)
    }

    // ==========================================
    // reads
    // ==========================================

    pub fn get_recipe(&self, id: &str) -> ApiResult<Recipe> {
        self.load(id)
    }

    pub fn get_recipe_by_code(&self, recipe_code: &str) -> ApiResult<Recipe> {
        let code = recipe_code.trim().to_uppercase();
        self.recipe_repo
            .find_by_code(&code)?
            .ok_or_else(|| ApiError::NotFound(format!("recipe {}", code)))
    }

    pub fn list_recipes(&self, status: Option<RecipeStatus>) -> ApiResult<Vec<Recipe>> {
        let recipes = self.recipe_repo.list(status)?;
        debug!(count = recipes.len(), "recipes listed");
        Ok(recipes)
    }

    fn load(&self, id: &str) -> ApiResult<Recipe> {
        self.recipe_repo
            .find_by_id(id)?
            .ok_or_else(|| ApiError::NotFound(format!("recipe (id={})", id)))
    }
}

/// Class strings must name an entry of the EN 13813 tables
fn validate_classes(recipe: &Recipe) -> ApiResult<()> {
    match compressive_minimum(&recipe.compressive_strength_class) {
        Some(v) if COMPRESSIVE_CLASSES.contains(&v) => {}
        _ => {
            return Err(ApiError::InvalidInput(format!(
                "unknown compressive strength class '{}'",
                recipe.compressive_strength_class
            )))
        }
    }
    match flexural_minimum(&recipe.flexural_strength_class) {
        Some(v) if FLEXURAL_CLASSES.contains(&v) => {}
        _ => {
            return Err(ApiError::InvalidInput(format!(
                "unknown flexural strength class '{}'",
                recipe.flexural_strength_class
            )))
        }
    }
    if !is_known_fire_class(&recipe.fire_class) {
        return Err(ApiError::InvalidInput(format!(
            "unknown reaction to fire class '{}'",
            recipe.fire_class
        )));
    }
    Ok(())
}

/// `CT25` -> `CT25-V2`, `CT25-V2` -> `CT25-V3`
fn revision_code(code: &str, version: i32) -> String {
    let base = match code.rsplit_once("-V") {
        Some((base, n)) if !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()) => base,
        _ => code,
    };
    format!("{}-V{}", base, version)
}
