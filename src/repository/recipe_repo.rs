// ==========================================
// EstrichManager - Recipe repository
// ==========================================
// Rule: data mapping only. Lock / archive rules live in api::recipe_api,
// the status guard in UPDATE only protects against concurrent writers.
// ==========================================

use crate::domain::recipe::Recipe;
use crate::domain::types::{AvcpSystem, BinderType, RecipeStatus};
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::row_mapping::enum_column;
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex};

const RECIPE_COLUMNS: &str = r#"
    id, recipe_code, name, binder_type,
    compressive_strength_class, flexural_strength_class, wear_resistance_class,
    fire_class, avcp_system, manufacturer_name, manufacturer_address, notified_body,
    version, status, previous_version_id, created_by, created_at, updated_at, locked_at
"#;

pub struct RecipeRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RecipeRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // writes
    // ==========================================

    pub fn insert(&self, recipe: &Recipe) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            &format!(
                "INSERT INTO recipe ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
                RECIPE_COLUMNS
            ),
            params![
                recipe.id,
                recipe.recipe_code,
                recipe.name,
                recipe.binder_type.as_str(),
                recipe.compressive_strength_class,
                recipe.flexural_strength_class,
                recipe.wear_resistance_class,
                recipe.fire_class,
                recipe.avcp_system.as_str(),
                recipe.manufacturer_name,
                recipe.manufacturer_address,
                recipe.notified_body,
                recipe.version,
                recipe.status.as_str(),
                recipe.previous_version_id,
                recipe.created_by,
                recipe.created_at,
                recipe.updated_at,
                recipe.locked_at,
            ],
        )?;
        Ok(())
    }

    /// Overwrite the editable fields of a draft
    ///
    /// # Returns
    /// - Ok(true): row updated
    /// - Ok(false): recipe no longer a draft (or missing)
    pub fn update_draft(&self, recipe: &Recipe) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            r#"
            UPDATE recipe SET
                name = ?2, binder_type = ?3,
                compressive_strength_class = ?4, flexural_strength_class = ?5,
                wear_resistance_class = ?6, fire_class = ?7, avcp_system = ?8,
                manufacturer_name = ?9, manufacturer_address = ?10, notified_body = ?11,
                version = ?12, updated_at = ?13
            WHERE id = ?1 AND status = 'draft'
            "#,
            params![
                recipe.id,
                recipe.name,
                recipe.binder_type.as_str(),
                recipe.compressive_strength_class,
                recipe.flexural_strength_class,
                recipe.wear_resistance_class,
                recipe.fire_class,
                recipe.avcp_system.as_str(),
                recipe.manufacturer_name,
                recipe.manufacturer_address,
                recipe.notified_body,
                recipe.version,
                recipe.updated_at,
            ],
        )?;
        Ok(rows == 1)
    }

    /// Move `from -> to`; false if the row was not in `from`
    pub fn update_status(
        &self,
        id: &str,
        from: RecipeStatus,
        to: RecipeStatus,
        at: NaiveDateTime,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let locked_at = (to == RecipeStatus::Locked).then_some(at);
        let rows = conn.execute(
            r#"
            UPDATE recipe
            SET status = ?3, updated_at = ?4, locked_at = COALESCE(?5, locked_at)
            WHERE id = ?1 AND status = ?2
            "#,
            params![id, from.as_str(), to.as_str(), at, locked_at],
        )?;
        Ok(rows == 1)
    }

    // ==========================================
    // reads
    // ==========================================

    pub fn find_by_id(&self, id: &str) -> RepositoryResult<Option<Recipe>> {
        let conn = self.get_conn()?;
        let recipe = conn
            .query_row(
                &format!("SELECT {} FROM recipe WHERE id = ?1", RECIPE_COLUMNS),
                params![id],
                map_recipe_row,
            )
            .optional()?;
        Ok(recipe)
    }

    pub fn find_by_code(&self, recipe_code: &str) -> RepositoryResult<Option<Recipe>> {
        let conn = self.get_conn()?;
        let recipe = conn
            .query_row(
                &format!("SELECT {} FROM recipe WHERE recipe_code = ?1", RECIPE_COLUMNS),
                params![recipe_code],
                map_recipe_row,
            )
            .optional()?;
        Ok(recipe)
    }

    /// All recipes, optionally filtered by status, ordered by code
    pub fn list(&self, status: Option<RecipeStatus>) -> RepositoryResult<Vec<Recipe>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM recipe WHERE (?1 IS NULL OR status = ?1) ORDER BY recipe_code",
            RECIPE_COLUMNS
        ))?;
        let recipes = stmt
            .query_map(params![status.map(|s| s.as_str())], map_recipe_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(recipes)
    }
}

fn map_recipe_row(row: &Row<'_>) -> rusqlite::Result<Recipe> {
    Ok(Recipe {
        id: row.get(0)?,
        recipe_code: row.get(1)?,
        name: row.get(2)?,
        binder_type: enum_column(row, 3, BinderType::from_db_str)?,
        compressive_strength_class: row.get(4)?,
        flexural_strength_class: row.get(5)?,
        wear_resistance_class: row.get(6)?,
        fire_class: row.get(7)?,
        avcp_system: enum_column(row, 8, AvcpSystem::from_db_str)?,
        manufacturer_name: row.get(9)?,
        manufacturer_address: row.get(10)?,
        notified_body: row.get(11)?,
        version: row.get(12)?,
        status: enum_column(row, 13, RecipeStatus::from_db_str)?,
        previous_version_id: row.get(14)?,
        created_by: row.get(15)?,
        created_at: row.get(16)?,
        updated_at: row.get(17)?,
        locked_at: row.get(18)?,
    })
}
