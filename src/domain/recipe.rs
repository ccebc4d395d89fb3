// ==========================================
// EstrichManager - Recipe (declared product specification)
// ==========================================
// Draft recipes are editable (each edit bumps `version`),
// locked recipes are immutable, archived recipes are hidden.
// Recipes are never physically deleted.
// ==========================================

use crate::domain::types::{AvcpSystem, BinderType, RecipeStatus};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// EN 13813 compressive strength classes (N/mm²)
pub const COMPRESSIVE_CLASSES: [u32; 13] = [5, 7, 12, 16, 20, 25, 30, 35, 40, 50, 60, 70, 80];

/// EN 13813 flexural strength classes (N/mm²)
pub const FLEXURAL_CLASSES: [u32; 13] = [1, 2, 3, 4, 5, 6, 7, 10, 15, 20, 30, 40, 50];

/// Euroclasses for floorings (EN 13501-1)
pub const FIRE_CLASSES: [&str; 7] = ["A1fl", "A2fl", "Bfl", "Cfl", "Dfl", "Efl", "Ffl"];

/// Default reaction-to-fire class for mineral screeds
pub const DEFAULT_FIRE_CLASS: &str = "A1fl";

// ==========================================
// Strength class parsing
// ==========================================

/// Parse the numeric suffix of a class string: `"C25"` -> 25, `"F4"` -> 4
///
/// The prefix letter is matched case-insensitively, surrounding
/// whitespace is ignored. Anything else returns None.
pub fn parse_class_value(class: &str, prefix: char) -> Option<u32> {
    let class = class.trim();
    let mut chars = class.chars();
    let first = chars.next()?;
    if !first.eq_ignore_ascii_case(&prefix) {
        return None;
    }
    let digits = chars.as_str();
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Minimum compressive strength declared by a `C<n>` class
pub fn compressive_minimum(class: &str) -> Option<u32> {
    parse_class_value(class, 'C')
}

/// Minimum flexural strength declared by an `F<n>` class
pub fn flexural_minimum(class: &str) -> Option<u32> {
    parse_class_value(class, 'F')
}

/// Whether the fire class is a flooring Euroclass (smoke suffix like `-s1` allowed)
pub fn is_known_fire_class(class: &str) -> bool {
    let base = class.trim().split('-').next().unwrap_or("");
    FIRE_CLASSES.iter().any(|c| c.eq_ignore_ascii_case(base))
}

// ==========================================
// Recipe
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub recipe_code: String,
    pub name: String,

    // ===== declared performance =====
    pub binder_type: BinderType,
    pub compressive_strength_class: String, // "C25"
    pub flexural_strength_class: String,    // "F4"
    pub wear_resistance_class: Option<String>, // "A15", "AR1", "RWA20"
    pub fire_class: String,
    pub avcp_system: AvcpSystem,

    // ===== manufacturer =====
    pub manufacturer_name: String,
    pub manufacturer_address: String,
    pub notified_body: Option<String>,

    // ===== lifecycle =====
    pub version: i32,
    pub status: RecipeStatus,
    pub previous_version_id: Option<String>,
    pub created_by: String,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    pub locked_at: Option<NaiveDateTime>,
}

impl Recipe {
    pub fn is_locked(&self) -> bool {
        self.status == RecipeStatus::Locked
    }

    pub fn is_editable(&self) -> bool {
        self.status == RecipeStatus::Draft
    }

    /// EN 13813 designation, e.g. `CT-C25-F4` or `CT-C30-F5-AR1`
    pub fn designation(&self) -> String {
        let mut parts = vec![
            self.binder_type.as_str().to_string(),
            self.compressive_strength_class.trim().to_uppercase(),
            self.flexural_strength_class.trim().to_uppercase(),
        ];
        if let Some(wear) = self
            .wear_resistance_class
            .as_deref()
            .map(str::trim)
            .filter(|w| !w.is_empty())
        {
            parts.push(wear.to_uppercase());
        }
        parts.join("-")
    }
}

/// Input for creating a recipe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRecipe {
    pub recipe_code: String,
    pub name: String,
    pub binder_type: BinderType,
    pub compressive_strength_class: String,
    pub flexural_strength_class: String,
    pub wear_resistance_class: Option<String>,
    pub fire_class: Option<String>,
    pub avcp_system: AvcpSystem,
    pub manufacturer_name: String,
    pub manufacturer_address: String,
    pub notified_body: Option<String>,
}

/// Partial update of a draft recipe; None leaves the field untouched
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RecipeUpdate {
    pub name: Option<String>,
    pub binder_type: Option<BinderType>,
    pub compressive_strength_class: Option<String>,
    pub flexural_strength_class: Option<String>,
    pub wear_resistance_class: Option<Option<String>>,
    pub fire_class: Option<String>,
    pub avcp_system: Option<AvcpSystem>,
    pub manufacturer_name: Option<String>,
    pub manufacturer_address: Option<String>,
    pub notified_body: Option<Option<String>>,
}

impl RecipeUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.binder_type.is_none()
            && self.compressive_strength_class.is_none()
            && self.flexural_strength_class.is_none()
            && self.wear_resistance_class.is_none()
            && self.fire_class.is_none()
            && self.avcp_system.is_none()
            && self.manufacturer_name.is_none()
            && self.manufacturer_address.is_none()
            && self.notified_body.is_none()
    }

    /// Apply onto a recipe (no validation, no version bump)
    pub fn apply_to(&self, recipe: &mut Recipe) {
        if let Some(v) = &self.name {
            recipe.name = v.clone();
        }
        if let Some(v) = self.binder_type {
            recipe.binder_type = v;
        }
        if let Some(v) = &self.compressive_strength_class {
            recipe.compressive_strength_class = v.clone();
        }
        if let Some(v) = &self.flexural_strength_class {
            recipe.flexural_strength_class = v.clone();
        }
        if let Some(v) = &self.wear_resistance_class {
            recipe.wear_resistance_class = v.clone();
        }
        if let Some(v) = &self.fire_class {
            recipe.fire_class = v.clone();
        }
        if let Some(v) = self.avcp_system {
            recipe.avcp_system = v;
        }
        if let Some(v) = &self.manufacturer_name {
            recipe.manufacturer_name = v.clone();
        }
        if let Some(v) = &self.manufacturer_address {
            recipe.manufacturer_address = v.clone();
        }
        if let Some(v) = &self.notified_body {
            recipe.notified_body = v.clone();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_class_value() {
        assert_eq!(compressive_minimum("C25"), Some(25));
        assert_eq!(compressive_minimum(" c30 "), Some(30));
        assert_eq!(flexural_minimum("F4"), Some(4));
        assert_eq!(flexural_minimum("F"), None);
        assert_eq!(flexural_minimum("C4"), None);
        assert_eq!(compressive_minimum("C2.5"), None);
        assert_eq!(compressive_minimum(""), None);
    }

    #[test]
    fn test_every_table_class_parses_to_itself() {
        for v in COMPRESSIVE_CLASSES {
            assert_eq!(compressive_minimum(&format!("C{}", v)), Some(v));
        }
        for v in FLEXURAL_CLASSES {
            assert_eq!(flexural_minimum(&format!("F{}", v)), Some(v));
        }
    }

    #[test]
    fn test_fire_class() {
        assert!(is_known_fire_class("A1fl"));
        assert!(is_known_fire_class("A2fl-s1"));
        assert!(is_known_fire_class("bfl"));
        assert!(!is_known_fire_class("B-s1,d0"));
    }
}
