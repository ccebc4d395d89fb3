// ==========================================
// EstrichManager - Batch QC gate
// ==========================================
// Compares measured QC values with the recipe's declared
// strength classes. Pure: no I/O, never errors, only reports.
// ==========================================

use crate::domain::batch::QcData;
use crate::domain::recipe::{compressive_minimum, flexural_minimum, Recipe};
use crate::domain::types::BatchStatus;
use crate::i18n;
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// Gate output
// ==========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QcCharacteristic {
    CompressiveStrength,
    FlexuralStrength,
}

impl QcCharacteristic {
    fn i18n_key(&self) -> &'static str {
        match self {
            QcCharacteristic::CompressiveStrength => "characteristic.compressive_strength",
            QcCharacteristic::FlexuralStrength => "characteristic.flexural_strength",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QcIssueKind {
    /// measured value strictly below the class minimum
    BelowMinimum { measured: f64, minimum: u32 },
    /// no measurement although the batch is to be released
    TestRequired,
    /// declared class string cannot be parsed
    InvalidClass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QcIssue {
    pub characteristic: QcCharacteristic,
    pub declared_class: String,
    pub kind: QcIssueKind,
    pub message: String, // localized, human readable
}

impl fmt::Display for QcIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QcValidation {
    pub is_valid: bool,
    pub issues: Vec<QcIssue>, // compressive first, then flexural
}

impl QcValidation {
    pub fn messages(&self) -> Vec<String> {
        self.issues.iter().map(|i| i.message.clone()).collect()
    }
}

// ==========================================
// BatchQcGate
// ==========================================
pub struct BatchQcGate;

impl BatchQcGate {
    /// Validate measured values against declared classes
    ///
    /// # Rules
    /// For compressive, then flexural strength:
    /// 1. class not parsable -> InvalidClass
    /// 2. value present and < class minimum -> BelowMinimum
    /// 3. value absent and target == Released -> TestRequired
    pub fn validate(
        qc: &QcData,
        compressive_class: &str,
        flexural_class: &str,
        target: BatchStatus,
    ) -> QcValidation {
        let mut issues = Vec::new();

        check_characteristic(
            &mut issues,
            QcCharacteristic::CompressiveStrength,
            compressive_class,
            compressive_minimum(compressive_class),
            qc.compressive_strength_28d,
            target,
        );
        check_characteristic(
            &mut issues,
            QcCharacteristic::FlexuralStrength,
            flexural_class,
            flexural_minimum(flexural_class),
            qc.flexural_strength_28d,
            target,
        );

        QcValidation {
            is_valid: issues.is_empty(),
            issues,
        }
    }

    /// Validate against a recipe's declared classes
    pub fn validate_for_recipe(qc: &QcData, recipe: &Recipe, target: BatchStatus) -> QcValidation {
        Self::validate(
            qc,
            &recipe.compressive_strength_class,
            &recipe.flexural_strength_class,
            target,
        )
    }
}

fn check_characteristic(
    issues: &mut Vec<QcIssue>,
    characteristic: QcCharacteristic,
    declared_class: &str,
    minimum: Option<u32>,
    measured: Option<f64>,
    target: BatchStatus,
) {
    let label = i18n::t(characteristic.i18n_key());
    let class = declared_class.trim().to_string();

    let Some(minimum) = minimum else {
        issues.push(QcIssue {
            characteristic,
            message: i18n::t_with_args(
                "qc.invalid_class",
                &[("characteristic", label.as_str()), ("class", class.as_str())],
            ),
            declared_class: class,
            kind: QcIssueKind::InvalidClass,
        });
        return;
    };

    match measured {
        Some(value) if value < minimum as f64 => {
            let measured_text = value.to_string();
            let minimum_text = minimum.to_string();
            issues.push(QcIssue {
                characteristic,
                message: i18n::t_with_args(
                    "qc.below_minimum",
                    &[
                        ("characteristic", label.as_str()),
                        ("measured", measured_text.as_str()),
                        ("class", class.as_str()),
                        ("minimum", minimum_text.as_str()),
                    ],
                ),
                declared_class: class,
                kind: QcIssueKind::BelowMinimum {
                    measured: value,
                    minimum,
                },
            });
        }
        Some(_) => {}
        None if target == BatchStatus::Released => {
            issues.push(QcIssue {
                characteristic,
                message: i18n::t_with_args(
                    "qc.test_required",
                    &[("characteristic", label.as_str()), ("class", class.as_str())],
                ),
                declared_class: class,
                kind: QcIssueKind::TestRequired,
            });
        }
        None => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn qc(compressive: Option<f64>, flexural: Option<f64>) -> QcData {
        QcData {
            compressive_strength_28d: compressive,
            flexural_strength_28d: flexural,
            ..Default::default()
        }
    }

    #[test]
    fn test_passes_when_values_meet_minimum() {
        let result = BatchQcGate::validate(&qc(Some(25.0), Some(4.0)), "C25", "F4", BatchStatus::Released);
        assert!(result.is_valid);
        assert!(result.issues.is_empty());

        let result = BatchQcGate::validate(&qc(Some(31.2), Some(6.8)), "C25", "F4", BatchStatus::Released);
        assert!(result.is_valid);
    }

    #[test]
    fn test_below_minimum_reports_measured_and_class() {
        let result = BatchQcGate::validate(&qc(Some(23.0), Some(5.0)), "C25", "F4", BatchStatus::Released);
        assert!(!result.is_valid);
        assert_eq!(result.issues.len(), 1);

        let issue = &result.issues[0];
        assert_eq!(issue.characteristic, QcCharacteristic::CompressiveStrength);
        assert_eq!(
            issue.kind,
            QcIssueKind::BelowMinimum {
                measured: 23.0,
                minimum: 25
            }
        );
        assert!(issue.message.contains("23"));
        assert!(issue.message.contains("25"));
    }

    #[test]
    fn test_missing_values_only_block_release() {
        let result = BatchQcGate::validate(&qc(None, None), "C25", "F4", BatchStatus::Released);
        assert!(!result.is_valid);
        let kinds: Vec<_> = result.issues.iter().map(|i| (i.characteristic, i.kind.clone())).collect();
        assert_eq!(
            kinds,
            vec![
                (QcCharacteristic::CompressiveStrength, QcIssueKind::TestRequired),
                (QcCharacteristic::FlexuralStrength, QcIssueKind::TestRequired),
            ]
        );

        // a partial dataset is fine while the batch stays produced
        let result = BatchQcGate::validate(&qc(Some(26.0), None), "C25", "F4", BatchStatus::Produced);
        assert!(result.is_valid);
    }

    #[test]
    fn test_issue_order_is_compressive_then_flexural() {
        let result = BatchQcGate::validate(&qc(Some(10.0), Some(1.0)), "C25", "F4", BatchStatus::Released);
        assert_eq!(result.issues.len(), 2);
        assert_eq!(result.issues[0].characteristic, QcCharacteristic::CompressiveStrength);
        assert_eq!(result.issues[1].characteristic, QcCharacteristic::FlexuralStrength);
        assert_eq!(result.messages().len(), 2);
    }

    #[test]
    fn test_unparsable_class_is_an_issue() {
        let result = BatchQcGate::validate(&qc(Some(30.0), Some(5.0)), "CT25", "F4", BatchStatus::Produced);
        assert!(!result.is_valid);
        assert_eq!(result.issues[0].kind, QcIssueKind::InvalidClass);
        assert_eq!(result.issues[0].declared_class, "CT25");
    }

    #[test]
    fn test_fractional_measurement_just_below_minimum() {
        let result = BatchQcGate::validate(&qc(Some(24.99), Some(4.0)), "C25", "F4", BatchStatus::Released);
        assert!(!result.is_valid);
        assert!(result.issues[0].message.contains("24.99"));
    }
}
