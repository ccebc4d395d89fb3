// ==========================================
// EstrichManager - Domain enums
// ==========================================
// All enums are stored as TEXT; `as_str` is the database form
// and `from_db_str` accepts it case-insensitively.
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! db_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Database / wire representation
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }

            /// Parse the database representation
            pub fn from_db_str(s: &str) -> Option<Self> {
                let s = s.trim();
                $(
                    if s.eq_ignore_ascii_case($text) {
                        return Some($name::$variant);
                    }
                )+
                None
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

// ==========================================
// Binder type (EN 13813 clause 3)
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BinderType {
    Ct, // cementitious screed
    Ca, // calcium sulfate screed
    Ma, // magnesite screed
    As, // mastic asphalt screed
    Sr, // synthetic resin screed
}

db_enum!(BinderType {
    Ct => "CT",
    Ca => "CA",
    Ma => "MA",
    As => "AS",
    Sr => "SR",
});

// ==========================================
// AVCP system
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AvcpSystem {
    #[serde(rename = "1")]
    System1,
    #[serde(rename = "1+")]
    System1Plus,
    #[serde(rename = "2+")]
    System2Plus,
    #[serde(rename = "3")]
    System3,
    #[serde(rename = "4")]
    System4,
}

db_enum!(AvcpSystem {
    System1Plus => "1+",
    System1 => "1",
    System2Plus => "2+",
    System3 => "3",
    System4 => "4",
});

impl AvcpSystem {
    /// Systems where a notified body certifies the factory production control
    pub fn requires_notified_body(&self) -> bool {
        matches!(
            self,
            AvcpSystem::System1 | AvcpSystem::System1Plus | AvcpSystem::System2Plus
        )
    }
}

// ==========================================
// Recipe lifecycle
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecipeStatus {
    Draft,    // editable
    Locked,   // immutable, may be declared
    Archived, // soft-deleted
}

db_enum!(RecipeStatus {
    Draft => "draft",
    Locked => "locked",
    Archived => "archived",
});

// ==========================================
// Batch lifecycle
// ==========================================
// produced -> released -> consumed
// produced | released | blocked -> blocked
// blocked -> produced (unblock)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Produced,
    Released,
    Blocked,
    Consumed,
}

db_enum!(BatchStatus {
    Produced => "produced",
    Released => "released",
    Blocked => "blocked",
    Consumed => "consumed",
});

// ==========================================
// Test reports
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestReportType {
    InitialTypeTest, // ITT
    FactoryControl,  // FPC
    Audit,
}

db_enum!(TestReportType {
    InitialTypeTest => "initial_type_test",
    FactoryControl => "factory_control",
    Audit => "audit",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestReportStatus {
    Valid,
    Expired,
    Revoked,
}

db_enum!(TestReportStatus {
    Valid => "valid",
    Expired => "expired",
    Revoked => "revoked",
});

// ==========================================
// Deviations / CAPA
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviationType {
    Product,
    Process,
    RawMaterial,
    Documentation,
    Equipment,
}

db_enum!(DeviationType {
    Product => "product",
    Process => "process",
    RawMaterial => "raw_material",
    Documentation => "documentation",
    Equipment => "equipment",
});

/// Ordered: Minor < Major < Critical
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviationSeverity {
    Minor,
    Major,
    Critical,
}

db_enum!(DeviationSeverity {
    Minor => "minor",
    Major => "major",
    Critical => "critical",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviationSource {
    InternalQc,
    CustomerComplaint,
    Audit,
    Supplier,
    Other,
}

db_enum!(DeviationSource {
    InternalQc => "internal_qc",
    CustomerComplaint => "customer_complaint",
    Audit => "audit",
    Supplier => "supplier",
    Other => "other",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviationStatus {
    Open,
    Investigation,
    CorrectiveActionPlanned,
    CorrectiveActionInProgress,
    EffectivenessCheckPending,
    Closed,
}

db_enum!(DeviationStatus {
    Open => "open",
    Investigation => "investigation",
    CorrectiveActionPlanned => "corrective_action_planned",
    CorrectiveActionInProgress => "corrective_action_in_progress",
    EffectivenessCheckPending => "effectiveness_check_pending",
    Closed => "closed",
});

impl DeviationStatus {
    pub fn is_closed(&self) -> bool {
        matches!(self, DeviationStatus::Closed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RootCauseMethod {
    FiveWhy,
    Ishikawa,
    FaultTree,
    Other,
}

db_enum!(RootCauseMethod {
    FiveWhy => "five_why",
    Ishikawa => "ishikawa",
    FaultTree => "fault_tree",
    Other => "other",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Immediate,
    Corrective,
    Preventive,
}

db_enum!(ActionKind {
    Immediate => "immediate",
    Corrective => "corrective",
    Preventive => "preventive",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Planned,
    InProgress,
    Completed,
    Cancelled,
}

db_enum!(ActionStatus {
    Planned => "planned",
    InProgress => "in_progress",
    Completed => "completed",
    Cancelled => "cancelled",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckResult {
    Pending,
    Passed,
    Failed,
}

db_enum!(CheckResult {
    Pending => "pending",
    Passed => "passed",
    Failed => "failed",
});

// ==========================================
// Declarations of performance
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DopStatus {
    Issued,
    Revoked,
}

db_enum!(DopStatus {
    Issued => "issued",
    Revoked => "revoked",
});
