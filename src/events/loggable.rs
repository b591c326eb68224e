use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Severity levels for activity entries. Drives retention and filtering in
/// the admin activity view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Permission and role changes: long-term retention, never auto-delete
    Critical,
    /// Registrations, logins and the like (default)
    #[default]
    Important,
    /// Aggressively trimmed
    Noise,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Important => "important",
            Severity::Noise => "noise",
        }
    }
}

/// Entities that appear in the activity log implement this. The entity type
/// becomes the prefix of event names like "grant.created".
pub trait Loggable: Serialize + Send + Sync {
    fn entity_type() -> &'static str;

    /// The subject ID (usually the entity's primary key)
    fn subject_id(&self) -> Uuid;

    fn severity(&self) -> Severity {
        Severity::Important
    }

    fn severity_for_action(&self, action: &str) -> Severity {
        match action {
            "deleted" | "revoked" => Severity::Critical,
            _ => self.severity(),
        }
    }
}
