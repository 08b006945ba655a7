use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A versioned document of formal-modeling source.
///
/// Models are **immutable** once created. Every share action creates a new
/// model whose `derivation_of` points at the model the user was editing.
///
/// `original` is the visibility root: the model itself when its code
/// contains secrets, otherwise the parent's root. Walking `original` never
/// crosses into a model whose secrets a public link could expose.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Model {
    pub id: Uuid,
    pub code: String,
    pub derivation_of: Option<Uuid>,
    pub original: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Model {
    /// Whether this model is the root of its own visibility tree.
    pub fn is_visibility_root(&self) -> bool {
        self.original == Some(self.id)
    }
}

/// Input for creating a seed model (one with no parent).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateModelInput {
    pub code: String,
}

/// Lightweight view used in lineage listings. Omits the source text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelSummary {
    pub id: Uuid,
    pub derivation_of: Option<Uuid>,
    pub original: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<Model> for ModelSummary {
    fn from(m: Model) -> Self {
        Self {
            id: m.id,
            derivation_of: m.derivation_of,
            original: m.original,
            created_at: m.created_at,
        }
    }
}
