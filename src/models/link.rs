use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A shareable handle to a [`Model`](super::Model).
///
/// Links never change after creation. A private link grants access to the
/// full source text; a public link only ever exposes the redacted text.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Link {
    pub id: Uuid,
    pub model_id: Uuid,
    pub private: bool,
    pub created_at: DateTime<Utc>,
}

/// Input for sharing a model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareInput {
    pub code: String,
    /// The model the user was editing. `None` shares a fresh seed.
    #[serde(default)]
    pub current_model_id: Option<Uuid>,
}

/// Result of a share.
///
/// `private` is present if and only if the shared code contains a secret
/// region. Its absence means no private sharing is needed, not a failure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ShareResult {
    pub public: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private: Option<Uuid>,
    pub last_id: Uuid,
}

/// A model reached through a link.
///
/// When reached through a public link, `code` has every secret region
/// stripped out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedLink {
    pub link_id: Uuid,
    pub model_id: Uuid,
    pub private: bool,
    pub code: String,
    pub original: Option<Uuid>,
}
