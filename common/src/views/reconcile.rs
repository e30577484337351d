use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Result of a successful `POST .../caRequest`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CaRequestCreated {
    /// Name of the CA intent created in the certificate service.
    pub intent: String,

    /// Members attached to the intent, in the order they were attached.
    pub members: Vec<String>,
}

/// Result of reconciling the attached members against a desired list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct ReconcileResult {
    pub created: Vec<String>,
    pub deleted: Vec<String>,

    /// False when the membership already matched and nothing was touched.
    pub updated: bool,
}

/// Current members of a CA intent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct MemberList {
    pub members: Vec<String>,
}
