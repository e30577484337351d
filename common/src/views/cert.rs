use std::{collections::BTreeMap, fmt};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::Metadata;

/// A CA certificate intent as stored by the certificate service.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct CaCert {
    pub metadata: Metadata,
    pub spec: CaCertSpec,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CaCertSpec {
    pub csr_info: CsrInfo,

    /// Validity of the issued certificate, in Go duration syntax (`8760h`).
    pub duration: String,

    #[serde(rename = "isCA")]
    pub is_ca: bool,

    pub issuer_ref: IssuerRef,
    pub issuing_cluster: IssuingCluster,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CsrInfo {
    pub key_size: u32,
    pub version: u32,
    pub algorithm: CsrAlgorithm,
    pub subject: CsrSubject,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CsrAlgorithm {
    pub public_key_algorithm: String,
    pub signature_algorithm: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct CsrSubject {
    pub names: CsrSubjectNames,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CsrSubjectNames {
    pub common_name_prefix: String,
}

/// Reference to the cert-manager issuer that signs the CA certificate.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
pub struct IssuerRef {
    pub name: String,
    pub kind: String,
    pub group: String,
}

/// The cluster on which the CA certificate is issued.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct IssuingCluster {
    pub cluster: String,
    pub cluster_provider: String,
}

/// Status of one phase (enrollment or distribution) of a CA intent, as
/// reported by the certificate service.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CertStatus {
    #[serde(default)]
    #[schema(value_type = String)]
    pub ready_status: Readiness,

    #[serde(default)]
    pub deployed_status: String,

    #[serde(default)]
    pub ready_counts: BTreeMap<String, i64>,

    #[serde(default)]
    pub states: PhaseStates,
}

impl CertStatus {
    /// The last recorded action state, provided the action log can be trusted.
    ///
    /// The log is trusted only when its final entry carries the revision
    /// matching its position. A gap or reordering anywhere before it shows up
    /// as a mismatch, and the state is then treated as unknown (`None`).
    pub fn last_state(&self) -> Option<&ActionState> {
        let last = self.states.actions.last()?;
        let expected = (self.states.actions.len() - 1) as i64;
        (last.revision == expected).then_some(&last.state)
    }

    pub fn is_instantiated(&self) -> bool {
        matches!(self.last_state(), Some(ActionState::Instantiated))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct PhaseStates {
    #[serde(default)]
    pub actions: Vec<ActionEntry>,

    #[serde(default)]
    pub statusctxid: String,
}

/// One entry of a phase's action log.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct ActionEntry {
    #[serde(default)]
    pub instance: String,

    pub revision: i64,

    #[schema(value_type = String)]
    pub state: ActionState,

    #[serde(default)]
    pub time: Option<DateTime<Utc>>,
}

/// The `readyStatus` of a phase. Anything the service reports besides
/// `Ready` and `NotReady` is preserved verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum Readiness {
    Ready,
    NotReady,
    Other(String),
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Readiness::Ready)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Readiness::Ready => "Ready",
            Readiness::NotReady => "NotReady",
            Readiness::Other(s) => s,
        }
    }
}

impl Default for Readiness {
    fn default() -> Self {
        Readiness::Other(String::new())
    }
}

impl From<String> for Readiness {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Ready" => Readiness::Ready,
            "NotReady" => Readiness::NotReady,
            _ => Readiness::Other(value),
        }
    }
}

impl From<Readiness> for String {
    fn from(value: Readiness) -> Self {
        match value {
            Readiness::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for Readiness {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The `state` recorded for an entry of a phase's action log.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum ActionState {
    Created,
    Approved,
    Instantiated,
    InstantiateStopped,
    Terminated,
    TerminateStopped,
    Updated,
    Other(String),
}

impl ActionState {
    pub fn as_str(&self) -> &str {
        match self {
            ActionState::Created => "Created",
            ActionState::Approved => "Approved",
            ActionState::Instantiated => "Instantiated",
            ActionState::InstantiateStopped => "InstantiateStopped",
            ActionState::Terminated => "Terminated",
            ActionState::TerminateStopped => "TerminateStopped",
            ActionState::Updated => "Updated",
            ActionState::Other(s) => s,
        }
    }
}

impl From<String> for ActionState {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Created" => ActionState::Created,
            "Approved" => ActionState::Approved,
            "Instantiated" => ActionState::Instantiated,
            "InstantiateStopped" => ActionState::InstantiateStopped,
            "Terminated" => ActionState::Terminated,
            "TerminateStopped" => ActionState::TerminateStopped,
            "Updated" => ActionState::Updated,
            _ => ActionState::Other(value),
        }
    }
}

impl From<ActionState> for String {
    fn from(value: ActionState) -> Self {
        match value {
            ActionState::Other(s) => s,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for ActionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
