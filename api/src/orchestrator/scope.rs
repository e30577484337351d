use std::fmt;

use certmesh_common::{
    params::{Phase, PhaseAction},
    views::{
        ClusterInfo, ClusterMember, ClusterMemberSpec, LogicalCloudInfo, LogicalCloudMember,
        LogicalCloudMemberSpec, Metadata,
    },
};
use serde_json::Value;

use super::OrchestratorError;
use crate::backend::Upstream;

/// Suffix appended to the scope name to form the name of its CA intent. Only
/// one intent per scope is supported.
pub const INTENT_SUFFIX: &str = "-certintent1";

/// What a CA intent is requested for: every cluster under a cluster-provider,
/// or every logical cloud in a project.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    ClusterProvider(String),
    Project(String),
}

impl Scope {
    pub fn cluster_provider(name: impl Into<String>) -> Result<Self, OrchestratorError> {
        Ok(Self::ClusterProvider(validate_name("cluster-provider", name.into())?))
    }

    pub fn project(name: impl Into<String>) -> Result<Self, OrchestratorError> {
        Ok(Self::Project(validate_name("project", name.into())?))
    }

    pub fn name(&self) -> &str {
        match self {
            Scope::ClusterProvider(name) | Scope::Project(name) => name,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Scope::ClusterProvider(_) => "cluster-provider",
            Scope::Project(_) => "project",
        }
    }

    pub fn intent_name(&self) -> String {
        format!("{}{}", self.name(), INTENT_SUFFIX)
    }

    fn root(&self) -> String {
        match self {
            Scope::ClusterProvider(cp) => format!("/v2/cluster-providers/{cp}"),
            Scope::Project(project) => format!("/v2/projects/{project}"),
        }
    }

    pub fn ca_certs_path(&self) -> String {
        format!("{}/ca-certs", self.root())
    }

    pub fn intent_path(&self) -> String {
        format!("{}/{}", self.ca_certs_path(), self.intent_name())
    }

    /// Path segment naming the member collection of an intent.
    pub fn members_segment(&self) -> &'static str {
        match self {
            Scope::ClusterProvider(_) => "clusters",
            Scope::Project(_) => "logical-clouds",
        }
    }

    pub fn members_path(&self) -> String {
        format!("{}/{}", self.intent_path(), self.members_segment())
    }

    pub fn member_path(&self, member: &str) -> String {
        format!("{}/{}", self.members_path(), member)
    }

    pub fn phase_action_path(&self, phase: Phase, action: PhaseAction) -> String {
        format!("{}/{}/{}", self.intent_path(), phase, action)
    }

    pub fn phase_status_path(&self, phase: Phase) -> String {
        format!("{}/{}/status", self.intent_path(), phase)
    }

    /// Where the full set of candidate members for this scope is listed.
    pub fn universe(&self) -> (Upstream, String) {
        match self {
            Scope::ClusterProvider(cp) => (
                Upstream::ClusterRegistry,
                format!("/v2/cluster-providers/{cp}/clusters?withLabels=true"),
            ),
            Scope::Project(project) => (
                Upstream::LogicalCloudRegistry,
                format!("/v2/projects/{project}/logical-clouds"),
            ),
        }
    }

    /// Decode a universe listing into members of this scope.
    pub fn parse_universe(&self, body: &[u8]) -> Result<Vec<Member>, serde_json::Error> {
        match self {
            Scope::ClusterProvider(cp) => {
                let clusters: Vec<ClusterInfo> = serde_json::from_slice(body)?;
                Ok(clusters
                    .into_iter()
                    .map(|c| Member::Cluster {
                        provider: cp.clone(),
                        name: c.metadata.name,
                    })
                    .collect())
            }
            Scope::Project(project) => {
                let clouds: Vec<LogicalCloudInfo> = serde_json::from_slice(body)?;
                Ok(clouds
                    .into_iter()
                    .map(|lc| Member::LogicalCloud {
                        project: project.clone(),
                        name: lc.metadata.name,
                    })
                    .collect())
            }
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.kind(), self.name())
    }
}

/// Names end up as single upstream path segments, so they are limited to
/// `[A-Za-z0-9._-]` and may not be `.` or `..`.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'.' | b'_' | b'-'))
}

fn validate_name(kind: &str, name: String) -> Result<String, OrchestratorError> {
    if name.is_empty() {
        return Err(OrchestratorError::validation(format!(
            "{kind} name must not be empty"
        )));
    }
    if !is_valid_name(&name) {
        return Err(OrchestratorError::validation(format!(
            "invalid {kind} name {name:?}"
        )));
    }
    Ok(name)
}

/// A resource that can be attached to a CA intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Member {
    Cluster { provider: String, name: String },
    LogicalCloud {
        project: String,
        name: String,
    },
}

impl Member {
    pub fn name(&self) -> &str {
        match self {
            Member::Cluster { name, .. } | Member::LogicalCloud { name, .. } => name,
        }
    }

    /// The body that attaches this member to an intent.
    pub fn payload(&self) -> Result<Value, serde_json::Error> {
        match self {
            Member::Cluster { provider, name } => serde_json::to_value(ClusterMember {
                metadata: Metadata::named(name.clone()),
                spec: ClusterMemberSpec {
                    scope: "name".into(),
                    cluster_provider: provider.clone(),
                    cluster: name.clone(),
                    label: String::new(),
                },
            }),
            Member::LogicalCloud { name, .. } => serde_json::to_value(LogicalCloudMember {
                metadata: Metadata::named(name.clone()),
                spec: LogicalCloudMemberSpec {
                    logical_cloud: name.clone(),
                },
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn cluster_provider_paths() {
        let scope = Scope::cluster_provider("cp1").unwrap();

        assert_eq!(scope.intent_name(), "cp1-certintent1");
        assert_eq!(scope.ca_certs_path(), "/v2/cluster-providers/cp1/ca-certs");
        assert_eq!(
            scope.member_path("c1"),
            "/v2/cluster-providers/cp1/ca-certs/cp1-certintent1/clusters/c1"
        );
        assert_eq!(
            scope.phase_action_path(Phase::Enrollment, PhaseAction::Instantiate),
            "/v2/cluster-providers/cp1/ca-certs/cp1-certintent1/enrollment/instantiate"
        );
        assert_eq!(
            scope.universe(),
            (
                Upstream::ClusterRegistry,
                "/v2/cluster-providers/cp1/clusters?withLabels=true".to_string()
            )
        );
    }

    #[test]
    fn project_paths() {
        let scope = Scope::project("p1").unwrap();

        assert_eq!(
            scope.members_path(),
            "/v2/projects/p1/ca-certs/p1-certintent1/logical-clouds"
        );
        assert_eq!(
            scope.phase_status_path(Phase::Distribution),
            "/v2/projects/p1/ca-certs/p1-certintent1/distribution/status"
        );
        assert_eq!(
            scope.universe(),
            (
                Upstream::LogicalCloudRegistry,
                "/v2/projects/p1/logical-clouds".to_string()
            )
        );
    }

    #[test]
    fn names_are_validated() {
        assert!(matches!(
            Scope::project(""),
            Err(OrchestratorError::Validation(_))
        ));
        for name in ["cp1/../other", "victim#x", "cp%2F1", "..", ".", "cp 1", "cp1?x=y"] {
            assert!(
                matches!(
                    Scope::cluster_provider(name),
                    Err(OrchestratorError::Validation(_))
                ),
                "{name:?} was accepted"
            );
        }

        for name in ["cp1", "edge.cp-1", "east_2", "..cp"] {
            assert_eq!(Scope::cluster_provider(name).unwrap().name(), name);
        }
    }

    #[test]
    fn universe_decodes_into_scope_members() {
        let scope = Scope::cluster_provider("cp1").unwrap();
        let body = json!([{"metadata": {"name": "c1"}, "labels": [{"clusterLabel": "edge"}]}]);

        let members = scope.parse_universe(body.to_string().as_bytes()).unwrap();
        assert_eq!(
            members,
            vec![Member::Cluster {
                provider: "cp1".into(),
                name: "c1".into(),
            }]
        );
        assert_eq!(members[0].payload().unwrap()["spec"]["clusterProvider"], "cp1");
    }
}
