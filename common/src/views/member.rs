use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Resource metadata as used by every upstream service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub name: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Metadata {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }
}

/// Any upstream resource, read only for its name.
#[derive(Debug, Clone, Deserialize)]
pub struct NamedResource {
    pub metadata: Metadata,
}

/// A cluster registered under a cluster-provider, as listed with
/// `withLabels=true`.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ClusterInfo {
    pub metadata: Metadata,

    #[serde(default)]
    pub labels: Vec<ClusterLabel>,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterLabel {
    pub cluster_label: String,
}

/// A logical cloud defined in a project.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct LogicalCloudInfo {
    pub metadata: Metadata,
}

/// Payload attaching a cluster to a cluster-provider CA intent.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct ClusterMember {
    pub metadata: Metadata,
    pub spec: ClusterMemberSpec,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClusterMemberSpec {
    /// Either `name` (select `cluster`) or `label` (select by `label`).
    /// certmesh always selects by name.
    pub scope: String,
    pub cluster_provider: String,

    #[serde(default)]
    pub cluster: String,

    #[serde(default)]
    pub label: String,
}

/// Payload attaching a logical cloud to a project CA intent.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct LogicalCloudMember {
    pub metadata: Metadata,
    pub spec: LogicalCloudMemberSpec,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LogicalCloudMemberSpec {
    pub logical_cloud: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn cluster_listing_with_labels_decodes() {
        let clusters: Vec<ClusterInfo> = serde_json::from_value(json!([
            {"metadata": {"name": "c1", "description": "edge"}, "labels": [{"clusterLabel": "edge"}]},
            {"metadata": {"name": "c2"}}
        ]))
        .unwrap();

        assert_eq!(clusters[0].metadata.name, "c1");
        assert_eq!(clusters[0].labels[0].cluster_label, "edge");
        assert!(clusters[1].labels.is_empty());
    }

    #[test]
    fn cluster_member_payload_field_names() {
        let member = ClusterMember {
            metadata: Metadata::named("c1"),
            spec: ClusterMemberSpec {
                scope: "name".into(),
                cluster_provider: "cp1".into(),
                cluster: "c1".into(),
                label: String::new(),
            },
        };

        let json = serde_json::to_value(&member).unwrap();
        assert_eq!(
            json,
            json!({
                "metadata": {"name": "c1"},
                "spec": {"scope": "name", "clusterProvider": "cp1", "cluster": "c1", "label": ""}
            })
        );
    }

    #[test]
    fn logical_cloud_member_payload_field_names() {
        let member = LogicalCloudMember {
            metadata: Metadata::named("lc1"),
            spec: LogicalCloudMemberSpec {
                logical_cloud: "lc1".into(),
            },
        };

        let json = serde_json::to_value(&member).unwrap();
        assert_eq!(json["spec"]["logicalCloud"], "lc1");
    }
}
