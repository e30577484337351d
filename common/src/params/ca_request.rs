use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::views::IssuingCluster;

/// Body of `POST .../caRequest`.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateCaRequestParams {
    /// Names of the members to attach. These are cluster names for a
    /// cluster-provider and logical cloud names for a project. Both
    /// `clusters` and `logicalClouds` are accepted as the field name.
    #[serde(default, alias = "clusters", alias = "logicalClouds")]
    pub members: Vec<String>,

    /// The cluster that issues the CA certificate.
    pub issuing_cluster: IssuingCluster,
}

/// Body of `PUT .../caRequest/clusters` and `PUT .../caRequest/logical-clouds`.
///
/// The list is the complete desired membership: members missing from it are
/// detached and new ones are attached.
#[derive(Debug, Clone, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMembersParams {
    #[serde(default, alias = "clusters", alias = "logicalClouds")]
    pub members: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_params_accept_cluster_alias() {
        let params: CreateCaRequestParams = serde_json::from_str(
            r#"{
                "clusters": ["c1", "c2"],
                "issuingCluster": {"cluster": "hub", "clusterProvider": "cp1"}
            }"#,
        )
        .unwrap();

        assert_eq!(params.members, vec!["c1", "c2"]);
        assert_eq!(params.issuing_cluster.cluster, "hub");
        assert_eq!(params.issuing_cluster.cluster_provider, "cp1");
    }

    #[test]
    fn update_params_accept_logical_cloud_alias() {
        let params: UpdateMembersParams =
            serde_json::from_str(r#"{"logicalClouds": ["lc1"]}"#).unwrap();
        assert_eq!(params.members, vec!["lc1"]);
    }

    #[test]
    fn update_params_default_to_empty() {
        let params: UpdateMembersParams = serde_json::from_str("{}").unwrap();
        assert!(params.members.is_empty());
    }
}
