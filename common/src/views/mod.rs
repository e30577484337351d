//! Output views for the various functions within certmesh.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

mod cert;
pub use cert::*;

mod member;
pub use member::*;

mod reconcile;
pub use reconcile::*;

/// The envelope every `caRequest` route answers with, successful or not.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct ApiEnvelope<T> {
    /// The payload of a successful call.
    pub data: Option<T>,

    /// Every message in the error chain, outermost first. Empty on success.
    #[serde(default)]
    pub errors: Vec<String>,

    /// The outermost error message, if the call failed.
    #[serde(rename = "Error")]
    pub error: Option<String>,

    #[serde(rename = "isSuccess")]
    pub is_success: bool,

    /// HTTP status code the response was sent with.
    #[serde(rename = "statusCode")]
    pub status_code: u16,
}

impl<T> ApiEnvelope<T> {
    pub fn success(status_code: u16, data: T) -> Self {
        Self {
            data: Some(data),
            errors: Vec::new(),
            error: None,
            is_success: true,
            status_code,
        }
    }

    pub fn failure(status_code: u16, errors: Vec<String>) -> Self {
        Self {
            data: None,
            error: errors.first().cloned(),
            errors,
            is_success: false,
            status_code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_uses_legacy_field_names() {
        let env = ApiEnvelope::<()>::failure(400, vec!["bad member".into(), "cause".into()]);
        let json = serde_json::to_value(&env).unwrap();

        assert_eq!(json["Error"], "bad member");
        assert_eq!(json["errors"][1], "cause");
        assert_eq!(json["isSuccess"], false);
        assert_eq!(json["statusCode"], 400);
        assert!(json["data"].is_null());
    }

    #[test]
    fn success_envelope_carries_data() {
        let env = ApiEnvelope::success(201, vec!["c1".to_string()]);
        let json = serde_json::to_value(&env).unwrap();

        assert_eq!(json["data"][0], "c1");
        assert_eq!(json["isSuccess"], true);
        assert!(json["Error"].is_null());
    }
}
