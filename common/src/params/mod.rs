//! Input parameters for the various functions within certmesh.

use std::fmt;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

mod ca_request;
pub use ca_request::*;

/// One of the two phases a CA intent goes through after it is requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    /// Issues the CA certificate itself.
    Enrollment,

    /// Pushes the resulting trust bundle to every attached member.
    Distribution,
}

impl Phase {
    /// Path segment used for this phase by the certificate service and by the
    /// `caRequest` routes.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Enrollment => "enrollment",
            Phase::Distribution => "distribution",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transition requested on a single phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseAction {
    Instantiate,
    Terminate,
}

impl PhaseAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PhaseAction::Instantiate => "instantiate",
            PhaseAction::Terminate => "terminate",
        }
    }
}

impl fmt::Display for PhaseAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
