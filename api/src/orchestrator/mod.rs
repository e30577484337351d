//! CA intent orchestration.
//!
//! [`CertIntentOrchestrator`] owns the multi-step workflows behind the
//! `caRequest` routes: it keeps the members attached to a scope's CA intent in
//! line with what the caller asks for, and hands phase transitions to the
//! [`LifecycleStateMachine`]. None of the state is kept here; every workflow
//! starts by reading it back from the upstream services.

use std::{collections::BTreeSet, sync::Arc};

use certmesh_common::{
    params::{Phase, PhaseAction},
    views::{
        CaCert, CaCertSpec, CaRequestCreated, CertStatus, CsrAlgorithm, CsrInfo, CsrSubject,
        CsrSubjectNames, IssuerRef, IssuingCluster, Metadata, NamedResource, ReconcileResult,
    },
};
use serde::de::DeserializeOwned;
use tracing::{info, instrument, warn};

use crate::backend::{Backend, BackendError, RemoteResponse, Upstream};

mod error;
pub use error::OrchestratorError;

mod lifecycle;
pub use lifecycle::LifecycleStateMachine;

mod poller;
pub use poller::{PollOutcome, ReadinessPoller};

mod reconcile;
pub use reconcile::{MembershipDiff, reconcile};

mod scope;
pub use scope::{INTENT_SUFFIX, Member, Scope, is_valid_name};


const CSR_KEY_SIZE: u32 = 4096;
const CSR_VERSION: u32 = 1;
const CSR_PUBLIC_KEY_ALGORITHM: &str = "RSA";
const CSR_SIGNATURE_ALGORITHM: &str = "SHA512WithRSA";
const CERT_DURATION: &str = "8760h";

/// Map a backend answer to the response on success, or to an error naming
/// `operation` otherwise.
fn expect_success(
    operation: &str,
    result: Result<RemoteResponse, BackendError>,
) -> Result<RemoteResponse, OrchestratorError> {
    let response = result.map_err(|source| OrchestratorError::Transport {
        operation: operation.to_string(),
        source,
    })?;

    if response.is_success() {
        Ok(response)
    } else {
        Err(OrchestratorError::upstream(operation, &response))
    }
}

fn decode<T: DeserializeOwned>(
    operation: &str,
    response: &RemoteResponse,
) -> Result<T, OrchestratorError> {
    response.json().map_err(|source| OrchestratorError::Decode {
        operation: operation.to_string(),
        source,
    })
}

/// Deletes treat an already missing resource as deleted.
fn ignore_not_found(
    result: Result<RemoteResponse, OrchestratorError>,
) -> Result<(), OrchestratorError> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if e.is_not_found() => Ok(()),
        Err(e) => Err(e),
    }
}

/// Drop repeated names, keeping the first occurrence of each.
fn dedup(names: &[String]) -> Vec<String> {
    let mut seen = BTreeSet::new();
    names
        .iter()
        .filter(|name| seen.insert(name.as_str()))
        .cloned()
        .collect()
}

#[derive(Clone)]
pub struct CertIntentOrchestrator {
    backend: Arc<dyn Backend>,
    lifecycle: LifecycleStateMachine,
    issuer: IssuerRef,
}

impl CertIntentOrchestrator {
    pub fn new(backend: Arc<dyn Backend>, poller: ReadinessPoller, issuer: IssuerRef) -> Self {
        Self {
            lifecycle: LifecycleStateMachine::new(backend.clone(), poller),
            backend,
            issuer,
        }
    }

    pub fn lifecycle(&self) -> &LifecycleStateMachine {
        &self.lifecycle
    }

    fn ca_cert(&self, scope: &Scope, issuing_cluster: IssuingCluster) -> CaCert {
        CaCert {
            metadata: Metadata::named(scope.intent_name()),
            spec: CaCertSpec {
                csr_info: CsrInfo {
                    key_size: CSR_KEY_SIZE,
                    version: CSR_VERSION,
                    algorithm: CsrAlgorithm {
                        public_key_algorithm: CSR_PUBLIC_KEY_ALGORITHM.to_string(),
                        signature_algorithm: CSR_SIGNATURE_ALGORITHM.to_string(),
                    },
                    subject: CsrSubject {
                        names: CsrSubjectNames {
                            common_name_prefix: scope.name().to_string(),
                        },
                    },
                },
                duration: CERT_DURATION.to_string(),
                is_ca: true,
                issuer_ref: self.issuer.clone(),
                issuing_cluster,
            },
        }
    }

    /// Every member that could be attached to the scope's intent.
    async fn universe(&self, scope: &Scope) -> Result<Vec<Member>, OrchestratorError> {
        let operation = format!("list {} members", scope.kind());
        let (upstream, path) = scope.universe();

        let response = expect_success(&operation, self.backend.read(upstream, &path).await)?;
        scope
            .parse_universe(&response.body)
            .map_err(|source| OrchestratorError::Decode { operation, source })
    }

    /// Look up each of `names` in `universe`, keeping the order of `names`.
    fn resolve(
        scope: &Scope,
        universe: &[Member],
        names: &[String],
    ) -> Result<Vec<Member>, OrchestratorError> {
        if let Some(name) = names.iter().find(|name| !is_valid_name(name)) {
            return Err(OrchestratorError::validation(format!(
                "invalid {} name {name:?}",
                scope.members_segment()
            )));
        }

        let mut resolved = Vec::with_capacity(names.len());
        let mut unknown = Vec::new();

        for name in names {
            match universe.iter().find(|m| m.name() == name) {
                Some(member) => resolved.push(member.clone()),
                None => unknown.push(name.as_str()),
            }
        }

        if unknown.is_empty() {
            Ok(resolved)
        } else {
            Err(OrchestratorError::validation(format!(
                "unknown {} {} in {} {}",
                scope.members_segment(),
                unknown.join(", "),
                scope.kind(),
                scope.name()
            )))
        }
    }

    /// Attach `members` in order. If one fails, the ones attached before it
    /// in this call are detached again and the failure is returned.
    async fn attach(
        &self,
        scope: &Scope,
        members: &[Member],
    ) -> Result<Vec<String>, OrchestratorError> {
        let collection = scope.members_path();
        let mut attached = Vec::with_capacity(members.len());

        for member in members {
            let operation = format!("attach {}", member.name());
            let result = match member.payload() {
                Ok(payload) => expect_success(
                    &operation,
                    self.backend
                        .create(Upstream::CertService, &collection, &payload)
                        .await,
                ),
                Err(source) => Err(OrchestratorError::Decode {
                    operation: operation.clone(),
                    source,
                }),
            };

            if let Err(e) = result {
                warn!(member = member.name(), error = %e, "Attach failed, rolling back");
                self.rollback(scope, &attached).await;
                return Err(e);
            }
            attached.push(member.name().to_string());
        }

        Ok(attached)
    }

    async fn rollback(&self, scope: &Scope, attached: &[String]) {
        for name in attached {
            if let Err(e) = self.detach(scope, name).await {
                warn!(member = %name, error = %e, "Rollback failed to detach member");
            }
        }
    }

    async fn detach(&self, scope: &Scope, name: &str) -> Result<(), OrchestratorError> {
        if !is_valid_name(name) {
            return Err(OrchestratorError::validation(format!(
                "refusing to detach {} {name:?}",
                scope.members_segment()
            )));
        }

        let operation = format!("detach {name}");
        ignore_not_found(expect_success(
            &operation,
            self.backend
                .delete(Upstream::CertService, &scope.member_path(name))
                .await,
        ))
    }

    async fn delete_intent(&self, scope: &Scope) -> Result<(), OrchestratorError> {
        ignore_not_found(expect_success(
            "delete CA intent",
            self.backend
                .delete(Upstream::CertService, &scope.intent_path())
                .await,
        ))
    }

    /// Best-effort removal of an intent that was created earlier in the same
    /// request.
    async fn discard_intent(&self, scope: &Scope) {
        if let Err(e) = self.delete_intent(scope).await {
            warn!(error = %e, "Failed to remove CA intent during rollback");
        }
    }

    /// Request a CA intent for `scope`, attach `members` to it and
    /// instantiate it.
    #[instrument(skip_all, fields(scope = %scope))]
    pub async fn create(
        &self,
        scope: &Scope,
        members: &[String],
        issuing_cluster: IssuingCluster,
    ) -> Result<CaRequestCreated, OrchestratorError> {
        let universe = self.universe(scope).await?;
        let cert = self.ca_cert(scope, issuing_cluster);

        let payload = serde_json::to_value(&cert).map_err(|source| OrchestratorError::Decode {
            operation: "encode CA intent".to_string(),
            source,
        })?;
        expect_success(
            "create CA intent",
            self.backend
                .create(Upstream::CertService, &scope.ca_certs_path(), &payload)
                .await,
        )?;
        info!(intent = %cert.metadata.name, "CA intent created");

        let members = match Self::resolve(scope, &universe, &dedup(members)) {
            Ok(members) => members,
            Err(e) => {
                self.discard_intent(scope).await;
                return Err(e);
            }
        };

        let attached = match self.attach(scope, &members).await {
            Ok(attached) => attached,
            Err(e) => {
                self.discard_intent(scope).await;
                return Err(OrchestratorError::partial_failure(
                    format!("failed to attach {} to CA intent", scope.members_segment()),
                    e,
                ));
            }
        };
        info!(members = ?attached, "Members attached");

        self.lifecycle.instantiate(scope).await?;

        Ok(CaRequestCreated {
            intent: cert.metadata.name,
            members: attached,
        })
    }

    /// Names of the members currently attached to the scope's intent.
    pub async fn current_members(
        &self,
        scope: &Scope,
    ) -> Result<BTreeSet<String>, OrchestratorError> {
        let operation = format!("list attached {}", scope.members_segment());
        let response = expect_success(
            &operation,
            self.backend
                .read(Upstream::CertService, &scope.members_path())
                .await,
        )?;

        let attached: Vec<NamedResource> = decode(&operation, &response)?;
        Ok(attached.into_iter().map(|r| r.metadata.name).collect())
    }

    /// Bring the attached members in line with `members` and, if anything
    /// changed, re-run the intent's lifecycle so the change is distributed.
    #[instrument(skip_all, fields(scope = %scope))]
    pub async fn update(
        &self,
        scope: &Scope,
        members: &[String],
    ) -> Result<ReconcileResult, OrchestratorError> {
        let universe = self.universe(scope).await?;
        let current = self.current_members(scope).await?;

        let desired = dedup(members);
        let resolved = Self::resolve(scope, &universe, &desired)?;
        let diff = reconcile(&current, &desired.into_iter().collect());

        if diff.is_empty() {
            info!("No update needed");
            return Ok(ReconcileResult::default());
        }

        let to_create: Vec<Member> = resolved
            .into_iter()
            .filter(|m| diff.to_create.iter().any(|name| name == m.name()))
            .collect();
        let created = self.attach(scope, &to_create).await.map_err(|e| {
            OrchestratorError::partial_failure(
                format!("failed to attach {}", scope.members_segment()),
                e,
            )
        })?;

        // Members attached above stay attached; the lifecycle is not re-run.
        for name in &diff.to_delete {
            self.detach(scope, name).await.map_err(|e| {
                OrchestratorError::partial_failure(
                    format!("failed to detach {}", scope.members_segment()),
                    e,
                )
            })?;
        }
        info!(created = ?created, deleted = ?diff.to_delete, "Membership updated");

        self.lifecycle.reinstantiate(scope).await?;

        Ok(ReconcileResult {
            created,
            deleted: diff.to_delete,
            updated: true,
        })
    }

    /// Terminate the scope's intent and remove it with all its members.
    /// Deleting an intent that does not exist succeeds.
    #[instrument(skip_all, fields(scope = %scope))]
    pub async fn delete(&self, scope: &Scope) -> Result<(), OrchestratorError> {
        let members = match self.current_members(scope).await {
            Ok(members) => members,
            Err(e) if e.is_not_found() => BTreeSet::new(),
            Err(e) => return Err(e),
        };

        if let Err(e) = self.lifecycle.terminate(scope).await {
            warn!(error = %e, "Terminate failed, deleting anyway");
        }

        for name in &members {
            self.detach(scope, name).await?;
        }
        self.delete_intent(scope).await?;

        info!(members = members.len(), "CA intent deleted");
        Ok(())
    }

    pub async fn get_intent(&self, scope: &Scope) -> Result<CaCert, OrchestratorError> {
        let operation = "read CA intent";
        let response = expect_success(
            operation,
            self.backend
                .read(Upstream::CertService, &scope.intent_path())
                .await,
        )?;
        decode(operation, &response)
    }

    pub async fn phase_status(
        &self,
        scope: &Scope,
        phase: Phase,
    ) -> Result<CertStatus, OrchestratorError> {
        self.lifecycle.status(scope, phase).await
    }

    /// Run a single phase transition as requested, without the checks the
    /// full lifecycle applies.
    #[instrument(skip(self, scope), fields(scope = %scope))]
    pub async fn run_phase(
        &self,
        scope: &Scope,
        phase: Phase,
        action: PhaseAction,
    ) -> Result<(), OrchestratorError> {
        self.lifecycle.request(scope, phase, action).await
    }
}
