use std::sync::Arc;

use certmesh_common::{
    params::{Phase, PhaseAction},
    views::CertStatus,
};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::{OrchestratorError, PollOutcome, ReadinessPoller, Scope, decode, expect_success};
use crate::backend::{Backend, Upstream};

/// Drives the enrollment and distribution phases of a scope's CA intent.
///
/// Phase transitions are only ever requested from the certificate service;
/// the state itself is read back from its status log every time.
#[derive(Clone)]
pub struct LifecycleStateMachine {
    backend: Arc<dyn Backend>,
    poller: ReadinessPoller,
}

impl LifecycleStateMachine {
    pub fn new(backend: Arc<dyn Backend>, poller: ReadinessPoller) -> Self {
        Self { backend, poller }
    }

    /// Ask the certificate service to run `action` on `phase`.
    pub async fn request(
        &self,
        scope: &Scope,
        phase: Phase,
        action: PhaseAction,
    ) -> Result<(), OrchestratorError> {
        let operation = format!("{action} {phase}");
        let path = scope.phase_action_path(phase, action);

        expect_success(
            &operation,
            self.backend
                .create(Upstream::CertService, &path, &Value::Null)
                .await,
        )?;
        debug!(%phase, %action, "Phase action accepted");
        Ok(())
    }

    pub async fn status(
        &self,
        scope: &Scope,
        phase: Phase,
    ) -> Result<CertStatus, OrchestratorError> {
        let operation = format!("read {phase} status");
        let path = scope.phase_status_path(phase);

        let response = expect_success(
            &operation,
            self.backend.read(Upstream::CertService, &path).await,
        )?;
        decode(&operation, &response)
    }

    /// Instantiate enrollment, wait for it to become ready, then instantiate
    /// distribution.
    ///
    /// Distribution is started whether or not enrollment became ready within
    /// the poll window; the outcome of the poll is returned for the caller to
    /// report.
    #[instrument(skip_all, fields(scope = %scope))]
    pub async fn instantiate(&self, scope: &Scope) -> Result<PollOutcome, OrchestratorError> {
        self.request(scope, Phase::Enrollment, PhaseAction::Instantiate)
            .await?;

        let outcome = self
            .poller
            .wait_until_ready(move || async move {
                self.status(scope, Phase::Enrollment)
                    .await
                    .map(|status| status.ready_status)
            })
            .await;

        match outcome {
            PollOutcome::Ready { attempts } => info!(attempts, "Enrollment is ready"),
            PollOutcome::Exhausted { attempts } => warn!(
                attempts,
                "Enrollment not ready after last check, starting distribution anyway"
            ),
        }

        self.request(scope, Phase::Distribution, PhaseAction::Instantiate)
            .await
            .inspect_err(|e| {
                warn!(
                    error = %e,
                    enrollment_ready = outcome.is_ready(),
                    "Distribution instantiate failed"
                )
            })?;

        Ok(outcome)
    }

    /// Terminate distribution, then enrollment. A phase is only terminated
    /// when its last recorded state is `Instantiated`, so calling this twice
    /// sends each terminate at most once.
    #[instrument(skip_all, fields(scope = %scope))]
    pub async fn terminate(&self, scope: &Scope) -> Result<(), OrchestratorError> {
        for phase in [Phase::Distribution, Phase::Enrollment] {
            self.terminate_phase(scope, phase).await?;
        }
        Ok(())
    }

    /// Returns whether a terminate was actually sent.
    async fn terminate_phase(
        &self,
        scope: &Scope,
        phase: Phase,
    ) -> Result<bool, OrchestratorError> {
        let status = match self.status(scope, phase).await {
            Ok(status) => status,
            Err(e) if e.is_not_found() => {
                debug!(%phase, "No status recorded, skipping terminate");
                return Ok(false);
            }
            Err(e) => return Err(e),
        };

        if !status.is_instantiated() {
            debug!(
                %phase,
                last_state = ?status.last_state(),
                "Phase not instantiated, skipping terminate"
            );
            return Ok(false);
        }

        self.request(scope, phase, PhaseAction::Terminate).await?;
        info!(%phase, "Phase terminated");
        Ok(true)
    }

    /// Terminate, then instantiate again. The first failure is returned and
    /// nothing after it is attempted.
    pub async fn reinstantiate(&self, scope: &Scope) -> Result<PollOutcome, OrchestratorError> {
        self.terminate(scope).await?;
        self.instantiate(scope).await
    }
}

#[cfg(test)]
mod tests {
    use certmesh_common::views::{ActionEntry, ActionState, PhaseStates, Readiness};
    use serde_json::json;

    use super::*;
    use crate::backend::MemoryBackend;

    fn setup() -> (Arc<MemoryBackend>, LifecycleStateMachine, Scope) {
        let scope = Scope::cluster_provider("cp1").unwrap();
        let backend = Arc::new(MemoryBackend::new());
        backend.seed(
            &scope.intent_path(),
            json!({"metadata": {"name": scope.intent_name()}}),
        );
        let machine =
            LifecycleStateMachine::new(backend.clone(), ReadinessPoller::without_delay(4));
        (backend, machine, scope)
    }

    fn phase_path(scope: &Scope, phase: Phase) -> String {
        format!("{}/{}", scope.intent_path(), phase)
    }

    #[tokio::test]
    async fn instantiate_runs_both_phases() {
        let (_backend, machine, scope) = setup();

        let outcome = machine.instantiate(&scope).await.unwrap();
        assert_eq!(outcome, PollOutcome::Ready { attempts: 1 });

        for phase in [Phase::Enrollment, Phase::Distribution] {
            assert!(machine.status(&scope, phase).await.unwrap().is_instantiated());
        }
    }

    #[tokio::test]
    async fn terminate_skips_phases_never_instantiated() {
        let (_backend, machine, scope) = setup();

        machine.terminate(&scope).await.unwrap();

        let status = machine.status(&scope, Phase::Enrollment).await.unwrap();
        assert!(status.states.actions.is_empty());
    }

    #[tokio::test]
    async fn untrustworthy_log_is_not_terminated() {
        let (backend, machine, scope) = setup();

        // Revision 3 at index 1: a gap, so the last state is unknown.
        let entry = |revision, state| ActionEntry {
            instance: scope.intent_name(),
            revision,
            state,
            time: None,
        };
        backend.set_phase_status(
            &phase_path(&scope, Phase::Distribution),
            CertStatus {
                ready_status: Readiness::Ready,
                states: PhaseStates {
                    actions: vec![
                        entry(0, ActionState::Created),
                        entry(3, ActionState::Instantiated),
                    ],
                    statusctxid: String::new(),
                },
                ..Default::default()
            },
        );

        assert!(
            !machine
                .terminate_phase(&scope, Phase::Distribution)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn missing_intent_skips_terminate() {
        let machine = LifecycleStateMachine::new(
            Arc::new(MemoryBackend::new()),
            ReadinessPoller::without_delay(1),
        );
        let scope = Scope::project("p1").unwrap();

        machine.terminate(&scope).await.unwrap();
    }

    #[tokio::test]
    async fn distribution_failure_reports_upstream_cause() {
        let (backend, machine, scope) = setup();

        // Distribution already instantiated: the service refuses a second one.
        backend
            .create(
                Upstream::CertService,
                &scope.phase_action_path(Phase::Distribution, PhaseAction::Instantiate),
                &Value::Null,
            )
            .await
            .unwrap();

        let err = machine.instantiate(&scope).await.unwrap_err();
        assert_eq!(err.status_code(), http::StatusCode::CONFLICT);
        assert!(err.to_string().contains("already instantiated"));
    }
}
