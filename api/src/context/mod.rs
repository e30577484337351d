use std::sync::Arc;

use crate::{backend::Backend, config::CertmeshApiConfig, orchestrator::CertIntentOrchestrator};

#[derive(Clone)]
pub struct ApiContext {
    pub config: CertmeshApiConfig,
    pub orchestrator: Arc<CertIntentOrchestrator>,
}

impl ApiContext {
    pub fn new(config: CertmeshApiConfig, backend: Arc<dyn Backend>) -> Self {
        let orchestrator =
            CertIntentOrchestrator::new(backend, config.readiness_poller(), config.issuer_ref());

        Self {
            config,
            orchestrator: Arc::new(orchestrator),
        }
    }
}
