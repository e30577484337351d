//! certmesh API service.
//!
//! Requests CA certificates for the clusters of a cluster-provider or the
//! logical clouds of a project, keeps the members attached to each request
//! in line with what callers ask for, and drives the certificate through its
//! enrollment and distribution phases on the certificate service.
//!
//! # Configuration
//!
//! Every option can be given as a flag or a `CERTMESH_API_*` environment
//! variable. See [`config::CertmeshApiConfig`].
//!
//! # Backends
//!
//! Upstream calls go through a [`backend::Backend`], either the real services
//! over HTTP or an in-process emulation (`--backend memory`).

pub mod backend;
pub mod config;
pub mod orchestrator;
pub mod server;

pub(crate) mod context;
pub(crate) mod error;
pub(crate) mod handlers;
