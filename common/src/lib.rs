//! Types shared between the certmesh API service and its clients.
//!
//! [`params`] holds request bodies accepted by the `caRequest` routes and
//! [`views`] holds everything that goes over the wire in the other direction,
//! including the payloads exchanged with the upstream certificate service.

pub mod params;
pub mod views;
