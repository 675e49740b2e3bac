//! # Admin Console Sample
//!
//! Two admin-console forms built on `resource_engine`: outbound webhooks and
//! payment gateways. The library exposes the modules for integration testing.

pub mod clients;
pub mod lifecycle;
pub mod model;
pub mod offline;
