//! Admin-console resources managed by resource engines.

pub mod gateway;
pub mod webhook;

pub use gateway::*;
pub use webhook::*;
