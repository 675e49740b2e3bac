pub mod gateway_client;
pub mod webhook_client;

pub use gateway_client::*;
pub use webhook_client::*;
