//! # System Lifecycle & Orchestration
//!
//! Every form of the admin console is backed by its own resource engine. This
//! module is the "conductor" that creates them, shares one interception chain
//! between them and shuts them down in order.
//!
//! ## Graceful Shutdown
//!
//! 1. **Drop all clients**: closes the request side of every engine's channel
//! 2. **Engines detect closure**: `receiver.recv()` returns `None`
//! 3. **Engines drain**: in-flight requests are settled, the final state is logged
//! 4. **Await completion**: wait for all engine tasks to finish
//!
//! Form clients handed out elsewhere (property bindings, cloned clients) keep
//! their engine alive until they are dropped too.

pub mod admin_system;

pub use admin_system::*;
