// Application layer - use cases and orchestration.
// The service loads a wallet under its lock, runs the domain operation on a
// private copy, writes the copy back and then publishes an event.

pub mod error;
pub mod events;
pub mod service;

pub use error::*;
pub use events::*;
pub use service::*;
