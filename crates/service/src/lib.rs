//! Service layer: the roster adapter and the object stores behind it.
//! - `storage` defines the `FileStore` seam and its implementations.
//! - `roster` maps schools and rosters onto folders and JSON files.
//! - `bootstrap` builds a ready `RosterStore` from configuration.

pub mod bootstrap;
pub mod errors;
pub mod observability;
pub mod roster;
pub mod storage;

pub use errors::ServiceError;
pub use roster::RosterStore;
