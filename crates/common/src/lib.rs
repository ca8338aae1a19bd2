//! Shared pieces used by every crate in the workspace: logging setup and the
//! small JSON shapes returned by the HTTP surface.

pub mod types;
pub mod utils;
