//! Language Server Protocol front end for the query engine.

pub mod backend;
pub mod convert;
pub mod documents;
pub mod transport;

pub use backend::{BackendConfig, PromBackend};
pub use transport::{run_stdio, run_websocket};
