//! JSON-RPC API Layer
//!
//! JSON-RPC 2.0 server for the JSONify export engine. Every method name carries
//! a `.v1` suffix; error codes are listed in [`error::code`].

pub mod error;
pub mod handler;
pub mod server;
pub mod types;

pub use handler::RpcHandler;
pub use server::{RpcServer, RpcServerConfig};
