//! Low-level HTTP transport (C8) and registry authentication (C9).

pub mod auth;
pub mod transport;

pub use transport::{HttpResponse, Transport};
