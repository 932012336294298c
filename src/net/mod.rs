//! Network layer.
//!
//! Plain TCP listeners are bound directly in startup; this module only holds
//! the TLS material loading for the HTTPS listener.

pub mod tls;

pub use tls::{load_tls_config, TlsError};
