//! TLS certificate loading.

use std::path::{Path, PathBuf};

use axum_server::tls_rustls::RustlsConfig;
use thiserror::Error;

use crate::config::TlsConfig;

#[derive(Debug, Error)]
pub enum TlsError {
    #[error("{kind} file not found: {}", .path.display())]
    Missing { kind: &'static str, path: PathBuf },

    #[error("failed to load TLS material: {0}")]
    Load(#[from] std::io::Error),
}

/// Load the certificate chain and private key named in `config`.
pub async fn load_tls_config(config: &TlsConfig) -> Result<RustlsConfig, TlsError> {
    let cert = Path::new(&config.cert_path);
    let key = Path::new(&config.key_path);
    require(cert, "certificate")?;
    require(key, "private key")?;

    let tls = RustlsConfig::from_pem_file(cert, key).await?;
    tracing::info!(cert = %cert.display(), "TLS material loaded");
    Ok(tls)
}

fn require(path: &Path, kind: &'static str) -> Result<(), TlsError> {
    if path.exists() {
        Ok(())
    } else {
        Err(TlsError::Missing {
            kind,
            path: path.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_certificate_is_reported() {
        let config = TlsConfig {
            cert_path: "/nonexistent/gateway.crt".into(),
            key_path: "/nonexistent/gateway.key".into(),
        };
        let err = load_tls_config(&config).await.unwrap_err();
        assert!(matches!(err, TlsError::Missing { kind: "certificate", .. }), "{err}");
        assert_eq!(err.to_string(), "certificate file not found: /nonexistent/gateway.crt");
    }
}
