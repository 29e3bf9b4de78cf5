//! TLS client for `https` backends.
//!
//! # Responsibilities
//! - Build one rustls client config at startup from `[gateway.tls]`
//! - Wrap a connected backend socket in TLS, verifying the target host
//!
//! # Design Decisions
//! - The ring provider is passed explicitly; nothing depends on a
//!   process-wide default provider
//! - Only HTTP/1.1 is offered over ALPN

use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, RootCertStore};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;
use tokio_rustls::TlsConnector;

use crate::config::schema::BackendTlsConfig;
use crate::load_balancer::Target;

/// Errors building the backend TLS client.
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
    #[error("reading CA file {}: {source}", .path.display())]
    CaFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("CA file {} holds no certificates", .0.display())]
    EmptyCaFile(PathBuf),
    #[error("TLS client setup failed: {0}")]
    Rustls(#[from] rustls::Error),
}

/// Shared TLS connector for all `https` targets.
#[derive(Clone)]
pub struct BackendTls {
    connector: TlsConnector,
}

impl BackendTls {
    pub fn from_config(config: &BackendTlsConfig) -> Result<Self, TlsError> {
        let mut roots = RootCertStore::empty();

        if config.native_roots {
            let native = rustls_native_certs::load_native_certs();
            for error in &native.errors {
                tracing::warn!(error = %error, "Skipping unreadable platform certificates");
            }
            let (added, ignored) = roots.add_parsable_certificates(native.certs);
            tracing::debug!(added, ignored, "Loaded platform trust roots");
        }

        if let Some(path) = &config.ca_file {
            let added = add_pem_roots(&mut roots, path)?;
            tracing::info!(path = %path.display(), added, "Loaded backend CA file");
        }

        if roots.is_empty() {
            tracing::warn!("No trust roots loaded; https targets will fail verification");
        }
        Self::with_roots(roots)
    }

    /// Client trusting exactly `roots`.
    pub fn with_roots(roots: RootCertStore) -> Result<Self, TlsError> {
        let mut config =
            ClientConfig::builder_with_provider(Arc::new(rustls::crypto::ring::default_provider()))
                .with_safe_default_protocol_versions()?
                .with_root_certificates(roots)
                .with_no_client_auth();
        config.alpn_protocols = vec![b"http/1.1".to_vec()];

        Ok(Self {
            connector: TlsConnector::from(Arc::new(config)),
        })
    }

    /// Run the TLS handshake on an established backend socket.
    pub async fn connect(&self, target: &Target, stream: TcpStream) -> io::Result<TlsStream<TcpStream>> {
        let name = ServerName::try_from(target.host().to_string())
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        self.connector.connect(name, stream).await
    }
}

fn add_pem_roots(roots: &mut RootCertStore, path: &Path) -> Result<usize, TlsError> {
    let read_error = |source| TlsError::CaFile {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(read_error)?;
    let mut added = 0;
    for cert in rustls_pemfile::certs(&mut BufReader::new(file)) {
        roots.add(cert.map_err(read_error)?)?;
        added += 1;
    }

    if added == 0 {
        return Err(TlsError::EmptyCaFile(path.to_path_buf()));
    }
    Ok(added)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn file_roots(path: PathBuf) -> BackendTlsConfig {
        BackendTlsConfig {
            native_roots: false,
            ca_file: Some(path),
        }
    }

    #[test]
    fn loads_pem_bundle() {
        let cert = rcgen::generate_simple_self_signed(vec!["localhost".to_string()]).unwrap();
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(cert.cert.pem().as_bytes()).unwrap();

        assert!(BackendTls::from_config(&file_roots(file.path().to_path_buf())).is_ok());
    }

    #[test]
    fn missing_ca_file_is_an_error() {
        let result = BackendTls::from_config(&file_roots("/nonexistent/ca.pem".into()));
        assert!(matches!(result, Err(TlsError::CaFile { .. })));
    }

    #[test]
    fn ca_file_without_certificates_is_an_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "not a certificate").unwrap();

        let result = BackendTls::from_config(&file_roots(file.path().to_path_buf()));
        assert!(matches!(result, Err(TlsError::EmptyCaFile(_))));
    }
}
