//! Configuration file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::GatewayConfig;

/// A watcher that monitors the configuration file for changes.
///
/// Only configurations that load and validate are forwarded; a broken edit
/// is logged and the running route table stays as it is.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<GatewayConfig>,
}

impl ConfigWatcher {
    /// Create a watcher that pushes reloaded configs into `update_tx`.
    pub fn new(path: &Path, update_tx: mpsc::UnboundedSender<GatewayConfig>) -> Self {
        Self {
            path: path.to_path_buf(),
            update_tx,
        }
    }

    /// Start watching the file in a background thread.
    ///
    /// The returned watcher must be kept alive for as long as reloads are wanted.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!(path = %path.display(), "Config file change detected, reloading");
                        reload_into(&path, &tx);
                    }
                }
                Err(e) => tracing::error!(error = %e, "Watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

/// Load `path` and forward it on success. Used by the watcher and by SIGHUP.
pub fn reload_into(path: &Path, tx: &mpsc::UnboundedSender<GatewayConfig>) -> bool {
    match load_config(path) {
        Ok(config) => tx.send(config).is_ok(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to reload config; keeping current configuration");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn reload_forwards_only_valid_configs() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut file = tempfile::NamedTempFile::new().unwrap();

        write!(file, "[gateway]\nenabled = false\n").unwrap();
        assert!(reload_into(file.path(), &tx));
        assert!(!rx.try_recv().unwrap().gateway.enabled);

        let mut broken = tempfile::NamedTempFile::new().unwrap();
        write!(broken, "[[gateway.rules]]\nname = \"x\"\npath = \"x\"\ntargets = []\n").unwrap();
        assert!(!reload_into(broken.path(), &tx));
        assert!(rx.try_recv().is_err());
    }
}
