//! Configuration file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::FilterConfig;
use crate::observability::metrics;

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<FilterConfig>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<FilterConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (
            Self {
                path: path.to_path_buf(),
                update_tx,
            },
            update_rx,
        )
    }

    /// Start watching the file. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Config file change detected, reloading...");
                        match load_config(&path) {
                            Ok(new_config) => {
                                metrics::record_reload(true);
                                let _ = tx.send(new_config);
                            }
                            Err(e) => {
                                metrics::record_reload(false);
                                tracing::error!(
                                    "Failed to reload config: {}. Keeping current configuration.",
                                    e
                                );
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_reload_on_change() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"[headers]\n\"X-A\" = \"1\"\n").unwrap();

        let (watcher, mut updates) = ConfigWatcher::new(file.path());
        let _guard = watcher.run().unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        std::fs::write(file.path(), "[headers]\n\"X-A\" = \"2\"\n").unwrap();

        let config = tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                match updates.recv().await {
                    Some(c) if c.headers.get("X-A").map(String::as_str) == Some("2") => break c,
                    Some(_) => continue,
                    None => panic!("watcher channel closed"),
                }
            }
        })
        .await
        .expect("no reload observed");

        assert_eq!(config.headers["X-A"], "2");
    }
}
