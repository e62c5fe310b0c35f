// Bridge from filesystem notifications to the change monitor.
//
// `CanvasWatcher` owns the notify subscription and forwards changed
// `.canvas` paths over a channel. `WatchSession` turns each change into a
// monitor scan and, when enabled, enriches the new cards one at a time.

use crate::enrich::{Enricher, EnrichmentResult};
use crate::error::WatchError;
use crate::monitor::ChangeMonitor;
use crate::store::DocumentStore;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

pub const CANVAS_EXTENSION: &str = "canvas";

pub fn is_canvas_path(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case(CANVAS_EXTENSION))
}

pub struct CanvasWatcher {
    watcher: Option<RecommendedWatcher>,
    root: PathBuf,
}

impl CanvasWatcher {
    /// Subscribe to changes below `root`. Each saved canvas arrives on the receiver.
    pub fn start(root: &Path) -> Result<(Self, mpsc::UnboundedReceiver<PathBuf>), WatchError> {
        let (tx, rx) = mpsc::unbounded_channel();

        let mut watcher = notify::recommended_watcher(move |result: notify::Result<Event>| {
            match result {
                Ok(event) => {
                    if !matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_)) {
                        return;
                    }
                    for path in event.paths.into_iter().filter(|p| is_canvas_path(p)) {
                        if let Err(e) = tx.send(path) {
                            error!("Failed to forward change event: {}", e);
                        }
                    }
                }
                Err(e) => error!("Notify error: {:?}", e),
            }
        })
        .map_err(|source| WatchError::Notify {
            path: root.display().to_string(),
            source,
        })?;

        watcher
            .watch(root, RecursiveMode::Recursive)
            .map_err(|source| WatchError::Notify {
                path: root.display().to_string(),
                source,
            })?;

        info!("Watching {} for canvas changes", root.display());
        Ok((
            Self {
                watcher: Some(watcher),
                root: root.to_path_buf(),
            },
            rx,
        ))
    }

    /// Release the subscription. Dropping the watcher closes the channel.
    pub fn stop(&mut self) {
        if self.watcher.take().is_some() {
            info!("Stopped watching {}", self.root.display());
        }
    }
}

/// Per-watch state: the monitor plus what to do with the cards it reports.
pub struct WatchSession {
    monitor: ChangeMonitor,
    store: Arc<dyn DocumentStore>,
    enricher: Arc<Enricher>,
    auto_enrich: bool,
}

impl WatchSession {
    pub fn new(store: Arc<dyn DocumentStore>, enricher: Arc<Enricher>, auto_enrich: bool) -> Self {
        Self {
            monitor: ChangeMonitor::new(),
            store,
            enricher,
            auto_enrich,
        }
    }

    pub fn monitor(&self) -> &ChangeMonitor {
        &self.monitor
    }

    /// Scan `document` and enrich whatever is new, sequentially.
    pub async fn handle_change(&mut self, document: &str) -> Vec<EnrichmentResult> {
        let new_cards = self.monitor.scan(self.store.as_ref(), document).await;
        if new_cards.is_empty() {
            return Vec::new();
        }
        if !self.auto_enrich {
            debug!(
                "{} new card(s) in {} left alone (auto enrich off)",
                new_cards.len(),
                document
            );
            return Vec::new();
        }

        let report = self.enricher.enrich_batch(document, &new_cards).await;
        report.results
    }

    /// Forget all monitor state, as when watching stops.
    pub fn stop(&mut self) {
        self.monitor.reset(None);
    }
}
