// Change detection for link cards across repeated canvas snapshots.
//
// A document is `Unseen` until its first successful scan, which only records
// a baseline. Every later scan reports ids absent from the previous baseline
// and then replaces it.

use crate::canvas::{Canvas, LinkCard};
use crate::store::DocumentStore;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

#[derive(Debug, Default)]
pub struct ChangeMonitor {
    baselines: HashMap<String, HashSet<String>>,
    initialized: HashSet<String>,
}

impl ChangeMonitor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read `document` from the store and diff it. Read or parse failures
    /// leave the state untouched and report nothing.
    pub async fn scan(&mut self, store: &dyn DocumentStore, document: &str) -> Vec<LinkCard> {
        match store.read(document).await {
            Ok(content) => self.observe(document, &content),
            Err(e) => {
                warn!("Skipping scan of {}: {}", document, e);
                Vec::new()
            }
        }
    }

    /// Diff raw canvas content against the baseline for `document`.
    pub fn observe(&mut self, document: &str, content: &str) -> Vec<LinkCard> {
        match Canvas::parse(content) {
            Ok(canvas) => self.observe_canvas(document, &canvas),
            Err(e) => {
                warn!("Skipping scan of {}: {}", document, e);
                Vec::new()
            }
        }
    }

    /// Diff a parsed canvas against the baseline for `document`.
    pub fn observe_canvas(&mut self, document: &str, canvas: &Canvas) -> Vec<LinkCard> {
        let cards = canvas.link_cards();
        let current: HashSet<String> = cards.iter().map(|card| card.id.clone()).collect();

        let new_cards = if self.initialized.contains(document) {
            let previous = self.baselines.get(document);
            cards
                .into_iter()
                .filter(|card| !previous.is_some_and(|seen| seen.contains(&card.id)))
                .collect()
        } else {
            debug!(
                "Baseline for {} established with {} link card(s)",
                document,
                current.len()
            );
            self.initialized.insert(document.to_string());
            Vec::new()
        };

        self.baselines.insert(document.to_string(), current);

        if !new_cards.is_empty() {
            debug!("{} new link card(s) in {}", new_cards.len(), document);
        }
        new_cards
    }

    pub fn is_initialized(&self, document: &str) -> bool {
        self.initialized.contains(document)
    }

    pub fn tracked_documents(&self) -> usize {
        self.initialized.len()
    }

    /// Forget one document, or every document when `document` is `None`.
    pub fn reset(&mut self, document: Option<&str>) {
        match document {
            Some(document) => {
                self.baselines.remove(document);
                self.initialized.remove(document);
            }
            None => {
                self.baselines.clear();
                self.initialized.clear();
            }
        }
    }
}
