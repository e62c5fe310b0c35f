// The enrichment pipeline: scrape, summarize, then rewrite the canvas node.
//
// At most one enrichment runs per `(document, node)` at a time. The guard is
// taken before the first await, so racing triggers (watcher, command, batch)
// see each other deterministically.

use crate::canvas::{Canvas, CanvasNode, FileNode, LinkCard, NodeBase, TextNode};
use crate::card::{self, PLACEHOLDER_SUMMARY};
use crate::config::{CardStyle, Settings};
use crate::error::{CanvasError, EnrichError, StoreError};
use crate::provider::GenerationProvider;
use crate::store::DocumentStore;
use linkcard_scanner::{Extractor, UrlMetadata};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// Options the pipeline reads from a settings snapshot.
#[derive(Debug, Clone)]
pub struct EnrichOptions {
    pub prompt: String,
    pub output_folder: String,
    pub max_description_length: usize,
    pub card_style: CardStyle,
}

impl From<&Settings> for EnrichOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            prompt: settings.prompt.clone(),
            output_folder: settings.output_folder.clone(),
            max_description_length: settings.max_description_length,
            card_style: settings.card_style,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichmentStatus {
    Enriched,
    /// Another enrichment for the same node was already running. Not a failure.
    AlreadyInProgress,
    Failed,
}

/// Outcome of one enrichment attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentResult {
    pub node_id: String,
    pub status: EnrichmentStatus,
    /// Path of the note created for the node, when one was written.
    pub artifact: Option<String>,
    /// Text that ended up on the card.
    pub summary: Option<String>,
    pub error: Option<String>,
}

impl EnrichmentResult {
    fn enriched(node_id: &str, artifact: Option<String>, summary: String) -> Self {
        Self {
            node_id: node_id.to_string(),
            status: EnrichmentStatus::Enriched,
            artifact,
            summary: Some(summary),
            error: None,
        }
    }

    fn from_error(node_id: &str, error: &EnrichError) -> Self {
        let status = match error {
            EnrichError::AlreadyInProgress { .. } => EnrichmentStatus::AlreadyInProgress,
            _ => EnrichmentStatus::Failed,
        };
        Self {
            node_id: node_id.to_string(),
            status,
            artifact: None,
            summary: None,
            error: Some(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == EnrichmentStatus::Enriched
    }
}

/// Results of enriching several nodes of one document in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub results: Vec<EnrichmentResult>,
    /// Candidates dropped before enrichment because their target is not a web URL.
    pub invalid_targets: usize,
}

impl BatchReport {
    fn count(&self, status: EnrichmentStatus) -> usize {
        self.results.iter().filter(|r| r.status == status).count()
    }

    pub fn enriched(&self) -> usize {
        self.count(EnrichmentStatus::Enriched)
    }

    pub fn in_progress(&self) -> usize {
        self.count(EnrichmentStatus::AlreadyInProgress)
    }

    pub fn failed(&self) -> usize {
        self.count(EnrichmentStatus::Failed)
    }
}

type FlightKey = (String, String);

/// Removes its key from the in-flight set when dropped, on every exit path.
struct InFlightGuard<'a> {
    in_flight: &'a Mutex<HashSet<FlightKey>>,
    key: FlightKey,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        let mut set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        set.remove(&self.key);
    }
}

pub struct Enricher {
    store: Arc<dyn DocumentStore>,
    extractor: Arc<Extractor>,
    provider: Arc<dyn GenerationProvider>,
    options: EnrichOptions,
    in_flight: Mutex<HashSet<FlightKey>>,
}

impl Enricher {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        extractor: Arc<Extractor>,
        provider: Arc<dyn GenerationProvider>,
        options: EnrichOptions,
    ) -> Self {
        Self {
            store,
            extractor,
            provider,
            options,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn is_in_flight(&self, document: &str, node_id: &str) -> bool {
        let set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        set.contains(&(document.to_string(), node_id.to_string()))
    }

    /// Check-and-insert under one lock; `None` means the key is taken.
    fn try_claim(&self, document: &str, node_id: &str) -> Option<InFlightGuard<'_>> {
        let key = (document.to_string(), node_id.to_string());
        let mut set = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if !set.insert(key.clone()) {
            return None;
        }
        Some(InFlightGuard {
            in_flight: &self.in_flight,
            key,
        })
    }

    /// Enrich a single link card of `document`.
    pub async fn enrich(&self, document: &str, link: &LinkCard) -> EnrichmentResult {
        let Some(_guard) = self.try_claim(document, &link.id) else {
            debug!("Enrichment of {} in {} already running", link.id, document);
            let error = EnrichError::AlreadyInProgress {
                document: document.to_string(),
                node_id: link.id.clone(),
            };
            return EnrichmentResult::from_error(&link.id, &error);
        };

        info!("Enriching {} ({}) in {}", link.id, link.target, document);
        match self.run(document, link).await {
            Ok((artifact, summary)) => {
                info!("Enriched {} in {}", link.id, document);
                EnrichmentResult::enriched(&link.id, artifact, summary)
            }
            Err(e) => {
                warn!("Enrichment of {} in {} failed: {}", link.id, document, e);
                EnrichmentResult::from_error(&link.id, &e)
            }
        }
    }

    /// Enrich `links` one after another, skipping any without a web URL.
    pub async fn enrich_batch(&self, document: &str, links: &[LinkCard]) -> BatchReport {
        let mut report = BatchReport::default();
        for link in links {
            if !link.has_web_target() {
                debug!("Skipping {}: '{}' is not a web URL", link.id, link.target);
                report.invalid_targets += 1;
                continue;
            }
            report.results.push(self.enrich(document, link).await);
        }
        report
    }

    async fn run(
        &self,
        document: &str,
        link: &LinkCard,
    ) -> Result<(Option<String>, String), EnrichError> {
        let metadata = self.extractor.scrape(&link.target).await?;
        let summary = self.summarize(&metadata).await;

        let artifact = match self.options.card_style {
            CardStyle::Note => Some(self.write_note(document, link, &metadata, &summary).await?),
            CardStyle::Inline => {
                self.write_inline(document, link, &metadata, &summary).await?;
                None
            }
        };
        Ok((artifact, summary))
    }

    /// Provider output, or the page description, or the placeholder.
    async fn summarize(&self, metadata: &UrlMetadata) -> String {
        match self
            .provider
            .generate(&self.options.prompt, &metadata.text_content)
            .await
        {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    "Summary generation with {} failed for {}: {}",
                    self.provider.name(),
                    metadata.url,
                    e
                );
                metadata
                    .description
                    .clone()
                    .filter(|d| !d.trim().is_empty())
                    .unwrap_or_else(|| PLACEHOLDER_SUMMARY.to_string())
            }
        }
    }

    async fn write_note(
        &self,
        document: &str,
        link: &LinkCard,
        metadata: &UrlMetadata,
        summary: &str,
    ) -> Result<String, EnrichError> {
        let folder = self.options.output_folder.trim_matches('/');
        if !folder.is_empty() {
            self.store.ensure_folder_exists(folder).await?;
        }
        let note_path = self
            .store
            .resolve_unique_path(folder, &card::note_file_name(metadata))
            .await?;
        let content = card::compose_note(metadata, summary, chrono::Local::now());
        let created = self.store.create(&note_path, &content).await?;
        debug!("Wrote note {}", created);

        let file = created.clone();
        self.replace_link(document, &link.id, move |base| {
            CanvasNode::File(FileNode {
                base,
                file,
                subpath: None,
            })
        })
        .await?;
        Ok(created)
    }

    async fn write_inline(
        &self,
        document: &str,
        link: &LinkCard,
        metadata: &UrlMetadata,
        summary: &str,
    ) -> Result<(), EnrichError> {
        let text =
            card::compose_inline_card(metadata, summary, self.options.max_description_length);
        self.replace_link(document, &link.id, move |base| {
            CanvasNode::Text(TextNode { base, text })
        })
        .await
    }

    /// Swap the link card `node_id` for `build(base)`, keeping id, geometry and color.
    async fn replace_link<F>(&self, document: &str, node_id: &str, build: F) -> Result<(), EnrichError>
    where
        F: FnOnce(NodeBase) -> CanvasNode + Send + 'static,
    {
        let node_id = node_id.to_string();
        self.store
            .mutate(
                document,
                Box::new(move |content: String| -> Result<String, StoreError> {
                    let mut canvas = Canvas::parse(&content)?;
                    let current = canvas
                        .node(&node_id)
                        .ok_or_else(|| CanvasError::NodeNotFound(node_id.clone()))?;
                    if current.link_target().is_none() {
                        return Err(CanvasError::NotALink {
                            id: node_id.clone(),
                            found: current.type_name(),
                        }
                        .into());
                    }
                    let base = current.base().clone();
                    canvas.replace_node(&node_id, build(base))?;
                    Ok(canvas.to_json_string()?)
                }),
            )
            .await?;
        Ok(())
    }
}
