// What the user is looking at: the active canvas and the selected cards

use crate::canvas::{Canvas, LinkCard};
use crate::error::StoreError;
use crate::store::DocumentStore;
use async_trait::async_trait;
use std::sync::Arc;

#[async_trait]
pub trait ViewQuery: Send + Sync {
    fn active_document(&self) -> Option<String>;

    async fn selected_link_cards(&self) -> Result<Vec<LinkCard>, StoreError>;

    async fn all_link_cards(&self, document: &str) -> Result<Vec<LinkCard>, StoreError>;
}

/// A view pinned to one canvas with an explicit selection of node ids.
pub struct CanvasSelection {
    store: Arc<dyn DocumentStore>,
    document: Option<String>,
    selected_ids: Vec<String>,
}

impl CanvasSelection {
    pub fn new(store: Arc<dyn DocumentStore>, document: Option<String>) -> Self {
        Self {
            store,
            document,
            selected_ids: Vec::new(),
        }
    }

    pub fn with_selection(mut self, ids: Vec<String>) -> Self {
        self.selected_ids = ids;
        self
    }
}

#[async_trait]
impl ViewQuery for CanvasSelection {
    fn active_document(&self) -> Option<String> {
        self.document.clone()
    }

    /// Selected ids that resolve to link cards, in selection order.
    async fn selected_link_cards(&self) -> Result<Vec<LinkCard>, StoreError> {
        let Some(document) = &self.document else {
            return Ok(Vec::new());
        };
        if self.selected_ids.is_empty() {
            return Ok(Vec::new());
        }
        let cards = self.all_link_cards(document).await?;
        Ok(self
            .selected_ids
            .iter()
            .filter_map(|id| cards.iter().find(|card| &card.id == id).cloned())
            .collect())
    }

    async fn all_link_cards(&self, document: &str) -> Result<Vec<LinkCard>, StoreError> {
        let content = self.store.read(document).await?;
        Ok(Canvas::parse(&content)?.link_cards())
    }
}
