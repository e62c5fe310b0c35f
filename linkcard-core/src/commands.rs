// Command entry points: enrich one card, the selection, or a whole canvas

use crate::enrich::{BatchReport, Enricher, EnrichmentResult};
use crate::error::EnrichError;
use crate::view::ViewQuery;
use tracing::info;

/// Enrich the first selected link card of the active canvas.
pub async fn enrich_single(
    enricher: &Enricher,
    view: &dyn ViewQuery,
) -> Result<EnrichmentResult, EnrichError> {
    let document = view.active_document().ok_or(EnrichError::NoActiveDocument)?;
    let selected = view
        .selected_link_cards()
        .await
        .map_err(EnrichError::Read)?;
    let link = selected.first().ok_or(EnrichError::NothingSelected)?;
    Ok(enricher.enrich(&document, link).await)
}

/// Enrich every selected link card, in selection order.
pub async fn enrich_selection(
    enricher: &Enricher,
    view: &dyn ViewQuery,
) -> Result<BatchReport, EnrichError> {
    let document = view.active_document().ok_or(EnrichError::NoActiveDocument)?;
    let selected = view
        .selected_link_cards()
        .await
        .map_err(EnrichError::Read)?;
    if selected.is_empty() {
        return Err(EnrichError::NothingSelected);
    }
    info!("Enriching {} selected card(s) in {}", selected.len(), document);
    Ok(enricher.enrich_batch(&document, &selected).await)
}

/// Enrich every link card on the active canvas.
pub async fn enrich_all(
    enricher: &Enricher,
    view: &dyn ViewQuery,
) -> Result<BatchReport, EnrichError> {
    let document = view.active_document().ok_or(EnrichError::NoActiveDocument)?;
    let cards = view
        .all_link_cards(&document)
        .await
        .map_err(EnrichError::Read)?;
    info!("Enriching {} card(s) in {}", cards.len(), document);
    Ok(enricher.enrich_batch(&document, &cards).await)
}
