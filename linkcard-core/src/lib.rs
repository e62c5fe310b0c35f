pub mod canvas;
pub mod card;
pub mod commands;
pub mod config;
pub mod enrich;
pub mod error;
pub mod monitor;
pub mod provider;
pub mod store;
pub mod view;
pub mod watch;

pub use canvas::{Canvas, CanvasNode, LinkCard};
pub use config::Settings;
pub use enrich::{BatchReport, EnrichOptions, Enricher, EnrichmentResult, EnrichmentStatus};
pub use monitor::ChangeMonitor;
pub use provider::{GenerationProvider, create_provider};
pub use store::{DocumentStore, FsDocumentStore};
