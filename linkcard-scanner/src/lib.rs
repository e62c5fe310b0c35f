pub mod error;
pub mod extractor;
pub mod fetch;
pub mod metadata;
pub mod social;

pub use error::ScanError;
pub use extractor::Extractor;
pub use fetch::{FetchResponse, Fetcher, HttpFetcher};
pub use metadata::UrlMetadata;
