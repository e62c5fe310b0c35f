use thiserror::Error;

#[derive(Error, Debug)]
pub enum CanvasError {
    #[error("Malformed canvas JSON: {0}")]
    Parse(#[source] serde_json::Error),

    #[error("Failed to serialize canvas: {0}")]
    Serialize(#[source] serde_json::Error),

    #[error("Canvas output is not valid UTF-8: {0}")]
    Encoding(String),

    #[error("Node {0} not found in canvas")]
    NodeNotFound(String),

    #[error("Replacement node id {found} does not match {expected}")]
    IdMismatch { expected: String, found: String },

    #[error("Node {id} is a {found} node, not a link card")]
    NotALink { id: String, found: &'static str },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Path {0} escapes the vault root")]
    OutsideRoot(String),

    #[error(transparent)]
    Canvas(#[from] CanvasError),
}

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("{provider} requires an API key but none is configured")]
    MissingCredential { provider: &'static str },

    #[error("{provider} request failed: {message}")]
    Transport {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} API error ({status}): {message}")]
    Api {
        provider: &'static str,
        status: u16,
        message: String,
    },

    #[error("{provider} returned an empty completion")]
    EmptyResponse { provider: &'static str },

    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(String),

    #[error("{provider} returned an unexpected response: {message}")]
    InvalidResponse {
        provider: &'static str,
        message: String,
    },
}

#[derive(Error, Debug)]
pub enum EnrichError {
    #[error("Enrichment already in progress for node {node_id} in {document}")]
    AlreadyInProgress { document: String, node_id: String },

    #[error("Fetch failed: {0}")]
    Fetch(#[from] linkcard_scanner::ScanError),

    #[error("Failed to read canvas: {0}")]
    Read(#[source] StoreError),

    #[error("Failed to update canvas: {0}")]
    Mutation(#[from] StoreError),

    #[error("No active canvas")]
    NoActiveDocument,

    #[error("No link card selected")]
    NothingSelected,
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Unknown provider '{0}' (expected ollama, openai, openrouter or anthropic)")]
    UnknownProvider(String),
}

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to watch {path}: {source}")]
    Notify {
        path: String,
        #[source]
        source: notify::Error,
    },
}
