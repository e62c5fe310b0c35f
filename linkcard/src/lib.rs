// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

// Re-export the pure helpers used by the binary and its tests
pub use handlers::{
    apply_overrides, describe_result, find_canvas_files, locate_canvas, summarize_report,
};
