//! Document ingestion: text extraction and the per-session document store

mod parser;
mod store;
mod summary;
mod table;

pub use parser::{decode_text, DocumentExtractor};
pub use store::IngestionStore;
pub use summary::{file_summary, summarize};
pub use table::render_table;
