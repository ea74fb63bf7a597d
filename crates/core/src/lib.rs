pub mod archive;
pub mod config;
pub mod container;
pub mod document;
pub mod error;
pub mod ingest;
pub mod library;
pub mod markup;
pub mod materialize;
pub mod metadata;
pub mod package;
pub mod progress;
pub mod security;
pub mod toc;

#[cfg(test)]
mod testing;

pub use ingest::{ingest_bytes, ingest_file, parse_epub, IngestOptions, ParsedEpub};

pub mod prelude {
    pub use crate::document::*;
    pub use crate::error::*;
}
