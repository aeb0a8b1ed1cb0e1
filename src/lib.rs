//! DeltaX: a deduplicating archive format in Rust.
//!
//! A directory tree is cut into chunks (fixed-size windows or
//! separator-delimited tokens). Every chunk seen at least twice across the
//! whole tree is stored once in a pattern table, and each file is encoded as
//! literal runs plus references into that table. Both tables are gzip
//! compressed independently behind an 8-byte `DX` header.
//!
//! The crate provides:
//! - The on-disk format (`format`)
//! - Chunking, pattern discovery and delta encoding (`dedup`)
//! - The two-phase encode pipeline and reconstruction (`engine`)
//! - Filesystem helpers (`io`)
//! - An optional CLI (`cli` feature)
//!
//! # Quick Start
//!
//! ```
//! use deltax::dedup::ChunkMode;
//! use deltax::engine::{self, Corpus, EncodeOptions, SourceFile};
//!
//! let corpus = Corpus {
//!     files: vec![
//!         SourceFile::new("a.txt", b"hello world hello".to_vec()),
//!         SourceFile::new("b.txt", b"hello there".to_vec()),
//!     ],
//!     empty_dirs: vec!["empty".into()],
//! };
//!
//! let opts = EncodeOptions::new(ChunkMode::separator(" "));
//! let archive = engine::encode(&corpus, &opts).unwrap();
//! let tree = engine::decode(&archive).unwrap();
//! assert_eq!(tree.files, corpus.files);
//! assert_eq!(tree.empty_dirs, corpus.empty_dirs);
//! ```

pub mod dedup;
pub mod engine;
pub mod error;
pub mod format;
pub mod io;

#[cfg(feature = "cli")]
pub mod cli;

pub use error::{DeltaXError, Result};
