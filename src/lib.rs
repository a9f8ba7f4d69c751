//! Epubinfo
//!
//! Safe bindings over the native EPUB metadata engine.
//!
//! # Modules
//!
//! - `document`: owning handle over one native document
//! - `metadata`: non-owning metadata view, scalar and repeated accessors
//! - `sys`: the fixed C ABI and its function table
//! - `engine`: reference engine implementing that ABI in Rust
//!
//! # Usage
//!
//! ```rust,no_run
//! use epubinfo::Document;
//!
//! let mut doc = Document::open("book.epub")?;
//! let meta = doc.metadata();
//! println!("{:?} by {:?}", meta.title()?, meta.authors()?);
//! doc.release()?;
//! # Ok::<(), epubinfo::EpubError>(())
//! ```

pub mod config;
pub mod document;
pub mod engine;
pub mod error;
pub mod metadata;
pub mod sys;

pub use document::Document;
pub use error::{EpubError, Result};
pub use metadata::{Metadata, MetadataRecord, RepeatedField, ScalarField};
pub use sys::EngineApi;
