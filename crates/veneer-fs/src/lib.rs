//! # veneer-fs
//!
//! Overlay file cache for long-running analysis processes.
//!
//! An editor holds unsaved buffers; the analysis process needs to see them
//! instead of what is on disk. [`OverlayFs`] sits in front of any
//! [`FileSource`] (usually a [`DiskSource`]) and reconciles editor
//! open/change/save/close events, disk changes, content hashes and protocol
//! versions into one consistent view.
//!
//! ```no_run
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use veneer_fs::{DiskSource, FileHandle, OverlayFs, ReadContext};
//! use veneer_types::{DocumentUri, Modification};
//!
//! let fs = OverlayFs::new(Arc::new(DiskSource::new()));
//! let uri = DocumentUri::from_path("/src/main.go");
//!
//! fs.apply_changes(&[Modification::open(uri.clone(), 1, "package main", "go")]).await?;
//! let fh = fs.read_file(&ReadContext::detached(), &uri).await?;
//! assert_eq!(fh.content()?, b"package main");
//! # Ok(())
//! # }
//! ```

pub mod backends;
pub mod config;
pub mod context;
pub mod error;
pub mod handle;
pub mod overlay;
pub mod source;

pub use backends::{DiskSource, MemorySource};
pub use config::{ConfigError, OverlayConfig};
pub use context::ReadContext;
pub use error::{OverlayError, OverlayResult, SourceError, SourceResult};
pub use handle::{BrokenFile, DiskFile, FileHandle, FileHandleRef};
pub use overlay::{Overlay, OverlayFs};
pub use source::{FileSource, must_read_file};
