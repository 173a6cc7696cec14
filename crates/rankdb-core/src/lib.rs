//! # RankDB
//!
//! A lightweight indexed-object store layered on an ordered key-value engine
//! with sorted-set indexes and atomic batch execution.
//!
//! Items — named, typed field collections keyed by `(kind, id)` — are stored
//! as single encoded records. Numeric fields marked as indexed are mirrored
//! into per-field score-ordered indexes, kept consistent with the primary
//! record under single-operation atomicity, and queried through ranked,
//! paginated listings with deterministic tie-breaking.
//!
//! ## Quick start
//!
//! ```
//! use std::sync::Arc;
//! use rankdb_core::{Item, MemoryEngine, Store};
//!
//! let store = Store::builder(Arc::new(MemoryEngine::new()))
//!     .key_prefix("app:")
//!     .build();
//!
//! store.add(
//!     &Item::new("user", "u1")
//!         .with_i64_indexed("age", 30)
//!         .with_string("name", "Ann"),
//! )?;
//! store.add(
//!     &Item::new("user", "u2")
//!         .with_i64_indexed("age", 25)
//!         .with_string("name", "Bo"),
//! )?;
//!
//! let page = store.list("user").sort_by("age").limit(10).execute()?;
//! assert_eq!(page.items[0].id(), "u2");
//! assert!(!page.has_more);
//! # Ok::<(), rankdb_core::Error>(())
//! ```
//!
//! The engine seam ([`Engine`]) fits any backend offering `GET`/`SET`/`DEL`,
//! sorted-set upsert/remove/range, hash storage, and an atomic multi-command
//! primitive; [`MemoryEngine`] is the in-process reference implementation.

pub mod codec;
pub mod engine;
pub mod error;
pub mod item;
pub mod keys;
pub mod store;

pub use engine::{Command, Engine, EngineError, MemoryEngine, Order};
pub use error::{CodecError, Error, QueryError, Result, SchemaError, ValidationError};
pub use item::{Item, ItemField, ItemValue, ValueType};
pub use keys::KeySpace;
pub use store::{IndexMode, ListBuilder, ListPage, Store, StoreBuilder};
