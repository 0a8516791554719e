//! # replay-core — market-data replay engine core
//!
//! A library for loading a bounded catalogue of timestamped market
//! events once at startup and replaying it to many independent clients
//! at controllable, time-dilated rates.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │  Transport (REST + SSE, in `replay-server`)│
//! ├──────────────────────────────────────────┤
//! │  Registry   — session table, idle sweep  │
//! │  Session    — per-client state machine   │
//! │  Scheduler  — fixed-tick publication loop│
//! ├──────────────────────────────────────────┤
//! │  Catalogue  — immutable sorted event set │
//! └──────────────────────────────────────────┘
//! ```
//!
//! ## Quick start
//!
//! ```no_run
//! use std::sync::Arc;
//! use replay_core::catalogue::{Catalogue, CatalogueLoader, RawRow};
//! use replay_core::registry::SessionRegistry;
//!
//! # struct NoopLoader;
//! # impl CatalogueLoader for NoopLoader {
//! #     fn next_row(&mut self) -> Option<replay_core::error::CatalogueResult<RawRow>> { None }
//! # }
//! # async fn run(mut loader: NoopLoader) -> Result<(), Box<dyn std::error::Error>> {
//! let catalogue = Arc::new(Catalogue::load(&mut loader)?);
//! let registry = Arc::new(SessionRegistry::new(catalogue, 1024, 100));
//! let session = registry.create();
//! let mut events = session.subscribe().await?;
//! session.start().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Crate layout
//!
//! - [`catalogue`] — [`catalogue::Catalogue`], [`catalogue::CatalogueLoader`], [`catalogue::Event`].
//! - [`session`] — [`session::Session`] state machine and its control operations.
//! - [`scheduler`] — the per-session fixed-tick publication loop.
//! - [`registry`] — [`registry::SessionRegistry`] and the idle-TTL sweep.
//! - [`error`] — [`error::CatalogueError`] / [`error::SessionError`] and their result aliases.

pub mod catalogue;
pub mod error;
pub mod registry;
pub mod scheduler;
pub mod session;

pub use catalogue::{Catalogue, CatalogueLoader, Event};
pub use error::{CatalogueError, CatalogueResult, SessionError, SessionResult};
pub use registry::SessionRegistry;
pub use session::{EventStream, Session, SessionId, SessionState};
