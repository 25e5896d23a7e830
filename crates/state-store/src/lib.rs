//! Poll state persistence.
//!
//! Implements the [`poller::PollStateStore`] trait with two backends:
//!
//! - [`FileStateStore`]: one JSON document per trigger under a directory.
//!   Writes go to a temporary file that is renamed over the old document, so
//!   a crash mid-write never leaves a truncated state behind.
//!
//! - [`InMemoryStateStore`]: a map behind an async lock, for tests and
//!   single-process hosts that do not need durability.
//!
//! ## Architectural Layer
//!
//! **Infrastructure.** File layout and encoding live here. The [`poller`]
//! crate sees only [`poller::PollStateStore`] and [`poller::PollState`].

pub mod file;
pub mod memory;

pub use file::FileStateStore;
pub use memory::InMemoryStateStore;
