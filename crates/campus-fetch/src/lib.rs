#![forbid(unsafe_code)]
#![deny(
    warnings,
    dead_code,
    unused,
    unused_imports,
    unused_must_use,
    unreachable_pub,
    clippy::all,
    clippy::pedantic,
    clippy::nursery,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls,
    missing_docs
)]

//! Fetch scheduling for list views.
//!
//! Layout: `source.rs` (remote collaborator traits), `policy.rs` (debounce and
//! poll windows), `scheduler.rs` (the timer-driven worker and its snapshots),
//! `directory.rs` (reference directory loading), `error.rs` (fetch errors).

pub mod directory;
pub mod error;
pub mod policy;
pub mod scheduler;
pub mod source;

pub use directory::{DEFAULT_DIRECTORY_PAGE_LIMIT, DEFAULT_DIRECTORY_PAGE_SIZE, DirectoryLoader};
pub use error::{FetchError, FetchResult};
pub use policy::{DEFAULT_DEBOUNCE, DEFAULT_POLL_INTERVAL, SchedulePolicy};
pub use scheduler::{FetchScheduler, ListSnapshot};
pub use source::{DirectoryQuery, DirectorySource, ListPage, ListSource};
