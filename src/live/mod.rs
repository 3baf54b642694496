//! Live video feed
//!
//! Keeps exactly one of four presentation states active, driven by a remote
//! document subscription plus local playback-health signals:
//! - the document store delivers the configured video URL,
//! - the player binds it and reports readiness or failure,
//! - the resolver folds both into a single `PresentationState`.

pub mod player;
pub mod resolver;
pub mod store;

pub use player::{Player, PlayerEvent};
pub use resolver::{LiveSourceResolver, PresentationState};
pub use store::{DocumentEvent, FirestoreConfig, FirestoreStore, LiveDocumentStore, StoreError};
