//! Scene source port — the configuration document read fresh each cycle.

use std::future::Future;

use pillar_domain::error::PillarError;
use pillar_domain::scene::SceneDefinition;

/// Loads the scene definitions for the coming day.
///
/// Implementations skip individually malformed or missing scenes (those
/// scenes simply get no timers this cycle); only a document that cannot
/// be read or parsed at all is an error.
pub trait SceneSource {
    /// Read the configuration afresh.
    ///
    /// # Errors
    ///
    /// Returns [`PillarError::Config`] when the document is unreadable
    /// or not parseable at the top level.
    fn load(&self) -> impl Future<Output = Result<Vec<SceneDefinition>, PillarError>> + Send;
}

impl<T: SceneSource + Send + Sync> SceneSource for std::sync::Arc<T> {
    fn load(&self) -> impl Future<Output = Result<Vec<SceneDefinition>, PillarError>> + Send {
        (**self).load()
    }
}
