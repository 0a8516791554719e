//! Error types for the replay engine core.

/// Errors that can occur while building or querying the [`crate::catalogue::Catalogue`].
#[derive(Debug, thiserror::Error)]
pub enum CatalogueError {
    /// The loader produced zero rows.
    #[error("catalogue source contained no events")]
    Empty,

    /// The loader failed to produce a row.
    #[error("failed to load catalogue: {0}")]
    Load(String),

    /// No event with the given id exists in the catalogue.
    #[error("no event with id {0}")]
    UnknownEvent(u64),
}

/// Errors that can occur on a session's control path.
///
/// Variants map onto the REST error taxonomy one-to-one:
/// - [`UnknownSession`](Self::UnknownSession) → 404.
/// - [`UnknownEvent`](Self::UnknownEvent) → 404.
/// - [`InvalidArgument`](Self::InvalidArgument) → 400.
/// - [`Terminal`](Self::Terminal) / [`AlreadySubscribed`](Self::AlreadySubscribed) → 409.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// No session with the given id exists in the [`crate::registry::SessionRegistry`].
    #[error("session not found: {0}")]
    UnknownSession(String),

    /// `jumpTo` referenced an event id absent from the catalogue.
    #[error("no event with id {0}")]
    UnknownEvent(u64),

    /// A non-positive speed or skip count was supplied.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The operation was attempted on a `Completed` or `Evicted` session.
    #[error("session {0} is terminal")]
    Terminal(String),

    /// A second subscriber attached while the first was still attached.
    #[error("session {0} already has an active subscriber")]
    AlreadySubscribed(String),
}

/// Convenience alias for `Result<T, CatalogueError>`.
pub type CatalogueResult<T> = std::result::Result<T, CatalogueError>;

/// Convenience alias for `Result<T, SessionError>`.
pub type SessionResult<T> = std::result::Result<T, SessionError>;
