//! Error types shared by stores and the search engine.

/// Failure of a [`Store`](crate::store::Store) operation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be reached (connection, pool, I/O).
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A statement was rejected (constraint violation, malformed query).
    #[error("store query failed: {0}")]
    Query(String),

    /// A stored value could not be decoded.
    #[error("corrupt stored value: {0}")]
    Corrupt(String),
}

/// Failure of a similarity search.
///
/// An un-embeddable or empty query is not an error; it yields an empty
/// response. Only a store failure surfaces here.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SearchError {
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unavailable_display() {
        let err = StoreError::Unavailable("connection refused".to_string());
        assert_eq!(err.to_string(), "store unavailable: connection refused");
    }

    #[test]
    fn search_error_wraps_store_error() {
        let err = SearchError::from(StoreError::Query("no such table".to_string()));
        assert_eq!(err.to_string(), "store query failed: no such table");
    }
}
