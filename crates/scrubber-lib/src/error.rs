//! Error taxonomy for listing, date handling and marker writes

/// Errors surfaced by the scrubber core and its adapters
#[derive(Debug, thiserror::Error)]
pub enum ScrubError {
    /// The adapter could not enumerate resources for a scope
    #[error("failed to list resources in {scope}: {message}")]
    Listing { scope: String, message: String },

    /// A marker or creation date is not strict `YYYY-MM-DD`
    #[error("malformed date {value:?}, expected YYYY-MM-DD")]
    MalformedDate { value: String },

    /// Applying an offset left the four-digit year range
    #[error("date {value} shifted by {offset_days} days is out of range")]
    DateOutOfRange { value: String, offset_days: i64 },

    /// Extend target did not match any marked cluster
    #[error("no marked cluster or resource named {target:?}")]
    NoMatch { target: String },

    /// The adapter failed to persist a marker
    #[error("failed to write marker on {resource_id}: {message}")]
    Write { resource_id: String, message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, ScrubError>;
