/// Failures from a collaborator store (roster, overtime, output, dedup).
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("no records for {0}")]
    NotFound(String),

    #[error("malformed record: {0}")]
    Malformed(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Reasons a monitoring pass was abandoned.
#[derive(Debug, thiserror::Error)]
pub enum MonitorError {
    #[error("roster query failed for team {team}: {source}")]
    Roster {
        team: String,
        #[source]
        source: StoreError,
    },

    #[error("output store write failed: {0}")]
    Output(#[source] StoreError),

    #[error("dedup store failed on key {key}: {source}")]
    Dedup {
        key: String,
        #[source]
        source: StoreError,
    },
}
