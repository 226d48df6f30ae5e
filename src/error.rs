use thiserror::Error;
use uuid::Uuid;

use crate::models::SlipStatus;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("{0} read timed out")]
    Timeout(&'static str),
    #[error("unexpected {column} value in row: {value}")]
    Decode { column: &'static str, value: String },
}

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("team {0} not found")]
    TeamNotFound(Uuid),
    #[error("permission slip {0} not found")]
    SlipNotFound(Uuid),
    #[error("participant {0} not found")]
    ParticipantNotFound(Uuid),
    #[error("permission slip cannot move from {from} to {to}; reset it to pending first")]
    InvalidTransition { from: SlipStatus, to: SlipStatus },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ViewError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::TeamNotFound(_) | Self::SlipNotFound(_) | Self::ParticipantNotFound(_)
        )
    }
}
