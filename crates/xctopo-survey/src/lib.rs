#![forbid(unsafe_code)]
#![cfg_attr(not(test), deny(clippy::expect_used, clippy::unwrap_used))]

pub mod census;
pub mod cli;
pub mod consensus;
pub mod probe;
pub mod report;
pub mod survey;

use thiserror::Error;
use xctopo_comm::CollectiveError;
use xctopo_wire::ConvertError;

/// Failure inside a collective round. Always fatal: a round cannot be resumed once any rank
/// has dropped out.
#[derive(Debug, Error)]
pub enum SurveyError {
    #[error("collective failed: {0}")]
    Collective(#[from] CollectiveError),
    #[error("malformed payload: {0}")]
    Payload(#[from] ConvertError),
}
