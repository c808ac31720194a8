//! Error Kinds
//!
//! The four failure categories of the fleet. None of them are fatal to the
//! reception loop; they surface to the user and the loop resumes. Errors
//! never travel over the pipes themselves.

use plazza_ipc::ChannelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlazzaError {
    /// Malformed user input or wire payload.
    #[error("parse error: {0}")]
    Parse(String),

    /// Transport failure on a pipe channel.
    #[error("ipc error: {0}")]
    Ipc(String),

    /// Kitchen-side failure, including failure to spawn one.
    #[error("kitchen error: {0}")]
    Worker(String),

    /// Dispatcher-side failure to place a job.
    #[error("scheduler error: {0}")]
    Scheduler(String),
}

impl From<ChannelError> for PlazzaError {
    fn from(err: ChannelError) -> Self {
        PlazzaError::Ipc(err.to_string())
    }
}
