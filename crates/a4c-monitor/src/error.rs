use std::time::Duration;

use a4c_interface::{InterfaceError, OperationHandle, OperationStatus};
use thiserror::Error;

pub type Result<T> = std::result::Result<T, MonitorError>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonitorError {
    /// A collaborator call failed. Never retried.
    #[error(transparent)]
    Remote(#[from] InterfaceError),

    /// The operation itself ended in a failure status.
    #[error("{handle} ended with status {status}")]
    OperationFailed {
        handle: OperationHandle,
        status: OperationStatus,
    },

    #[error("operation still running after {0:?}")]
    Timeout(Duration),

    #[error("completion signal dropped before the operation finished")]
    CallbackDropped,
}
