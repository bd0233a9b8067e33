use crate::CrawlerError;
use serde::Serialize;
use std::fmt;

/// Lifecycle status of a [`Scheduler`](super::Scheduler)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    #[default]
    Uninitialized,
    Initializing,
    Initialized,
    Starting,
    Started,
    Stopping,
    Stopped,
}

impl Status {
    /// Whether an operation on the scheduler is currently in progress
    pub fn is_transient(self) -> bool {
        matches!(
            self,
            Status::Initializing | Status::Starting | Status::Stopping
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Status::Uninitialized => "uninitialized",
            Status::Initializing => "initializing",
            Status::Initialized => "initialized",
            Status::Starting => "starting",
            Status::Started => "started",
            Status::Stopping => "stopping",
            Status::Stopped => "stopped",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checks whether the scheduler may move from `current` into `wanted`
///
/// Only the three transient statuses can be wanted. The table:
///
/// | current                 | Initializing | Starting | Stopping |
/// |-------------------------|--------------|----------|----------|
/// | Uninitialized           | yes          | no       | no       |
/// | Initialized             | yes          | yes      | no       |
/// | Started                 | no           | no       | yes      |
/// | Stopped                 | yes          | yes      | no       |
/// | any transient status    | no           | no       | no       |
pub fn check_status(current: Status, wanted: Status) -> Result<(), CrawlerError> {
    if current.is_transient() {
        return Err(CrawlerError::illegal_state(format!(
            "the scheduler is being {}",
            match current {
                Status::Initializing => "initialized",
                Status::Starting => "started",
                _ => "stopped",
            }
        )));
    }

    match (current, wanted) {
        (Status::Uninitialized, Status::Starting | Status::Stopping) => Err(
            CrawlerError::illegal_state("the scheduler has not yet been initialized"),
        ),
        (Status::Started, Status::Initializing | Status::Starting) => Err(
            CrawlerError::illegal_state("the scheduler has been started"),
        ),
        (Status::Started, Status::Stopping) => Ok(()),
        (_, Status::Stopping) => Err(CrawlerError::illegal_state(
            "the scheduler has not been started",
        )),
        (_, Status::Initializing | Status::Starting) => Ok(()),
        (_, wanted) => Err(CrawlerError::illegal_state(format!(
            "unsupported wanted status for check: {}",
            wanted
        ))),
    }
}
