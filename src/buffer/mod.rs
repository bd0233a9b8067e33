//! Elastic buffer pool
//!
//! A [`Pool`] is a chain of fixed-capacity FIFO [`Buffer`]s behind one
//! blocking put/get contract. Under sustained "full" pressure it grows by one
//! buffer (up to its maximum), and under sustained "empty" pressure it drops
//! an empty buffer (never below one). There is no global FIFO order across
//! buffers.

mod pool;
mod queue;

pub use pool::Pool;
pub use queue::{Buffer, Offer};

use thiserror::Error;

/// Errors raised by buffers and pools
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    #[error("illegal parameter: {0}")]
    IllegalParameter(String),

    #[error("closed buffer pool")]
    ClosedPool,

    #[error("closed buffer")]
    ClosedBuffer,
}
