//! Cooperative cancellation for running conversion jobs.
//!
//! Jobs share a [`CancellationToken`] between the async orchestration and the blocking
//! pipeline. Cancelling does not interrupt a page that is already being decoded; the job
//! stops at the next source, part or decode window boundary and fails with
//! [`Error::Cancelled`].

pub use tokio_util::sync::CancellationToken;

use crate::error::{Error, Result};

/// `?`-friendly cancellation checks for the blocking pipeline.
pub trait CancellationExt {
    /// Returns [`Error::Cancelled`] once the token has been cancelled.
    fn check(&self) -> Result<()>;
}

impl CancellationExt for CancellationToken {
    fn check(&self) -> Result<()> {
        if self.is_cancelled() {
            Err(Error::Cancelled)
        } else {
            Ok(())
        }
    }
}
