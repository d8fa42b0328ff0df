//! Audit trail sink
//!
//! Writes to the history log are best-effort: callers log failures and
//! carry on.

use async_trait::async_trait;

use crate::{error::AppResult, models::history::HistoryEvent};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HistoryLog: Send + Sync {
    async fn record(&self, event: HistoryEvent) -> AppResult<()>;
}
