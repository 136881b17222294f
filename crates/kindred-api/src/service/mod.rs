//! Service layer. Each service receives its collaborators at construction and
//! runs database work on the blocking pool.

pub mod accounts;
pub mod messaging;
pub mod profiles;

use std::sync::Arc;

use tracing::error;

use kindred_db::Database;

use crate::error::{ApiError, ApiResult};

pub use accounts::AccountService;
pub use messaging::MessagingService;
pub use profiles::ProfileService;

/// Runs `f` against the database off the async runtime.
pub(crate) async fn blocking<F, T>(db: &Arc<Database>, f: F) -> ApiResult<T>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let db = db.clone();
    tokio::task::spawn_blocking(move || f(&db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow::anyhow!("blocking task failed: {}", e))
        })?
        .map_err(ApiError::from)
}
