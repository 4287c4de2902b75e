// GET /api/history handler

use std::convert::Infallible;
use uuid::Uuid;

use super::AppContext;
use crate::models::HistoryResponse;

/// Return the stored conversation verbatim; empty list for unknown sessions.
pub async fn history_handler(
    session: Uuid,
    ctx: AppContext,
) -> Result<impl warp::Reply, Infallible> {
    let messages = ctx.store.history(session).await;
    Ok(warp::reply::json(&HistoryResponse { messages }))
}
