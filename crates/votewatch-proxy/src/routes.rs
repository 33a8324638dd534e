use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::header::{CACHE_CONTROL, CONTENT_TYPE},
    response::{IntoResponse, Response},
};
use tracing::{info, warn};

use crate::{error::ProxyError, state::AppState, upstream::NomineeParams};

/// `GET /api/nominee`: relay the upstream leaderboard verbatim, uncached.
///
/// The query is taken as raw pairs so repeated or unknown keys never produce
/// a non-JSON rejection.
pub async fn nominee_handler(
    State(state): State<Arc<AppState>>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> Result<Response, ProxyError> {
    let params = NomineeParams::from_pairs(pairs);
    match state.upstream.fetch(&params).await {
        Ok(body) => {
            info!(bytes = body.len(), "relayed upstream leaderboard");
            Ok((
                [(CONTENT_TYPE, "application/json"), (CACHE_CONTROL, "no-store")],
                body,
            )
                .into_response())
        }
        Err(e) => {
            warn!(kind = e.kind(), status = e.status_code().as_u16(), error = %e, "nominee request failed");
            Err(e)
        }
    }
}
