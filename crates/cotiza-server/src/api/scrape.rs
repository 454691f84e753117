use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use cotiza_core::{CoreError, ProductResult, Store};
use cotiza_scraper::build_scraper;
use serde::{Deserialize, Serialize};

use crate::middleware::{AuthUser, RequestId};

use super::{ApiError, AppState};

#[derive(Debug, Deserialize)]
pub(super) struct ScrapeParams {
    query: Option<String>,
}

#[derive(Debug, Serialize)]
pub(super) struct ScrapeResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<String>,
    pub results: Vec<ProductResult>,
}

/// `GET /scrape/{store}?query=`. Scrape faults never surface here: a store
/// that could not be read answers 200 with empty `results`.
pub(super) async fn scrape_store(
    State(state): State<AppState>,
    Extension(req_id): Extension<RequestId>,
    user: Option<Extension<AuthUser>>,
    Path(slug): Path<String>,
    Query(params): Query<ScrapeParams>,
) -> Result<Json<ScrapeResponse>, ApiError> {
    let store: Store = slug.parse().map_err(|e: CoreError| {
        ApiError::new(req_id.0.clone(), "not_found", e.to_string())
    })?;

    let query = params.query.as_deref().map(str::trim).unwrap_or_default();
    if query.is_empty() {
        return Err(ApiError::new(
            req_id.0,
            "bad_request",
            "query parameter is required",
        ));
    }

    let user = user.and_then(|Extension(AuthUser(name))| name);
    let scraper = build_scraper(store, state.ctx.clone(), &state.branches).map_err(|e| {
        tracing::error!(store = %store, error = %e, "could not build scraper");
        ApiError::new(req_id.0.clone(), "internal_error", "scraper unavailable")
    })?;

    tracing::info!(
        request_id = %req_id.0,
        store = %store,
        query,
        user = user.as_deref().unwrap_or("-"),
        "scrape requested"
    );
    let results = scraper.scrape(query).await;

    Ok(Json(ScrapeResponse { user, results }))
}
