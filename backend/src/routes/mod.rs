//! Route definitions for the medicine inventory server

use axum::{
    routing::{get, patch, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        // Today's ledger
        .nest("/ledger", ledger_routes())
        // Past ledgers
        .nest("/history", history_routes())
}

fn ledger_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::get_ledger))
        .route("/stats", get(handlers::get_stats))
        .route("/low-stock", get(handlers::get_low_stock))
        .route("/medicines", post(handlers::add_medicine))
        .route(
            "/medicines/:id",
            patch(handlers::update_medicine).delete(handlers::delete_medicine),
        )
        .route("/save", post(handlers::save_ledger))
        .route("/export", get(handlers::export_ledger))
        .route("/import", post(handlers::import_ledger))
        .route("/day-end", post(handlers::end_day))
}

fn history_routes() -> Router<AppState> {
    Router::new()
        .route("/", get(handlers::list_history))
        .route("/:date", get(handlers::get_archived_ledger))
}
