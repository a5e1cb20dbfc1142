use crate::handlers;
use crate::state::AppState;
use axum::{
    Router,
    routing::{delete, get, patch, post, put},
};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/today", get(handlers::get_today))
        .route("/api/days/:date", get(handlers::get_day))
        .route("/api/mutations", post(handlers::mutate))
        .route("/api/dashboard", get(handlers::get_dashboard))
        .route("/api/months/:year/:month/summary", get(handlers::get_month_summary))
        .route("/api/months/:year/:month/export.csv", get(handlers::export_month_csv))
        .route(
            "/api/members",
            get(handlers::list_members)
                .post(handlers::add_member)
                .put(handlers::bulk_update_members),
        )
        .route(
            "/api/members/:id",
            patch(handlers::update_member).delete(handlers::delete_member),
        )
        .route("/api/banned", get(handlers::list_banned).post(handlers::add_banned))
        .route("/api/banned/:id", delete(handlers::remove_banned))
        .route(
            "/api/settings",
            get(handlers::get_settings).put(handlers::update_settings),
        )
        .route(
            "/api/backup",
            get(handlers::export_backup).post(handlers::import_data),
        )
        .route("/api/records/:record", put(handlers::push_record))
        .with_state(state)
}
