use axum::{
    Router,
    routing::{get, patch},
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::routes;
use crate::state::AppState;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(routes::health::health_check))
        // Libraries
        .route(
            "/library",
            get(routes::library::get_libraries)
                .post(routes::library::add_library)
                .patch(routes::library::update_library),
        )
        // Static segment registered alongside `/library/{name}`; the router
        // prefers it, so a library literally named "query" is shadowed here.
        .route(
            "/library/query",
            patch(routes::library::build_index).post(routes::library::query_library),
        )
        .route(
            "/library/{name}",
            get(routes::library::get_library).delete(routes::library::remove_library),
        )
        // Documents
        .route(
            "/document",
            get(routes::document::get_documents).post(routes::document::add_document),
        )
        .route(
            "/document/{doc_id}",
            get(routes::document::get_document).delete(routes::document::remove_document),
        )
        // Chunks
        .route(
            "/chunk",
            get(routes::chunk::get_chunks).post(routes::chunk::add_chunks),
        )
        .route(
            "/chunk/{id}",
            get(routes::chunk::get_chunk)
                .patch(routes::chunk::update_chunk)
                .delete(routes::chunk::remove_chunk),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors)
        .with_state(state)
}
