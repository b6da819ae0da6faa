use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;

use crate::error::AppResult;
use crate::routes::{LibraryQuery, ResponseMessage};
use crate::state::AppState;
use crate::store::{DocumentMetadata, DocumentSummary};

#[derive(Debug, Deserialize)]
pub struct AddDocumentRequest {
    pub name: String,
    pub library_name: String,
    #[serde(default)]
    pub metadata: Option<DocumentMetadata>,
}

pub async fn get_documents(
    State(state): State<AppState>,
    Query(query): Query<LibraryQuery>,
) -> AppResult<Json<Vec<DocumentSummary>>> {
    let documents = state.manager.list_documents(&query.library_name)?;
    Ok(Json(documents))
}

pub async fn get_document(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
    Query(query): Query<LibraryQuery>,
) -> AppResult<Json<DocumentSummary>> {
    let document = state.manager.get_document(&query.library_name, &doc_id)?;
    Ok(Json(document))
}

pub async fn add_document(
    State(state): State<AppState>,
    Json(request): Json<AddDocumentRequest>,
) -> AppResult<Json<DocumentSummary>> {
    let document = state.manager.create_document(
        &request.library_name,
        request.name,
        request.metadata.unwrap_or_default(),
    )?;
    Ok(Json(document))
}

pub async fn remove_document(
    State(state): State<AppState>,
    Path(doc_id): Path<String>,
    Query(query): Query<LibraryQuery>,
) -> AppResult<Json<ResponseMessage>> {
    state.manager.remove_document(&query.library_name, &doc_id)?;
    Ok(Json(ResponseMessage::new("Document removed successfully")))
}
