use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;

use crate::error::AppResult;
use crate::index::IndexKind;
use crate::routes::{LibraryQuery, ResponseMessage};
use crate::routes::chunk::ChunkResponse;
use crate::state::AppState;
use crate::store::{LibraryMetadata, LibrarySummary};

/// Index strategies selectable over HTTP. LSH is constructed programmatically
/// only, so it is deliberately absent here.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexTypeParam {
    FlatL2,
    Ivf,
}

impl From<IndexTypeParam> for IndexKind {
    fn from(param: IndexTypeParam) -> Self {
        match param {
            IndexTypeParam::FlatL2 => IndexKind::FlatL2,
            IndexTypeParam::Ivf => IndexKind::Ivf,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AddLibraryParams {
    pub index_type: IndexTypeParam,
}

#[derive(Debug, Deserialize)]
pub struct AddLibraryRequest {
    pub name: String,
    #[serde(default)]
    pub metadata: Option<LibraryMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateLibraryRequest {
    pub library_name: String,
    pub new_name: String,
    /// Accepted for wire compatibility; the operation is a rename only.
    #[serde(default)]
    pub metadata: Option<LibraryMetadata>,
}

#[derive(Debug, Deserialize)]
pub struct QueryLibraryRequest {
    pub library_name: String,
    pub query: String,
    pub k: usize,
}

pub async fn get_libraries(
    State(state): State<AppState>,
) -> AppResult<Json<Vec<LibrarySummary>>> {
    Ok(Json(state.manager.list_libraries()))
}

pub async fn get_library(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<LibrarySummary>> {
    Ok(Json(state.manager.get_library(&name)?))
}

pub async fn add_library(
    State(state): State<AppState>,
    Query(params): Query<AddLibraryParams>,
    Json(request): Json<AddLibraryRequest>,
) -> AppResult<(StatusCode, Json<ResponseMessage>)> {
    state.manager.create_library(
        request.name,
        request.metadata.unwrap_or_default(),
        params.index_type.into(),
    )?;
    Ok((
        StatusCode::CREATED,
        Json(ResponseMessage::new("Library added successfully")),
    ))
}

pub async fn update_library(
    State(state): State<AppState>,
    Json(request): Json<UpdateLibraryRequest>,
) -> AppResult<Json<ResponseMessage>> {
    state
        .manager
        .rename_library(&request.library_name, &request.new_name)?;
    Ok(Json(ResponseMessage::new("Library updated successfully")))
}

pub async fn remove_library(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> AppResult<Json<ResponseMessage>> {
    state.manager.remove_library(&name)?;
    Ok(Json(ResponseMessage::new("Library removed successfully")))
}

/// Build the library's vector search index. Do this after bulk insertions;
/// the clustered strategy only reflects mutations after a rebuild.
pub async fn build_index(
    State(state): State<AppState>,
    Query(query): Query<LibraryQuery>,
) -> AppResult<Json<ResponseMessage>> {
    state.manager.build_index(&query.library_name)?;
    Ok(Json(ResponseMessage::new("Index built successfully")))
}

pub async fn query_library(
    State(state): State<AppState>,
    Json(request): Json<QueryLibraryRequest>,
) -> AppResult<Json<Vec<ChunkResponse>>> {
    let chunks = state
        .manager
        .search(&request.library_name, &request.query, request.k)
        .await?;
    Ok(Json(chunks.iter().map(ChunkResponse::from).collect()))
}
