use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};

use crate::error::AppResult;
use crate::routes::{LibraryQuery, ResponseMessage};
use crate::state::AppState;
use crate::store::{Chunk, ChunkMetadata};

#[derive(Debug, Deserialize)]
pub struct ChunkPayload {
    pub text: String,
    pub metadata: ChunkMetadata,
}

#[derive(Debug, Deserialize)]
pub struct AddChunksRequest {
    pub library_name: String,
    pub chunks: Vec<ChunkPayload>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateChunkRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct ListChunksQuery {
    pub library_name: String,
    pub document_id: Option<String>,
}

/// The JSON shape chunks take on the wire. The embedding is rendered as a
/// preview of at most its first 5 components; full vectors are an internal
/// detail and would bloat every listing.
#[derive(Debug, Serialize)]
pub struct ChunkResponse {
    pub id: String,
    pub text: String,
    pub embedding: Option<Vec<f32>>,
    pub metadata: ChunkMetadata,
}

impl From<&Chunk> for ChunkResponse {
    fn from(chunk: &Chunk) -> Self {
        Self {
            id: chunk.id.clone(),
            text: chunk.text.clone(),
            embedding: chunk
                .embedding
                .as_ref()
                .map(|v| v.iter().take(5).copied().collect()),
            metadata: chunk.metadata.clone(),
        }
    }
}

pub async fn get_chunks(
    State(state): State<AppState>,
    Query(query): Query<ListChunksQuery>,
) -> AppResult<Json<Vec<ChunkResponse>>> {
    let chunks = state
        .manager
        .list_chunks(&query.library_name, query.document_id.as_deref())?;
    Ok(Json(chunks.iter().map(ChunkResponse::from).collect()))
}

pub async fn get_chunk(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LibraryQuery>,
) -> AppResult<Json<ChunkResponse>> {
    let chunk = state.manager.get_chunk(&query.library_name, &id)?;
    Ok(Json(ChunkResponse::from(&chunk)))
}

pub async fn add_chunks(
    State(state): State<AppState>,
    Json(request): Json<AddChunksRequest>,
) -> AppResult<Json<ResponseMessage>> {
    let chunks: Vec<Chunk> = request
        .chunks
        .into_iter()
        .map(|payload| Chunk::new(payload.text, payload.metadata))
        .collect();
    state.manager.add_chunks(&request.library_name, chunks).await?;
    Ok(Json(ResponseMessage::new("Chunks added successfully")))
}

pub async fn update_chunk(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LibraryQuery>,
    Json(request): Json<UpdateChunkRequest>,
) -> AppResult<Json<ResponseMessage>> {
    state
        .manager
        .update_chunk(&query.library_name, &id, &request.text)
        .await?;
    Ok(Json(ResponseMessage::new("Chunk updated successfully")))
}

pub async fn remove_chunk(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<LibraryQuery>,
) -> AppResult<Json<ResponseMessage>> {
    state.manager.remove_chunk(&query.library_name, &id)?;
    Ok(Json(ResponseMessage::new("Chunk removed successfully")))
}
