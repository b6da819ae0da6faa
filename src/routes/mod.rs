pub mod chunk;
pub mod document;
pub mod health;
pub mod library;

use serde::{Deserialize, Serialize};

/// `{"message": "..."}` envelope for mutations that return no payload.
#[derive(Debug, Serialize)]
pub struct ResponseMessage {
    pub message: String,
}

impl ResponseMessage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// `?library_name=` selector shared by the document and chunk routes.
#[derive(Debug, Deserialize)]
pub struct LibraryQuery {
    pub library_name: String,
}
