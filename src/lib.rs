//! shelfdb — an in-memory vector database.
//!
//! Libraries hold documents, documents hold chunks, and each library carries
//! one pluggable vector search index (exact flat L2, inverted-file k-means,
//! or random-hyperplane LSH) over the chunks' embeddings. A thin axum layer
//! exposes the store over HTTP; embeddings come from a remote provider.

pub mod config;
pub mod embed;
pub mod error;
pub mod index;
pub mod knn;
pub mod manager;
pub mod routes;
pub mod server;
pub mod state;
pub mod store;
