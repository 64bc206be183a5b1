//! Shared response envelope types for API handlers.
//!
//! Resource payloads use a `{ "data": ... }` envelope. Annotation documents
//! are the exception: they are returned bare, because the document itself
//! is the wire format clients load and save.

use serde::Serialize;

/// Standard `{ "data": T }` response envelope.
///
/// # Example
///
/// ```ignore
/// Ok(Json(DataResponse { data: folders }))
/// ```
#[derive(Debug, Serialize)]
pub struct DataResponse<T: Serialize> {
    pub data: T,
}

/// One page of a listing plus the paging metadata.
#[derive(Debug, Serialize)]
pub struct ImagePage<T: Serialize> {
    pub images: Vec<T>,
    pub total: i64,
    pub page: i64,
    pub page_size: i64,
}
