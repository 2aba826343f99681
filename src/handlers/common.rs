use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::models::Direction;
use crate::ApiResponse;

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, crate::errors::ServiceError>;
pub type CreatedResult<T> =
    Result<(StatusCode, Json<ApiResponse<T>>), crate::errors::ServiceError>;

/// Standard success response
pub fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse::success(data))
}

/// Standard created response
pub fn created<T: Serialize>(data: T) -> (StatusCode, Json<ApiResponse<T>>) {
    (StatusCode::CREATED, Json(ApiResponse::success(data)))
}

/// Body of the `/move` endpoints.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct MoveRequest {
    pub direction: Direction,
}
