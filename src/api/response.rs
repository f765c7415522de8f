use axum::{
    extract::Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;

use crate::service::validator::FieldError;
use crate::service::ServiceError;

/// 统一响应体
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// 校验失败响应体
#[derive(Debug, Serialize)]
pub struct ValidationResponse {
    pub success: bool,
    pub message: String,
    pub errors: Vec<FieldError>,
}

/// 成功响应
pub fn success<T: Serialize>(status: StatusCode, data: T, message: &str) -> Response {
    let body = ApiResponse {
        success: true,
        message: message.to_string(),
        data: Some(data),
        error: None,
    };
    (status, Json(body)).into_response()
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        match self {
            ServiceError::NotFound(message) => {
                let body = ApiResponse::<()> {
                    success: false,
                    message,
                    data: None,
                    error: None,
                };
                (StatusCode::NOT_FOUND, Json(body)).into_response()
            }
            ServiceError::Validation(errors) => {
                let body = ValidationResponse {
                    success: false,
                    message: "Validation failed".to_string(),
                    errors: errors.0,
                };
                (StatusCode::BAD_REQUEST, Json(body)).into_response()
            }
            ServiceError::Database(e) => {
                tracing::error!("数据库错误: {:?}", e);
                let body = ApiResponse::<()> {
                    success: false,
                    message: "Internal server error".to_string(),
                    data: None,
                    error: Some(e.to_string()),
                };
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}
