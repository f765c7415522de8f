use thiserror::Error;

use crate::service::validator::ValidationErrors;

/// CRUD 服务错误
#[derive(Debug, Error)]
pub enum ServiceError {
    /// 资源不存在
    #[error("{0}")]
    NotFound(String),

    /// 字段校验失败（含唯一性检查）
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    /// 数据库错误
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;
