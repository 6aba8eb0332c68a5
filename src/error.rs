//! # 에러 처리 모듈
//!
//! 저장소(repository)와 HTTP 계층에서 발생할 수 있는 모든 에러 타입을 정의합니다.
//!
//! 이 모듈의 핵심:
//! - `AppError` 열거형(enum): 검증 실패, 없음, 잘못된 인자, 저장소 연결 불가 등을
//!   하나의 타입으로 통합합니다. 호출자는 variant를 보고 재시도 여부를 결정합니다.
//! - `From<sqlx::Error>` 구현: 드라이버 에러를 의미 있는 variant로 분류합니다.
//! - `From<JsonRejection>`, `From<QueryRejection>` 구현: 요청 파싱 실패도 같은 에러 형태로 맞춥니다.
//! - `IntoResponse` 구현: 에러를 HTTP 응답으로 자동 변환합니다.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// 애플리케이션에서 발생할 수 있는 모든 에러 종류
///
/// 어떤 연산도 에러를 조용히 삼키지 않습니다. 로그는 전파 위에 얹히는 부수효과일 뿐입니다.
#[derive(Debug, Error)]
pub enum AppError {
    /// 필수 필드 누락 또는 형식이 잘못된 필드 (HTTP 422)
    #[error("Validation failed: {0}")]
    Validation(String),

    /// 조회 결과가 없음 (HTTP 404)
    ///
    /// 부재를 명시적으로 알려야 하는 연산(`load_mutate_save`)에서만 사용합니다.
    /// 나머지 조회 연산은 `Ok(None)`을 반환합니다.
    #[error("Resource not found")]
    NotFound,

    /// 잘못된 식별자나 필터 (HTTP 400)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// 저장소에 연결할 수 없음: 풀 종료, 타임아웃, I/O 오류 (HTTP 503)
    ///
    /// 호출자가 재시도 여부를 판단할 수 있도록 다른 에러와 구분됩니다.
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// 고유(unique) 제약 위반, 예: 중복 email (HTTP 409)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// 분류되지 않은 데이터베이스 오류 (HTTP 500)
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// 서버 내부 오류 (HTTP 500)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// 재시도하면 성공할 가능성이 있는 에러인지 여부
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::StoreUnavailable(_))
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
            AppError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Database(_) | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 응답 본문의 `error.code` 값
    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_error",
            AppError::NotFound => "not_found",
            AppError::InvalidArgument(_) => "invalid_argument",
            AppError::StoreUnavailable(_) => "store_unavailable",
            AppError::Conflict(_) => "conflict",
            AppError::Database(_) => "database_error",
            AppError::Internal(_) => "internal_error",
        }
    }
}

// #[from] 대신 직접 From을 구현합니다.
// sqlx 에러 중 연결 계열은 StoreUnavailable, 고유 제약 위반은 Conflict로 분류해야 하기 때문입니다.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolClosed => {
                AppError::StoreUnavailable("connection pool is closed".to_string())
            }
            sqlx::Error::PoolTimedOut => {
                AppError::StoreUnavailable("timed out waiting for a connection".to_string())
            }
            sqlx::Error::Io(e) => AppError::StoreUnavailable(e.to_string()),
            sqlx::Error::Tls(e) => AppError::StoreUnavailable(e.to_string()),
            sqlx::Error::Database(ref db) if db.is_unique_violation() => {
                AppError::Conflict(db.message().to_string())
            }
            other => AppError::Database(other),
        }
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(format!("malformed stored document: {err}"))
    }
}

/// 요청 본문이 JSON이 아니거나 필드 타입이 맞지 않음
impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        AppError::Validation(rejection.body_text())
    }
}

/// 쿼리 문자열을 해석할 수 없음 (예: `limit=abc`)
impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        AppError::InvalidArgument(rejection.body_text())
    }
}

impl IntoResponse for AppError {
    /// AppError를 HTTP 응답으로 변환합니다.
    ///
    /// 내부 에러(Database, Internal)는 실제 내용을 로그에만 기록하고,
    /// 클라이언트에는 일반적인 메시지만 반환합니다.
    fn into_response(self) -> Response {
        let message = match &self {
            AppError::Validation(msg)
            | AppError::InvalidArgument(msg)
            | AppError::Conflict(msg) => msg.clone(),
            AppError::NotFound => self.to_string(),
            AppError::StoreUnavailable(msg) => {
                tracing::warn!("Store unavailable: {}", msg);
                "The document store is unavailable".to_string()
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                "A database error occurred".to_string()
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                "An internal error occurred".to_string()
            }
        };

        // 결과: { "error": { "code": "not_found", "message": "Resource not found" } }
        let body = Json(json!({
            "error": {
                "code": self.code(),
                "message": message
            }
        }));

        (self.status_code(), body).into_response()
    }
}
