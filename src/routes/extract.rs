//! # 요청 추출기(Extractor)
//!
//! axum 기본 `Json`/`Query`는 파싱에 실패하면 일반 텍스트 응답을 돌려줍니다.
//! 여기의 래퍼는 거부(rejection)를 `AppError`로 바꿔 모든 에러 응답을 같은 JSON 형태로 맞춥니다.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::AppError;

/// 요청 본문 JSON. 파싱 실패는 `AppError::Validation` (HTTP 422)
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(AppError))]
pub struct AppJson<T>(pub T);

/// 쿼리 문자열. 파싱 실패는 `AppError::InvalidArgument` (HTTP 400)
#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(AppError))]
pub struct AppQuery<T>(pub T);
