//! # 헬스체크(Health Check) 핸들러
//!
//! ## 엔드포인트
//! - `GET /api/v1/health` → `{ "status": "ok" }`

use axum::Json;
use serde_json::{json, Value};

/// `GET /api/v1/health`: 서버 상태를 확인합니다. 저장소에는 접근하지 않습니다.
pub async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "ok"
    }))
}
