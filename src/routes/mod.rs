//! # 라우트 핸들러 모듈
//!
//! HTTP 요청을 처리하는 핸들러 함수들과 라우터 구성입니다.
//!
//! 각 하위 모듈:
//! - `extract`: 파싱 실패를 `AppError`로 돌려주는 `Json`/`Query` 래퍼
//! - `health`: 서버 상태 확인 (헬스체크)
//! - `people`: 사람(Person) CRUD와 체이닝 쿼리 핸들러

pub mod extract;
pub mod health;
pub mod people;

pub use health::*;
pub use people::*;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// `/api/v1` 아래에 모든 라우트를 묶은 라우터를 만듭니다.
///
/// axum 0.8부터 경로 파라미터는 `{id}` 형식입니다.
pub fn router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route(
            "/people",
            get(list_people)
                .post(create_person)
                .delete(delete_people),
        )
        .route("/people/batch", post(create_people))
        .route(
            "/people/{id}",
            get(get_person).patch(update_person).delete(delete_person),
        )
        .route("/people/{id}/favorite-foods", post(add_favorite_food))
        .route("/health", get(health_check))
        .with_state(state);

    // 개발 환경 기준으로 모든 출처를 허용합니다.
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/api/v1", api_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
