//! # 데이터베이스 접근 계층 (Data Access Layer)
//!
//! 저장소 연결 핸들(`Store`)과, `people` 테이블에 대한 SQL 쿼리 함수들을 모아둔 모듈입니다.
//!
//! 연결은 전역 싱글톤이 아니라 명시적인 핸들입니다:
//! 시작 시 `Store::connect`로 만들고, 저장소 계층에 주입하고, 종료 시 `Store::close`로 닫습니다.
//! 닫힌 뒤의 모든 연산은 `AppError::StoreUnavailable`로 실패합니다.

pub mod people;

pub use people::*;

use std::str::FromStr;

use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

use crate::error::AppError;

/// 저장소 연결 설정
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub database_url: String,
    pub max_connections: u32,
}

impl StoreConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            max_connections: 5,
        }
    }

    /// 테스트와 데모용 인메모리 저장소
    pub fn in_memory() -> Self {
        Self::new("sqlite::memory:")
    }

    fn is_in_memory(&self) -> bool {
        self.database_url.contains(":memory:") || self.database_url.contains("mode=memory")
    }
}

/// 저장소 연결 핸들
///
/// `SqlitePool`은 내부적으로 Arc를 사용하므로 clone해도 같은 풀을 가리킵니다.
#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// 저장소에 연결하고 마이그레이션을 적용합니다.
    ///
    /// 연결 자체가 실패하면 `StoreUnavailable`을 반환합니다.
    /// 시작 단계에서는 이 에러로 프로세스를 종료합니다.
    pub async fn connect(config: &StoreConfig) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(&config.database_url)
            .map_err(|e| AppError::InvalidArgument(format!("bad database url: {e}")))?
            .create_if_missing(true);

        // 인메모리 DB는 연결마다 별개의 DB가 생기므로
        // 연결 하나를 만료 없이 유지해 모든 호출자가 같은 DB를 보게 합니다.
        let pool_options = if config.is_in_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            SqlitePoolOptions::new()
                .max_connections(config.max_connections)
        };

        let pool = pool_options
            .connect_with(options)
            .await
            .map_err(|e| AppError::StoreUnavailable(e.to_string()))?;

        tracing::info!("Running database migrations...");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::Internal(format!("migration failed: {e}")))?;

        tracing::info!("Connected to document store");
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// 연결을 닫습니다. 진행 중인 연결이 반환될 때까지 기다립니다.
    pub async fn close(&self) {
        self.pool.close().await;
        tracing::info!("Disconnected from document store");
    }
}
