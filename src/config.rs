//! # 애플리케이션 설정(Configuration) 모듈
//!
//! 환경변수에서 서버 설정값을 읽어오는 모듈입니다.
//! `config/.env` 파일이나 시스템 환경변수에서 값을 가져옵니다.
//!
//! 설정 항목:
//! - `DATABASE_URL`: 문서 저장소(SQLite) 연결 문자열 (필수)
//! - `DATABASE_MAX_CONNECTIONS`: 연결 풀 최대 크기
//! - `HOST`: 서버 바인딩 주소
//! - `PORT`: 서버 포트 번호
//! - `RUN_DEMO`: 시작 시 CRUD 데모 시나리오 실행 여부

use std::{env, str::FromStr};

use sqlx::sqlite::SqliteConnectOptions;
use thiserror::Error;

/// 설정 로딩 실패. 시작 단계에서 치명적(fatal) 에러로 취급됩니다.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("environment variable {name} is malformed: {reason}")]
    Malformed { name: &'static str, reason: String },
}

/// 애플리케이션 전체 설정
#[derive(Debug, Clone)]
pub struct Config {
    /// 저장소 연결 문자열 (예: "sqlite:data/people.db", "sqlite::memory:")
    pub database_url: String,
    /// 연결 풀 최대 크기 (기본값: 5)
    pub max_connections: u32,
    /// 서버가 바인딩할 호스트 주소 (기본값: "0.0.0.0")
    pub host: String,
    /// 서버 포트 번호 (기본값: 3000)
    pub port: u16,
    /// 시작 시 데모 시나리오를 실행할지 여부 (기본값: true)
    pub run_demo: bool,
}

impl Config {
    /// 환경변수에서 설정값을 읽어 Config 인스턴스를 생성합니다.
    ///
    /// # 에러
    /// `DATABASE_URL`이 없거나 SQLite 연결 문자열로 해석할 수 없으면 에러를 반환합니다.
    /// 나머지 설정은 기본값이 있습니다.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// 이름으로 값을 찾아주는 함수에서 설정을 만듭니다.
    ///
    /// `from_env`는 프로세스 환경변수를 넘기고, 테스트는 고정된 값 목록을 넘깁니다.
    pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let Some(database_url) = get("DATABASE_URL") else {
            return Err(ConfigError::Missing("DATABASE_URL"));
        };
        validate_database_url(&database_url)?;

        Ok(Self {
            database_url,
            max_connections: parse_or(&get, "DATABASE_MAX_CONNECTIONS", 5)?,
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&get, "PORT", 3000)?,
            run_demo: parse_or(&get, "RUN_DEMO", true)?,
        })
    }
}

/// 연결 문자열이 SQLite 형식인지 확인합니다. 실제 연결은 `Store::connect`에서 합니다.
pub fn validate_database_url(url: &str) -> Result<(), ConfigError> {
    if !url.starts_with("sqlite:") {
        return Err(ConfigError::Malformed {
            name: "DATABASE_URL",
            reason: "expected a sqlite: URL".to_string(),
        });
    }

    if let Err(e) = SqliteConnectOptions::from_str(url) {
        return Err(ConfigError::Malformed {
            name: "DATABASE_URL",
            reason: e.to_string(),
        });
    }
    Ok(())
}

// 값이 없으면 기본값, 있는데 파싱이 안 되면 에러
fn parse_or<T>(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(raw) = get(name) else {
        return Ok(default);
    };
    match raw.trim().parse() {
        Ok(value) => Ok(value),
        Err(e) => Err(ConfigError::Malformed {
            name,
            reason: e.to_string(),
        }),
    }
}
