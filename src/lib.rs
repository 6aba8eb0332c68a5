//! # peopledb
//!
//! 문서 저장소 위에서 사람(Person) 레코드를 다루는 저장소 façade와 HTTP API입니다.
//!
//! - `db`: 저장소 연결 핸들(`Store`)과 SQL 쿼리
//! - `repository`: 검증/기본값/로깅을 담당하는 `PersonRepository`와 체이닝 쿼리
//! - `routes`: axum 라우터와 핸들러
//! - `demo`: CRUD 연산을 순서대로 실행하는 데모 시나리오

pub mod config;
pub mod db;
pub mod demo;
pub mod error;
pub mod models;
pub mod repository;
pub mod routes;

pub use error::AppError;
pub use repository::{PersonQuery, PersonRepository};
