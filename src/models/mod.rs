//! # 데이터 모델 모듈
//!
//! - `person`: 사람(Person) 엔티티와 생성/수정/투영 구조체, 필드 정의
//! - `criteria`: 조회 조건(필드 → 값/술어)

pub mod criteria;
pub mod person;

pub use criteria::*;
pub use person::*;
