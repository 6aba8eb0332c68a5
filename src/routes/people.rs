//! # 사람(Person) 라우트 핸들러
//!
//! `PersonRepository`를 HTTP로 노출하는 얇은 계층입니다. 비즈니스 규칙은 저장소에 있고,
//! 여기서는 요청을 조건/patch로 바꾸고 결과를 JSON으로 돌려줍니다.
//!
//! ## 엔드포인트
//! - `GET    /api/v1/people`                       → 체이닝 쿼리 (`?filter=&name=&favoriteFood=&sort=&limit=&select=`)
//! - `POST   /api/v1/people`                       → 한 명 생성
//! - `POST   /api/v1/people/batch`                 → 여러 명 생성 (전부 또는 전무)
//! - `DELETE /api/v1/people`                       → 조건에 맞는 사람 모두 삭제
//! - `GET    /api/v1/people/{id}`                  → 단일 조회
//! - `PATCH  /api/v1/people/{id}`                  → 부분 수정 (원자적)
//! - `DELETE /api/v1/people/{id}`                  → 단일 삭제
//! - `POST   /api/v1/people/{id}/favorite-foods`   → 좋아하는 음식 추가 (불러오기-수정-저장)

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};

use super::extract::{AppJson, AppQuery};
use crate::{error::AppError, models::*, repository::PersonRepository};

/// 애플리케이션 공유 상태
///
/// `PersonRepository`는 내부적으로 Arc 기반 풀을 들고 있어 clone 비용이 작습니다.
#[derive(Clone)]
pub struct AppState {
    pub people: PersonRepository,
}

/// `GET /people`, `DELETE /people`의 쿼리 파라미터
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PeopleQuery {
    /// JSON 조건 객체, 예: `{"age":{"$gte":20}}`
    pub filter: Option<String>,
    pub name: Option<String>,
    pub favorite_food: Option<String>,
    /// `name` 또는 `-name` (내림차순)
    pub sort: Option<String>,
    pub limit: Option<u64>,
    /// 쉼표로 구분한 제외 필드, 예: `-age,-email`
    pub select: Option<String>,
}

impl PeopleQuery {
    /// `filter`를 먼저 해석하고, `name`/`favoriteFood`를 AND 조건으로 덧붙입니다.
    fn criteria(&self) -> Result<Criteria, AppError> {
        let mut criteria = match &self.filter {
            Some(raw) => Criteria::from_json(&parse_filter(raw)?)?,
            None => Criteria::new(),
        };
        if let Some(name) = &self.name {
            criteria = criteria.eq(Field::Name, name.clone());
        }
        if let Some(food) = &self.favorite_food {
            criteria = criteria.contains(Field::FavoriteFoods, food.clone());
        }
        Ok(criteria)
    }
}

fn parse_filter(raw: &str) -> Result<Value, AppError> {
    serde_json::from_str(raw)
        .map_err(|e| AppError::InvalidArgument(format!("filter is not valid JSON: {e}")))
}

/// `sort=name` / `sort=-name`을 해석합니다.
pub fn parse_sort(raw: &str) -> Result<(Field, SortOrder), AppError> {
    match raw.strip_prefix('-') {
        Some(field) => Ok((field.parse()?, SortOrder::Descending)),
        None => Ok((raw.trim_start_matches('+').parse()?, SortOrder::Ascending)),
    }
}

/// `select=-age,-email`을 제외 필드 목록으로 해석합니다. 포함(projection-in)은 지원하지 않습니다.
pub fn parse_exclusions(raw: &str) -> Result<Vec<Field>, AppError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(parse_exclusion)
        .collect()
}

fn parse_exclusion(item: &str) -> Result<Field, AppError> {
    match item.strip_prefix('-') {
        Some(name) => name.parse(),
        None => Err(AppError::InvalidArgument(format!(
            "only exclusions are supported in select, got '{item}'"
        ))),
    }
}

/// `GET /api/v1/people`: 조건에 맞는 사람 목록을 정렬, 개수 제한, 필드 제외를 적용해 조회합니다.
pub async fn list_people(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<PeopleQuery>,
) -> Result<Json<Value>, AppError> {
    let mut query = state.people.query(params.criteria()?);

    if let Some(sort) = &params.sort {
        let (field, order) = parse_sort(sort)?;
        query = query.sort_by(field, order);
    }
    if let Some(limit) = params.limit {
        query = query.limit(limit);
    }
    if let Some(select) = &params.select {
        query = query.exclude_fields(parse_exclusions(select)?);
    }

    let people = query.execute().await?;
    Ok(Json(json!({ "people": people })))
}

/// `POST /api/v1/people`: 한 명을 생성합니다.
pub async fn create_person(
    State(state): State<AppState>,
    AppJson(req): AppJson<NewPerson>,
) -> Result<(StatusCode, Json<Person>), AppError> {
    let person = state.people.create(req).await?;
    Ok((StatusCode::CREATED, Json(person)))
}

/// `POST /api/v1/people/batch`: 여러 명을 한 번에 생성합니다. 하나라도 실패하면 아무것도 저장하지 않습니다.
pub async fn create_people(
    State(state): State<AppState>,
    AppJson(req): AppJson<Vec<NewPerson>>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let people = state.people.create_many(req).await?;
    Ok((StatusCode::CREATED, Json(json!({ "people": people }))))
}

/// `GET /api/v1/people/{id}`: id로 한 명을 조회합니다.
pub async fn get_person(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Person>, AppError> {
    let person = state
        .people
        .find_by_id(&id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(person))
}

/// `PATCH /api/v1/people/{id}`: 보낸 필드만 원자적으로 수정하고 수정된 레코드를 반환합니다.
pub async fn update_person(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(patch): AppJson<PersonPatch>,
) -> Result<Json<Person>, AppError> {
    // 형식 검증은 find_by_id와 같은 규칙을 따릅니다.
    let id = uuid::Uuid::parse_str(&id)
        .map_err(|_| AppError::InvalidArgument(format!("'{id}' is not a valid person id")))?
        .to_string();

    let criteria = Criteria::new().eq(Field::Id, id);
    let person = state
        .people
        .find_one_and_update(&criteria, patch)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(person))
}

/// `DELETE /api/v1/people/{id}`: 한 명을 삭제하고 삭제된 레코드를 반환합니다.
pub async fn delete_person(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Person>, AppError> {
    let removed = state
        .people
        .delete_by_id(&id)
        .await?
        .ok_or(AppError::NotFound)?;
    Ok(Json(removed))
}

/// `DELETE /api/v1/people`: 조건에 맞는 사람을 모두 삭제하고 개수를 반환합니다.
pub async fn delete_people(
    State(state): State<AppState>,
    AppQuery(params): AppQuery<PeopleQuery>,
) -> Result<Json<Value>, AppError> {
    let criteria = params.criteria()?;
    let deleted = state.people.delete_many(&criteria).await?;
    Ok(Json(json!({ "deleted": deleted })))
}

#[derive(Debug, Deserialize)]
pub struct AddFoodRequest {
    pub food: String,
}

/// `POST /api/v1/people/{id}/favorite-foods`: 불러오기-수정-저장 방식으로 좋아하는 음식을 추가합니다.
pub async fn add_favorite_food(
    State(state): State<AppState>,
    Path(id): Path<String>,
    AppJson(req): AppJson<AddFoodRequest>,
) -> Result<Json<Person>, AppError> {
    let person = state
        .people
        .load_mutate_save(&id, |p| p.favorite_foods.push(req.food))
        .await?;
    Ok(Json(person))
}
