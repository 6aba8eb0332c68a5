//! # 사람(Person) 엔티티
//!
//! 저장소에 보관되는 단일 레코드 타입과, 생성/수정/투영(projection)에 쓰이는
//! 보조 구조체들을 정의합니다. 기본값과 필수 여부 같은 스키마 규칙은
//! 런타임 스키마 객체가 아니라 `validate` 함수로 명시적으로 표현합니다.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// `age`를 지정하지 않고 생성했을 때 사용되는 기본값
pub const DEFAULT_AGE: i64 = 18;

/// 저장된 사람 레코드
///
/// 와이어 형태: `{ id, name, age, favoriteFoods, email?, createdAt }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Person {
    /// 저장소가 생성 시 부여하는 UUIDv7 식별자. 이후 변경되지 않습니다.
    pub id: String,
    pub name: String,
    pub age: i64,
    pub favorite_foods: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// 생성 시각. 이후 변경되지 않습니다.
    pub created_at: DateTime<Utc>,
}

/// 생성 요청. `age`가 없으면 `DEFAULT_AGE`가 적용됩니다.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPerson {
    #[serde(default)]
    pub name: Option<String>,
    pub age: Option<i64>,
    #[serde(default)]
    pub favorite_foods: Vec<String>,
    pub email: Option<String>,
}

impl NewPerson {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    pub fn age(mut self, age: i64) -> Self {
        self.age = Some(age);
        self
    }

    pub fn favorite_foods<I, S>(mut self, foods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.favorite_foods = foods.into_iter().map(Into::into).collect();
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// 필수 필드를 검증하고 기본값을 채워 저장 가능한 `Person`을 만듭니다.
    ///
    /// `id`와 `created_at`은 호출자(저장소)가 부여합니다.
    pub fn into_person(self, id: String, created_at: DateTime<Utc>) -> Result<Person, AppError> {
        let name = self
            .name
            .ok_or_else(|| AppError::Validation("name is required".to_string()))?;

        let person = Person {
            id,
            name,
            age: self.age.unwrap_or(DEFAULT_AGE),
            favorite_foods: self.favorite_foods,
            email: self.email,
            created_at,
        };
        person.validate()?;
        Ok(person)
    }
}

impl Person {
    /// 저장 직전에 항상 실행되는 필드 검증
    pub fn validate(&self) -> Result<(), AppError> {
        validate_name(&self.name)?;
        validate_age(self.age)?;
        if let Some(email) = &self.email {
            validate_email(email)?;
        }
        Ok(())
    }
}

/// 부분 수정(patch). `None`인 필드는 변경하지 않습니다.
///
/// `age`는 명시적으로 주어질 때만 바뀌며, 수정 시 기본값으로 되돌아가지 않습니다.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonPatch {
    pub name: Option<String>,
    pub age: Option<i64>,
    pub favorite_foods: Option<Vec<String>>,
    /// None = 변경 안 함, Some(None) = 이메일 제거, Some(Some(e)) = 변경
    #[serde(default, deserialize_with = "double_option")]
    pub email: Option<Option<String>>,
}

impl PersonPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.age.is_none()
            && self.favorite_foods.is_none()
            && self.email.is_none()
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(age) = self.age {
            validate_age(age)?;
        }
        if let Some(Some(email)) = &self.email {
            validate_email(email)?;
        }
        Ok(())
    }
}

// 필드가 없으면 None, null이면 Some(None)
fn double_option<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

fn validate_name(name: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("name must not be empty".to_string()));
    }
    Ok(())
}

fn validate_age(age: i64) -> Result<(), AppError> {
    if age < 0 {
        return Err(AppError::Validation(format!("age must not be negative, got {age}")));
    }
    Ok(())
}

fn validate_email(email: &str) -> Result<(), AppError> {
    if !email.contains('@') {
        return Err(AppError::Validation(format!("'{email}' is not an email address")));
    }
    Ok(())
}

/// 쿼리 결과의 투영(projection). 제외된 필드는 `None`이 되고 직렬화에서 빠집니다.
///
/// `id`는 항상 포함됩니다.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PersonView {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub age: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub favorite_foods: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl PersonView {
    pub fn project(person: Person, excluded: &[Field]) -> Self {
        Self {
            id: person.id,
            name: kept(excluded, Field::Name, person.name),
            age: kept(excluded, Field::Age, person.age),
            favorite_foods: kept(excluded, Field::FavoriteFoods, person.favorite_foods),
            email: kept(excluded, Field::Email, person.email).flatten(),
            created_at: kept(excluded, Field::CreatedAt, person.created_at),
        }
    }
}

fn kept<T>(excluded: &[Field], field: Field, value: T) -> Option<T> {
    (!excluded.contains(&field)).then_some(value)
}

/// 필터/정렬/투영에서 참조할 수 있는 필드
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Id,
    Name,
    Age,
    FavoriteFoods,
    Email,
    CreatedAt,
}

impl Field {
    /// `people` 테이블의 컬럼 이름. SQL에는 이 고정된 이름만 들어갑니다.
    pub fn column(self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Name => "name",
            Field::Age => "age",
            Field::FavoriteFoods => "favorite_foods",
            Field::Email => "email",
            Field::CreatedAt => "created_at",
        }
    }

    /// 와이어(JSON) 이름
    pub fn as_str(self) -> &'static str {
        match self {
            Field::Id => "id",
            Field::Name => "name",
            Field::Age => "age",
            Field::FavoriteFoods => "favoriteFoods",
            Field::Email => "email",
            Field::CreatedAt => "createdAt",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" | "_id" => Ok(Field::Id),
            "name" => Ok(Field::Name),
            "age" => Ok(Field::Age),
            "favoriteFoods" | "favorite_foods" => Ok(Field::FavoriteFoods),
            "email" => Ok(Field::Email),
            "createdAt" | "created_at" => Ok(Field::CreatedAt),
            other => Err(AppError::InvalidArgument(format!("unknown field '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Ascending,
    Descending,
}

impl SortOrder {
    pub fn sql(self) -> &'static str {
        match self {
            SortOrder::Ascending => "ASC",
            SortOrder::Descending => "DESC",
        }
    }
}

/// DB 행 그대로의 형태. `favorite_foods`는 JSON 텍스트, `created_at`은 RFC 3339 텍스트입니다.
#[derive(Debug, sqlx::FromRow)]
pub struct PersonRow {
    pub id: String,
    pub name: String,
    pub age: i64,
    pub favorite_foods: String,
    pub email: Option<String>,
    pub created_at: String,
}

impl TryFrom<PersonRow> for Person {
    type Error = AppError;

    fn try_from(row: PersonRow) -> Result<Self, Self::Error> {
        let created_at = DateTime::parse_from_rfc3339(&row.created_at)
            .map_err(|e| AppError::Internal(format!("malformed created_at: {e}")))?
            .with_timezone(&Utc);

        Ok(Person {
            id: row.id,
            name: row.name,
            age: row.age,
            favorite_foods: serde_json::from_str(&row.favorite_foods)?,
            email: row.email,
            created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_name_is_validation_error() {
        let err = NewPerson::default()
            .into_person("id".into(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn blank_name_is_validation_error() {
        let err = NewPerson::named("   ")
            .into_person("id".into(), Utc::now())
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn age_defaults_to_eighteen() {
        let person = NewPerson::named("John Doe")
            .into_person("id".into(), Utc::now())
            .unwrap();
        assert_eq!(person.age, DEFAULT_AGE);
        assert!(person.favorite_foods.is_empty());
    }

    #[test]
    fn patch_null_email_means_remove() {
        let patch: PersonPatch = serde_json::from_str(r#"{"email": null}"#).unwrap();
        assert_eq!(patch.email, Some(None));

        let patch: PersonPatch = serde_json::from_str(r#"{"age": 20}"#).unwrap();
        assert_eq!(patch.email, None);
        assert_eq!(patch.age, Some(20));
    }

    #[test]
    fn view_omits_excluded_fields_when_serialized() {
        let person = NewPerson::named("Mary")
            .age(25)
            .favorite_foods(["salad", "tofu"])
            .into_person("abc".into(), Utc::now())
            .unwrap();

        let view = PersonView::project(person, &[Field::Age]);
        let json = serde_json::to_value(&view).unwrap();

        assert!(json.get("age").is_none());
        assert_eq!(json["name"], "Mary");
        assert_eq!(json["favoriteFoods"][1], "tofu");
    }

    #[test]
    fn parses_wire_and_column_field_names() {
        let field: Field = "favoriteFoods".parse().unwrap();
        assert_eq!(field, Field::FavoriteFoods);

        let field: Field = "_id".parse().unwrap();
        assert_eq!(field, Field::Id);
        assert!("shoeSize".parse::<Field>().is_err());
    }
}
