//! # 조회 조건(Criteria)
//!
//! 필드 이름 → 기대값/술어(predicate)의 매핑입니다. 모든 조건은 AND로 결합되며,
//! 조건이 없으면 모든 레코드와 일치합니다.
//!
//! ```ignore
//! let criteria = Criteria::new()
//!     .contains(Field::FavoriteFoods, "burritos")
//!     .eq(Field::Name, "Mary");
//! ```

use serde_json::Value as JsonValue;

use super::person::Field;
use crate::error::AppError;

/// 조건에 사용되는 값
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Text(String),
    Int(i64),
    List(Vec<String>),
    Null,
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Value::List(v)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Eq(Value),
    /// 시퀀스 필드가 해당 원소를 포함
    Contains(String),
    Gte(i64),
    Lte(i64),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    pub field: Field,
    pub predicate: Predicate,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Criteria {
    conditions: Vec<Condition>,
}

impl Criteria {
    /// 모든 레코드와 일치하는 빈 조건
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(self, field: Field, value: impl Into<Value>) -> Self {
        self.with(field, Predicate::Eq(value.into()))
    }

    pub fn contains(self, field: Field, item: impl Into<String>) -> Self {
        self.with(field, Predicate::Contains(item.into()))
    }

    pub fn gte(self, field: Field, bound: i64) -> Self {
        self.with(field, Predicate::Gte(bound))
    }

    pub fn lte(self, field: Field, bound: i64) -> Self {
        self.with(field, Predicate::Lte(bound))
    }

    pub fn with(mut self, field: Field, predicate: Predicate) -> Self {
        self.conditions.push(Condition { field, predicate });
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// JSON 객체 `{ "name": "Mary", "favoriteFoods": "burritos" }`를 조건으로 해석합니다.
    ///
    /// 시퀀스 필드에 문자열 하나를 주면 "포함"을, 배열을 주면 "완전 일치"를 뜻합니다.
    /// `{ "age": { "$gte": 20, "$lte": 30 } }` 형태의 범위 조건도 받습니다.
    pub fn from_json(value: &JsonValue) -> Result<Self, AppError> {
        let object = value
            .as_object()
            .ok_or_else(|| AppError::InvalidArgument("criteria must be a JSON object".into()))?;

        let mut criteria = Criteria::new();
        for (key, raw) in object {
            let field: Field = key.parse()?;
            criteria = match (field, raw) {
                (Field::FavoriteFoods, JsonValue::String(item)) => {
                    criteria.contains(field, item.clone())
                }
                (Field::FavoriteFoods, JsonValue::Array(_)) => criteria.eq(field, strings(raw)?),
                (Field::Age, JsonValue::Number(n)) => criteria.eq(field, as_int(field, n)?),
                (Field::Age, JsonValue::Object(range)) => {
                    let mut c = criteria;
                    for (op, bound) in range {
                        let bound = bound.as_i64().ok_or_else(|| invalid_value(field, bound))?;
                        c = match op.as_str() {
                            "$gte" => c.gte(field, bound),
                            "$lte" => c.lte(field, bound),
                            other => {
                                return Err(AppError::InvalidArgument(format!(
                                    "unsupported operator '{other}' on {field}"
                                )));
                            }
                        };
                    }
                    c
                }
                (Field::Email, JsonValue::Null) => criteria.eq(field, Value::Null),
                (Field::Id | Field::Name | Field::Email, JsonValue::String(s)) => {
                    criteria.eq(field, s.clone())
                }
                (field, other) => return Err(invalid_value(field, other)),
            };
        }
        Ok(criteria)
    }
}

fn as_int(field: Field, n: &serde_json::Number) -> Result<i64, AppError> {
    n.as_i64()
        .ok_or_else(|| AppError::InvalidArgument(format!("{field} must be an integer, got {n}")))
}

fn strings(raw: &JsonValue) -> Result<Vec<String>, AppError> {
    serde_json::from_value(raw.clone())
        .map_err(|_| AppError::InvalidArgument("favoriteFoods must be an array of strings".into()))
}

fn invalid_value(field: Field, value: &JsonValue) -> AppError {
    AppError::InvalidArgument(format!("unsupported value for {field}: {value}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn string_on_sequence_field_means_contains() {
        let raw = json!({ "favoriteFoods": "burritos" });
        let criteria = Criteria::from_json(&raw).unwrap();

        let first = &criteria.conditions()[0];
        assert_eq!(first.field, Field::FavoriteFoods);
        assert_eq!(first.predicate, Predicate::Contains("burritos".into()));
    }

    #[test]
    fn array_on_sequence_field_means_exact_match() {
        let raw = json!({ "favoriteFoods": ["steak", "burritos"] });
        let criteria = Criteria::from_json(&raw).unwrap();

        let expected = Value::List(vec!["steak".into(), "burritos".into()]);
        assert_eq!(criteria.conditions()[0].predicate, Predicate::Eq(expected));
    }

    #[test]
    fn empty_object_matches_everything() {
        assert!(Criteria::from_json(&json!({})).unwrap().is_empty());
    }

    #[test]
    fn age_range_operators() {
        let raw = json!({ "age": { "$gte": 20 } });
        let criteria = Criteria::from_json(&raw).unwrap();
        assert_eq!(criteria.conditions()[0].predicate, Predicate::Gte(20));
    }

    #[test]
    fn unknown_field_is_invalid_argument() {
        let raw = json!({ "shoeSize": 42 });
        let err = Criteria::from_json(&raw).unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[test]
    fn ill_typed_value_is_invalid_argument() {
        let err = Criteria::from_json(&json!({ "name": 7 })).unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));

        let raw = json!({ "age": "old" });
        let err = Criteria::from_json(&raw).unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));

        let raw = json!({ "age": { "$between": [1, 2] } });
        let err = Criteria::from_json(&raw).unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }
}
