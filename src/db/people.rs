//! # 사람(Person) 컬렉션 쿼리 모듈
//!
//! `people` 테이블에 대한 SQL 쿼리 함수들입니다.
//! 조회 조건(`Criteria`)은 `sqlx::QueryBuilder`로 동적 WHERE 절로 바뀌며,
//! 값은 항상 `push_bind`로 바인딩하고 컬럼 이름은 `Field::column()`의 고정 문자열만 사용합니다.
//!
//! `favorite_foods`는 JSON 배열 텍스트로 저장되며, "포함" 조건은 SQLite의 `json_each`로 평가합니다.

use chrono::SecondsFormat;
use sqlx::{QueryBuilder, Sqlite, SqliteExecutor, SqlitePool};

use crate::error::AppError;
use crate::models::*;

const COLUMNS: &str = "id, name, age, favorite_foods, email, created_at";

/// 정렬/개수 제한 옵션
#[derive(Debug, Clone, Copy, Default)]
pub struct FindOptions {
    pub sort: Option<(Field, SortOrder)>,
    pub limit: Option<u64>,
}

fn encode_foods(foods: &[String]) -> Result<String, AppError> {
    Ok(serde_json::to_string(foods)?)
}

fn encode_timestamp(person: &Person) -> String {
    person.created_at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn into_people(rows: Vec<PersonRow>) -> Result<Vec<Person>, AppError> {
    rows.into_iter().map(Person::try_from).collect()
}

/// 조건을 ` WHERE a AND b ...` 형태로 이어 붙입니다. 조건이 없으면 아무것도 붙이지 않습니다.
pub fn push_criteria(
    qb: &mut QueryBuilder<'_, Sqlite>,
    criteria: &Criteria,
) -> Result<(), AppError> {
    for (i, condition) in criteria.conditions().iter().enumerate() {
        qb.push(if i == 0 { " WHERE " } else { " AND " });
        push_condition(qb, condition)?;
    }
    Ok(())
}

fn push_condition(
    qb: &mut QueryBuilder<'_, Sqlite>,
    condition: &Condition,
) -> Result<(), AppError> {
    let field = condition.field;
    let column = field.column();

    match (&condition.predicate, field) {
        (Predicate::Eq(Value::Text(s)), Field::Id | Field::Name | Field::Email) => {
            qb.push(column).push(" = ").push_bind(s.clone());
        }
        (Predicate::Eq(Value::Int(n)), Field::Age) => {
            qb.push(column).push(" = ").push_bind(*n);
        }
        (Predicate::Eq(Value::List(items)), Field::FavoriteFoods) => {
            qb.push(column).push(" = ").push_bind(encode_foods(items)?);
        }
        (Predicate::Eq(Value::Null), Field::Email) => {
            qb.push(column).push(" IS NULL");
        }
        (Predicate::Contains(item), Field::FavoriteFoods) => {
            qb.push("EXISTS (SELECT 1 FROM json_each(people.favorite_foods)");
            qb.push(" WHERE json_each.value = ")
                .push_bind(item.clone())
                .push(")");
        }
        (Predicate::Gte(bound), Field::Age) => {
            qb.push(column).push(" >= ").push_bind(*bound);
        }
        (Predicate::Lte(bound), Field::Age) => {
            qb.push(column).push(" <= ").push_bind(*bound);
        }
        (predicate, field) => {
            return Err(AppError::InvalidArgument(format!(
                "predicate {predicate:?} cannot be applied to {field}"
            )));
        }
    }
    Ok(())
}

/// 새 레코드를 삽입합니다.
///
/// `SqliteExecutor`를 받으므로 풀(`&SqlitePool`)과 트랜잭션(`&mut *tx`) 모두에서 쓸 수 있습니다.
pub async fn insert_person<'e, E>(executor: E, person: &Person) -> Result<(), AppError>
where
    E: SqliteExecutor<'e>,
{
    sqlx::query(
        r#"
        INSERT INTO people (id, name, age, favorite_foods, email, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&person.id)
    .bind(&person.name)
    .bind(person.age)
    .bind(encode_foods(&person.favorite_foods)?)
    .bind(&person.email)
    .bind(encode_timestamp(person))
    .execute(executor)
    .await?;

    Ok(())
}

/// 조건에 맞는 레코드를 조회합니다.
///
/// 정렬이 없으면 삽입 순서(rowid)로 반환합니다. 정렬 값이 같을 때도 삽입 순서를 따릅니다.
pub async fn find_people(
    pool: &SqlitePool,
    criteria: &Criteria,
    options: FindOptions,
) -> Result<Vec<Person>, AppError> {
    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {COLUMNS} FROM people"));
    push_criteria(&mut qb, criteria)?;

    qb.push(" ORDER BY ");
    if let Some((field, order)) = options.sort {
        qb.push(field.column())
            .push(" ")
            .push(order.sql())
            .push(", ");
    }
    qb.push("rowid ASC");

    // limit 0은 "제한 없음"입니다.
    if let Some(limit) = options.limit.filter(|&n| n > 0) {
        let limit = i64::try_from(limit)
            .map_err(|_| AppError::InvalidArgument(format!("limit {limit} is too large")))?;
        qb.push(" LIMIT ").push_bind(limit);
    }

    tracing::debug!(sql = qb.sql(), "find_people");
    let rows = qb.build_query_as::<PersonRow>().fetch_all(pool).await?;
    into_people(rows)
}

pub async fn find_person_by_id(pool: &SqlitePool, id: &str) -> Result<Option<Person>, AppError> {
    let sql = format!("SELECT {COLUMNS} FROM people WHERE id = ?");
    let row = sqlx::query_as::<_, PersonRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(Person::try_from).transpose()
}

pub async fn count_people(pool: &SqlitePool, criteria: &Criteria) -> Result<u64, AppError> {
    let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM people");
    push_criteria(&mut qb, criteria)?;

    let (count,) = qb.build_query_as::<(i64,)>().fetch_one(pool).await?;
    Ok(count.max(0) as u64)
}

/// 레코드 전체를 덮어씁니다 (`id`, `created_at` 제외).
///
/// # 반환값
/// - `Ok(true)`: 저장 성공
/// - `Ok(false)`: 그 사이에 레코드가 삭제됨
pub async fn save_person(pool: &SqlitePool, person: &Person) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        UPDATE people
        SET name = ?, age = ?, favorite_foods = ?, email = ?
        WHERE id = ?
        "#,
    )
    .bind(&person.name)
    .bind(person.age)
    .bind(encode_foods(&person.favorite_foods)?)
    .bind(&person.email)
    .bind(&person.id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// 조건에 맞는 첫 레코드에 patch를 적용하고 수정된 레코드를 반환합니다.
///
/// 찾기와 쓰기가 하나의 UPDATE 문(`WHERE id = (SELECT ... LIMIT 1) RETURNING`)이므로
/// 저장소 수준에서 원자적입니다. 일치하는 레코드가 없으면 아무것도 바꾸지 않고 `None`을 반환합니다.
pub async fn find_one_and_update(
    pool: &SqlitePool,
    criteria: &Criteria,
    patch: &PersonPatch,
) -> Result<Option<Person>, AppError> {
    if patch.is_empty() {
        let options = FindOptions {
            sort: None,
            limit: Some(1),
        };
        let mut first = find_people(pool, criteria, options).await?;
        return Ok(first.pop());
    }

    let mut qb = QueryBuilder::<Sqlite>::new("UPDATE people SET ");
    {
        let mut set = qb.separated(", ");
        if let Some(name) = &patch.name {
            set.push("name = ").push_bind_unseparated(name.clone());
        }
        if let Some(age) = patch.age {
            set.push("age = ").push_bind_unseparated(age);
        }
        if let Some(foods) = &patch.favorite_foods {
            let foods = encode_foods(foods)?;
            set.push("favorite_foods = ").push_bind_unseparated(foods);
        }
        if let Some(email) = &patch.email {
            set.push("email = ").push_bind_unseparated(email.clone());
        }
    }

    qb.push(" WHERE id = (SELECT id FROM people");
    push_criteria(&mut qb, criteria)?;
    qb.push(" ORDER BY rowid ASC LIMIT 1)");
    qb.push(format!(" RETURNING {COLUMNS}"));

    tracing::debug!(sql = qb.sql(), "find_one_and_update");
    let query = qb.build_query_as::<PersonRow>();
    let row = query.fetch_optional(pool).await?;
    row.map(Person::try_from).transpose()
}

/// 레코드를 삭제하고 삭제된 레코드를 반환합니다.
pub async fn delete_person(pool: &SqlitePool, id: &str) -> Result<Option<Person>, AppError> {
    let sql = format!("DELETE FROM people WHERE id = ? RETURNING {COLUMNS}");
    let row = sqlx::query_as::<_, PersonRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await?;

    row.map(Person::try_from).transpose()
}

/// 조건에 맞는 레코드를 모두 삭제하고 삭제된 개수를 반환합니다.
pub async fn delete_people(pool: &SqlitePool, criteria: &Criteria) -> Result<u64, AppError> {
    let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM people");
    push_criteria(&mut qb, criteria)?;

    let result = qb.build().execute(pool).await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sql_for(criteria: &Criteria) -> Result<String, AppError> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT id FROM people");
        push_criteria(&mut qb, criteria)?;
        Ok(qb.sql().to_string())
    }

    #[test]
    fn empty_criteria_has_no_where_clause() {
        let sql = sql_for(&Criteria::new()).unwrap();
        assert_eq!(sql, "SELECT id FROM people");
    }

    #[test]
    fn conditions_are_joined_with_and() {
        let criteria = Criteria::new().eq(Field::Name, "Mary");
        let sql = sql_for(&criteria.gte(Field::Age, 20)).unwrap();
        assert_eq!(sql, "SELECT id FROM people WHERE name = ? AND age >= ?");
    }

    #[test]
    fn contains_uses_json_each() {
        let criteria = Criteria::new().contains(Field::FavoriteFoods, "burritos");
        let sql = sql_for(&criteria).unwrap();
        assert!(sql.contains("json_each(people.favorite_foods)"));
    }

    #[test]
    fn mismatched_predicate_is_rejected() {
        let criteria = Criteria::new().contains(Field::Name, "ar");
        let err = sql_for(&criteria).unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));

        let criteria = Criteria::new().eq(Field::Age, "old");
        let err = sql_for(&criteria).unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }
}
