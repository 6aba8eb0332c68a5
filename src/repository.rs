//! # 사람(Person) 저장소 façade
//!
//! `PersonRepository`는 문서 컬렉션 위의 좁고 타입이 있는 인터페이스입니다.
//! 경계에서 검증과 기본값 적용을 하고, 실제 SQL은 `db` 모듈에 맡깁니다.
//!
//! 모든 연산은 호출자가 순서대로 await하는 단일 요청/응답 호출입니다.
//! 내부 병렬성, 재시도, 캐시는 없습니다.

use chrono::{SubsecRound, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::db::{self, FindOptions, Store};
use crate::error::AppError;
use crate::models::*;

/// `people` 컬렉션에 대한 저장소
///
/// `Store` 핸들을 주입받습니다. clone해도 같은 연결 풀을 공유합니다.
#[derive(Debug, Clone)]
pub struct PersonRepository {
    store: Store,
}

impl PersonRepository {
    pub fn new(store: Store) -> Self {
        Self { store }
    }

    fn pool(&self) -> &SqlitePool {
        self.store.pool()
    }

    /// 새 사람을 만들고 저장합니다.
    ///
    /// 필수 필드가 없으면 `Validation` 에러, `age`가 없으면 18로 채웁니다.
    pub async fn create(&self, fields: NewPerson) -> Result<Person, AppError> {
        let person = prepare(fields)?;
        db::insert_person(self.pool(), &person).await?;
        tracing::info!(id = %person.id, name = %person.name, "Created person");
        Ok(person)
    }

    /// 여러 사람을 한 번에 저장합니다.
    ///
    /// 모든 원소를 먼저 검증하고, 하나라도 잘못되면 아무것도 쓰지 않고 `Validation` 에러를 반환합니다.
    /// 삽입은 하나의 트랜잭션이므로 중간에 실패하면(예: 중복 email) 전체가 롤백됩니다.
    pub async fn create_many(&self, batch: Vec<NewPerson>) -> Result<Vec<Person>, AppError> {
        let people = batch
            .into_iter()
            .enumerate()
            .map(|(i, fields)| prepare(fields).map_err(|e| in_batch(i, e)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut tx = self.pool().begin().await?;
        for person in &people {
            db::insert_person(&mut *tx, person).await?;
        }
        tx.commit().await?;

        tracing::info!(count = people.len(), "Created people");
        Ok(people)
    }

    /// 조건에 맞는 모든 사람. 빈 조건은 전체와 일치합니다.
    pub async fn find(&self, criteria: &Criteria) -> Result<Vec<Person>, AppError> {
        let options = FindOptions::default();
        let people = db::find_people(self.pool(), criteria, options).await?;
        tracing::debug!(count = people.len(), "Found people");
        Ok(people)
    }

    /// 조건에 맞는 첫 사람. 없으면 `Ok(None)`입니다.
    pub async fn find_one(&self, criteria: &Criteria) -> Result<Option<Person>, AppError> {
        let options = FindOptions {
            sort: None,
            limit: Some(1),
        };
        let mut people = db::find_people(self.pool(), criteria, options).await?;
        Ok(people.pop())
    }

    /// 식별자로 조회합니다. 형식이 잘못된 식별자는 `InvalidArgument`입니다.
    pub async fn find_by_id(&self, id: &str) -> Result<Option<Person>, AppError> {
        let id = parse_id(id)?;
        db::find_person_by_id(self.pool(), &id).await
    }

    /// 불러오기 → 수정 → 저장 (read-modify-write).
    ///
    /// 낙관적 동시성 검사가 없으므로 동시에 실행되는 mutator끼리는 경쟁할 수 있습니다.
    /// 원자적인 수정이 필요하면 `find_one_and_update`를 사용하세요.
    /// `mutator`가 `id`나 `created_at`을 바꿔도 저장 전에 원래 값으로 되돌립니다.
    pub async fn load_mutate_save<F>(&self, id: &str, mutator: F) -> Result<Person, AppError>
    where
        F: FnOnce(&mut Person),
    {
        let mut person = self.find_by_id(id).await?.ok_or(AppError::NotFound)?;
        let (id, created_at) = (person.id.clone(), person.created_at);

        mutator(&mut person);
        person.id = id;
        person.created_at = created_at;
        person.validate()?;

        if !db::save_person(self.pool(), &person).await? {
            // 불러온 뒤 저장 전에 다른 호출자가 삭제한 경우
            return Err(AppError::NotFound);
        }

        tracing::info!(id = %person.id, "Saved person");
        Ok(person)
    }

    /// 조건에 맞는 첫 사람에 patch를 원자적으로 적용합니다.
    ///
    /// 일치하는 사람이 없으면 아무것도 바꾸지 않고 `Ok(None)`을 반환합니다.
    pub async fn find_one_and_update(
        &self,
        criteria: &Criteria,
        patch: PersonPatch,
    ) -> Result<Option<Person>, AppError> {
        patch.validate()?;
        let pool = self.pool();
        let updated = db::find_one_and_update(pool, criteria, &patch).await?;

        match &updated {
            Some(person) => tracing::info!(id = %person.id, "Updated person"),
            None => tracing::debug!("No person matched for update"),
        }
        Ok(updated)
    }

    /// 삭제된 사람을 반환합니다. 없으면 `Ok(None)`입니다.
    pub async fn delete_by_id(&self, id: &str) -> Result<Option<Person>, AppError> {
        let id = parse_id(id)?;
        let removed = db::delete_person(self.pool(), &id).await?;
        if removed.is_some() {
            tracing::info!(%id, "Removed person");
        }
        Ok(removed)
    }

    /// 조건에 맞는 사람을 모두 삭제하고 삭제된 수를 반환합니다.
    ///
    /// 일치하는 사람이 없어도 실패하지 않고 0을 반환합니다.
    pub async fn delete_many(&self, criteria: &Criteria) -> Result<u64, AppError> {
        let removed = db::delete_people(self.pool(), criteria).await?;
        tracing::info!(removed, "Deleted people");
        Ok(removed)
    }

    pub async fn count(&self, criteria: &Criteria) -> Result<u64, AppError> {
        db::count_people(self.pool(), criteria).await
    }

    /// 체이닝 쿼리를 시작합니다. `execute`를 호출하기 전에는 I/O가 없습니다.
    pub fn query(&self, criteria: Criteria) -> PersonQuery<'_> {
        PersonQuery {
            repository: self,
            criteria,
            sort: None,
            limit: None,
            excluded: Vec::new(),
        }
    }
}

/// 체이닝 쿼리 빌더: 필터 → 정렬 → 개수 제한 → 필드 제외
///
/// ```ignore
/// let people = repository
///     .query(Criteria::new().contains(Field::FavoriteFoods, "burritos"))
///     .sort_by(Field::Name, SortOrder::Ascending)
///     .limit(2)
///     .exclude_fields([Field::Age])
///     .execute()
///     .await?;
/// ```
#[derive(Debug)]
#[must_use = "a query does nothing until `execute` is awaited"]
pub struct PersonQuery<'r> {
    repository: &'r PersonRepository,
    criteria: Criteria,
    sort: Option<(Field, SortOrder)>,
    limit: Option<u64>,
    excluded: Vec<Field>,
}

impl PersonQuery<'_> {
    pub fn sort_by(mut self, field: Field, order: SortOrder) -> Self {
        self.sort = Some((field, order));
        self
    }

    pub fn limit(mut self, n: u64) -> Self {
        self.limit = Some(n);
        self
    }

    /// 결과에서 뺄 필드. `id`는 뺄 수 없으며 `execute`에서 `InvalidArgument`가 됩니다.
    pub fn exclude_fields(mut self, fields: impl IntoIterator<Item = Field>) -> Self {
        self.excluded.extend(fields);
        self
    }

    pub async fn execute(self) -> Result<Vec<PersonView>, AppError> {
        if self.excluded.contains(&Field::Id) {
            return Err(AppError::InvalidArgument("id cannot be excluded".to_string()));
        }

        let options = FindOptions {
            sort: self.sort,
            limit: self.limit,
        };
        let pool = self.repository.pool();
        let people = db::find_people(pool, &self.criteria, options).await?;

        let views = people
            .into_iter()
            .map(|person| PersonView::project(person, &self.excluded))
            .collect();
        Ok(views)
    }
}

// 저장소가 부여하는 값(id, createdAt)을 채우고 검증합니다.
// createdAt은 저장 형식(밀리초)에 맞춰 잘라서, 반환값과 다시 읽은 값이 같게 합니다.
fn prepare(fields: NewPerson) -> Result<Person, AppError> {
    let id = Uuid::now_v7().to_string();
    fields.into_person(id, Utc::now().trunc_subsecs(3))
}

// 배치 안의 검증 실패에는 몇 번째 원소인지 붙입니다.
fn in_batch(index: usize, err: AppError) -> AppError {
    match err {
        AppError::Validation(msg) => AppError::Validation(format!("item {index}: {msg}")),
        other => other,
    }
}

fn parse_id(id: &str) -> Result<String, AppError> {
    Uuid::parse_str(id)
        .map(|uuid| uuid.to_string())
        .map_err(|_| AppError::InvalidArgument(format!("'{id}' is not a valid person id")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::StoreConfig;
    use crate::demo::sample_people;

    async fn repository() -> PersonRepository {
        let store = Store::connect(&StoreConfig::in_memory()).await.unwrap();
        PersonRepository::new(store)
    }

    fn everyone() -> Criteria {
        Criteria::new()
    }

    fn named(name: &str) -> Criteria {
        Criteria::new().eq(Field::Name, name)
    }

    fn liking(food: &str) -> Criteria {
        Criteria::new().contains(Field::FavoriteFoods, food)
    }

    #[tokio::test]
    async fn create_assigns_id_timestamp_and_default_age() {
        let repo = repository().await;
        let fields = NewPerson::named("John Doe").favorite_foods(["pizza"]);
        let created = repo.create(fields).await.unwrap();

        assert!(Uuid::parse_str(&created.id).is_ok());
        assert_eq!(created.age, DEFAULT_AGE);

        let found = repo.find_by_id(&created.id).await.unwrap();
        assert_eq!(found, Some(created));
    }

    #[tokio::test]
    async fn create_without_name_fails_and_writes_nothing() {
        let repo = repository().await;
        let fields = NewPerson::default().age(30);
        let err = repo.create(fields).await.unwrap_err();

        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(repo.count(&everyone()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn create_many_is_all_or_nothing_on_invalid_item() {
        let repo = repository().await;
        let mut batch = sample_people();
        batch.push(NewPerson::named(""));

        match repo.create_many(batch).await.unwrap_err() {
            AppError::Validation(msg) => assert!(msg.starts_with("item 3")),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(repo.count(&everyone()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn create_many_rolls_back_on_duplicate_email() {
        let repo = repository().await;
        let batch = vec![
            NewPerson::named("Ann").email("ann@example.com"),
            NewPerson::named("Anne").email("ann@example.com"),
        ];

        let err = repo.create_many(batch).await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(repo.count(&everyone()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn find_by_name_and_find_one_by_food() {
        let repo = repository().await;
        repo.create_many(sample_people()).await.unwrap();

        let marys = repo.find(&named("Mary")).await.unwrap();
        assert_eq!(marys.len(), 2);

        let fan = repo.find_one(&liking("burritos")).await.unwrap();
        assert_eq!(fan.unwrap().name, "Steve");

        let nobody = repo.find_one(&liking("sushi")).await.unwrap();
        assert!(nobody.is_none());
    }

    #[tokio::test]
    async fn malformed_id_is_invalid_argument() {
        let repo = repository().await;
        let err = repo.find_by_id("not-an-id").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));

        let err = repo.delete_by_id("42").await.unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn load_mutate_save_appends_food() {
        let repo = repository().await;
        let person = repo.create(NewPerson::named("John Doe")).await.unwrap();

        let saved = repo
            .load_mutate_save(&person.id, |p| p.favorite_foods.push("hamburger".into()))
            .await
            .unwrap();
        assert_eq!(saved.favorite_foods, ["hamburger"]);

        let reloaded = repo.find_by_id(&person.id).await.unwrap().unwrap();
        assert_eq!(reloaded.favorite_foods, ["hamburger"]);
    }

    #[tokio::test]
    async fn load_mutate_save_keeps_id_and_created_at() {
        let repo = repository().await;
        let person = repo.create(NewPerson::named("John Doe")).await.unwrap();

        let saved = repo
            .load_mutate_save(&person.id, |p| {
                p.id = "hijacked".into();
                p.created_at = Utc::now();
                p.age = 31;
            })
            .await
            .unwrap();

        assert_eq!(saved.id, person.id);
        assert_eq!(saved.created_at, person.created_at);
        assert_eq!(saved.age, 31);
    }

    #[tokio::test]
    async fn load_mutate_save_missing_is_not_found() {
        let repo = repository().await;
        let missing = Uuid::now_v7().to_string();

        let err = repo.load_mutate_save(&missing, |_| {}).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound));
    }

    #[tokio::test]
    async fn load_mutate_save_rejects_invalid_mutation() {
        let repo = repository().await;
        let person = repo.create(NewPerson::named("John Doe")).await.unwrap();

        let err = repo
            .load_mutate_save(&person.id, |p| p.name.clear())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let reloaded = repo.find_by_id(&person.id).await.unwrap().unwrap();
        assert_eq!(reloaded.name, "John Doe");
    }

    #[tokio::test]
    async fn find_one_and_update_changes_only_patched_fields() {
        let repo = repository().await;
        repo.create_many(sample_people()).await.unwrap();

        let patch = PersonPatch {
            age: Some(20),
            ..PersonPatch::default()
        };
        let updated = repo
            .find_one_and_update(&named("Steve"), patch)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(updated.age, 20);
        assert_eq!(updated.name, "Steve");
        assert_eq!(updated.favorite_foods, ["steak", "burritos"]);
    }

    #[tokio::test]
    async fn find_one_and_update_without_match_changes_nothing() {
        let repo = repository().await;
        let before = repo.create_many(sample_people()).await.unwrap();

        let patch = PersonPatch {
            age: Some(99),
            ..PersonPatch::default()
        };
        let updated = repo
            .find_one_and_update(&named("Nobody"), patch)
            .await
            .unwrap();
        assert!(updated.is_none());

        let after = repo.find(&everyone()).await.unwrap();
        assert_eq!(after, before);
    }

    #[tokio::test]
    async fn delete_by_id_returns_removed_person() {
        let repo = repository().await;
        let person = repo.create(NewPerson::named("John Doe")).await.unwrap();

        let removed = repo.delete_by_id(&person.id).await.unwrap();
        assert_eq!(removed, Some(person.clone()));
        assert!(repo.find_by_id(&person.id).await.unwrap().is_none());
        assert!(repo.delete_by_id(&person.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_many_counts_removed() {
        let repo = repository().await;
        repo.create_many(sample_people()).await.unwrap();

        let removed = repo.delete_many(&named("Mary")).await.unwrap();
        assert_eq!(removed, 2);

        let removed = repo.delete_many(&named("Mary")).await.unwrap();
        assert_eq!(removed, 0);
    }

    #[tokio::test]
    async fn query_chain_sorts_limits_and_projects() {
        let repo = repository().await;
        repo.create_many(sample_people()).await.unwrap();

        let people = repo
            .query(liking("burritos"))
            .sort_by(Field::Name, SortOrder::Ascending)
            .limit(2)
            .exclude_fields([Field::Age])
            .execute()
            .await
            .unwrap();

        let names: Vec<_> = people.iter().filter_map(|p| p.name.as_deref()).collect();
        assert_eq!(names, ["Mary", "Steve"]);
        assert!(people.iter().all(|p| p.age.is_none()));
    }

    #[tokio::test]
    async fn query_limit_zero_returns_every_match() {
        let repo = repository().await;
        repo.create_many(sample_people()).await.unwrap();

        let people = repo.query(named("Mary")).limit(0).execute().await;
        assert_eq!(people.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn query_descending_and_excluding_id_fails() {
        let repo = repository().await;
        repo.create_many(sample_people()).await.unwrap();

        let people = repo
            .query(everyone())
            .sort_by(Field::Age, SortOrder::Descending)
            .execute()
            .await
            .unwrap();
        let ages: Vec<_> = people.iter().filter_map(|p| p.age).collect();
        assert_eq!(ages, [40, 25, 22]);

        let err = repo
            .query(everyone())
            .exclude_fields([Field::Id])
            .execute()
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn operations_after_close_are_store_unavailable() {
        let store = Store::connect(&StoreConfig::in_memory()).await.unwrap();
        let repo = PersonRepository::new(store.clone());
        store.close().await;

        let err = repo.find(&everyone()).await.unwrap_err();
        assert!(matches!(err, AppError::StoreUnavailable(_)));
        assert!(err.is_retryable());
    }
}
