//! # CRUD 데모 시나리오
//!
//! 저장소의 모든 연산을 정해진 순서대로 한 번씩 실행합니다.
//! 실행 순서는 `steps()`가 돌려주는 목록 그대로이며, 숨겨진 순서는 없습니다.
//!
//! 각 단계의 실패는 로그로 남기고 다음 단계로 넘어갑니다. 프로세스를 멈추지 않습니다.

use crate::error::AppError;
use crate::models::*;
use crate::repository::PersonRepository;

#[derive(Debug, Clone, PartialEq)]
pub enum Step {
    CreateOne,
    CreateMany,
    FindByName(&'static str),
    FindOneByFood(&'static str),
    /// 이후 id 기반 단계에서 사용할 사람을 하나 고릅니다.
    PickTarget,
    FindById,
    AddFavoriteFood(&'static str),
    RemoveById,
    SetAgeByName { name: &'static str, age: i64 },
    RemoveByName(&'static str),
    QueryChain { food: &'static str, limit: u64 },
}

pub fn steps() -> Vec<Step> {
    vec![
        Step::CreateOne,
        Step::CreateMany,
        Step::FindByName("Mary"),
        Step::FindOneByFood("burritos"),
        Step::PickTarget,
        Step::FindById,
        Step::AddFavoriteFood("hamburger"),
        Step::RemoveById,
        Step::SetAgeByName {
            name: "Steve",
            age: 20,
        },
        Step::RemoveByName("Mary"),
        Step::QueryChain {
            food: "burritos",
            limit: 2,
        },
    ]
}

pub fn sample_people() -> Vec<NewPerson> {
    vec![
        sample("Mary", 25, ["salad", "tofu"]),
        sample("Steve", 40, ["steak", "burritos"]),
        sample("Mary", 22, ["pizza", "burritos"]),
    ]
}

fn sample(name: &str, age: i64, foods: [&str; 2]) -> NewPerson {
    NewPerson::named(name).age(age).favorite_foods(foods)
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DemoReport {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
}

enum Outcome {
    Done,
    Skipped,
}

/// 단계들을 순서대로 실행하고 결과를 집계합니다.
pub async fn run(repository: &PersonRepository, steps: &[Step]) -> DemoReport {
    let mut report = DemoReport::default();
    let mut target: Option<String> = None;

    for step in steps {
        match run_step(repository, step, &mut target).await {
            Ok(Outcome::Done) => report.succeeded += 1,
            Ok(Outcome::Skipped) => {
                tracing::warn!(?step, "Skipped: no target person");
                report.skipped += 1;
            }
            Err(e) => {
                tracing::error!(?step, error = %e, "Step failed");
                report.failed += 1;
            }
        }
    }

    tracing::info!(
        succeeded = report.succeeded,
        failed = report.failed,
        skipped = report.skipped,
        "Demo finished"
    );
    report
}

async fn run_step(
    repository: &PersonRepository,
    step: &Step,
    target: &mut Option<String>,
) -> Result<Outcome, AppError> {
    match step {
        Step::CreateOne => {
            let fields = NewPerson::named("John Doe")
                .age(30)
                .favorite_foods(["pizza", "pasta"]);
            let person = repository.create(fields).await?;
            tracing::info!(?person, "Saved person");
        }
        Step::CreateMany => {
            let people = repository.create_many(sample_people()).await?;
            tracing::info!(count = people.len(), "Created many people");
        }
        Step::FindByName(name) => {
            let criteria = Criteria::new().eq(Field::Name, *name);
            let people = repository.find(&criteria).await?;
            tracing::info!(?people, "People named {}", name);
        }
        Step::FindOneByFood(food) => {
            let person = repository
                .find_one(&Criteria::new().contains(Field::FavoriteFoods, *food))
                .await?;
            tracing::info!(?person, "Found one who likes {}", food);
        }
        Step::PickTarget => {
            *target = repository.find_one(&Criteria::new()).await?.map(|p| p.id);
            if target.is_none() {
                return Ok(Outcome::Skipped);
            }
        }
        Step::FindById => {
            let Some(id) = target.as_deref() else {
                return Ok(Outcome::Skipped);
            };
            let person = repository.find_by_id(id).await?;
            tracing::info!(?person, "Found person by id");
        }
        Step::AddFavoriteFood(food) => {
            let Some(id) = target.as_deref() else {
                return Ok(Outcome::Skipped);
            };
            let person = repository
                .load_mutate_save(id, |p| p.favorite_foods.push((*food).to_string()))
                .await?;
            tracing::info!(?person, "Added {} and saved", food);
        }
        Step::RemoveById => {
            let Some(id) = target.take() else {
                return Ok(Outcome::Skipped);
            };
            let removed = repository.delete_by_id(&id).await?;
            tracing::info!(?removed, "Removed person by id");
        }
        Step::SetAgeByName { name, age } => {
            let patch = PersonPatch {
                age: Some(*age),
                ..PersonPatch::default()
            };
            let updated = repository
                .find_one_and_update(&Criteria::new().eq(Field::Name, *name), patch)
                .await?;
            tracing::info!(?updated, "Updated age to {}", age);
        }
        Step::RemoveByName(name) => {
            let deleted = repository
                .delete_many(&Criteria::new().eq(Field::Name, *name))
                .await?;
            tracing::info!(deleted, "Deleted all entries named {}", name);
        }
        Step::QueryChain { food, limit } => {
            let people = repository
                .query(Criteria::new().contains(Field::FavoriteFoods, *food))
                .sort_by(Field::Name, SortOrder::Ascending)
                .limit(*limit)
                .exclude_fields([Field::Age])
                .execute()
                .await?;
            tracing::info!(?people, "Query chain result");
        }
    }
    Ok(Outcome::Done)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Store, StoreConfig};

    #[tokio::test]
    async fn full_scenario_runs_every_step() {
        let store = Store::connect(&StoreConfig::in_memory()).await.unwrap();
        let repository = PersonRepository::new(store);

        let report = run(&repository, &steps()).await;
        let expected = DemoReport {
            succeeded: steps().len(),
            ..DemoReport::default()
        };
        assert_eq!(report, expected);

        // John Doe가 대상으로 골라져 삭제되고, Mary 둘이 삭제되어 Steve만 남습니다.
        let left = repository.find(&Criteria::new()).await.unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].name, "Steve");
        assert_eq!(left[0].age, 20);
    }

    #[tokio::test]
    async fn id_steps_are_skipped_on_empty_store() {
        let store = Store::connect(&StoreConfig::in_memory()).await.unwrap();
        let repository = PersonRepository::new(store);

        let steps = [Step::PickTarget, Step::FindById, Step::RemoveById];
        let report = run(&repository, &steps).await;
        assert_eq!(report.skipped, 3);
    }

    #[tokio::test]
    async fn failures_do_not_stop_the_run() {
        let store = Store::connect(&StoreConfig::in_memory()).await.unwrap();
        let repository = PersonRepository::new(store.clone());
        store.close().await;

        let steps = [Step::CreateOne, Step::FindByName("Mary")];
        let report = run(&repository, &steps).await;
        assert_eq!(report.failed, 2);
    }
}
