//! # peopledb 서버 진입점
//!
//! 이 파일이 수행하는 작업:
//! 1. 환경변수(config/.env 또는 .env) 로딩
//! 2. 로깅(tracing) 초기화
//! 3. 저장소 연결 및 마이그레이션 (실패하면 즉시 종료)
//! 4. CRUD 데모 시나리오 실행 (RUN_DEMO)
//! 5. HTTP 서버 시작, Ctrl+C로 종료
//! 6. 저장소 연결 해제

use anyhow::{Context, Result};
use peopledb::{
    config::Config,
    db::{Store, StoreConfig},
    demo,
    repository::PersonRepository,
    routes::{self, AppState},
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // config/.env가 없으면 현재 디렉토리의 .env를 시도합니다. 둘 다 없어도 괜찮습니다.
    if dotenvy::from_path("config/.env").is_err() {
        dotenvy::dotenv().ok();
    }

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "peopledb=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // 설정이 없거나 잘못되면 치명적 에러로 종료합니다.
    let config = Config::from_env().context("invalid configuration")?;

    let store = Store::connect(&StoreConfig {
        database_url: config.database_url.clone(),
        max_connections: config.max_connections,
    })
    .await
    .context("failed to connect to the document store")?;

    let people = PersonRepository::new(store.clone());

    if config.run_demo {
        demo::run(&people, &demo::steps()).await;
    }

    // 바인딩이나 서버 실행이 실패해도 저장소 연결은 닫고 에러를 돌려줍니다.
    let served = serve(&config, people).await;
    store.close().await;
    served
}

/// HTTP 서버를 띄우고 Ctrl+C가 들어올 때까지 요청을 처리합니다.
async fn serve(config: &Config, people: PersonRepository) -> Result<()> {
    let app = routes::router(AppState { people });

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}
