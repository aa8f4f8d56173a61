use anyhow::Context;
use tracing::info;

use campus_rs::AppState;
use campus_rs::config::ConfigLoader;
use campus_rs::db::{establish_async_connection_pool, run_pending_migrations};
use campus_rs::logger::init_logger;
use campus_rs::models::ProfileQuery;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = ConfigLoader::new()
        .and_then(|loader| loader.load())
        .context("Failed to load configuration")?;

    init_logger(settings.logger.clone().into_logger_config()?)?;
    info!(
        name = %settings.application.name,
        version = %settings.application.version,
        "Starting"
    );

    let pool = establish_async_connection_pool(&settings.database)
        .await
        .context("Failed to create database pool")?;

    if settings.database.auto_migrate {
        let applied = run_pending_migrations(&settings.database.url).await?;
        info!(applied, "Migrations applied");
    }

    let state = AppState::postgres(pool, &settings);
    let services = &state.services;
    let ctx = state.request_ctx();
    let all = ProfileQuery::default();

    let directors = services.directors.count(&ctx, &all).await?;
    let headmasters = services.headmasters.count(&ctx, &all).await?;
    let teachers = services.teachers.count(&ctx, &all).await?;
    let students = services.students.count(&ctx, &all).await?;
    let owners = services.owners.count(&ctx, &all).await?;
    info!(directors, headmasters, teachers, students, owners, "Profile totals");

    Ok(())
}
