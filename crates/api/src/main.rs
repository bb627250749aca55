use anyhow::Context;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    kitroom_observability::init();

    let database_url = std::env::var("KITROOM_DATABASE_URL").unwrap_or_else(|_| {
        tracing::warn!("KITROOM_DATABASE_URL not set; using in-memory database");
        "sqlite::memory:".to_string()
    });
    let bind_addr =
        std::env::var("KITROOM_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    let db = kitroom_store::Db::connect(&database_url)
        .await
        .context("failed to open database")?;
    let app = kitroom_api::app::build_app(db);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
