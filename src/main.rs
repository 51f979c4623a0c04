//! News Localizer: binary entrypoint
//! Boots the Axum HTTP server through Shuttle; all wiring lives in the library.

use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    news_localizer::init_tracing();

    let router = news_localizer::app()
        .await
        .map_err(shuttle_runtime::Error::Custom)?;

    Ok(router.into())
}
