//! Kleo rewards service: binary entrypoint.
//! Boots the Axum HTTP server with config, storage and the submission pipeline wired in.

use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    kleo_rewards::logging::init_tracing();

    let router = kleo_rewards::api::app()?;
    Ok(router.into())
}
