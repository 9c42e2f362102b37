use gatekeep::{
    app::{build_app, serve},
    logging,
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    logging::init("gatekeep=debug,axum=info,tower_http=info");

    // Missing JWT_SECRET or DATABASE_URL ends the process here, before any socket is bound.
    let app_state = match AppState::init().await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "startup failed");
            std::process::exit(1);
        }
    };
    tracing::info!("connected to database");

    let host = app_state.config.host.clone();
    let port = app_state.config.port;
    let app = build_app(app_state);

    serve(app, &host, port).await
}
