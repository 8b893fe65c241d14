use dietlog::{app, state::AppState};

fn init_tracing() {
    let env_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "dietlog=debug,axum=info,tower_http=info".to_string());
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter);

    match std::env::var("LOG_FORMAT").as_deref() {
        Ok("json") => builder.with_target(false).json().init(),
        _ => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let state = AppState::init()?;
    let addr = state.config.addr()?;
    tracing::info!(
        max_sessions = state.config.max_sessions,
        session_ttl_secs = state.config.session_ttl_secs,
        "diet selection service starting"
    );

    // Idle sessions are also swept on create; this covers quiet periods.
    state.sessions.spawn_sweeper(state.config.sweep_period());

    app::serve(app::build_app(state), addr).await
}
