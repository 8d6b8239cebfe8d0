use axum::{extract::State, routing::get, Json, Router};
use mongodb::bson::doc;
use serde::Serialize;
use storefront::{config::AppConfig, db, state::AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Serialize)]
struct Health {
    status: &'static str,
    database: &'static str,
}

async fn health(State(state): State<AppState>) -> Json<Health> {
    let database = match state.database.run_command(doc! { "ping": 1 }).await {
        Ok(_) => "ok",
        Err(e) => {
            tracing::warn!("Health check ping failed: {}", e);
            "unavailable"
        }
    };
    Json(Health {
        status: "ok",
        database,
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = match AppConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            std::process::exit(1);
        }
    };

    let client = match db::connect(&config.mongo).await {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("Failed to connect to MongoDB: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = db::create_indices(&client.database(&config.mongo.database)).await {
        tracing::error!("Failed to create indices: {}", e);
        std::process::exit(1);
    }

    let app = Router::new()
        .route("/health", get(health))
        .with_state(AppState::new(&client, &config));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!("Failed to bind {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    tracing::info!("Server running on {}", addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
