//! carrier - transport-agnostic RPC dispatch
//!
//! Demo service wiring the route compiler and HTTP serving loop together.

use async_trait::async_trait;
use carrier_protocol::{ErrorCode, StatusError};
use carrier_server::{
    Group, Handler, HttpServer, Operator, Reply, RequestContext, Route, RouteTable, ServeConfig,
};
use hyper::Method;
use tracing_subscriber::EnvFilter;

/// Lists the demo users.
struct ListUsers;

impl Operator for ListUsers {
    fn name(&self) -> &str {
        "ListUsers"
    }

    fn path_segment(&self) -> Option<&str> {
        Some("/users")
    }

    fn method(&self) -> Option<Method> {
        Some(Method::GET)
    }

    fn as_handler(&self) -> Option<&dyn Handler> {
        Some(self)
    }
}

#[async_trait]
impl Handler for ListUsers {
    async fn handle(&self, _cx: &RequestContext) -> Result<Reply, StatusError> {
        Reply::json(&serde_json::json!([
            {"id": "1", "name": "ada"},
            {"id": "2", "name": "grace"},
        ]))
    }
}

/// Fetches one demo user by id.
struct GetUser;

impl Operator for GetUser {
    fn name(&self) -> &str {
        "GetUser"
    }

    fn path_segment(&self) -> Option<&str> {
        Some("/users/:id")
    }

    fn method(&self) -> Option<Method> {
        Some(Method::GET)
    }

    fn as_handler(&self) -> Option<&dyn Handler> {
        Some(self)
    }
}

#[async_trait]
impl Handler for GetUser {
    async fn handle(&self, cx: &RequestContext) -> Result<Reply, StatusError> {
        let id = cx
            .param("id")
            .ok_or_else(|| StatusError::new(ErrorCode::BadRequest, "missing user id"))?;
        match id {
            "1" => Reply::json(&serde_json::json!({"id": "1", "name": "ada"})),
            "2" => Reply::json(&serde_json::json!({"id": "2", "name": "grace"})),
            _ => Err(StatusError::new(ErrorCode::NotFound, "no such user")
                .with_desc(format!("user id {}", id))),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration (from file if CARRIER_CONFIG is set, then env overrides)
    let config = match ServeConfig::load() {
        Ok(c) => {
            if let Ok(path) = std::env::var("CARRIER_CONFIG") {
                tracing::info!("Loaded config from {}", path);
            }
            c
        }
        Err(e) => {
            // If a config file was explicitly specified, fail on error
            if std::env::var("CARRIER_CONFIG").is_ok() {
                tracing::error!("Failed to load config: {}", e);
                return Err(e.into());
            }
            tracing::info!("Using default configuration");
            ServeConfig::default()
        }
    };

    tracing::info!("Starting {} server", config.name);
    tracing::info!("  Bind address: {}", config.bind_addr());
    tracing::info!("  CORS: {}", if config.with_cors { "enabled" } else { "disabled" });

    let mut table = RouteTable::new();
    table.register(Route::new().with(Group::new("/v0")).with(ListUsers));
    table.register(Route::new().with(Group::new("/v0")).with(GetUser));

    let server = HttpServer::bind(config, table).await?;
    let handle = server.shutdown_handle();

    // Spawn shutdown signal handler
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Received shutdown signal, stopping server...");
        handle.shutdown().await;
    });

    // Run server (blocks until shutdown completes)
    server.run().await?;

    tracing::info!("Server stopped");
    Ok(())
}
