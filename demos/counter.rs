//! Session Counter Example
//!
//! Counts requests per visitor and remembers when each visitor was last seen.
//!
//! # Usage
//!
//! ```bash
//! # With Redis
//! REDIS_URL=redis://localhost:6379 cargo run --example counter
//!
//! # Without REDIS_URL sessions are kept in process memory
//! cargo run --example counter
//!
//! # Keep the cookie between requests
//! curl -c jar -b jar http://localhost:3000/
//! ```

use chrono::{DateTime, Utc};
use hashsession::prelude::*;
use http_body_util::Full;
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::{Request, Response};
use hyper_util::rt::TokioIo;
use hyper_util::service::TowerToHyperService;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::{ServiceBuilder, service_fn};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

const COUNTER: &str = "Counter";
const LAST_ACCESS: &str = "LastAccess";

async fn visit(req: Request<Incoming>) -> Result<Response<Full<Bytes>>, Infallible> {
    let Some(session) = req.session() else {
        return Ok(Response::new(Full::new(Bytes::from_static(b"no session"))));
    };

    let count = session.get::<u64>(COUNTER) + 1;
    let previous = session.try_get::<DateTime<Utc>>(LAST_ACCESS);

    if let Err(e) = session
        .set(COUNTER, &count)
        .and_then(|_| session.set(LAST_ACCESS, &Utc::now()))
    {
        error!("Failed to update session: {}", e);
    }

    let body = match previous {
        Some(at) => format!("Visit #{count} (last seen {at})\n"),
        None => format!("Visit #{count}\n"),
    };

    Ok(Response::new(Full::new(Bytes::from(body))))
}

async fn build_store() -> Arc<dyn HashStore> {
    if std::env::var("REDIS_URL").is_ok() {
        let config = RedisConfig::from_env().build();
        match RedisService::new(config).await {
            Ok(redis) => {
                let stats = redis.pool_stats();
                info!(
                    "Using Redis session store {} ({} connections, {} idle)",
                    redis.config().target_name(),
                    stats.connections,
                    stats.idle_connections
                );
                return Arc::new(redis);
            }
            Err(e) => warn!("Redis unavailable, falling back to memory: {}", e),
        }
    }

    info!("Using in-memory session store");
    Arc::new(MemoryHashStore::new("memory"))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let options = SessionOptions::builder()
        .store(build_store().await)
        .settings(SessionSettings::from_env()?)
        .tracer(TracingTracer::factory())
        .build()?;

    let service = ServiceBuilder::new()
        .layer(SessionLayer::new(options))
        .service(service_fn(visit));

    let addr = SocketAddr::from(([127, 0, 0, 1], 3000));
    let listener = TcpListener::bind(addr).await?;
    info!("Listening on http://{}", addr);

    loop {
        let (stream, _) = listener.accept().await?;
        let io = TokioIo::new(stream);
        let service = TowerToHyperService::new(service.clone());

        tokio::spawn(async move {
            if let Err(e) = http1::Builder::new().serve_connection(io, service).await {
                error!("Connection error: {}", e);
            }
        });
    }
}
