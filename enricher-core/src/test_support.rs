//! Shared helpers for unit tests

use std::sync::Arc;
use std::time::Duration;

use axum::Router;

use crate::logic::credentials::StaticCredentials;
use crate::logic::fetch::{FetchClient, FetchConfig};
use crate::logic::sources::SourceContext;

/// Serve `router` on an ephemeral local port, returning its base URL
pub(crate) async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}

pub(crate) fn fetch_client() -> FetchClient {
    FetchClient::new(FetchConfig { timeout: Duration::from_secs(5), max_retries: 1 }).unwrap()
}

pub(crate) fn context(credentials: StaticCredentials) -> SourceContext {
    SourceContext::new(fetch_client(), Arc::new(credentials))
}

pub(crate) fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
