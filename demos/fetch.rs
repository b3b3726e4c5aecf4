//! Fetch Example
//!
//! Fetches a URL with the default policy (5 attempts, 1s apart, 10s per
//! attempt) and prints the body. Run with:
//!
//! ```text
//! cargo run --example fetch -- https://httpbin.org/status/503,200
//! ```

use bytes::Bytes;
use steadyget::{perform_reliable_request, ObserveError, RetryPolicy};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let url = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "https://example.com".to_string());

    let print_body = |body: Bytes| -> Result<(), ObserveError> {
        println!("{}", String::from_utf8_lossy(&body));
        Ok(())
    };

    match perform_reliable_request(&url, &print_body, RetryPolicy::default()).await {
        Ok(delivery) => tracing::info!(
            attempts = delivery.attempts,
            status = delivery.status,
            elapsed = ?delivery.elapsed,
            "delivered"
        ),
        Err(e) if e.is_retryable() => {
            tracing::error!(attempts = e.attempts(), "server never cooperated: {}", e);
            std::process::exit(2);
        }
        Err(e) => {
            tracing::error!("request failed: {}", e);
            std::process::exit(1);
        }
    }
}
