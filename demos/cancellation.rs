//! Cancellation Example
//!
//! Starts a reliable request against an address nothing listens on and
//! cancels it after two seconds, while it is waiting between attempts.

use std::time::Duration;

use bytes::Bytes;
use steadyget::{
    CancellationToken, ObserveError, ReliableRequester, ReqwestConnector, RetryPolicy,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let requester = ReliableRequester::new(
        ReqwestConnector::new().with_user_agent("steadyget-demo"),
        RetryPolicy::constant(Duration::from_millis(750))
            .with_max_attempts(20)
            .with_per_attempt_timeout(Duration::from_secs(2)),
    )
    .with_on_retry(|event| {
        println!(
            "attempt {} failed: {} (next in {:?})",
            event.attempt, event.error, event.next_delay
        );
    });

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            tokio::time::sleep(Duration::from_secs(2)).await;
            println!("cancelling");
            cancel.cancel();
        }
    });

    let observer = |_: Bytes| -> Result<(), ObserveError> {
        unreachable!("nothing listens on port 1")
    };

    match requester
        .perform_with_cancellation("http://127.0.0.1:1/", &observer, &cancel)
        .await
    {
        Err(e) if e.is_cancelled() => println!("cancelled after {} attempts", e.attempts()),
        other => println!("unexpected outcome: {:?}", other),
    }
}
