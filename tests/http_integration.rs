#![cfg(feature = "reqwest")]
//! End-to-end tests through reqwest against a local HTTP server.

use std::time::{Duration, Instant};

use bytes::Bytes;
use steadyget::testing::RecordingObserver;
use steadyget::{
    assert_delivered, assert_exhausted, perform_reliable_request, CancellationToken, FatalError,
    ReliableRequester, ReqwestConnector, RetryPolicy, TransportError,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy::constant(Duration::from_millis(20))
        .with_max_attempts(max_attempts)
        .with_per_attempt_timeout(Duration::from_secs(2))
}

async fn received(server: &MockServer) -> usize {
    server.received_requests().await.map(|r| r.len()).unwrap_or(0)
}

#[tokio::test]
async fn recovers_after_server_errors() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_body_string("ok"))
        .mount(&server)
        .await;

    let observer = RecordingObserver::new();
    let url = format!("{}/flaky", server.uri());

    let delivery = assert_delivered!(perform_reliable_request(&url, &observer, fast_policy(3)).await);

    assert_eq!(delivery.attempts, 3);
    assert_eq!(delivery.status, 200);
    assert_eq!(observer.bodies(), vec![Bytes::from_static(b"ok")]);
    assert_eq!(received(&server).await, 3);
}

#[tokio::test]
async fn persistent_503_exhausts_with_the_503() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&server)
        .await;

    let observer = RecordingObserver::new();
    let result = perform_reliable_request(&server.uri(), &observer, fast_policy(2)).await;

    let last = assert_exhausted!(result, 2);
    assert_eq!(last.status_code(), Some(503));
    assert_eq!(observer.calls(), 0);
    assert_eq!(received(&server).await, 2);
}

#[tokio::test]
async fn slow_responses_time_out_per_attempt() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("too late")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let observer = RecordingObserver::new();
    let policy = RetryPolicy::constant(Duration::from_millis(10))
        .with_max_attempts(2)
        .with_per_attempt_timeout(Duration::from_millis(150));
    let start = Instant::now();

    let last = assert_exhausted!(perform_reliable_request(&server.uri(), &observer, policy).await, 2);

    assert!(last.is_timeout());
    assert!(start.elapsed() < Duration::from_secs(2));
    assert_eq!(observer.calls(), 0);
}

#[tokio::test]
async fn refused_connection_is_retried_then_surfaced() {
    let observer = RecordingObserver::new();

    let last = assert_exhausted!(
        perform_reliable_request("http://127.0.0.1:1/", &observer, fast_policy(3)).await,
        3
    );

    assert!(matches!(
        last,
        steadyget::AttemptError::Transport(TransportError::Connect(_))
    ));
}

#[tokio::test]
async fn malformed_url_fails_on_first_attempt() {
    let observer = RecordingObserver::new();

    let err = perform_reliable_request("not a url", &observer, fast_policy(5))
        .await
        .unwrap_err();

    assert!(matches!(err.fatal_error(), Some(FatalError::InvalidRequest(_))));
    assert_eq!(err.attempts(), 1);
    assert_eq!(observer.calls(), 0);
}

#[tokio::test]
async fn delays_are_honored_between_attempts() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let delay = Duration::from_millis(60);
    let policy = RetryPolicy::constant(delay).with_max_attempts(4);
    let start = Instant::now();

    assert_exhausted!(
        perform_reliable_request(&server.uri(), &RecordingObserver::new(), policy).await,
        4
    );

    assert!(start.elapsed() >= delay * 3);
}

#[tokio::test]
async fn cancellation_aborts_an_inflight_request() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let url = server.uri();
    let requester = ReliableRequester::new(ReqwestConnector::new(), RetryPolicy::default());
    let observer = RecordingObserver::new();
    let cancel = CancellationToken::new();
    let start = Instant::now();

    let (result, _) = tokio::join!(
        requester.perform_with_cancellation(&url, &observer, &cancel),
        async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            cancel.cancel();
        }
    );

    let err = result.unwrap_err();
    assert!(err.is_cancelled());
    assert_eq!(err.attempts(), 1);
    assert!(start.elapsed() < Duration::from_secs(1));
    assert_eq!(observer.calls(), 0);
}

#[tokio::test]
async fn non_2xx_body_is_not_delivered() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("missing"))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("found"))
        .mount(&server)
        .await;

    let observer = RecordingObserver::new();
    assert_delivered!(perform_reliable_request(&server.uri(), &observer, fast_policy(2)).await);

    assert_eq!(observer.bodies(), vec![Bytes::from_static(b"found")]);
}
