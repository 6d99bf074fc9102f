//! Integration tests for the request controller over the HTTP transport.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tether_core::Signal;
use tether_net::{ControllerConfig, RequestController, RequestState};
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn record<T: Clone + Send + 'static>(signal: &Signal<T>) -> Arc<Mutex<Vec<T>>> {
    let values = Arc::new(Mutex::new(Vec::new()));
    let values_clone = values.clone();
    signal.connect(move |value: &T| values_clone.lock().push(value.clone()));
    values
}

async fn wait_idle(controller: &RequestController) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while controller.is_busy() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("request did not settle");
}

#[tokio::test]
async fn test_get_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/test"))
        .and(header("content-type", "application/json"))
        .respond_with(ResponseTemplate::new(200).set_body_string("Hello, World!"))
        .expect(1)
        .mount(&mock_server)
        .await;

    let controller = RequestController::new().expect("Failed to create controller");
    let finished = record(controller.finished());
    let states = record(controller.state_changed());

    assert!(controller.start_get(format!("{}/test", mock_server.uri())));
    assert!(controller.is_busy());
    wait_idle(&controller).await;

    assert_eq!(controller.state(), RequestState::Completed);
    assert_eq!(controller.status_code(), Some(200));
    assert_eq!(&controller.buffer()[..], b"Hello, World!");

    let finished = finished.lock();
    assert_eq!(finished.len(), 1);
    assert_eq!(&finished[0][..], b"Hello, World!");

    let states = states.lock();
    assert_eq!(states.first(), Some(&RequestState::Pending));
    assert_eq!(states.last(), Some(&RequestState::Completed));
}

#[tokio::test]
async fn test_post_request_with_headers() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/items"))
        .and(header("content-type", "application/json"))
        .and(header("x-auth", "tok"))
        .and(body_string(r#"{"name":"x"}"#))
        .respond_with(ResponseTemplate::new(201).set_body_string(r#"{"id":1}"#))
        .expect(1)
        .mount(&mock_server)
        .await;

    let controller = RequestController::new().expect("Failed to create controller");
    let errors = record(controller.error_occurred());

    assert!(controller.start_post(
        format!("{}/api/items", mock_server.uri()),
        r#"{"name":"x"}"#,
        [("X-Auth", "tok"), ("Content-Type", "text/plain")],
    ));
    wait_idle(&controller).await;

    assert!(errors.lock().is_empty());
    assert_eq!(controller.state(), RequestState::Completed);
    assert_eq!(controller.status_code(), Some(201));
    assert_eq!(&controller.buffer()[..], br#"{"id":1}"#);
}

#[tokio::test]
async fn test_custom_content_type() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(header("content-type", "text/plain"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let config = ControllerConfig::new()
        .content_type("text/plain")
        .expect("valid content type");
    let controller = RequestController::with_config(config).expect("Failed to create controller");

    controller.start_post(mock_server.uri(), "plain", std::iter::empty::<(&str, &str)>());
    wait_idle(&controller).await;

    assert_eq!(controller.state(), RequestState::Completed);
}

#[tokio::test]
async fn test_error_status_keeps_body() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/not-found"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .mount(&mock_server)
        .await;

    let controller = RequestController::new().expect("Failed to create controller");
    let errors = record(controller.error_occurred());
    let finished = record(controller.finished());

    controller.start_get(format!("{}/not-found", mock_server.uri()));
    wait_idle(&controller).await;

    assert_eq!(controller.state(), RequestState::Error);
    assert_eq!(controller.status_code(), Some(404));
    assert_eq!(&controller.buffer()[..], b"Not Found");
    assert!(finished.lock().is_empty());

    let errors = errors.lock();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("Network error 203"), "{}", errors[0]);
}

#[tokio::test]
async fn test_transfer_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&mock_server)
        .await;

    let config = ControllerConfig::new().transfer_timeout(Duration::from_millis(100));
    let controller = RequestController::with_config(config).expect("Failed to create controller");
    let errors = record(controller.error_occurred());

    controller.start_get(format!("{}/slow", mock_server.uri()));
    wait_idle(&controller).await;

    assert_eq!(controller.state(), RequestState::Error);
    let errors = errors.lock();
    assert_eq!(errors.len(), 1);
    assert!(errors[0].starts_with("Network error 4 "), "{}", errors[0]);
}

#[tokio::test]
async fn test_abort_in_flight() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("late")
                .set_delay(Duration::from_millis(300)),
        )
        .mount(&mock_server)
        .await;

    let controller = RequestController::new().expect("Failed to create controller");
    let aborted = record(controller.aborted());
    let finished = record(controller.finished());
    let errors = record(controller.error_occurred());

    controller.start_get(mock_server.uri());
    tokio::time::sleep(Duration::from_millis(50)).await;
    controller.abort();

    assert_eq!(controller.state(), RequestState::None);
    tokio::time::sleep(Duration::from_millis(500)).await;

    assert_eq!(controller.state(), RequestState::None);
    assert_eq!(aborted.lock().len(), 1);
    assert!(finished.lock().is_empty());
    assert!(errors.lock().is_empty());
    assert!(controller.buffer().is_empty());
}

#[tokio::test]
async fn test_sequential_requests() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/first"))
        .respond_with(ResponseTemplate::new(200).set_body_string("first"))
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/second"))
        .respond_with(ResponseTemplate::new(200).set_body_string("second"))
        .mount(&mock_server)
        .await;

    let controller = RequestController::new().expect("Failed to create controller");
    let finished = record(controller.finished());

    controller.start_get(format!("{}/first", mock_server.uri()));
    assert!(!controller.start_get(format!("{}/second", mock_server.uri())));
    wait_idle(&controller).await;

    assert!(controller.start_get(format!("{}/second", mock_server.uri())));
    wait_idle(&controller).await;

    let finished = finished.lock();
    assert_eq!(finished.len(), 2);
    assert_eq!(&finished[0][..], b"first");
    assert_eq!(&finished[1][..], b"second");
    assert_eq!(&controller.buffer()[..], b"second");
}

#[tokio::test]
async fn test_connection_refused() {
    // Bind then release a port so nothing is listening on it.
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let controller = RequestController::new().expect("Failed to create controller");
    let errors = record(controller.error_occurred());

    controller.start_get(format!("http://{addr}/"));
    wait_idle(&controller).await;

    assert_eq!(controller.state(), RequestState::Error);
    assert!(errors.lock()[0].starts_with("Network error 1 "));
}
