//! SessionLayer behaviour through a tower stack.

mod common;

use common::RecordingStore;
use hashsession_core::{BoxError, RequestSessionExt, SessionLayer, SessionOptions};
use http::header::{COOKIE, SET_COOKIE};
use http::{Request, Response, StatusCode};
use std::convert::Infallible;
use std::rc::Rc;
use tower::{Layer, ServiceBuilder, ServiceExt, service_fn};

async fn counter(req: Request<()>) -> Result<Response<String>, Infallible> {
    let session = req.session().expect("session layer installed");
    let count = session.get::<u64>("count") + 1;
    session.set("count", &count).expect("u64 encodes");
    Ok(Response::new(count.to_string()))
}

fn request(cookie: Option<&str>) -> Request<()> {
    let mut builder = Request::builder().uri("/");
    if let Some(cookie) = cookie {
        builder = builder.header(COOKIE, cookie);
    }
    builder.body(()).unwrap()
}

fn layer_for(store: std::sync::Arc<RecordingStore>) -> SessionLayer {
    SessionLayer::new(
        SessionOptions::builder()
            .store(store)
            .key_generator(|| "issued".to_string())
            .build()
            .unwrap(),
    )
}

#[tokio::test]
async fn test_new_visitor_gets_cookie_and_state() {
    let store = RecordingStore::new("mem");
    let service = ServiceBuilder::new()
        .layer(layer_for(store.clone()))
        .service(service_fn(counter));

    let response = service.oneshot(request(None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.body(), "1");
    assert_eq!(response.headers().get(SET_COOKIE).unwrap(), "session=issued");
    assert_eq!(store.memory().field("issued", "count"), Some(b"1".to_vec()));
}

#[tokio::test]
async fn test_returning_visitor_keeps_counting() {
    let store = RecordingStore::new("mem");
    let layer = layer_for(store.clone());

    for expected in 1..=3u64 {
        let service = layer.layer(service_fn(counter));
        let response = service
            .oneshot(request(Some("session=known")))
            .await
            .unwrap();

        assert_eq!(response.body(), &expected.to_string());
        assert!(response.headers().get(SET_COOKIE).is_none());
    }

    assert_eq!(store.transactions().len(), 3);
}

#[tokio::test]
async fn test_inner_error_still_flushes() {
    let store = RecordingStore::new("mem");
    let service = layer_for(store.clone()).layer(service_fn(|req: Request<()>| async move {
        if let Some(session) = req.session() {
            session.set("attempted", &true).map_err(BoxError::from)?;
        }
        Err::<Response<String>, BoxError>("inner failed".into())
    }));

    let err = service.oneshot(request(Some("session=k"))).await.unwrap_err();

    assert_eq!(err.to_string(), "inner failed");
    assert_eq!(store.memory().field("k", "attempted"), Some(b"true".to_vec()));
}

/// Inner error type that is neither `Send` nor `Sync`.
struct LocalError(Rc<&'static str>);

impl From<LocalError> for BoxError {
    fn from(err: LocalError) -> Self {
        (*err.0).into()
    }
}

#[tokio::test]
async fn test_inner_error_without_send_is_converted_before_flush() {
    let store = RecordingStore::new("mem");
    let service = layer_for(store.clone()).layer(service_fn(|req: Request<()>| async move {
        if let Some(session) = req.session() {
            let _ = session.set("attempted", &true);
        }
        Err::<Response<String>, LocalError>(LocalError(Rc::new("local failure")))
    }));

    // The layered future must still be spawnable on a multi-threaded runtime.
    let joined = tokio::spawn(service.oneshot(request(Some("session=k")))).await;
    let err = joined.unwrap().unwrap_err();

    assert_eq!(err.to_string(), "local failure");
    assert_eq!(store.memory().field("k", "attempted"), Some(b"true".to_vec()));
}

#[tokio::test]
async fn test_start_failure_rejects_request() {
    let store = RecordingStore::new("mem");
    store.fail_reads(true);
    let service = layer_for(store.clone()).layer(service_fn(counter));

    let err = service.oneshot(request(Some("session=k"))).await.unwrap_err();

    assert!(err.to_string().contains("read refused"));
    assert!(store.transactions().is_empty());
}

#[tokio::test]
async fn test_flush_failure_replaces_response() {
    let store = RecordingStore::new("mem");
    store.fail_execute(true);
    let service = layer_for(store.clone()).layer(service_fn(counter));

    let err = service.oneshot(request(Some("session=k"))).await.unwrap_err();

    assert!(err.to_string().contains("EXECABORT"));
}

#[tokio::test]
async fn test_panicking_handler_flushes_before_unwinding() {
    let store = RecordingStore::new("mem");
    let service = layer_for(store.clone()).layer(service_fn(|req: Request<()>| async move {
        let session = req.session().cloned();
        if let Some(session) = session {
            session.set("before_panic", &1).map_err(BoxError::from)?;
            panic!("handler blew up");
        }
        Ok::<_, BoxError>(Response::new(String::new()))
    }));

    let joined = tokio::spawn(service.oneshot(request(Some("session=k")))).await;

    assert!(joined.unwrap_err().is_panic());
    assert_eq!(store.memory().field("k", "before_panic"), Some(b"1".to_vec()));
}
