//! End-to-end tests: a synchronizer against a scripted backend and an editor
//! channel on the other side of an in-process window pair.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use pagesync::core::{ComponentKind, PageEvent, Reference};
use pagesync::rpc::{listen, window_pair, PostMessageTransport, RpcChannel, RpcConfig};
use pagesync::{
    Configuration, EditorLink, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse,
    ReadyState, Spa, SpaError, SpaState, UpdateEvent, EVENT_READY, EVENT_UPDATE,
};
use serde_json::{json, Value};
use tokio::sync::{mpsc, watch};
use tokio::time::{timeout, Duration};

const SPA_ORIGIN: &str = "http://spa.example";
const CMS_ORIGIN: &str = "http://cms.example";
const PAGE_URL: &str = "http://cms.example/site/resourceapi/";
const BANNER_URL: &str = "http://cms.example/banner";

/// Answers by URL and records every request.
#[derive(Default)]
struct Backend {
    requests: Mutex<Vec<HttpRequest>>,
    responses: Mutex<HashMap<String, Result<Value, HttpError>>>,
}

impl Backend {
    fn respond(&self, url: &str, data: Value) {
        self.responses.lock().unwrap().insert(url.to_string(), Ok(data));
    }

    fn fail(&self, url: &str) {
        self.responses.lock().unwrap().insert(
            url.to_string(),
            Err(HttpError::Response {
                url: url.to_string(),
                reason: "500 Internal Server Error".to_string(),
            }),
        );
    }

    fn requests(&self) -> Vec<HttpRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl HttpClient for Backend {
    fn fetch(&self, request: HttpRequest) -> BoxFuture<'static, Result<HttpResponse, HttpError>> {
        let response = match self.responses.lock().unwrap().get(&request.url) {
            Some(Ok(data)) => Ok(HttpResponse { data: data.clone() }),
            Some(Err(e)) => Err(e.clone()),
            None => Err(HttpError::Request {
                url: request.url.clone(),
                reason: "no route".to_string(),
            }),
        };
        self.requests.lock().unwrap().push(request);
        async move { response }.boxed()
    }
}

fn page_model(preview: bool) -> Value {
    json!({
        "root": { "$ref": "/page/root" },
        "page": {
            "root": {
                "id": "root", "type": "component", "name": "root",
                "meta": { "pageTitle": "Home" },
                "children": [{ "$ref": "/page/main" }]
            },
            "main": {
                "id": "main", "type": "container", "name": "main",
                "children": [{ "$ref": "/page/banner" }, { "$ref": "/page/banner1" }]
            },
            "banner": {
                "id": "banner", "type": "container-item", "name": "banner", "label": "Banner",
                "links": { "self": { "href": BANNER_URL, "type": "external" } }
            },
            "banner1": {
                "id": "banner1", "type": "container-item", "name": "banner1", "label": "Banner"
            }
        },
        "meta": { "preview": preview }
    })
}

fn banner_fragment(label: &str) -> Value {
    json!({
        "root": { "$ref": "/page/banner" },
        "page": {
            "banner": {
                "id": "banner", "type": "container-item", "name": "banner", "label": label,
                "links": { "self": { "href": BANNER_URL, "type": "external" } }
            }
        }
    })
}

fn config() -> Configuration {
    Configuration::from_value(&json!({ "cmsBaseUrl": "http://cms.example/site" })).unwrap()
}

struct Harness {
    backend: Arc<Backend>,
    spa: Spa,
    cms: Arc<RpcChannel>,
    readiness: watch::Sender<ReadyState>,
    editor: Option<EditorLink>,
}

fn harness(preview: bool, ready: ReadyState) -> Harness {
    let backend = Arc::new(Backend::default());
    backend.respond(PAGE_URL, page_model(preview));

    let (spa_window, cms_window) = window_pair(SPA_ORIGIN, CMS_ORIGIN);
    let cms = Arc::new(RpcChannel::new(
        Arc::new(PostMessageTransport::new(cms_window.target, SPA_ORIGIN)),
        RpcConfig::default(),
    ));
    listen(cms.clone(), SPA_ORIGIN, cms_window.inbox);

    let (readiness, receiver) = watch::channel(ready);
    let editor = EditorLink {
        target: spa_window.target,
        inbox: spa_window.inbox,
        readiness: receiver,
        rpc: RpcConfig::default(),
    };

    Harness {
        spa: Spa::new(config(), backend.clone()),
        backend,
        cms,
        readiness,
        editor: Some(editor),
    }
}

/// Forward the editor-side `event` into a queue.
fn watch_event(cms: &RpcChannel, event: &str) -> mpsc::UnboundedReceiver<Value> {
    let (tx, rx) = mpsc::unbounded_channel();
    cms.on(event, move |payload| {
        let _ = tx.send(payload.clone());
    });
    rx
}

#[tokio::test]
async fn test_live_page_becomes_ready_without_editor() {
    let mut h = harness(false, ReadyState::Complete);
    let page = h.spa.initialize(h.editor.take()).await.unwrap();

    assert_eq!(h.spa.state(), SpaState::Ready);
    assert!(h.spa.bridge().is_none());
    assert_eq!(page.title().as_deref(), Some("Home"));

    let requests = h.backend.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, HttpMethod::Get);
    assert_eq!(requests[0].url, PAGE_URL);
}

#[tokio::test]
async fn test_container_items_keep_identity_and_visibility() {
    let mut model = page_model(false);
    model["page"]["banner"]["meta"] = json!({ "hidden": false });
    model["page"]["banner1"]["meta"] = json!({ "hidden": true });

    let mut h = harness(false, ReadyState::Complete);
    h.backend.respond(PAGE_URL, model);
    let page = h.spa.initialize(None).await.unwrap();

    let main = page.component(&["main"]).unwrap();
    assert_eq!(main.kind(), ComponentKind::Container);
    assert_eq!(main.children().len(), 2);

    let banner = page.component(&["main", "banner"]).unwrap();
    let banner1 = page.component(&["main", "banner1"]).unwrap();
    assert_eq!(banner.kind(), ComponentKind::ContainerItem);
    assert!(!banner.is_hidden());
    assert!(banner1.is_hidden());

    let again = page.component(&["main", "banner1"]).unwrap();
    assert!(Arc::ptr_eq(&banner1, &again));
    assert!(Arc::ptr_eq(&main.children()[1], &banner1));
}

#[test]
fn test_model_without_editor_needs_no_runtime() {
    let backend = Arc::new(Backend::default());
    let mut spa = Spa::new(config(), backend.clone());
    let model = serde_json::from_value(page_model(true)).unwrap();

    let page = spa.initialize_with_model(model, None).unwrap();
    assert_eq!(spa.state(), SpaState::Ready);
    assert!(page.is_preview());
    assert!(backend.requests().is_empty());

    spa.destroy();
    assert_eq!(spa.state(), SpaState::Destroyed);
}

#[tokio::test]
async fn test_second_initialize_is_rejected() {
    let mut h = harness(false, ReadyState::Complete);
    h.spa.initialize(None).await.unwrap();

    match h.spa.initialize(None).await {
        Err(SpaError::InvalidState { expected, actual }) => {
            assert_eq!(expected, SpaState::Uninitialized);
            assert_eq!(actual, SpaState::Ready);
        }
        other => panic!("Expected invalid state, got {other:?}"),
    }
}

#[tokio::test]
async fn test_failed_initial_fetch_can_be_retried() {
    let mut h = harness(true, ReadyState::Complete);
    h.backend.fail(PAGE_URL);

    assert!(matches!(h.spa.initialize(None).await, Err(SpaError::Http(_))));
    assert_eq!(h.spa.state(), SpaState::Uninitialized);
    assert!(h.spa.page().is_none());

    h.backend.respond(PAGE_URL, page_model(true));
    h.spa.initialize(None).await.unwrap();
    assert_eq!(h.spa.state(), SpaState::Ready);
}

#[tokio::test]
async fn test_handshake_waits_for_document() {
    let mut h = harness(true, ReadyState::Loading);
    let mut ready = watch_event(&h.cms, EVENT_READY);

    h.spa.initialize(h.editor.take()).await.unwrap();
    assert_eq!(h.spa.state(), SpaState::ReadyEditing);
    assert!(timeout(Duration::from_millis(50), ready.recv()).await.is_err());

    h.readiness.send(ReadyState::Interactive).unwrap();
    let payload = timeout(Duration::from_secs(2), ready.recv()).await.unwrap();
    assert_eq!(payload, Some(Value::Null));
}

#[tokio::test]
async fn test_editor_update_reaches_component() {
    let mut h = harness(true, ReadyState::Complete);
    h.backend.respond(BANNER_URL, banner_fragment("Updated"));
    let mut ready = watch_event(&h.cms, EVENT_READY);

    let page = h.spa.initialize(h.editor.take()).await.unwrap();
    timeout(Duration::from_secs(2), ready.recv()).await.unwrap();

    let (tx, mut events) = mpsc::unbounded_channel();
    page.subscribe(move |event| {
        let PageEvent::Updated { target, .. } = event;
        let _ = tx.send(target.clone());
    });

    h.cms
        .emit(EVENT_UPDATE, Some(json!({ "id": "banner", "properties": { "title": "x" } })))
        .unwrap();

    let target = timeout(Duration::from_secs(2), events.recv()).await.unwrap().unwrap();
    assert_eq!(target, Reference::page("banner"));

    let banner = page.component_by_id("banner").unwrap();
    assert_eq!(banner.label().as_deref(), Some("Updated"));
    assert_eq!(page.component_by_id("banner1").unwrap().label().as_deref(), Some("Banner"));

    let post = h.backend.requests().pop().unwrap();
    assert_eq!(post.method, HttpMethod::Post);
    assert_eq!(post.url, BANNER_URL);
    assert_eq!(post.data, Some(json!({ "title": "x" })));
}

#[tokio::test]
async fn test_update_for_unknown_id_is_ignored() {
    let mut h = harness(true, ReadyState::Complete);
    h.backend.respond(BANNER_URL, banner_fragment("Updated"));

    let page = h.spa.initialize(h.editor.take()).await.unwrap();
    let (tx, mut events) = mpsc::unbounded_channel();
    page.subscribe(move |event| {
        let PageEvent::Updated { target, .. } = event;
        let _ = tx.send(target.clone());
    });

    // Updates are applied in order, so the banner event proves the first
    // one was skipped rather than still pending.
    h.cms.emit(EVENT_UPDATE, Some(json!({ "id": "nope" }))).unwrap();
    h.cms.emit(EVENT_UPDATE, Some(json!({ "id": "banner1" }))).unwrap();
    h.cms.emit(EVENT_UPDATE, Some(json!({ "id": "banner" }))).unwrap();

    let target = timeout(Duration::from_secs(2), events.recv()).await.unwrap().unwrap();
    assert_eq!(target, Reference::page("banner"));

    let posts: Vec<_> = h
        .backend
        .requests()
        .into_iter()
        .filter(|r| r.method == HttpMethod::Post)
        .collect();
    assert_eq!(posts.len(), 1);
}

#[tokio::test]
async fn test_failed_fragment_fetch_keeps_page() {
    let mut h = harness(true, ReadyState::Complete);
    h.backend.fail(BANNER_URL);

    let page = h.spa.initialize(h.editor.take()).await.unwrap();
    let before = page.model();

    let event = UpdateEvent {
        id: "banner".to_string(),
        properties: json!({}),
    };
    assert!(matches!(h.spa.handle_update(&event).await, Err(SpaError::Http(_))));
    assert_eq!(h.spa.state(), SpaState::ReadyEditing);
    assert!(Arc::ptr_eq(&before, &page.model()));
    assert_eq!(page.component_by_id("banner").unwrap().label().as_deref(), Some("Banner"));
}

#[tokio::test]
async fn test_sync_calls_editor() {
    let mut h = harness(true, ReadyState::Complete);
    let calls = Arc::new(Mutex::new(0));
    let counter = calls.clone();
    h.cms.register("sync", move |_| {
        *counter.lock().unwrap() += 1;
        async { Ok(Value::Null) }
    });

    h.spa.initialize(h.editor.take()).await.unwrap();
    timeout(Duration::from_secs(2), h.spa.sync()).await.unwrap().unwrap();
    assert_eq!(*calls.lock().unwrap(), 1);
}

#[tokio::test]
async fn test_sync_requires_editing() {
    let mut h = harness(false, ReadyState::Complete);
    h.spa.initialize(h.editor.take()).await.unwrap();
    assert!(matches!(h.spa.sync().await, Err(SpaError::InvalidState { .. })));
}

#[tokio::test]
async fn test_destroy_is_idempotent() {
    let mut h = harness(true, ReadyState::Complete);
    h.backend.respond(BANNER_URL, banner_fragment("Updated"));
    let page = h.spa.initialize(h.editor.take()).await.unwrap();

    h.spa.destroy();
    h.spa.destroy();

    assert_eq!(h.spa.state(), SpaState::Destroyed);
    assert!(h.spa.bridge().is_none());
    assert!(page.is_destroyed());

    let _ = h.cms.emit(EVENT_UPDATE, Some(json!({ "id": "banner" })));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(h.backend.requests().iter().all(|r| r.method == HttpMethod::Get));
    assert_eq!(page.component_by_id("banner").unwrap().label().as_deref(), Some("Banner"));

    let event = UpdateEvent {
        id: "banner".to_string(),
        properties: json!({}),
    };
    assert!(matches!(h.spa.handle_update(&event).await, Err(SpaError::InvalidState { .. })));
}
