//! End-to-end capture and replay through the spawned background loop.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Notify;
use tokio_test::{assert_err, assert_ok};
use tracing_subscriber::EnvFilter;
use wiremock::matchers::{body_string, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use frame_replay::background::Background;
use frame_replay::bridge::FrameChannel;
use frame_replay::frame::{DomDriver, ElementRef, FrameAgent, HttpFetcher};
use frame_replay::protocol::{Event, FrameCommand};
use frame_replay::{ReplayConfig, Result, TabId};

const WIDGET: &str = "https://embed.example.com/widget";

// ============================================================================
// Helpers
// ============================================================================

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Document with nothing in it.
struct EmptyDom {
    notify: Arc<Notify>,
}

#[async_trait]
impl DomDriver for EmptyDom {
    async fn outer_html(&self) -> Result<String> {
        Ok("<html></html>".to_string())
    }
    async fn query_selector(&self, _selector: &str) -> Result<Option<ElementRef>> {
        Ok(None)
    }
    async fn element_from_point(&self, _x: f64, _y: f64) -> Result<Option<ElementRef>> {
        Ok(None)
    }
    async fn scroll_to_bottom(&self) -> Result<()> {
        Ok(())
    }
    async fn scroll_into_view(&self, _element: &ElementRef) -> Result<()> {
        Ok(())
    }
    async fn click(&self, _element: &ElementRef) -> Result<()> {
        Ok(())
    }
    async fn focus(&self, _element: &ElementRef) -> Result<()> {
        Ok(())
    }
    async fn is_focused(&self, _element: &ElementRef) -> Result<bool> {
        Ok(true)
    }
    async fn set_value(&self, _element: &ElementRef, _text: &str) -> Result<()> {
        Ok(())
    }
    async fn dispatch_paste(&self, _element: &ElementRef, _text: &str) -> Result<()> {
        Ok(())
    }
    async fn dispatch_change(&self, _element: &ElementRef) -> Result<()> {
        Ok(())
    }
    fn mutations(&self) -> Arc<Notify> {
        Arc::clone(&self.notify)
    }
}

fn tab(id: i64) -> TabId {
    TabId::new(id).expect("valid tab id")
}

/// Browser events for one form POST issued by the widget frame.
fn form_post_events(submit_url: &str) -> Vec<Event> {
    vec![
        Event::new(
            "webNavigation.onCommitted",
            json!({ "tabId": 4, "frameId": 12, "url": WIDGET }),
        ),
        Event::new(
            "webRequest.onBeforeRequest",
            json!({
                "tabId": 4, "frameId": 12, "requestId": "881",
                "url": submit_url, "method": "POST", "type": "xmlhttprequest",
                "requestBody": { "formData": { "a": ["1"] } },
            }),
        ),
        Event::new(
            "webRequest.onBeforeSendHeaders",
            json!({
                "tabId": 4, "frameId": 12, "requestId": "881",
                "url": submit_url, "type": "xmlhttprequest",
                "requestHeaders": [
                    { "name": "Content-Type", "value": "application/x-www-form-urlencoded" },
                    { "name": "Content-Length", "value": "3" },
                    { "name": "X-Token", "value": "t" },
                ],
            }),
        ),
    ]
}

// ============================================================================
// Scenario
// ============================================================================

#[tokio::test]
async fn replay_form_post_from_widget_frame() -> anyhow::Result<()> {
    init_tracing();

    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/submit"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(header("x-token", "t"))
        .and(body_string("a=1"))
        .respond_with(ResponseTemplate::new(200).set_body_string("accepted"))
        .expect(1)
        .mount(&server)
        .await;

    let config = ReplayConfig::default();
    let (background, _task) = Background::new(&config).spawn();
    for event in form_post_events(&format!("{}/submit", server.uri())) {
        background.emit(event)?;
    }

    let agent = Arc::new(FrameAgent::new(
        WIDGET,
        Arc::new(EmptyDom {
            notify: Arc::new(Notify::new()),
        }),
        Arc::new(background.link(tab(4))),
        Arc::new(HttpFetcher::new(&config)?),
        &config,
    ));

    // The page opens the bridge once the frame announces readiness.
    let (channel, inbox) = FrameChannel::open(&agent.ready(), config.command_timeout)?;
    tokio::spawn(Arc::clone(&agent).serve(inbox));

    let replay = FrameCommand::ReplayRequest {
        url: "/submit".to_string(),
        headers: Some([("X-Token".to_string(), "t".to_string())].into()),
    };

    let reply = assert_ok!(channel.send(&replay).await);
    assert_eq!(
        serde_json::to_value(&reply)?,
        json!({
            "success": true,
            "action": "replayRequest",
            "response": { "status": 200, "text": "accepted" },
        })
    );

    // Released exactly once: a second replay finds nothing.
    let again = assert_ok!(channel.send(&replay).await);
    assert!(!again.success);
    assert_eq!(
        again.error.as_deref(),
        Some("Request not found for URL and headers in iframe: https://embed.example.com/widget")
    );
    assert!(background.engine().inspect(|log| log.store().is_empty()));

    Ok(())
}

#[tokio::test]
async fn tab_close_drops_everything_for_the_tab() -> anyhow::Result<()> {
    init_tracing();

    let (background, _task) = Background::new(&ReplayConfig::default()).spawn();
    for event in form_post_events("https://api.example.com/submit") {
        background.emit(event)?;
    }
    background.emit(Event::new("tabs.onRemoved", json!({ "tabId": 4 })))?;

    let reply = background
        .dispatch(
            tab(4),
            serde_json::from_value(json!({
                "action": "getRequestForReplay",
                "url": "submit",
                "href": WIDGET,
            }))?,
        )
        .await?;
    assert_eq!(reply.error.as_deref(), Some("No requests logged for this tab."));

    Ok(())
}

#[tokio::test]
async fn unknown_bridge_message_is_answered() -> anyhow::Result<()> {
    init_tracing();

    let config = ReplayConfig::default();
    let (background, _task) = Background::new(&config).spawn();
    let agent = Arc::new(FrameAgent::new(
        WIDGET,
        Arc::new(EmptyDom {
            notify: Arc::new(Notify::new()),
        }),
        Arc::new(background.link(tab(4))),
        Arc::new(HttpFetcher::new(&config)?),
        &config,
    ));
    let (channel, inbox) = FrameChannel::open(&agent.ready(), config.command_timeout)?;
    tokio::spawn(Arc::clone(&agent).serve(inbox));

    let reply = channel.request(json!({ "message": "fly" })).await?;
    assert_eq!(reply.error.as_deref(), Some("Unknown message type: fly"));

    let scroll = channel
        .request(json!({ "message": "scrollTo", "selector": "#missing" }))
        .await?;
    assert_eq!(scroll.action.as_deref(), Some("scrollTo"));
    assert_eq!(scroll.error.as_deref(), Some("Element not found: #missing"));

    let null = channel.request(Value::Null).await?;
    assert_eq!(null.error.as_deref(), Some("Unknown message type: undefined"));

    let mut not_ready = agent.ready();
    not_ready.status = "loading".to_string();
    assert_err!(FrameChannel::open(&not_ready, config.command_timeout));

    background.shutdown();
    Ok(())
}
