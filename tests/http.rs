use once_cell::sync::Lazy;
use reply_counter::badge::BadgeView;
use reply_counter::client::MessageClient;
use reply_counter::models::{Disposition, MessageResponse, NetworkResponse, RecentDaysResponse};
use reqwest::{Client, StatusCode};
use serde_json::json;
use std::net::TcpListener;
use std::process::{Child, Command, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;

const CREATE_URL: &str = "https://x.com/i/api/graphql/Q1w2E3/CreateTweet";

struct TestServer {
    base_url: String,
    child: Child,
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

static TEST_LOCK: Lazy<Mutex<()>> = Lazy::new(|| Mutex::new(()));
static SERVER: Lazy<Mutex<Option<Arc<TestServer>>>> = Lazy::new(|| Mutex::new(None));

#[cfg(unix)]
mod cleanup {
    use std::sync::Once;
    use std::sync::atomic::{AtomicI32, Ordering};

    static REGISTER: Once = Once::new();
    static PID: AtomicI32 = AtomicI32::new(0);

    pub fn register(pid: u32) {
        REGISTER.call_once(|| {
            PID.store(pid as i32, Ordering::SeqCst);
            unsafe {
                libc::atexit(on_exit);
            }
        });
    }

    extern "C" fn on_exit() {
        let pid = PID.load(Ordering::SeqCst);
        if pid > 0 {
            unsafe {
                libc::kill(pid, libc::SIGTERM);
            }
        }
    }
}

fn pick_free_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind random port");
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    port
}

fn unique_data_path() -> String {
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let mut path = std::env::temp_dir();
    path.push(format!("reply_counter_http_{}_{}.json", std::process::id(), nanos));
    path.to_string_lossy().to_string()
}

async fn wait_until_ready(base_url: &str) {
    let client = Client::new();
    let deadline = Instant::now() + Duration::from_secs(3);
    loop {
        if let Ok(resp) = client.get(format!("{base_url}/api/today")).send().await {
            if resp.status().is_success() {
                return;
            }
        }
        if Instant::now() > deadline {
            panic!("server did not become ready");
        }
        sleep(Duration::from_millis(100)).await;
    }
}

async fn spawn_server() -> TestServer {
    let port = pick_free_port();
    let data_path = unique_data_path();
    let child = Command::new(env!("CARGO_BIN_EXE_reply_counter"))
        .env("PORT", port.to_string())
        .env("REPLY_COUNTER_DATA_PATH", data_path)
        .env("RUST_LOG", "info")
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .spawn()
        .expect("failed to spawn server");

    #[cfg(unix)]
    cleanup::register(child.id());

    let base_url = format!("http://127.0.0.1:{port}");
    wait_until_ready(&base_url).await;

    TestServer { base_url, child }
}

async fn shared_server() -> Arc<TestServer> {
    let mut guard = SERVER.lock().await;
    if let Some(server) = guard.as_ref() {
        return Arc::clone(server);
    }
    let server = Arc::new(spawn_server().await);
    *guard = Some(Arc::clone(&server));
    server
}

async fn today(client: &Client, base_url: &str) -> MessageResponse {
    client
        .get(format!("{base_url}/api/today"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap()
}

async fn network(client: &Client, base_url: &str, event: serde_json::Value) -> Disposition {
    let response: NetworkResponse = client
        .post(format!("{base_url}/api/network"))
        .json(&event)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    response.disposition
}

fn reply_body(target: &str) -> String {
    json!({ "variables": { "tweet_text": "agreed", "reply": { "in_reply_to_tweet_id": target } } })
        .to_string()
}

#[tokio::test]
async fn http_increment_message_updates_today() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = MessageClient::new(&server.base_url);

    let before = client.get_today_count().await;
    assert!(before.ok, "{before:?}");

    let updated = client
        .increment_reply(Some(1_709_640_000_000.0), Some("https://x.com/home".to_string()))
        .await;
    assert!(updated.ok, "{updated:?}");
    assert_eq!(updated.count, Some(before.count.unwrap() + 1));
    assert_eq!(updated.date.as_ref().unwrap().as_str().len(), "2024-03-05".len());

    let after = client.get_today_count().await;
    assert_eq!(after.count, updated.count);
}

#[tokio::test]
async fn http_namespaced_messages_are_accepted() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response: MessageResponse = client
        .post(format!("{}/api/message", server.base_url))
        .json(&json!({ "type": "RGI/GET_TODAY_COUNT" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(response.ok);
    assert!(response.count.is_some());
}

#[tokio::test]
async fn http_unknown_message_is_a_noop() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let before = today(&client, &server.base_url).await;

    for body in [json!({ "type": "RESET_EVERYTHING" }), json!({ "hello": "world" }), json!(null)] {
        let response = client
            .post(format!("{}/api/message", server.base_url))
            .json(&body)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
    }

    assert_eq!(today(&client, &server.base_url).await.count, before.count);
}

#[tokio::test]
async fn http_successful_reply_request_is_counted_once() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let base = server.base_url.as_str();
    let before = today(&client, base).await.count.unwrap();

    let body = reply_body("42");
    let sent = network(
        &client,
        base,
        json!({ "event": "before_request", "request_id": "501", "method": "POST", "url": CREATE_URL, "body": body }),
    )
    .await;
    assert_eq!(sent, Disposition::Pending);

    let done = json!({ "event": "completed", "request_id": "501", "url": CREATE_URL, "status_code": 201 });
    assert_eq!(network(&client, base, done.clone()).await, Disposition::Counted);
    assert_eq!(network(&client, base, done).await, Disposition::Ignored);

    let after = today(&client, base).await.count.unwrap();
    assert_eq!(after, before + 1);

    let badge: BadgeView = client
        .get(format!("{base}/api/badge"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(badge.text, after.to_string());
}

#[tokio::test]
async fn http_failed_and_non_reply_requests_are_not_counted() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();
    let base = server.base_url.as_str();
    let before = today(&client, base).await.count.unwrap();

    network(
        &client,
        base,
        json!({ "event": "before_request", "request_id": "601", "method": "POST", "url": CREATE_URL, "body": reply_body("42") }),
    )
    .await;
    let forbidden = json!({ "event": "completed", "request_id": "601", "url": CREATE_URL, "status_code": 403 });
    assert_eq!(network(&client, base, forbidden).await, Disposition::Discarded);

    network(
        &client,
        base,
        json!({ "event": "before_request", "request_id": "602", "method": "POST", "url": CREATE_URL, "body": reply_body("43") }),
    )
    .await;
    let errored = json!({ "event": "error_occurred", "request_id": "602", "url": CREATE_URL });
    assert_eq!(network(&client, base, errored).await, Disposition::Discarded);

    let plain_post = json!({ "variables": { "tweet_text": "just posting" } }).to_string();
    let sent = network(
        &client,
        base,
        json!({ "event": "before_request", "request_id": "603", "method": "POST", "url": CREATE_URL, "body": plain_post }),
    )
    .await;
    assert_eq!(sent, Disposition::Ignored);
    let ok = json!({ "event": "completed", "request_id": "603", "url": CREATE_URL, "status_code": 200 });
    assert_eq!(network(&client, base, ok).await, Disposition::Ignored);

    assert_eq!(today(&client, base).await.count.unwrap(), before);
}

#[tokio::test]
async fn http_malformed_network_event_is_rejected() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response = client
        .post(format!("{}/api/network", server.base_url))
        .json(&json!({ "event": "redirected", "request_id": "1" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn http_recent_days_cover_a_week() {
    let _guard = TEST_LOCK.lock().await;
    let server = shared_server().await;
    let client = Client::new();

    let response: RecentDaysResponse = client
        .get(format!("{}/api/days", server.base_url))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(response.days.len(), 7);

    let today = today(&client, &server.base_url).await;
    let last = response.days.last().unwrap();
    assert_eq!(Some(&last.date), today.date.as_ref());
    assert_eq!(Some(last.count), today.count);
}

#[tokio::test]
async fn unreachable_service_yields_a_failure_response() {
    let client = MessageClient::new(format!("http://127.0.0.1:{}", pick_free_port()));

    let response = client.get_today_count().await;
    assert!(!response.ok);
    assert!(response.error.is_some());
    assert_eq!(response.count, None);
}
