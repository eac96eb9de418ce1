use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use std::{
    collections::HashMap,
    convert::Infallible,
    net::SocketAddr,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tokio::sync::{broadcast, Mutex};
use tokio_stream::{wrappers::BroadcastStream, Stream, StreamExt};
use tower_http::services::{ServeDir, ServeFile};
use tracing::{debug, info, warn};

use crate::api::{
    api_error, ApiError, GenerateRepliesRequest, RepliesResponse, SavedChangeResponse,
    SavedListResponse, SendReplyRequest, TweetsQuery, TweetsResponse,
};
use crate::twitter::{DeliveryError, DeliveryReceipt, ReplySender, TwitterCredentials};
use replyguy::config::AppConfig;
use replyguy::llm::LlmClient;
use replyguy::providers::{ChainStep, ToolhouseClient};
use replyguy::{
    FilterCriteria, JsonFileStore, Post, ProviderChain, ReplyGenerator, SavedStore, SearchMethod,
};

type Channels = Arc<Mutex<HashMap<String, broadcast::Sender<StreamEvent>>>>;

/// Interval at which a stream channel is checked for remaining subscribers.
const CHANNEL_IDLE_TTL: Duration = Duration::from_secs(30);

#[derive(Clone)]
pub struct AppState {
    structured: ProviderChain,
    function_call: ProviderChain,
    replies: ReplyGenerator,
    sender: ReplySender,
    saved: Arc<dyn SavedStore>,
    channels: Channels,
}

impl AppState {
    pub fn new(
        structured: ProviderChain,
        function_call: ProviderChain,
        replies: ReplyGenerator,
        sender: ReplySender,
        saved: Arc<dyn SavedStore>,
    ) -> Self {
        Self {
            structured,
            function_call,
            replies,
            sender,
            saved,
            channels: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn from_config(config: &AppConfig) -> Result<Self, String> {
        let llm = LlmClient::from_env(&config.llm);
        let tools = ToolhouseClient::from_env(&config.toolhouse);
        if llm.is_none() {
            warn!("AIML_API_KEY not set, searches will use the static dataset");
        }

        let saved = JsonFileStore::load(config.saved.path.clone()).await?;
        let model = config.llm.search_model.as_str();
        let structured =
            ProviderChain::for_method(SearchMethod::Structured, llm.clone(), tools.clone(), model);
        let function_call =
            ProviderChain::for_method(SearchMethod::FunctionCall, llm.clone(), tools, model);
        let replies = ReplyGenerator::from_config(llm, &config.llm);
        if !replies.is_configured() {
            warn!("reply drafting disabled until AIML_API_KEY is set");
        }

        Ok(Self::new(
            structured,
            function_call,
            replies,
            ReplySender::new(
                TwitterCredentials::from_env(),
                Duration::from_millis(config.reply.delay_ms),
            ),
            Arc::new(saved),
        ))
    }

    fn chain(&self, method: SearchMethod) -> &ProviderChain {
        match method {
            SearchMethod::Structured => &self.structured,
            SearchMethod::FunctionCall => &self.function_call,
        }
    }
}

#[derive(Clone, Serialize)]
struct StreamEvent {
    event: String,
    message: String,
    timestamp_ms: u128,
}

#[derive(serde::Deserialize)]
struct StreamQuery {
    request_id: String,
}

static REQUEST_COUNTER: AtomicUsize = AtomicUsize::new(0);

pub async fn serve(config: AppConfig) -> Result<(), String> {
    let state = AppState::from_config(&config).await?;
    let app = router(state, Some(&config.server.web_root));

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|err| format!("invalid bind address: {}", err))?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|err| format!("failed to bind server: {}", err))?;
    info!(%addr, saved = %config.saved.path.display(), "replyguy listening");

    axum::serve(listener, app)
        .await
        .map_err(|err| format!("server error: {}", err))?;

    Ok(())
}

pub fn router(state: AppState, web_root: Option<&str>) -> Router {
    let api = Router::new()
        .route("/api/health", get(health))
        .route("/api/tweets", post(tweets_handler))
        .route("/api/tweets/stream", get(stream_handler))
        .route("/api/generate-replies", post(generate_replies_handler))
        .route("/api/reply", post(reply_handler))
        .route("/api/saved", get(list_saved_handler).post(save_handler))
        .route("/api/saved/:id", delete(unsave_handler))
        .with_state(state);

    match web_root {
        Some(web_root) => {
            let index_path = format!("{}/index.html", web_root.trim_end_matches('/'));
            let files = ServeDir::new(web_root).not_found_service(ServeFile::new(index_path));
            api.fallback_service(files)
        }
        None => api,
    }
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn tweets_handler(
    State(state): State<AppState>,
    Query(query): Query<TweetsQuery>,
    body: Option<Json<FilterCriteria>>,
) -> Result<Json<TweetsResponse>, ApiError> {
    let criteria = body.map(|Json(criteria)| criteria).unwrap_or_default();
    let method = SearchMethod::from_param(query.method.as_deref());
    let channel = match query.request_id.as_deref() {
        Some(request_id) => Some(get_or_create_channel(&state, request_id).await),
        None => None,
    };
    let request_id = query.request_id.unwrap_or_else(generate_request_id);

    if let Some(sender) = channel.as_ref() {
        send_event(sender, "start", &format!("Searching with the {} method", method.label()));
    }
    let progress = channel.clone();
    let batch = state
        .chain(method)
        .resolve_with(&criteria, move |step| {
            if let Some(sender) = progress.as_ref() {
                report_step(sender, &step);
            }
        })
        .await;

    let mut tweets = batch.ranked(&criteria);
    let saved = state
        .saved
        .get_all()
        .await
        .map_err(|err| api_error(StatusCode::INTERNAL_SERVER_ERROR, err))?;
    saved.mark(&mut tweets);

    info!(
        request_id = %request_id,
        method = method.label(),
        source = batch.source.label(),
        candidates = batch.posts.len(),
        returned = tweets.len(),
        "tweets ranked"
    );
    if let Some(sender) = channel.as_ref() {
        send_event(sender, "done", &format!("{} tweets ranked", tweets.len()));
        schedule_cleanup(state.channels.clone(), request_id.clone());
    }

    let warnings = batch
        .failures
        .iter()
        .map(|(source, error)| format!("{} provider failed: {}", source.label(), error))
        .collect();
    Ok(Json(TweetsResponse {
        tweets,
        source: batch.source,
        request_id,
        warnings,
    }))
}

fn report_step(sender: &broadcast::Sender<StreamEvent>, step: &ChainStep<'_>) {
    match step {
        ChainStep::Attempt(source) => {
            send_event(sender, "attempt", &format!("Trying {} provider", source.label()))
        }
        ChainStep::Failed { source, error } => send_event(
            sender,
            "fallback",
            &format!("{} provider failed: {}", source.label(), error),
        ),
        ChainStep::Resolved { source, count } => send_event(
            sender,
            "resolved",
            &format!("{} candidates from {}", count, source.label()),
        ),
    }
}

async fn stream_handler(
    State(state): State<AppState>,
    Query(query): Query<StreamQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let sender = get_or_create_channel(&state, &query.request_id).await;
    let receiver = sender.subscribe();
    schedule_idle_eviction(state.channels.clone(), query.request_id.clone());
    let stream = BroadcastStream::new(receiver).filter_map(|event| match event {
        Ok(event) => {
            let data = serde_json::to_string(&event).unwrap_or_default();
            Some(Ok(Event::default().data(data)))
        }
        Err(_) => None,
    });

    send_event(&sender, "connected", "Streaming provider progress");
    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(8)))
}

async fn generate_replies_handler(
    State(state): State<AppState>,
    body: Option<Json<GenerateRepliesRequest>>,
) -> Result<Json<RepliesResponse>, ApiError> {
    let request = body
        .map(|Json(body)| body)
        .unwrap_or_default()
        .into_request()
        .map_err(|err| api_error(StatusCode::BAD_REQUEST, err))?;

    let replies = state.replies.generate(&request).await.map_err(|err| {
        warn!(error = %err, "reply generation failed");
        api_error(StatusCode::INTERNAL_SERVER_ERROR, err)
    })?;
    Ok(Json(RepliesResponse { replies }))
}

async fn reply_handler(
    State(state): State<AppState>,
    body: Option<Json<SendReplyRequest>>,
) -> Result<Json<DeliveryReceipt>, ApiError> {
    let request = body.map(|Json(body)| body).unwrap_or_default();
    match state.sender.send(&request.tweet_id, &request.text).await {
        Ok(receipt) => Ok(Json(receipt)),
        Err(err @ DeliveryError::NotConfigured) => {
            warn!("reply rejected: platform credentials missing");
            Err(api_error(StatusCode::INTERNAL_SERVER_ERROR, err.to_string()))
        }
        Err(err @ DeliveryError::MissingParameters) => {
            Err(api_error(StatusCode::BAD_REQUEST, err.to_string()))
        }
    }
}

async fn list_saved_handler(
    State(state): State<AppState>,
) -> Result<Json<SavedListResponse>, ApiError> {
    let saved = state
        .saved
        .get_all()
        .await
        .map_err(|err| api_error(StatusCode::INTERNAL_SERVER_ERROR, err))?;
    Ok(Json(SavedListResponse {
        saved: saved.into_vec(),
    }))
}

async fn save_handler(
    State(state): State<AppState>,
    Json(post): Json<Post>,
) -> Result<(StatusCode, Json<SavedChangeResponse>), ApiError> {
    if post.id.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "post id is required"));
    }
    let id = post.id.clone();
    let added = state
        .saved
        .put(post)
        .await
        .map_err(|err| api_error(StatusCode::INTERNAL_SERVER_ERROR, err))?;
    let status = if added { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(SavedChangeResponse { id, saved: true })))
}

async fn unsave_handler(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SavedChangeResponse>, ApiError> {
    let removed = state
        .saved
        .delete(&id)
        .await
        .map_err(|err| api_error(StatusCode::INTERNAL_SERVER_ERROR, err))?;
    if !removed {
        return Err(api_error(StatusCode::NOT_FOUND, "saved item not found"));
    }
    Ok(Json(SavedChangeResponse { id, saved: false }))
}

async fn get_or_create_channel(
    state: &AppState,
    request_id: &str,
) -> broadcast::Sender<StreamEvent> {
    let mut guard = state.channels.lock().await;
    if let Some(sender) = guard.get(request_id) {
        return sender.clone();
    }
    let (sender, _) = broadcast::channel(32);
    guard.insert(request_id.to_string(), sender.clone());
    sender
}

fn send_event(sender: &broadcast::Sender<StreamEvent>, event: &str, message: &str) {
    let _ = sender.send(StreamEvent {
        event: event.to_string(),
        message: message.to_string(),
        timestamp_ms: now_ms(),
    });
}

fn schedule_cleanup(channels: Channels, request_id: String) {
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_secs(10)).await;
        let mut guard = channels.lock().await;
        guard.remove(&request_id);
    });
}

/// Drops the channel for `request_id` once it has had no subscriber for a
/// full check interval. Ids that never see a tweets request end up here.
fn schedule_idle_eviction(channels: Channels, request_id: String) {
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(CHANNEL_IDLE_TTL).await;
            let mut guard = channels.lock().await;
            let idle = guard
                .get(&request_id)
                .map(|sender| sender.receiver_count() == 0);
            match idle {
                Some(false) => continue,
                Some(true) => {
                    guard.remove(&request_id);
                    debug!(request_id = %request_id, "idle stream channel evicted");
                    break;
                }
                None => break,
            }
        }
    });
}

fn generate_request_id() -> String {
    let counter = REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("req-{}-{}", now_ms(), counter)
}

fn now_ms() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|duration| duration.as_millis())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use http_body_util::BodyExt;
    use replyguy::MemoryStore;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn credentials() -> TwitterCredentials {
        TwitterCredentials {
            bearer_token: Some("bearer".to_string()),
            api_key: Some("key".to_string()),
            api_secret: Some("secret".to_string()),
            ..TwitterCredentials::default()
        }
    }

    fn test_state(credentials: TwitterCredentials) -> AppState {
        AppState::new(
            ProviderChain::mock_only(),
            ProviderChain::mock_only(),
            ReplyGenerator::new(None, "gpt-4o"),
            ReplySender::new(credentials, Duration::ZERO),
            Arc::new(MemoryStore::new()),
        )
    }

    async fn call(
        app: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(body) => {
                builder = builder.header("content-type", "application/json");
                Body::from(body.to_string())
            }
            None => Body::empty(),
        };
        let response = app.clone().oneshot(builder.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, value)
    }

    fn ids(value: &Value) -> Vec<String> {
        value["tweets"]
            .as_array()
            .unwrap()
            .iter()
            .map(|tweet| tweet["id"].as_str().unwrap().to_string())
            .collect()
    }

    #[tokio::test]
    async fn health_is_ok() {
        let app = router(test_state(credentials()), None);
        let (status, _) = call(&app, Method::GET, "/api/health", None).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn open_filters_return_whole_static_dataset_in_blended_order() {
        let app = router(test_state(credentials()), None);
        let filters = json!({
            "minEngagement": 0,
            "topics": [],
            "excludeReplies": false,
            "onlyVerified": false,
            "minViralPotential": 0
        });
        let uri = "/api/tweets?method=structured";
        let (status, body) = call(&app, Method::POST, uri, Some(filters)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["source"], "mock");
        assert_eq!(
            ids(&body),
            vec!["t1", "t9", "t10", "t2", "t7", "t3", "t4", "t6", "t8", "t5"]
        );
        assert_eq!(body["tweets"][0]["viralPotential"], 92);
        assert_eq!(body["tweets"][0]["timestamp"], "2 minutes ago");
    }

    #[tokio::test]
    async fn missing_body_means_no_constraints() {
        let app = router(test_state(credentials()), None);
        let (status, body) = call(&app, Method::POST, "/api/tweets", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(ids(&body).len(), 10);
    }

    #[tokio::test]
    async fn verified_topic_filters_narrow_the_batch() {
        let app = router(test_state(credentials()), None);
        let filters = json!({ "onlyVerified": true, "topics": ["AGI", "metaverse"] });
        let uri = "/api/tweets?method=function";
        let (_, body) = call(&app, Method::POST, uri, Some(filters)).await;
        assert_eq!(ids(&body), vec!["t9", "t2"]);
    }

    #[tokio::test]
    async fn generate_replies_validates_before_calling_out() {
        let app = router(test_state(credentials()), None);
        let (status, body) = call(
            &app,
            Method::POST,
            "/api/generate-replies",
            Some(json!({ "tweetContent": "hello" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required fields: tweetContent and tweetAuthor");

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/generate-replies",
            Some(json!({ "tweetContent": "hello", "tweetAuthor": "sama" })),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body["error"].as_str().unwrap().contains("AIML_API_KEY"));
    }

    #[tokio::test]
    async fn reply_checks_credentials_first() {
        let app = router(test_state(TwitterCredentials::default()), None);
        let (status, body) = call(&app, Method::POST, "/api/reply", Some(json!({}))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Twitter credentials not configured");

        let app = router(test_state(credentials()), None);
        let body = json!({ "tweetId": "t1" });
        let (status, body) = call(&app, Method::POST, "/api/reply", Some(body)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing required parameters");

        let (status, body) = call(
            &app,
            Method::POST,
            "/api/reply",
            Some(json!({ "tweetId": "t1", "text": "Bold claim, bolder timeline." })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "success": true, "message": "Reply sent successfully" }));
    }

    async fn open_stream(app: &Router, request_id: &str) -> axum::response::Response {
        let uri = format!("/api/tweets/stream?request_id={}", request_id);
        let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
        app.clone().oneshot(request).await.unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn stream_channels_without_subscribers_are_evicted() {
        let state = test_state(credentials());
        let channels = state.channels.clone();
        let app = router(state, None);

        let live = open_stream(&app, "live").await;
        let orphan = open_stream(&app, "orphan").await;
        assert_eq!(live.status(), StatusCode::OK);
        assert_eq!(orphan.status(), StatusCode::OK);
        drop(orphan);
        assert_eq!(channels.lock().await.len(), 2);

        tokio::time::sleep(CHANNEL_IDLE_TTL + Duration::from_secs(1)).await;
        {
            let guard = channels.lock().await;
            assert!(guard.contains_key("live"));
            assert!(!guard.contains_key("orphan"));
        }

        drop(live);
        tokio::time::sleep(CHANNEL_IDLE_TTL).await;
        assert!(channels.lock().await.is_empty());
    }

    #[tokio::test]
    async fn saved_posts_are_flagged_in_tweet_results() {
        let app = router(test_state(credentials()), None);
        let (_, body) = call(&app, Method::POST, "/api/tweets", Some(json!({}))).await;
        let post = body["tweets"][3].clone();
        assert_eq!(post["id"], "t2");

        let (status, _) = call(&app, Method::POST, "/api/saved", Some(post.clone())).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, _) = call(&app, Method::POST, "/api/saved", Some(post)).await;
        assert_eq!(status, StatusCode::OK);

        let (_, body) = call(&app, Method::POST, "/api/tweets", Some(json!({}))).await;
        let flagged: Vec<&str> = body["tweets"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|tweet| tweet["isSaved"] == true)
            .map(|tweet| tweet["id"].as_str().unwrap())
            .collect();
        assert_eq!(flagged, vec!["t2"]);

        let (_, body) = call(&app, Method::GET, "/api/saved", None).await;
        assert_eq!(body["saved"].as_array().unwrap().len(), 1);

        let (status, _) = call(&app, Method::DELETE, "/api/saved/t2", None).await;
        assert_eq!(status, StatusCode::OK);
        let (status, _) = call(&app, Method::DELETE, "/api/saved/t2", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
