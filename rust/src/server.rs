use anyhow::{anyhow, Context, Result};
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::response::Html;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::net::TcpListener;
use std::sync::atomic::{AtomicU16, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::thread;
use tokio::sync::oneshot;
use tower_http::cors::CorsLayer;
use tracing::{debug, error, info, warn};

use crate::config_store::ConfigStore;
use crate::keyword_store::{KeywordSet, KeywordStore};
use crate::main_ui_html::build_main_ui_html;
use crate::prompt_history::{HistoryStatus, PromptHistory};
use crate::renderer::{render_prompt, render_selectors, PromptView, SelectorRow};
use crate::session_store::SessionStore;
use crate::translations::{LanguageOption, TranslationTable};

const MAX_BODY_BYTES: usize = 64 * 1024;

pub struct AppState {
    pub config: Mutex<ConfigStore>,
    pub translations: TranslationTable,
    pub keywords: Mutex<KeywordStore>,
    pub sessions: Mutex<SessionStore>,
    pub server_port: AtomicU16,
}

type ApiResponse = (StatusCode, Json<Value>);
type ApiResult<T> = std::result::Result<T, ApiResponse>;

impl AppState {
    pub fn new(config: ConfigStore, translations: TranslationTable, keywords: KeywordStore) -> Self {
        let sessions = SessionStore::new(config.max_sessions());
        Self {
            config: Mutex::new(config),
            translations,
            keywords: Mutex::new(keywords),
            sessions: Mutex::new(sessions),
            server_port: AtomicU16::new(0),
        }
    }
}

pub struct AppServer {
    port: u16,
    shutdown_tx: Option<oneshot::Sender<()>>,
    thread_handle: Option<thread::JoinHandle<()>>,
}

impl AppServer {
    pub fn start(state: Arc<AppState>, preferred_port: u16) -> Result<Self> {
        let listener = bind_listener(preferred_port)?;
        let port = listener
            .local_addr()
            .context("failed to inspect server local address")?
            .port();
        listener
            .set_nonblocking(true)
            .context("failed to set listener non-blocking")?;

        state.server_port.store(port, Ordering::Relaxed);

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let thread_handle = thread::spawn(move || {
            let runtime = tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build();
            let runtime = match runtime {
                Ok(runtime) => runtime,
                Err(err) => {
                    error!("failed to build server runtime: {err}");
                    return;
                }
            };

            runtime.block_on(async move {
                let listener = match tokio::net::TcpListener::from_std(listener) {
                    Ok(listener) => listener,
                    Err(err) => {
                        error!("failed to adopt listener: {err}");
                        return;
                    }
                };

                let app = build_router(state);
                let server = axum::serve(listener, app).with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                });
                if let Err(err) = server.await {
                    error!("server stopped with error: {err}");
                }
            });
        });

        info!("serving prompt builder on http://127.0.0.1:{port}/");
        Ok(Self {
            port,
            shutdown_tx: Some(shutdown_tx),
            thread_handle: Some(thread_handle),
        })
    }

    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
            debug!("server thread joined");
        }
    }

    /// Blocks until the server thread exits.
    pub fn wait(&mut self) {
        if let Some(handle) = self.thread_handle.take() {
            let _ = handle.join();
        }
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Drop for AppServer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Debug, Clone, Serialize)]
struct UiSnapshot {
    session_id: u64,
    language: String,
    languages: Vec<LanguageOption>,
    texts: BTreeMap<String, String>,
    rows: Vec<SelectorRow>,
    view: PromptView,
}

#[derive(Debug, Deserialize)]
struct InitReq {
    session_id: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct SessionReq {
    session_id: u64,
}

#[derive(Debug, Deserialize)]
struct AppendReq {
    session_id: u64,
    keyword: String,
}

#[derive(Debug, Deserialize)]
struct LanguageReq {
    session_id: u64,
    language: String,
}

fn build_router(state: Arc<AppState>) -> Router {
    let port = state.server_port.load(Ordering::Relaxed);
    let local_origin = HeaderValue::from_str(&format!("http://127.0.0.1:{port}"))
        .expect("127.0.0.1 origin should be valid");
    let localhost_origin = HeaderValue::from_str(&format!("http://localhost:{port}"))
        .expect("localhost origin should be valid");

    let cors = CorsLayer::new()
        .allow_origin([local_origin, localhost_origin])
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE]);

    Router::new()
        .route("/", get(get_main_page))
        .route("/ping", get(get_ping))
        .route("/app/init", get(get_app_init))
        .route("/app/language", post(post_app_language))
        .route("/app/append", post(post_app_append))
        .route("/app/clear", post(post_app_clear))
        .route("/app/undo", post(post_app_undo))
        .route("/app/redo", post(post_app_redo))
        .route("/app/random", post(post_app_random))
        .route("/app/copy", post(post_app_copy))
        .route("/app/close", post(post_app_close))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(cors)
        .with_state(state)
}

async fn get_main_page() -> Html<String> {
    Html(build_main_ui_html())
}

async fn get_ping() -> ApiResponse {
    ok_json(json!({}))
}

async fn get_app_init(
    State(state): State<Arc<AppState>>,
    Query(payload): Query<InitReq>,
) -> ApiResponse {
    respond(init_session(&state, payload.session_id))
}

async fn post_app_language(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<LanguageReq>,
) -> ApiResponse {
    respond(change_language(&state, payload.session_id, &payload.language))
}

async fn post_app_append(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<AppendReq>,
) -> ApiResponse {
    respond(apply_history_op(&state, payload.session_id, |history| {
        history.append(&payload.keyword)
    }))
}

async fn post_app_clear(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SessionReq>,
) -> ApiResponse {
    respond(apply_history_op(&state, payload.session_id, PromptHistory::clear))
}

async fn post_app_undo(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SessionReq>,
) -> ApiResponse {
    respond(apply_history_op(&state, payload.session_id, PromptHistory::undo))
}

async fn post_app_redo(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SessionReq>,
) -> ApiResponse {
    respond(apply_history_op(&state, payload.session_id, PromptHistory::redo))
}

async fn post_app_random(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SessionReq>,
) -> ApiResponse {
    respond(generate_random(&state, payload.session_id))
}

async fn post_app_copy(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SessionReq>,
) -> ApiResponse {
    respond(copy_prompt(&state, payload.session_id))
}

async fn post_app_close(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SessionReq>,
) -> ApiResponse {
    respond(close_session(&state, payload.session_id))
}

fn close_session(state: &AppState, session_id: u64) -> ApiResult<ApiResponse> {
    let closed = lock(&state.sessions, "session store")?.close(session_id);
    if closed {
        debug!(session = session_id, "closed session");
    }
    Ok(ok_json(json!({ "closed": closed })))
}

fn init_session(state: &AppState, requested: Option<u64>) -> ApiResult<ApiResponse> {
    let language = current_language(state)?;
    let (session_id, opened) = {
        let mut sessions = lock(&state.sessions, "session store")?;
        match requested {
            Some(id) if sessions.contains(id) => (id, false),
            _ => (sessions.open(), true),
        }
    };

    match build_ui_snapshot(state, session_id, &language) {
        Ok(snapshot) => Ok(ok_snapshot(snapshot)),
        Err(response) => {
            // A session the page never learned about would only push live ones out.
            if opened {
                if let Ok(mut sessions) = state.sessions.lock() {
                    sessions.close(session_id);
                }
            }
            Err(response)
        }
    }
}

fn change_language(state: &AppState, session_id: u64, requested: &str) -> ApiResult<ApiResponse> {
    let requested = requested.trim();
    if !state.translations.has_language(requested) {
        return Err(err_json(StatusCode::BAD_REQUEST, "unknown language"));
    }
    if !lock(&state.sessions, "session store")?.contains(session_id) {
        return Err(err_json(StatusCode::NOT_FOUND, "session not found"));
    }

    load_keywords(state, requested)?;
    {
        let mut config = lock(&state.config, "config")?;
        config.set_language(requested).map_err(|err| {
            err_json(
                StatusCode::INTERNAL_SERVER_ERROR,
                &format!("save error: {err}"),
            )
        })?;
    }

    let snapshot = build_ui_snapshot(state, session_id, requested)?;
    Ok(ok_snapshot(snapshot))
}

fn apply_history_op<F>(state: &AppState, session_id: u64, op: F) -> ApiResult<ApiResponse>
where
    F: FnOnce(&mut PromptHistory) -> HistoryStatus,
{
    let mut sessions = lock(&state.sessions, "session store")?;
    let history = session_history(&mut sessions, session_id)?;
    let status = op(&mut *history);
    debug!(session = session_id, ?status, "history operation");
    Ok(ok_prompt(session_id, render_prompt(history), status, None))
}

fn generate_random(state: &AppState, session_id: u64) -> ApiResult<ApiResponse> {
    let language = current_language(state)?;
    let keywords = load_keywords(state, &language)?;

    let mut sessions = lock(&state.sessions, "session store")?;
    let history = session_history(&mut sessions, session_id)?;
    let mut rng = rand::rng();
    let added = history.generate_random(keywords.lists(), &mut rng);
    Ok(ok_prompt(
        session_id,
        render_prompt(history),
        HistoryStatus::Applied,
        Some(added),
    ))
}

fn copy_prompt(state: &AppState, session_id: u64) -> ApiResult<ApiResponse> {
    let prompt = {
        let mut sessions = lock(&state.sessions, "session store")?;
        session_history(&mut sessions, session_id)?.buffer().to_string()
    };

    if prompt.is_empty() {
        return Ok(ok_json(json!({ "skipped": true })));
    }

    let native = copy_to_system_clipboard(&prompt).map_err(|err| {
        err_json(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("clipboard error: {err}"),
        )
    })?;

    Ok(ok_json(json!({
        "skipped": false,
        "native": native,
        "prompt": prompt,
    })))
}

fn build_ui_snapshot(state: &AppState, session_id: u64, language: &str) -> ApiResult<UiSnapshot> {
    let texts = state.translations.texts(language);
    let select_label = texts.get("select").cloned().unwrap_or_default();
    let keywords = load_keywords(state, language)?;

    let view = {
        let mut sessions = lock(&state.sessions, "session store")?;
        render_prompt(session_history(&mut sessions, session_id)?)
    };

    Ok(UiSnapshot {
        session_id,
        language: language.to_string(),
        languages: state.translations.languages(),
        rows: render_selectors(&keywords, &select_label),
        texts,
        view,
    })
}

fn current_language(state: &AppState) -> ApiResult<String> {
    let config = lock(&state.config, "config")?;
    Ok(state.translations.resolve_language(&config.language()))
}

fn load_keywords(state: &AppState, language: &str) -> ApiResult<KeywordSet> {
    let mut store = lock(&state.keywords, "keyword store")?;
    store.keywords(language).cloned().map_err(|err| {
        warn!("keyword load failed: {err:#}");
        err_json(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("keyword load error: {err:#}"),
        )
    })
}

fn session_history(sessions: &mut SessionStore, session_id: u64) -> ApiResult<&mut PromptHistory> {
    sessions
        .get_mut(session_id)
        .ok_or_else(|| err_json(StatusCode::NOT_FOUND, "session not found"))
}

fn lock<'a, T>(mutex: &'a Mutex<T>, name: &str) -> ApiResult<MutexGuard<'a, T>> {
    mutex.lock().map_err(|_| {
        err_json(
            StatusCode::INTERNAL_SERVER_ERROR,
            &format!("{name} lock error"),
        )
    })
}

fn respond(result: ApiResult<ApiResponse>) -> ApiResponse {
    result.unwrap_or_else(|response| response)
}

fn ok_json(payload: Value) -> ApiResponse {
    let mut body = serde_json::Map::new();
    body.insert("ok".to_string(), Value::Bool(true));

    if let Some(obj) = payload.as_object() {
        for (key, value) in obj {
            body.insert(key.clone(), value.clone());
        }
    } else if !payload.is_null() {
        body.insert("data".to_string(), payload);
    }

    (StatusCode::OK, Json(Value::Object(body)))
}

fn ok_prompt(
    session_id: u64,
    view: PromptView,
    status: HistoryStatus,
    added: Option<Vec<String>>,
) -> ApiResponse {
    let mut payload = json!({
        "session_id": session_id,
        "prompt": view.prompt,
        "can_undo": view.can_undo,
        "can_redo": view.can_redo,
        "status": status,
    });
    if let (Some(added), Some(obj)) = (added, payload.as_object_mut()) {
        obj.insert("added".to_string(), json!(added));
    }
    ok_json(payload)
}

fn ok_snapshot(snapshot: UiSnapshot) -> ApiResponse {
    (
        StatusCode::OK,
        Json(json!({
            "ok": true,
            "session_id": snapshot.session_id,
            "language": snapshot.language,
            "languages": snapshot.languages,
            "texts": snapshot.texts,
            "rows": snapshot.rows,
            "prompt": snapshot.view.prompt,
            "can_undo": snapshot.view.can_undo,
            "can_redo": snapshot.view.can_redo,
        })),
    )
}

fn err_json(status: StatusCode, message: &str) -> ApiResponse {
    (
        status,
        Json(json!({
            "ok": false,
            "error": message,
        })),
    )
}

fn bind_listener(preferred_port: u16) -> Result<TcpListener> {
    for offset in 0..200u16 {
        let port = preferred_port.saturating_add(offset);
        if port == 0 {
            continue;
        }

        if let Ok(listener) = TcpListener::bind(("127.0.0.1", port)) {
            return Ok(listener);
        }
    }

    Err(anyhow!("failed to bind server port"))
}

/// Returns whether the text reached the system clipboard natively. When it
/// did not, the page copies through the browser clipboard instead.
#[cfg(target_os = "windows")]
fn copy_to_system_clipboard(text: &str) -> Result<bool> {
    clipboard_win::set_clipboard_string(text)
        .map_err(|err| anyhow!("failed to write clipboard: {err}"))?;
    Ok(true)
}

#[cfg(not(target_os = "windows"))]
fn copy_to_system_clipboard(_text: &str) -> Result<bool> {
    debug!("no native clipboard on this platform");
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::{
        apply_history_op, change_language, close_session, copy_prompt, generate_random,
        init_session, AppState,
    };
    use crate::config_store::ConfigStore;
    use crate::keyword_store::KeywordStore;
    use crate::prompt_history::PromptHistory;
    use crate::translations::TranslationTable;
    use axum::http::StatusCode;
    use serde_json::Value;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU64, Ordering};

    static NEXT_FIXTURE_ID: AtomicU64 = AtomicU64::new(1);

    fn fixture_base() -> PathBuf {
        let mut base = std::env::temp_dir();
        let sequence = NEXT_FIXTURE_ID.fetch_add(1, Ordering::Relaxed);
        base.push(format!(
            "prompt_builder_server_test_{}_{}",
            std::process::id(),
            sequence
        ));
        let _ = fs::remove_dir_all(&base);
        fs::create_dir_all(base.join("data")).expect("mkdir fixture");
        fs::write(
            base.join("data").join("keywords_en.json"),
            r#"{"Animal": ["cat", "dog"], "Style": ["sketch"]}"#,
        )
        .expect("write en keywords");
        fs::write(
            base.join("data").join("keywords_ja.json"),
            r#"{"動物": ["猫"]}"#,
        )
        .expect("write ja keywords");
        base
    }

    fn fixture_state(base: &PathBuf) -> AppState {
        let config = ConfigStore::new(base.join("config.toml")).expect("create config");
        let translations = TranslationTable::from_json(
            r#"{"en": {"language_name": "English", "select": "Select"},
                "ja": {"language_name": "日本語", "select": "選択"}}"#,
        )
        .expect("parse translations");
        let keywords = KeywordStore::new(config.data_dir(base));
        AppState::new(config, translations, keywords)
    }

    fn body(response: (StatusCode, axum::Json<Value>)) -> (StatusCode, Value) {
        (response.0, response.1 .0)
    }

    fn session_of(value: &Value) -> u64 {
        value
            .get("session_id")
            .and_then(Value::as_u64)
            .expect("session id")
    }

    #[test]
    fn init_opens_session_and_renders_rows() {
        let base = fixture_base();
        let state = fixture_state(&base);

        let (status, value) = body(init_session(&state, None).expect("init"));
        assert_eq!(status, StatusCode::OK);
        assert_eq!(value["rows"][0]["placeholder"], "Select Animal");
        assert_eq!(value["prompt"], "");
        assert_eq!(value["languages"][1]["code"], "ja");

        let id = session_of(&value);
        let (_, again) = body(init_session(&state, Some(id)).expect("re-init"));
        assert_eq!(session_of(&again), id);

        fs::remove_dir_all(base).ok();
    }

    #[test]
    fn history_operations_report_status() {
        let base = fixture_base();
        let state = fixture_state(&base);
        let (_, value) = body(init_session(&state, None).expect("init"));
        let id = session_of(&value);

        let (_, undo) = body(apply_history_op(&state, id, PromptHistory::undo).expect("undo"));
        assert_eq!(undo["status"], "nothing_to_undo");

        let (_, appended) =
            body(apply_history_op(&state, id, |h| h.append("cat")).expect("append"));
        assert_eq!(appended["status"], "applied");
        assert_eq!(appended["prompt"], "cat");
        assert_eq!(appended["can_undo"], true);

        let (_, cleared) = body(apply_history_op(&state, id, PromptHistory::clear).expect("clear"));
        assert_eq!(cleared["prompt"], "");
        let (_, cleared_again) =
            body(apply_history_op(&state, id, PromptHistory::clear).expect("clear again"));
        assert_eq!(cleared_again["status"], "nothing_to_clear");

        fs::remove_dir_all(base).ok();
    }

    #[test]
    fn unknown_session_is_not_found() {
        let base = fixture_base();
        let state = fixture_state(&base);

        let (status, value) =
            body(apply_history_op(&state, 999, PromptHistory::undo).expect_err("missing session"));
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(value["ok"], false);

        fs::remove_dir_all(base).ok();
    }

    #[test]
    fn random_uses_current_language_keywords() {
        let base = fixture_base();
        let state = fixture_state(&base);
        let (_, value) = body(init_session(&state, None).expect("init"));
        let id = session_of(&value);

        let (_, random) = body(generate_random(&state, id).expect("random"));
        let added = random["added"].as_array().expect("added keywords");
        assert_eq!(added.len(), 3);
        assert_eq!(random["can_undo"], true);

        fs::remove_dir_all(base).ok();
    }

    #[test]
    fn language_change_persists_and_switches_keywords() {
        let base = fixture_base();
        let state = fixture_state(&base);
        let (_, value) = body(init_session(&state, None).expect("init"));
        let id = session_of(&value);

        let (status, _) = body(change_language(&state, id, "fr").expect_err("unknown lang"));
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, switched) = body(change_language(&state, id, "ja").expect("switch"));
        assert_eq!(switched["language"], "ja");
        assert_eq!(switched["rows"][0]["placeholder"], "選択 動物");

        let saved = ConfigStore::new(base.join("config.toml")).expect("reload config");
        assert_eq!(saved.language(), "ja");

        fs::remove_dir_all(base).ok();
    }

    #[test]
    fn failed_language_switch_keeps_saved_language() {
        let base = fixture_base();
        fs::remove_file(base.join("data").join("keywords_ja.json")).expect("remove ja keywords");
        let state = fixture_state(&base);
        let (_, value) = body(init_session(&state, None).expect("init"));
        let id = session_of(&value);

        let (status, _) = body(change_language(&state, id, "ja").expect_err("missing keywords"));
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);

        let saved = ConfigStore::new(base.join("config.toml")).expect("reload config");
        assert_eq!(saved.language(), "en");
        let (status, _) = body(init_session(&state, Some(id)).expect("init after failed switch"));
        assert_eq!(status, StatusCode::OK);

        fs::remove_dir_all(base).ok();
    }

    #[test]
    fn failed_init_does_not_evict_live_sessions() {
        let base = fixture_base();
        let state = fixture_state(&base);
        let (_, value) = body(init_session(&state, None).expect("init"));
        let live = session_of(&value);

        fs::remove_file(base.join("data").join("keywords_en.json")).expect("remove en keywords");
        state.keywords.lock().expect("keyword lock").reload();
        for _ in 0..40 {
            init_session(&state, None).expect_err("keywords missing");
        }

        let sessions = state.sessions.lock().expect("session lock");
        assert_eq!(sessions.len(), 1);
        assert!(sessions.contains(live));
        drop(sessions);

        fs::remove_dir_all(base).ok();
    }

    #[test]
    fn copy_sends_whitespace_only_prompt() {
        let base = fixture_base();
        let state = fixture_state(&base);
        let (_, value) = body(init_session(&state, None).expect("init"));
        let id = session_of(&value);
        apply_history_op(&state, id, |h| h.append(" ")).expect("append space");

        let (_, copied) = body(copy_prompt(&state, id).expect("copy"));
        assert_eq!(copied["skipped"], false);
        assert_eq!(copied["prompt"], " ");

        fs::remove_dir_all(base).ok();
    }

    #[test]
    fn close_frees_session_slot() {
        let base = fixture_base();
        let state = fixture_state(&base);
        let (_, value) = body(init_session(&state, None).expect("init"));
        let id = session_of(&value);

        let (_, closed) = body(close_session(&state, id).expect("close"));
        assert_eq!(closed["closed"], true);
        let (_, again) = body(close_session(&state, id).expect("close again"));
        assert_eq!(again["closed"], false);
        assert!(state.sessions.lock().expect("session lock").is_empty());

        let (_, reopened) = body(init_session(&state, Some(id)).expect("re-init"));
        assert_ne!(session_of(&reopened), id);

        fs::remove_dir_all(base).ok();
    }

    #[test]
    fn copy_skips_empty_prompt() {
        let base = fixture_base();
        let state = fixture_state(&base);
        let (_, value) = body(init_session(&state, None).expect("init"));
        let id = session_of(&value);

        let (_, copied) = body(copy_prompt(&state, id).expect("copy"));
        assert_eq!(copied["skipped"], true);

        fs::remove_dir_all(base).ok();
    }
}
