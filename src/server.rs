//! Single-page web form: model picker, prompt, count and size, a reset
//! control and a two-column image grid.

use crate::{
    config::Config,
    dispatcher::Dispatcher,
    error::Result,
    form::{apply_form, FormInput},
    models::{GenerationResult, ImageModel, SessionState},
};
use actix_web::{cookie::Cookie, web, App, HttpRequest, HttpResponse, HttpServer};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "lumiere_session";
pub const DEFAULT_SESSION_IDLE: Duration = Duration::from_secs(30 * 60);
pub const DEFAULT_MAX_SESSIONS: usize = 1024;
const IMAGES_PER_ROW: usize = 2;

struct SessionEntry {
    state: SessionState,
    last_seen: Instant,
}

/// Session states keyed by server-issued ids. Idle entries expire and the
/// map never holds more than `max_sessions`.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, SessionEntry>>,
    idle_timeout: Duration,
    max_sessions: usize,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::with_limits(DEFAULT_SESSION_IDLE, DEFAULT_MAX_SESSIONS)
    }
}

impl SessionRegistry {
    pub fn with_limits(idle_timeout: Duration, max_sessions: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            idle_timeout,
            max_sessions: max_sessions.max(1),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, SessionEntry>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn prune(&self, sessions: &mut HashMap<String, SessionEntry>) {
        let idle_timeout = self.idle_timeout;
        sessions.retain(|_, entry| entry.last_seen.elapsed() < idle_timeout);
    }

    fn insert_bounded(&self, sessions: &mut HashMap<String, SessionEntry>, id: String) {
        self.prune(sessions);
        while sessions.len() >= self.max_sessions {
            let oldest = sessions
                .iter()
                .min_by_key(|(_, entry)| entry.last_seen)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    log::debug!("evicting session {}", key);
                    sessions.remove(&key);
                }
                None => break,
            }
        }
        sessions.insert(
            id,
            SessionEntry {
                state: SessionState::default(),
                last_seen: Instant::now(),
            },
        );
    }

    /// Creates a fresh session with default state and returns its id.
    pub fn issue(&self) -> String {
        let id = Uuid::new_v4().to_string();
        let mut sessions = self.lock();
        self.insert_bounded(&mut sessions, id.clone());
        id
    }

    /// Accepts `cookie` only if it names a live session; otherwise issues a new one.
    fn resolve(&self, cookie: Option<&str>) -> SessionId {
        if let Some(id) = cookie {
            let mut sessions = self.lock();
            let idle_timeout = self.idle_timeout;
            match sessions.get_mut(id) {
                Some(entry) if entry.last_seen.elapsed() < idle_timeout => {
                    entry.last_seen = Instant::now();
                    return SessionId {
                        value: id.to_string(),
                        is_new: false,
                    };
                }
                Some(_) => {
                    sessions.remove(id);
                }
                None => {}
            }
        }

        SessionId {
            value: self.issue(),
            is_new: true,
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    /// Current state for `id`, or the defaults if the session is gone. Never inserts.
    pub fn snapshot(&self, id: &str) -> SessionState {
        self.lock()
            .get(id)
            .map(|entry| entry.state.clone())
            .unwrap_or_default()
    }

    pub fn with_session<R>(&self, id: &str, f: impl FnOnce(&mut SessionState) -> R) -> R {
        let mut sessions = self.lock();
        if !sessions.contains_key(id) {
            self.insert_bounded(&mut sessions, id.to_string());
        }
        match sessions.get_mut(id) {
            Some(entry) => {
                entry.last_seen = Instant::now();
                f(&mut entry.state)
            }
            None => f(&mut SessionState::default()),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct AppState {
    pub dispatcher: Dispatcher,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self::with_sessions(dispatcher, SessionRegistry::default())
    }

    pub fn with_sessions(dispatcher: Dispatcher, sessions: SessionRegistry) -> Self {
        Self {
            dispatcher,
            sessions,
        }
    }
}

/// Result of the last action, rendered under the form.
enum Outcome {
    Nothing,
    Images(GenerationResult),
    Error(String),
}

struct SessionId {
    value: String,
    is_new: bool,
}

fn session_id(req: &HttpRequest, sessions: &SessionRegistry) -> SessionId {
    let cookie = req.cookie(SESSION_COOKIE);
    sessions.resolve(cookie.as_ref().map(|cookie| cookie.value()))
}

fn respond(session: &SessionId, body: String) -> HttpResponse {
    let mut response = HttpResponse::Ok();
    response.content_type("text/html; charset=utf-8");
    if session.is_new {
        response.cookie(
            Cookie::build(SESSION_COOKIE, session.value.clone())
                .path("/")
                .http_only(true)
                .finish(),
        );
    }
    response.body(body)
}

async fn index(req: HttpRequest, data: web::Data<AppState>) -> HttpResponse {
    let session = session_id(&req, &data.sessions);
    let state = data.sessions.snapshot(&session.value);
    respond(&session, render_page(&state, &Outcome::Nothing))
}

async fn update(
    req: HttpRequest,
    data: web::Data<AppState>,
    form: web::Form<FormInput>,
) -> HttpResponse {
    let session = session_id(&req, &data.sessions);
    let applied = data
        .sessions
        .with_session(&session.value, |state| apply_form(state, &form));
    let state = data.sessions.snapshot(&session.value);

    let outcome = match applied {
        Ok(()) => Outcome::Nothing,
        Err(e) => Outcome::Error(e.user_message()),
    };
    respond(&session, render_page(&state, &outcome))
}

async fn generate(
    req: HttpRequest,
    data: web::Data<AppState>,
    form: web::Form<FormInput>,
) -> HttpResponse {
    let session = session_id(&req, &data.sessions);
    let applied: Result<SessionState> = data.sessions.with_session(&session.value, |state| {
        apply_form(state, &form)?;
        Ok(state.clone())
    });

    // The registry lock is released before the outbound call.
    let outcome = match applied {
        Ok(snapshot) => match data.dispatcher.generate(&snapshot).await {
            Ok(result) => Outcome::Images(result),
            Err(e) => Outcome::Error(e.user_message()),
        },
        Err(e) => Outcome::Error(e.user_message()),
    };

    let state = data.sessions.snapshot(&session.value);
    respond(&session, render_page(&state, &outcome))
}

async fn reset(req: HttpRequest, data: web::Data<AppState>) -> HttpResponse {
    let session = session_id(&req, &data.sessions);
    data.sessions
        .with_session(&session.value, |state| state.reset());
    let state = data.sessions.snapshot(&session.value);
    respond(&session, render_page(&state, &Outcome::Nothing))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(index))
        .route("/update", web::post().to(update))
        .route("/generate", web::post().to(generate))
        .route("/reset", web::post().to(reset));
}

pub async fn run(config: Config) -> std::io::Result<()> {
    let port = config.port_or_default();
    let data = web::Data::new(AppState::new(Dispatcher::new(&config)));

    log::info!("🌐 Serving on http://127.0.0.1:{}", port);
    HttpServer::new(move || App::new().app_data(data.clone()).configure(configure))
        .bind(("127.0.0.1", port))?
        .run()
        .await
}

fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn render_page(state: &SessionState, outcome: &Outcome) -> String {
    let model = state.model();

    let model_options: String = ImageModel::ALL
        .iter()
        .map(|candidate| {
            format!(
                r#"<option value="{id}"{selected}>{id}</option>"#,
                id = candidate.id(),
                selected = if *candidate == model { " selected" } else { "" }
            )
        })
        .collect();

    let range = model.count_range();
    let count_field = if range.start() == range.end() {
        String::new()
    } else {
        format!(
            r#"<label>Number of images <input type="number" name="image_count" min="{}" max="{}" step="1" value="{}"></label>"#,
            range.start(),
            range.end(),
            state.image_count()
        )
    };

    let size_field = if model.size_selectable() {
        let options: String = model
            .sizes()
            .iter()
            .map(|size| {
                format!(
                    r#"<option value="{size}"{selected}>{size}</option>"#,
                    size = size,
                    selected = if *size == state.image_size() { " selected" } else { "" }
                )
            })
            .collect();
        format!(
            r#"<label>Image size <select name="image_size">{}</select></label>"#,
            options
        )
    } else {
        String::new()
    };

    let results = match outcome {
        Outcome::Nothing => String::new(),
        Outcome::Error(message) => {
            format!(r#"<div class="error">{}</div>"#, escape_html(message))
        }
        Outcome::Images(result) => {
            let rows: String = result
                .rows(IMAGES_PER_ROW)
                .iter()
                .map(|row| {
                    let cells: String = row
                        .iter()
                        .map(|url| format!(r#"<img src="{}" alt="">"#, escape_html(url)))
                        .collect();
                    format!(r#"<div class="row">{}</div>"#, cells)
                })
                .collect();
            format!(r#"<div class="grid">{}</div>"#, rows)
        }
    };

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>Lumiere</title>
<style>
body {{ max-width: 46rem; margin: 2rem auto; font-family: sans-serif; }}
label {{ display: block; margin: .5rem 0; }}
.row {{ display: grid; grid-template-columns: repeat({per_row}, 1fr); gap: .5rem; margin-bottom: .5rem; }}
.row img {{ width: 100%; }}
.error {{ color: #b00020; margin-top: 1rem; }}
</style>
</head>
<body>
<h1>Lumiere</h1>
<form method="post" action="/generate">
<label>Select the AI model: <select name="model">{model_options}</select></label>
<label>Enter a text prompt: <input type="text" name="prompt" value="{prompt}"></label>
{count_field}
{size_field}
<button type="submit" formaction="/update">Apply</button>
<button type="submit">Generate</button>
</form>
<form method="post" action="/reset"><button type="submit" title="Reset">🔄</button></form>
{results}
</body>
</html>"#,
        per_row = IMAGES_PER_ROW,
        model_options = model_options,
        prompt = escape_html(state.prompt()),
        count_field = count_field,
        size_field = size_field,
        results = results,
    )
}
