
use std::sync::Arc;

use axum::Json;
use axum::extract::{Form, State};
use axum::response::{Html, IntoResponse, Redirect};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::debug;
use uuid::Uuid;

use super::{AppState, SESSION_COOKIE, templates};
use crate::chat::ChatSession;

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChatForm {
    #[serde(default)]
    pub message: String,
}

fn requested_session(jar: &CookieJar) -> Option<Uuid> {
    jar.get(SESSION_COOKIE)
        .and_then(|cookie| Uuid::parse_str(cookie.value()).ok())
}

/// Existing session for the caller's cookie, without creating one
async fn existing_session(state: &AppState, jar: &CookieJar) -> Option<Arc<Mutex<ChatSession>>> {
    match requested_session(jar) {
        Some(id) => state.sessions.get(id).await,
        None => None,
    }
}

/// Resolve the caller's session, creating it and issuing a cookie when needed
async fn session_for_login(state: &AppState, jar: CookieJar) -> (CookieJar, Arc<Mutex<ChatSession>>) {
    let requested = requested_session(&jar);
    let (id, session) = state.sessions.get_or_create(requested).await;

    let jar = if requested == Some(id) {
        jar
    } else {
        debug!("Issuing session cookie {}", id);
        jar.add(
            Cookie::build((SESSION_COOKIE, id.to_string()))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax),
        )
    };

    (jar, session)
}

#[inline]
pub async fn index(State(state): State<AppState>, jar: CookieJar) -> Html<String> {
    let Some(session) = existing_session(&state, &jar).await else {
        return Html(templates::login_page(None));
    };
    let session = session.lock().await;

    let page = if session.is_authenticated() {
        templates::chat_page(session.transcript())
    } else {
        templates::login_page(session.login_error())
    };

    Html(page)
}

#[inline]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> impl IntoResponse {
    let (jar, session) = session_for_login(&state, jar).await;
    session.lock().await.login(&form.password, &state.secrets);

    (jar, Redirect::to("/"))
}

#[inline]
pub async fn chat(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<ChatForm>,
) -> Redirect {
    if let Some(session) = existing_session(&state, &jar).await {
        session.lock().await.send(&form.message).await;
    }

    Redirect::to("/")
}

#[inline]
pub async fn reset(State(state): State<AppState>, jar: CookieJar) -> Redirect {
    if let Some(session) = existing_session(&state, &jar).await {
        session.lock().await.reset();
    }

    Redirect::to("/")
}

#[inline]
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "ok",
        "collection": state.collection,
        "documents": state.document_count,
        "sessions": state.sessions.len().await,
    }))
}
