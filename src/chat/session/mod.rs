
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{ChatEngine, ChatMessage};
use crate::config::Secrets;

pub const WRONG_PASSWORD_MESSAGE: &str = "Nesprávne heslo. Skúste znova.";
pub const ERROR_REPLY_PREFIX: &str = "Prepáčte, nastala chyba: ";

/// Creates a fresh chat engine for every new browser session
pub type EngineFactory = Arc<dyn Fn() -> ChatEngine + Send + Sync>;

/// State of one browser session: the visible transcript, the password gate and
/// the chat engine with its memory
pub struct ChatSession {
    transcript: Vec<ChatMessage>,
    authenticated: bool,
    login_error: Option<&'static str>,
    greeting: String,
    engine: ChatEngine,
}

impl ChatSession {
    #[inline]
    pub fn new(engine: ChatEngine, greeting: impl Into<String>) -> Self {
        let greeting = greeting.into();
        Self {
            transcript: vec![ChatMessage::assistant(greeting.clone())],
            authenticated: false,
            login_error: None,
            greeting,
            engine,
        }
    }

    #[inline]
    pub fn transcript(&self) -> &[ChatMessage] {
        &self.transcript
    }

    #[inline]
    pub const fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Error shown under the login form after a failed attempt
    #[inline]
    pub const fn login_error(&self) -> Option<&'static str> {
        self.login_error
    }

    #[inline]
    pub fn login(&mut self, candidate: &str, secrets: &Secrets) -> bool {
        if secrets.password_matches(candidate) {
            self.authenticated = true;
            self.login_error = None;
            info!("Session authenticated");
        } else {
            self.authenticated = false;
            self.login_error = Some(WRONG_PASSWORD_MESSAGE);
            warn!("Rejected login attempt");
        }
        self.authenticated
    }

    /// Run one chat turn and return the assistant message appended to the transcript.
    ///
    /// Engine failures become the assistant reply. Returns `None` when the session is
    /// not authenticated or the message is blank.
    #[inline]
    pub async fn send(&mut self, message: &str) -> Option<&ChatMessage> {
        let message = message.trim();
        if !self.authenticated || message.is_empty() {
            return None;
        }

        self.transcript.push(ChatMessage::user(message));

        let reply = match self.engine.chat(message).await {
            Ok(response) => response.response,
            Err(e) => {
                warn!("Chat turn failed: {}", e);
                format!("{ERROR_REPLY_PREFIX}{e}")
            }
        };

        self.transcript.push(ChatMessage::assistant(reply));
        self.transcript.last()
    }

    /// Back to the greeting, with empty engine memory and the password gate closed
    #[inline]
    pub fn reset(&mut self) {
        self.transcript = vec![ChatMessage::assistant(self.greeting.clone())];
        self.engine.reset();
        self.authenticated = false;
        self.login_error = None;
        debug!("Session reset");
    }
}

struct SessionEntry {
    session: Arc<Mutex<ChatSession>>,
    last_seen: Instant,
}

/// In-memory registry of browser sessions keyed by cookie id.
///
/// Sessions are only created on a login attempt and are dropped once they have
/// been idle for longer than `idle_timeout`.
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, SessionEntry>>,
    factory: EngineFactory,
    greeting: String,
    idle_timeout: Duration,
}

impl SessionStore {
    #[inline]
    pub fn new(factory: EngineFactory, greeting: impl Into<String>, idle_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            factory,
            greeting: greeting.into(),
            idle_timeout,
        }
    }

    /// Look up a live session and mark it as used
    #[inline]
    pub async fn get(&self, id: Uuid) -> Option<Arc<Mutex<ChatSession>>> {
        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        Self::evict_idle(&mut sessions, now, self.idle_timeout);

        sessions.get_mut(&id).map(|entry| {
            entry.last_seen = now;
            Arc::clone(&entry.session)
        })
    }

    /// Look up the session for `id`, creating one under a new id when it is unknown or expired
    #[inline]
    pub async fn get_or_create(&self, id: Option<Uuid>) -> (Uuid, Arc<Mutex<ChatSession>>) {
        if let Some(id) = id {
            if let Some(session) = self.get(id).await {
                return (id, session);
            }
        }

        let id = Uuid::new_v4();
        let session = Arc::new(Mutex::new(ChatSession::new(
            (self.factory)(),
            self.greeting.clone(),
        )));

        let now = Instant::now();
        let mut sessions = self.sessions.write().await;
        Self::evict_idle(&mut sessions, now, self.idle_timeout);
        sessions.insert(
            id,
            SessionEntry {
                session: Arc::clone(&session),
                last_seen: now,
            },
        );
        debug!("Created chat session {} ({} live)", id, sessions.len());

        (id, session)
    }

    /// Drop every session idle for longer than the timeout
    #[inline]
    pub async fn evict_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        Self::evict_idle(&mut sessions, Instant::now(), self.idle_timeout)
    }

    fn evict_idle(sessions: &mut HashMap<Uuid, SessionEntry>, now: Instant, timeout: Duration) -> usize {
        let before = sessions.len();
        sessions.retain(|_, entry| now.saturating_duration_since(entry.last_seen) <= timeout);
        let evicted = before - sessions.len();
        if evicted > 0 {
            debug!("Evicted {} idle chat sessions", evicted);
        }
        evicted
    }

    #[inline]
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    #[inline]
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}
