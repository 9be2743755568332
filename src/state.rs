use crate::config::Config;
use crate::services::agentic::ControllerAgent;
use genai::chat::ChatMessage;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use uuid::Uuid;

/// One conversation, locked for the duration of a turn so a session never
/// processes two turns at once. Independent sessions share nothing but the
/// backing stores.
pub type Conversation = Arc<Mutex<Vec<ChatMessage>>>;

// --- Shared application state ---
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub controller: Arc<ControllerAgent>,
    pub sessions: Arc<Mutex<HashMap<Uuid, Conversation>>>,
}

impl AppState {
    pub fn new(config: Arc<Config>, controller: Arc<ControllerAgent>) -> Self {
        Self {
            config,
            controller,
            sessions: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}
