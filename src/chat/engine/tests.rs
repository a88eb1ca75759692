use super::*;
use crate::AssistantError;
use crate::openapi::DocumentMetadata;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Replays canned replies and records every request
#[derive(Default)]
struct ScriptedModel {
    replies: Mutex<VecDeque<crate::Result<String>>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
}

impl ScriptedModel {
    fn with_replies(replies: &[&str]) -> Self {
        Self {
            replies: Mutex::new(replies.iter().map(|r| Ok((*r).to_string())).collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn push_error(&self, message: &str) {
        self.replies
            .lock()
            .expect("lock")
            .push_back(Err(AssistantError::Completion(message.to_string())));
    }

    fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().expect("lock").clone()
    }
}

#[async_trait]
impl ChatModel for ScriptedModel {
    async fn complete(&self, messages: Vec<ChatMessage>) -> crate::Result<String> {
        self.requests.lock().expect("lock").push(messages);
        self.replies
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or_else(|| Ok("default reply".to_string()))
    }
}

#[derive(Default)]
struct FixedRetriever {
    queries: Mutex<Vec<(String, usize)>>,
}

#[async_trait]
impl Retriever for FixedRetriever {
    async fn retrieve(&self, query: &str, top_k: usize) -> crate::Result<Vec<SearchResult>> {
        self.queries
            .lock()
            .expect("lock")
            .push((query.to_string(), top_k));
        Ok(vec![SearchResult {
            text: "API Endpoint: GET /api/v1/products\nSúhrn: Zoznam produktov\n".to_string(),
            metadata: DocumentMetadata::Operation {
                path: "/api/v1/products".to_string(),
                method: crate::openapi::HttpMethod::Get,
                summary: "Zoznam produktov".to_string(),
                tags: "products".to_string(),
            },
            similarity_score: 0.9,
            distance: 0.1,
        }])
    }
}

fn engine(model: &Arc<ScriptedModel>, retriever: &Arc<FixedRetriever>) -> ChatEngine {
    let config = ChatConfig {
        system_prompt: "Vždy odpovedaj v slovenčine.".to_string(),
        ..ChatConfig::default()
    };
    ChatEngine::new(model.clone(), retriever.clone(), &config)
}

#[tokio::test]
async fn first_turn_uses_message_verbatim() {
    let model = Arc::new(ScriptedModel::with_replies(&["Použite GET /api/v1/products."]));
    let retriever = Arc::new(FixedRetriever::default());
    let mut engine = engine(&model, &retriever);

    let response = engine
        .chat("Ako získam zoznam produktov?")
        .await
        .expect("turn should succeed");

    assert_eq!(response.response, "Použite GET /api/v1/products.");
    assert_eq!(response.standalone_question, "Ako získam zoznam produktov?");
    assert_eq!(response.sources.len(), 1);

    let requests = model.requests();
    assert_eq!(requests.len(), 1, "no condense call on the first turn");

    let queries = retriever.queries.lock().expect("lock").clone();
    assert_eq!(queries, vec![("Ako získam zoznam produktov?".to_string(), 4)]);
}

#[tokio::test]
async fn retrieved_context_reaches_system_message() {
    let model = Arc::new(ScriptedModel::with_replies(&["ok"]));
    let retriever = Arc::new(FixedRetriever::default());
    let mut engine = engine(&model, &retriever);

    engine.chat("produkty?").await.expect("turn should succeed");

    let request = &model.requests()[0];
    assert_eq!(request[0].role, Role::System);
    assert!(request[0].content.starts_with("Vždy odpovedaj v slovenčine."));
    assert!(request[0].content.contains("API Endpoint: GET /api/v1/products"));
    assert_eq!(request.last(), Some(&ChatMessage::user("produkty?")));
}

#[tokio::test]
async fn later_turns_condense_history() {
    let model = Arc::new(ScriptedModel::with_replies(&[
        "GET /api/v1/products",
        "Aké parametre má GET /api/v1/products?",
        "Parameter limit.",
    ]));
    let retriever = Arc::new(FixedRetriever::default());
    let mut engine = engine(&model, &retriever);

    engine.chat("Ako získam produkty?").await.expect("first turn");
    let response = engine.chat("A aké má parametre?").await.expect("second turn");

    assert_eq!(response.standalone_question, "Aké parametre má GET /api/v1/products?");
    assert_eq!(response.response, "Parameter limit.");

    let requests = model.requests();
    assert_eq!(requests.len(), 3);

    let condense = &requests[1];
    assert_eq!(condense.len(), 1);
    assert!(condense[0].content.contains("user: Ako získam produkty?"));
    assert!(condense[0].content.contains("assistant: GET /api/v1/products"));
    assert!(condense[0].content.contains("Follow Up Input: A aké má parametre?"));

    let answer = &requests[2];
    assert_eq!(answer.len(), 4, "system, two history messages, user");
    assert_eq!(answer[1], ChatMessage::user("Ako získam produkty?"));

    let queries = retriever.queries.lock().expect("lock").clone();
    assert_eq!(queries[1].0, "Aké parametre má GET /api/v1/products?");
}

#[tokio::test]
async fn failed_turn_leaves_memory_untouched() {
    let model = Arc::new(ScriptedModel::default());
    model.push_error("rate limited");
    let retriever = Arc::new(FixedRetriever::default());
    let mut engine = engine(&model, &retriever);

    let err = engine.chat("hello").await.expect_err("turn should fail");
    assert!(err.to_string().contains("rate limited"));
    assert!(engine.memory().is_empty());
}

#[tokio::test]
async fn reset_empties_memory() {
    let model = Arc::new(ScriptedModel::with_replies(&["a", "b"]));
    let retriever = Arc::new(FixedRetriever::default());
    let mut engine = engine(&model, &retriever);

    engine.chat("first").await.expect("turn should succeed");
    assert_eq!(engine.memory().len(), 2);

    engine.reset();
    assert!(engine.memory().is_empty());

    engine.chat("second").await.expect("turn should succeed");
    assert_eq!(model.requests().len(), 2, "no condense call after reset");
}
