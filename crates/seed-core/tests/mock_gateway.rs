use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use seed_core::{
    ChatError, ChatGateway, ChatReply, ChatRequest, ChatResult, Conversation, ConversationConfig,
    LoadedSession, MarkdownSanitizer, MemoryStore, Message, RestoreOutcome, SaveRequest,
    SessionSummary, CONNECTIVITY_FALLBACK, NEUTRAL, SADNESS,
};

/// In-memory backend for driving a conversation end to end
#[derive(Default)]
struct MockGateway {
    replies: Mutex<Vec<ChatResult<ChatReply>>>,
    sessions: Mutex<HashMap<String, Vec<Message>>>,
    saves: Mutex<Vec<SaveRequest>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockGateway {
    fn with_replies(replies: Vec<ChatResult<ChatReply>>) -> Self {
        let mut replies = replies;
        replies.reverse();
        Self {
            replies: Mutex::new(replies),
            ..Default::default()
        }
    }

    fn with_session(self, sid: &str, chat: Vec<Message>) -> Self {
        self.sessions.lock().unwrap().insert(sid.to_string(), chat);
        self
    }

    fn saves(&self) -> Vec<SaveRequest> {
        self.saves.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatGateway for MockGateway {
    async fn send(&self, request: &ChatRequest) -> ChatResult<ChatReply> {
        self.requests.lock().unwrap().push(request.clone());
        self.replies
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| Err(ChatError::network("no scripted reply")))
    }

    async fn save(&self, request: &SaveRequest) -> ChatResult<()> {
        self.saves.lock().unwrap().push(request.clone());
        self.sessions
            .lock()
            .unwrap()
            .insert(request.sid.clone(), request.chat.clone());
        Ok(())
    }

    async fn list_sessions(&self) -> ChatResult<Vec<SessionSummary>> {
        Ok(self
            .sessions
            .lock()
            .unwrap()
            .iter()
            .map(|(sid, chat)| SessionSummary {
                sid: sid.clone(),
                title: chat.first().map(|m| m.text.clone()).unwrap_or_default(),
                updated: 0,
                count: Some(chat.len()),
            })
            .collect())
    }

    async fn load_session(&self, sid: &str) -> ChatResult<LoadedSession> {
        match self.sessions.lock().unwrap().get(sid) {
            Some(chat) => Ok(LoadedSession::new(sid, chat.clone())),
            None => Err(ChatError::Api {
                status: 404,
                message: "not-found".to_string(),
            }),
        }
    }

    async fn session_check(&self) -> ChatResult<bool> {
        Ok(true)
    }

    async fn logout(&self) -> ChatResult<()> {
        Ok(())
    }
}

fn conversation() -> Conversation {
    Conversation::new(
        ConversationConfig::default(),
        Box::new(MemoryStore::new()),
        Arc::new(MarkdownSanitizer),
    )
}

/// Submit, run the send, and reveal the reply to completion.
async fn turn(
    conversation: &mut Conversation,
    gateway: &MockGateway,
    text: &str,
    now: Instant,
) -> Vec<SaveRequest> {
    let pending = conversation.submit(text).expect("submission accepted");
    let result = gateway.send(&pending.request).await;
    conversation.on_reply(pending.epoch, result, now);
    let mut saves = Vec::new();
    let mut at = now;
    while conversation.is_revealing() {
        at += Duration::from_millis(20);
        saves.extend(conversation.tick(at));
    }
    saves
}

#[tokio::test]
async fn test_log_order_matches_call_order() {
    let gateway = MockGateway::with_replies(vec![
        Ok(ChatReply::ok("first reply", "joy")),
        Ok(ChatReply::ok("second reply", "fear")),
    ]);
    let mut c = conversation();
    let now = Instant::now();

    turn(&mut c, &gateway, "first", now).await;
    turn(&mut c, &gateway, "second", now).await;

    let texts: Vec<_> = c.log().messages().iter().map(|m| m.text.as_str()).collect();
    assert_eq!(texts, vec!["first", "first reply", "second", "second reply"]);
    assert_eq!(c.mood(), "fear");
}

#[tokio::test]
async fn test_network_failure_reveals_fallback() {
    let gateway = MockGateway::with_replies(vec![Err(ChatError::network("connection refused"))]);
    let mut c = conversation();
    turn(&mut c, &gateway, "anyone there?", Instant::now()).await;

    assert_eq!(
        c.log().last(),
        Some(&Message::assistant(CONNECTIVITY_FALLBACK, SADNESS))
    );
    // the chat keeps working afterwards
    assert!(c.submit("retry").is_some());
}

#[tokio::test]
async fn test_autosave_reaches_gateway_once() {
    let gateway = MockGateway::with_replies(vec![
        Ok(ChatReply::ok("a", "joy")),
        Ok(ChatReply::ok("b", "joy")),
    ]);
    let mut c = conversation();
    let now = Instant::now();

    let mut saves = turn(&mut c, &gateway, "one", now).await;
    saves.extend(turn(&mut c, &gateway, "two", now).await);
    assert!(saves.is_empty());

    saves.extend(c.tick(now + Duration::from_secs(10)));
    assert_eq!(saves.len(), 1);
    for save in &saves {
        gateway.save(save).await.unwrap();
    }
    assert_eq!(gateway.saves()[0].chat.len(), 4);
}

#[tokio::test]
async fn test_restore_twice_is_idempotent() {
    let chat = vec![
        Message::user("I lost my keys"),
        Message::assistant("That sounds stressful.", "sadness"),
        Message::user("found them!"),
        Message::assistant("**Great** news!", "joy"),
    ];
    let gateway = MockGateway::default().with_session("100", chat.clone());
    let mut c = conversation();

    let mut snapshots = Vec::new();
    for _ in 0..2 {
        let load = c.request_restore("100");
        let result = gateway.load_session(&load.sid).await;
        let outcome = c.on_loaded(&load, result).unwrap();
        assert!(matches!(outcome, RestoreOutcome::Restored { .. }));
        snapshots.push((c.transcript().units().to_vec(), c.mood().to_string()));
    }

    let bodies = |units: &[seed_core::RenderedUnit]| {
        units
            .iter()
            .map(|u| (u.body.clone(), u.emotion.clone()))
            .collect::<Vec<_>>()
    };
    assert_eq!(bodies(&snapshots[0].0), bodies(&snapshots[1].0));
    assert_eq!(snapshots[0].1, snapshots[1].1);
    assert_eq!(c.mood(), "joy");
    assert_eq!(c.log().messages(), chat.as_slice());
}

#[tokio::test]
async fn test_restore_without_emotions_is_neutral() {
    let gateway = MockGateway::with_replies(vec![Ok(ChatReply::ok("grr", "anger"))])
        .with_session("200", vec![Message::user("only me")]);
    let mut c = conversation();
    turn(&mut c, &gateway, "hi", Instant::now()).await;
    assert_eq!(c.mood(), "anger");

    let load = c.request_restore("200");
    let result = gateway.load_session("200").await;
    c.on_loaded(&load, result).unwrap();
    assert_eq!(c.mood(), NEUTRAL);
}

#[tokio::test]
async fn test_failed_load_keeps_state() {
    let gateway = MockGateway::default();
    let mut c = conversation();
    let sid = c.sid().to_string();

    let load = c.request_restore("missing");
    let result = gateway.load_session("missing").await;
    assert!(c.on_loaded(&load, result).is_err());
    assert_eq!(c.sid(), sid);
}

#[tokio::test]
async fn test_restore_flushes_previous_session_under_its_own_sid() {
    let gateway = MockGateway::with_replies(vec![Ok(ChatReply::ok("hey", "joy"))])
        .with_session("300", vec![Message::user("older chat")]);
    let mut c = conversation();
    let original_sid = c.sid().to_string();
    turn(&mut c, &gateway, "hello", Instant::now()).await;

    let load = c.request_restore("300");
    let result = gateway.load_session("300").await;
    match c.on_loaded(&load, result).unwrap() {
        RestoreOutcome::Restored {
            outgoing: Some(save),
        } => {
            assert_eq!(save.sid, original_sid);
            assert_eq!(save.chat.len(), 2);
        }
        other => panic!("unexpected outcome: {:?}", other),
    }
    assert_eq!(c.sid(), "300");
}
