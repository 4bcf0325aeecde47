//! End-to-end turns against in-memory collaborators.

use async_trait::async_trait;
use orcbot_config::TrackerConfig;
use orcbot_conversation::{
    CreateCommandOutcome, GenerationError, GeneratorConfig, HistoryAssembler, HistoryConfig,
    IncomingMessage, IssueEnricher, KnowledgeGenerator, Orchestrator, TurnError, TurnOutcome,
};
use orcbot_core::{
    ChatMessage, ChatTransport, CompletionModel, CompletionRequest, ConversationThread,
    IssueDetails, IssueTracker, KnowledgeAnswer, KnowledgeService, ThreadStore,
};
use orcbot_store::{MemoryThreadStore, ThreadRepository};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Default)]
struct FakeTransport {
    thread: Vec<ChatMessage>,
    fail_posts: bool,
    posts: Mutex<Vec<(String, String, String)>>,
}

#[async_trait]
impl ChatTransport for FakeTransport {
    async fn post_reply(&self, channel: &str, text: &str, thread_key: &str) -> anyhow::Result<()> {
        if self.fail_posts {
            anyhow::bail!("channel_not_found");
        }
        self.posts.lock().unwrap().push((
            channel.to_string(),
            text.to_string(),
            thread_key.to_string(),
        ));
        Ok(())
    }

    async fn fetch_thread_replies(
        &self,
        _channel: &str,
        _thread_key: &str,
    ) -> anyhow::Result<Vec<ChatMessage>> {
        Ok(self.thread.clone())
    }
}

impl FakeTransport {
    fn posts(&self) -> Vec<(String, String, String)> {
        self.posts.lock().unwrap().clone()
    }
}

/// Hands out `sess-1`, `sess-2`, ... and records the tokens it was given.
#[derive(Default)]
struct FakeKnowledge {
    fail: bool,
    empty: bool,
    delay: Duration,
    issued: AtomicUsize,
    prompts: Mutex<Vec<String>>,
    sessions_seen: Mutex<Vec<Option<String>>>,
}

#[async_trait]
impl KnowledgeService for FakeKnowledge {
    async fn retrieve_and_generate(
        &self,
        prompt: &str,
        session_id: Option<&str>,
    ) -> anyhow::Result<KnowledgeAnswer> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        self.sessions_seen
            .lock()
            .unwrap()
            .push(session_id.map(str::to_string));
        tokio::time::sleep(self.delay).await;
        if self.fail {
            anyhow::bail!("ThrottlingException");
        }
        let n = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let text = if self.empty { "" } else { "Roll back with helm." };
        Ok(KnowledgeAnswer {
            text: text.to_string(),
            session_id: Some(format!("sess-{n}")),
        })
    }
}

/// Replies with `raw`, or fails every call when `raw` is `None`.
struct FakeCompletion {
    raw: Option<String>,
    calls: AtomicUsize,
}

impl FakeCompletion {
    fn replying(raw: &str) -> Self {
        Self {
            raw: Some(raw.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    const fn failing() -> Self {
        Self {
            raw: None,
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl CompletionModel for FakeCompletion {
    async fn complete(&self, _request: &CompletionRequest) -> anyhow::Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.raw
            .clone()
            .ok_or_else(|| anyhow::anyhow!("model returned 500"))
    }
}

#[derive(Default)]
struct FakeTracker {
    created: Mutex<Vec<(String, String)>>,
}

#[async_trait]
impl IssueTracker for FakeTracker {
    async fn create_issue(&self, summary: &str, description: &str) -> anyhow::Result<String> {
        self.created
            .lock()
            .unwrap()
            .push((summary.to_string(), description.to_string()));
        Ok("OPS-7".to_string())
    }

    async fn get_issue(&self, _key: &str) -> anyhow::Result<IssueDetails> {
        Ok(IssueDetails {
            summary: "Deploy stuck".to_string(),
            description: "ArgoCD sync hangs".to_string(),
        })
    }
}

struct Harness {
    orchestrator: Arc<Orchestrator>,
    transport: Arc<FakeTransport>,
    knowledge: Arc<FakeKnowledge>,
    completion: Arc<FakeCompletion>,
    tracker: Arc<FakeTracker>,
    store: Arc<MemoryThreadStore>,
}

const SENTINEL_REPLY: &str = "Sure. USER_RESPONSE Just roll it back. USER_RESPONSE done";

fn harness(transport: FakeTransport, knowledge: FakeKnowledge, raw: &str) -> Harness {
    harness_with_notice(transport, knowledge, raw, None)
}

fn harness_with_notice(
    transport: FakeTransport,
    knowledge: FakeKnowledge,
    raw: &str,
    notice: Option<&str>,
) -> Harness {
    build_harness(transport, knowledge, FakeCompletion::replying(raw), notice)
}

fn build_harness(
    transport: FakeTransport,
    knowledge: FakeKnowledge,
    completion: FakeCompletion,
    notice: Option<&str>,
) -> Harness {
    let transport = Arc::new(transport);
    let knowledge = Arc::new(knowledge);
    let completion = Arc::new(completion);
    let tracker = Arc::new(FakeTracker::default());
    let store = Arc::new(MemoryThreadStore::new());

    let tracker_config = TrackerConfig {
        base_url: "https://acme.atlassian.net".to_string(),
        username: "bot".to_string(),
        api_token: String::new(),
        project_key: "OPS".to_string(),
        issue_type: "Task".to_string(),
        domain_hints: vec!["atlassian.net".to_string()],
        create_command_prefix: "create ticket:".to_string(),
    };

    let orchestrator = Orchestrator::new(
        transport.clone(),
        ThreadRepository::new(store.clone()).with_retry_delays(Vec::new()),
        HistoryAssembler::new(HistoryConfig::default()),
        IssueEnricher::new(tracker.clone(), &tracker_config),
        KnowledgeGenerator::new(
            knowledge.clone(),
            completion.clone(),
            GeneratorConfig::default(),
        ),
    )
    .with_failure_notice(notice.map(str::to_string));

    Harness {
        orchestrator: Arc::new(orchestrator),
        transport,
        knowledge,
        completion,
        tracker,
        store,
    }
}

fn msg(author: &str, text: &str, ts: &str, thread_ts: &str) -> ChatMessage {
    ChatMessage {
        author: author.to_string(),
        text: text.to_string(),
        timestamp: ts.to_string(),
        thread_timestamp: thread_ts.to_string(),
    }
}

fn incoming(message: ChatMessage) -> IncomingMessage {
    IncomingMessage {
        channel: "C1".to_string(),
        client_msg_id: Some(format!("client-{}", message.timestamp)),
        message,
    }
}

async fn stored_token(store: &MemoryThreadStore, key: &str) -> Option<String> {
    store
        .load(key)
        .await
        .unwrap()
        .map(|thread: ConversationThread| thread.session_id)
}

#[tokio::test]
async fn top_level_message_starts_thread_and_persists_token() {
    let h = harness(
        FakeTransport::default(),
        FakeKnowledge::default(),
        SENTINEL_REPLY,
    );

    let outcome = h
        .orchestrator
        .handle(incoming(msg("alice", "How do I roll back?", "100.1", "")))
        .await;

    assert!(matches!(&outcome, TurnOutcome::Replied { thread_key } if thread_key == "100.1"));
    assert_eq!(*h.knowledge.sessions_seen.lock().unwrap(), vec![None]);
    assert_eq!(
        h.transport.posts(),
        vec![(
            "C1".to_string(),
            " Just roll it back. ".to_string(),
            "100.1".to_string()
        )]
    );
    assert_eq!(
        stored_token(&h.store, "100.1").await.as_deref(),
        Some("sess-1")
    );
}

#[tokio::test]
async fn follow_up_reuses_stored_token() {
    let h = harness(
        FakeTransport {
            thread: vec![
                msg("alice", "How do I roll back?", "100.1", "100.1"),
                msg("alice", "and for staging?", "100.5", "100.1"),
            ],
            ..FakeTransport::default()
        },
        FakeKnowledge::default(),
        SENTINEL_REPLY,
    );
    let mut existing = ConversationThread::new("100.1");
    existing.record_session("sess-old");
    h.store.save(&existing).await.unwrap();

    let outcome = h
        .orchestrator
        .handle(incoming(msg("alice", "and for staging?", "100.5", "100.1")))
        .await;

    assert!(outcome.is_replied());
    assert_eq!(
        *h.knowledge.sessions_seen.lock().unwrap(),
        vec![Some("sess-old".to_string())]
    );
    assert_eq!(
        stored_token(&h.store, "100.1").await.as_deref(),
        Some("sess-1")
    );
    assert_eq!(h.transport.posts()[0].2, "100.1");
}

#[tokio::test]
async fn reply_answers_latest_message_of_other_author() {
    let h = harness(
        FakeTransport {
            thread: vec![
                msg("alice", "pods are crashlooping", "1.0", "1.0"),
                msg("bob", "which namespace?", "2.0", "1.0"),
                msg("carol", "payments, since the last deploy", "3.0", "1.0"),
            ],
            ..FakeTransport::default()
        },
        FakeKnowledge::default(),
        SENTINEL_REPLY,
    );

    let outcome = h
        .orchestrator
        .handle(incoming(msg("bob", "which namespace?", "2.0", "1.0")))
        .await;

    assert!(outcome.is_replied());
    assert_eq!(
        *h.knowledge.prompts.lock().unwrap(),
        vec!["payments, since the last deploy".to_string()]
    );
}

#[tokio::test]
async fn suppressed_thread_gets_no_reply_and_no_state() {
    let h = harness(
        FakeTransport {
            thread: vec![
                msg("alice", "humans only here, no_orc", "1.0", "1.0"),
                msg("bob", "what broke?", "2.0", "1.0"),
            ],
            ..FakeTransport::default()
        },
        FakeKnowledge::default(),
        SENTINEL_REPLY,
    );

    let outcome = h
        .orchestrator
        .handle(incoming(msg("bob", "what broke?", "2.0", "1.0")))
        .await;

    assert!(matches!(outcome, TurnOutcome::Suppressed));
    assert!(h.transport.posts().is_empty());
    assert!(h.knowledge.prompts.lock().unwrap().is_empty());
    assert!(h.store.is_empty().await);
}

#[tokio::test]
async fn message_without_client_id_is_ignored() {
    let h = harness(
        FakeTransport::default(),
        FakeKnowledge::default(),
        SENTINEL_REPLY,
    );
    let mut echo = incoming(msg("bot", "Just roll it back.", "5.0", "1.0"));
    echo.client_msg_id = None;

    let outcome = h.orchestrator.handle(echo).await;

    assert!(matches!(outcome, TurnOutcome::Aborted(None)));
    assert!(h.transport.posts().is_empty());
    assert!(h.knowledge.prompts.lock().unwrap().is_empty());
}

#[tokio::test]
async fn raw_output_without_sentinels_is_posted_verbatim() {
    let h = harness(
        FakeTransport::default(),
        FakeKnowledge::default(),
        "plain answer",
    );

    h.orchestrator
        .handle(incoming(msg("alice", "q", "7.0", "")))
        .await;

    assert_eq!(h.transport.posts()[0].1, "plain answer");
}

#[tokio::test]
async fn tracker_link_enriches_prompt() {
    let h = harness(
        FakeTransport::default(),
        FakeKnowledge::default(),
        SENTINEL_REPLY,
    );

    h.orchestrator
        .handle(incoming(msg(
            "alice",
            "status of https://acme.atlassian.net/browse/OPS-12 ?",
            "8.0",
            "",
        )))
        .await;

    let prompts = h.knowledge.prompts.lock().unwrap();
    assert!(prompts[0].contains("Context from issue OPS-12"));
    assert!(prompts[0].contains("Summary: Deploy stuck"));
}

#[tokio::test]
async fn create_command_short_circuits_generation() {
    let h = harness(
        FakeTransport {
            thread: vec![
                msg("alice", "CI keeps timing out", "1.0", "1.0"),
                msg("alice", "create ticket: CI timeouts", "2.0", "1.0"),
            ],
            ..FakeTransport::default()
        },
        FakeKnowledge::default(),
        SENTINEL_REPLY,
    );

    let outcome = h
        .orchestrator
        .handle(incoming(msg("alice", "create ticket: CI timeouts", "2.0", "1.0")))
        .await;

    match outcome {
        TurnOutcome::ShortCircuited(CreateCommandOutcome::Created { key, .. }) => {
            assert_eq!(key, "OPS-7");
        }
        other => panic!("unexpected outcome: {other:?}"),
    }

    let created = h.tracker.created.lock().unwrap().clone();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0].0, "CI timeouts");
    assert!(created[0].1.contains("alice: CI keeps timing out"));

    assert_eq!(h.transport.posts().len(), 1);
    assert!(h.transport.posts()[0].1.contains("OPS-7"));
    assert!(h.knowledge.prompts.lock().unwrap().is_empty());
    assert_eq!(h.completion.calls.load(Ordering::SeqCst), 0);
    assert!(h.store.is_empty().await);
}

#[tokio::test]
async fn retrieval_failure_posts_nothing_and_persists_nothing() {
    let h = harness(
        FakeTransport::default(),
        FakeKnowledge {
            fail: true,
            ..FakeKnowledge::default()
        },
        SENTINEL_REPLY,
    );

    let outcome = h
        .orchestrator
        .handle(incoming(msg("alice", "q", "9.0", "")))
        .await;

    assert!(matches!(
        outcome,
        TurnOutcome::Aborted(Some(TurnError::Generation(_)))
    ));
    assert!(h.transport.posts().is_empty());
    assert_eq!(h.completion.calls.load(Ordering::SeqCst), 0);
    assert!(h.store.is_empty().await);
}

#[tokio::test]
async fn completion_failure_posts_nothing_and_persists_nothing() {
    let h = build_harness(
        FakeTransport::default(),
        FakeKnowledge::default(),
        FakeCompletion::failing(),
        None,
    );

    let outcome = h
        .orchestrator
        .handle(incoming(msg("alice", "q", "9.5", "")))
        .await;

    assert!(matches!(
        outcome,
        TurnOutcome::Aborted(Some(TurnError::Generation(GenerationError::Completion(_))))
    ));
    assert_eq!(h.completion.calls.load(Ordering::SeqCst), 1);
    assert!(h.transport.posts().is_empty());
    assert!(h.store.is_empty().await);
}

#[tokio::test]
async fn empty_knowledge_answer_skips_completion() {
    let h = harness(
        FakeTransport::default(),
        FakeKnowledge {
            empty: true,
            ..FakeKnowledge::default()
        },
        SENTINEL_REPLY,
    );

    let outcome = h
        .orchestrator
        .handle(incoming(msg("alice", "q", "9.7", "")))
        .await;

    assert!(matches!(
        outcome,
        TurnOutcome::Aborted(Some(TurnError::Generation(
            GenerationError::EmptyKnowledgeAnswer
        )))
    ));
    assert_eq!(h.completion.calls.load(Ordering::SeqCst), 0);
    assert!(h.transport.posts().is_empty());
    assert!(h.store.is_empty().await);
}

#[tokio::test]
async fn failure_notice_is_posted_when_configured() {
    let h = harness_with_notice(
        FakeTransport::default(),
        FakeKnowledge {
            fail: true,
            ..FakeKnowledge::default()
        },
        SENTINEL_REPLY,
        Some("I'm having trouble answering right now."),
    );

    h.orchestrator
        .handle(incoming(msg("alice", "q", "9.0", "")))
        .await;

    assert_eq!(
        h.transport.posts(),
        vec![(
            "C1".to_string(),
            "I'm having trouble answering right now.".to_string(),
            "9.0".to_string()
        )]
    );
    assert!(h.store.is_empty().await);
}

#[tokio::test]
async fn failed_post_still_persists_token() {
    let h = harness(
        FakeTransport {
            fail_posts: true,
            ..FakeTransport::default()
        },
        FakeKnowledge::default(),
        SENTINEL_REPLY,
    );

    let outcome = h
        .orchestrator
        .handle(incoming(msg("alice", "q", "11.0", "")))
        .await;

    assert!(matches!(
        outcome,
        TurnOutcome::Aborted(Some(TurnError::Transport(_)))
    ));
    assert_eq!(
        stored_token(&h.store, "11.0").await.as_deref(),
        Some("sess-1")
    );
}

#[tokio::test]
async fn concurrent_turns_in_one_thread_keep_every_token() {
    let h = harness(
        FakeTransport {
            thread: vec![msg("alice", "start", "1.0", "1.0")],
            ..FakeTransport::default()
        },
        FakeKnowledge {
            delay: Duration::from_millis(20),
            ..FakeKnowledge::default()
        },
        SENTINEL_REPLY,
    );

    let first = h
        .orchestrator
        .handle(incoming(msg("alice", "first", "2.0", "1.0")));
    let second = h
        .orchestrator
        .handle(incoming(msg("bob", "second", "3.0", "1.0")));
    let (a, b) = tokio::join!(first, second);

    assert!(a.is_replied());
    assert!(b.is_replied());
    // the second turn must observe the token written by the first
    assert_eq!(
        *h.knowledge.sessions_seen.lock().unwrap(),
        vec![None, Some("sess-1".to_string())]
    );
    assert_eq!(
        stored_token(&h.store, "1.0").await.as_deref(),
        Some("sess-2")
    );
    assert!(h.orchestrator.threads().locks().is_empty());
}
