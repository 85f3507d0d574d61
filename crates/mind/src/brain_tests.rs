// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::context::{BotStatus, ContextInputs};
use crate::Role;
use crate::transport::FakeTransport;
use golem_core::FakeClock;
use golem_library::{LibraryConfig, SkillLibrary};
use golem_memory::{BridgeConfig, HashEmbedder, MemoryBridge, VectorStore};
use tempfile::TempDir;

struct Fixture {
    _dir: TempDir,
    brain: Brain<Arc<FakeTransport>, FakeClock>,
    transport: Arc<FakeTransport>,
    clock: FakeClock,
    memory: Arc<MemoryBridge<FakeClock>>,
    library: Arc<SkillLibrary<FakeClock>>,
}

async fn fixture(config: BrainConfig) -> Fixture {
    let dir = TempDir::new().unwrap();
    let clock = FakeClock::new();
    let library = Arc::new(
        SkillLibrary::open(
            LibraryConfig { library_dir: dir.path().join("library"), strict_metadata: false },
            clock.clone(),
        )
        .await
        .unwrap(),
    );
    let store = Arc::new(VectorStore::new(Box::new(HashEmbedder::default())));
    let memory = Arc::new(MemoryBridge::new(
        BridgeConfig {
            base_url: "http://127.0.0.1:9".to_string(),
            max_retries: 1,
            backoff: vec![],
            request_timeout: Duration::from_millis(200),
            health_check_interval: Duration::from_secs(60),
            mirror_to_local: true,
        },
        store,
        clock.clone(),
    ));
    let transport = Arc::new(FakeTransport::new());
    let brain = Brain::new(
        Arc::clone(&transport),
        clock.clone(),
        config,
        Arc::clone(&memory),
        Arc::clone(&library),
    );
    Fixture { _dir: dir, brain, transport, clock, memory, library }
}

fn bundle(query: &str) -> ContextBundle {
    ContextInputs {
        query: query.to_string(),
        primitives: vec!["dig".to_string()],
        skills: Vec::new(),
        strategy: None,
        reflexes: Vec::new(),
        status: BotStatus::default(),
        word_budget: 0,
    }
    .assemble()
}

#[tokio::test]
async fn chat_passes_through_the_transport() {
    let fx = fixture(BrainConfig::default()).await;
    fx.transport.push_reply("hello there");
    let reply = fx.brain.chat(vec![ChatMessage::user("hi")]).await;
    assert_eq!(reply, "hello there");
}

#[tokio::test]
async fn transport_failure_surfaces_the_disconnected_sentinel() {
    let fx = fixture(BrainConfig::default()).await;
    fx.transport.push_error("connection reset by provider");
    let reply = fx.brain.chat(vec![ChatMessage::user("hi")]).await;
    assert_eq!(reply, DISCONNECTED_SENTINEL);
}

#[tokio::test]
async fn budget_boundary_is_exact() {
    let config = BrainConfig { limit: 2, ..BrainConfig::default() };
    let fx = fixture(config).await;
    fx.transport.push_reply("one");
    fx.transport.push_reply("two");

    assert_eq!(fx.brain.chat(vec![ChatMessage::user("a")]).await, "one");
    assert_eq!(fx.brain.chat(vec![ChatMessage::user("b")]).await, "two");
    // Third request: sentinel, and the transport is never contacted.
    assert_eq!(fx.brain.chat(vec![ChatMessage::user("c")]).await, BUDGET_SENTINEL);
    assert_eq!(fx.transport.request_count(), 2);
}

#[tokio::test]
async fn budget_window_resets_lazily() {
    let config = BrainConfig { limit: 1, ..BrainConfig::default() };
    let fx = fixture(config).await;
    fx.transport.push_reply("one");
    fx.transport.push_reply("two");

    assert_eq!(fx.brain.chat(vec![ChatMessage::user("a")]).await, "one");
    assert_eq!(fx.brain.chat(vec![ChatMessage::user("b")]).await, BUDGET_SENTINEL);

    fx.clock.advance(Duration::from_secs(12 * 60 * 60 + 1));
    assert_eq!(fx.brain.chat(vec![ChatMessage::user("c")]).await, "two");
}

#[tokio::test]
async fn code_raises_on_exhausted_budget() {
    let config = BrainConfig { limit: 0, ..BrainConfig::default() };
    let fx = fixture(config).await;
    let err = fx.brain.code("write a skill", Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, BrainError::BudgetExhausted));
    assert_eq!(fx.transport.request_count(), 0);
}

#[tokio::test]
async fn code_inlines_the_skill_catalog() {
    let fx = fixture(BrainConfig::default()).await;
    fx.library.add("dig_down", "d();", "digs straight down", &[]).await.unwrap();
    fx.transport.push_reply("function skill() {}");

    fx.brain.code("mine deeper", Uuid::new_v4()).await.unwrap();
    let requests = fx.transport.requests.lock();
    let user = &requests[0].iter().find(|m| m.role == Role::User).unwrap().content;
    assert!(user.contains("mine deeper"));
    assert!(user.contains("dig_down: digs straight down"));
}

#[tokio::test]
async fn plan_enriches_with_memories_and_catalog() {
    let fx = fixture(BrainConfig::default()).await;
    let world = Uuid::new_v4();
    fx.memory.store(world, &["iron ore at the cliff".to_string()], serde_json::json!({})).await;
    fx.library.add("mine_iron", "m();", "mines iron", &[]).await.unwrap();
    fx.transport.push_reply("plan: go east");

    let reply = fx.brain.plan(&bundle("where to find iron ore"), world).await;
    assert_eq!(reply, "plan: go east");

    let requests = fx.transport.requests.lock();
    let system = &requests[0].iter().find(|m| m.role == Role::System).unwrap().content;
    assert!(system.contains("## Tools"));
    assert!(system.contains("iron ore at the cliff"));
    assert!(system.contains("mine_iron: mines iron"));
    let user = &requests[0].iter().find(|m| m.role == Role::User).unwrap().content;
    assert_eq!(user, "where to find iron ore");
}

#[tokio::test]
async fn chat_truncates_to_max_messages() {
    let config = BrainConfig { max_messages: 2, ..BrainConfig::default() };
    let fx = fixture(config).await;
    fx.transport.push_reply("ok");
    let messages = vec![
        ChatMessage::user("oldest"),
        ChatMessage::assistant("middle"),
        ChatMessage::user("newest"),
    ];
    fx.brain.chat(messages).await;
    let requests = fx.transport.requests.lock();
    assert_eq!(requests[0].len(), 2);
    assert_eq!(requests[0][0].content, "middle");
}
