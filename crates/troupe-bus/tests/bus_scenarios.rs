//! Integration scenarios for the message bus.

use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use troupe_bus::MessageBus;
use troupe_core::{Agent, AgentResult, AgentRole, Message, MessageKind};

struct Inbox {
    role: AgentRole,
    received: Arc<Mutex<Vec<Message>>>,
}

impl Inbox {
    fn new(role: AgentRole) -> (Arc<Self>, Arc<Mutex<Vec<Message>>>) {
        let received = Arc::new(Mutex::new(Vec::new()));
        (
            Arc::new(Self {
                role,
                received: Arc::clone(&received),
            }),
            received,
        )
    }
}

#[async_trait]
impl Agent for Inbox {
    fn role(&self) -> AgentRole {
        self.role
    }

    async fn process_task(&self, payload: serde_json::Value) -> AgentResult<serde_json::Value> {
        Ok(payload)
    }

    async fn receive_message(&self, message: Message) -> AgentResult<()> {
        self.received.lock().unwrap().push(message);
        Ok(())
    }
}

async fn settle(bus: &MessageBus, dispatcher: tokio::task::JoinHandle<()>) {
    bus.close();
    dispatcher.await.unwrap();
}

#[tokio::test]
async fn broadcast_reaches_only_matching_subscribers() {
    let bus = MessageBus::new(32);
    let (a, a_inbox) = Inbox::new(AgentRole::Planner);
    let (b, b_inbox) = Inbox::new(AgentRole::Coder);

    // A subscribes to requests, B to responses; C (the tester) broadcasts
    // a request, so only A may see it.
    bus.register(AgentRole::Planner, a).await;
    bus.register(AgentRole::Coder, b).await;
    bus.subscribe(AgentRole::Planner, &[MessageKind::Request])
        .await
        .unwrap();
    bus.subscribe(AgentRole::Coder, &[MessageKind::Response])
        .await
        .unwrap();

    let dispatcher = bus.spawn_dispatcher().unwrap();
    bus.send(
        AgentRole::Tester,
        "who can plan this?",
        None,
        MessageKind::Request,
        None,
    )
    .await
    .unwrap();
    settle(&bus, dispatcher).await;

    assert_eq!(a_inbox.lock().unwrap().len(), 1);
    assert_eq!(b_inbox.lock().unwrap().len(), 0);
}

#[tokio::test]
async fn message_ids_stay_unique_under_load() {
    let bus = MessageBus::new(256);
    let dispatcher = bus.spawn_dispatcher().unwrap();

    let mut ids = HashSet::new();
    for _ in 0..200 {
        let msg = bus
            .send(
                AgentRole::Monitor,
                "tick",
                None,
                MessageKind::Notification,
                None,
            )
            .await
            .unwrap();
        assert!(ids.insert(msg.id.clone()), "duplicate message id");
    }
    settle(&bus, dispatcher).await;
    assert_eq!(bus.history_len().await, 200);
}

#[tokio::test]
async fn conversation_threads_chain_through_parents() {
    let bus = MessageBus::new(32);
    let (coder, coder_inbox) = Inbox::new(AgentRole::Coder);
    bus.register(AgentRole::Coder, coder).await;
    let dispatcher = bus.spawn_dispatcher().unwrap();

    let request = bus
        .post(
            Message::direct(
                AgentRole::Planner,
                AgentRole::Coder,
                MessageKind::Request,
                "implement module",
            )
            .with_conversation("req-42"),
        )
        .await
        .unwrap();

    // Wait until the request is delivered before replying.
    tokio::time::timeout(Duration::from_secs(2), async {
        while coder_inbox.lock().unwrap().is_empty() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .unwrap();

    let reply = bus
        .post(Message::reply_to(&request, AgentRole::Coder, "done"))
        .await
        .unwrap();
    settle(&bus, dispatcher).await;

    let thread = bus.conversation("req-42").await;
    assert_eq!(thread.len(), 2);
    assert_eq!(thread[0].id, request.id);
    assert_eq!(thread[1].id, reply.id);
    assert_eq!(thread[1].parent_id, Some(request.id.clone()));

    let from_coder = bus.messages_from(AgentRole::Coder, Some(1)).await;
    assert_eq!(from_coder.len(), 1);
    assert_eq!(from_coder[0].id, reply.id);
}

#[tokio::test]
async fn directed_send_to_unregistered_role_delivers_nothing() {
    let bus = MessageBus::new(8);
    let (planner, planner_inbox) = Inbox::new(AgentRole::Planner);
    bus.register(AgentRole::Planner, planner).await;
    let dispatcher = bus.spawn_dispatcher().unwrap();

    bus.send(
        AgentRole::Planner,
        "hello?",
        Some(AgentRole::SecurityAuditor),
        MessageKind::Request,
        None,
    )
    .await
    .unwrap();
    settle(&bus, dispatcher).await;

    assert!(planner_inbox.lock().unwrap().is_empty());
    let events = bus.unroutable_events().await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].recipient, AgentRole::SecurityAuditor);
}
