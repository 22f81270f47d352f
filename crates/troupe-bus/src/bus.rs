//! The message bus: agent registry, subscription table, and the single
//! consumer dispatch loop.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use troupe_core::{Agent, AgentRole, Message, MessageId, MessageKind, Payload};

use crate::error::{BusError, BusResult};
use crate::history::History;

/// A directed message that had no registered recipient.
///
/// Unroutable messages are dropped without surfacing an error to the
/// sender; the event log is the only trace they leave.
#[derive(Debug, Clone)]
pub struct UnroutableEvent {
    pub message_id: MessageId,
    pub recipient: AgentRole,
    pub timestamp: DateTime<Utc>,
}

#[derive(Default)]
struct Registry {
    agents: HashMap<AgentRole, Arc<dyn Agent>>,
    /// Registration order; broadcast delivery follows it. A re-registered
    /// role keeps its original slot.
    order: Vec<AgentRole>,
    subscriptions: HashMap<AgentRole, HashSet<MessageKind>>,
}

struct BusInner {
    registry: RwLock<Registry>,
    history: RwLock<History>,
    unroutable: RwLock<Vec<UnroutableEvent>>,
    delivery_failures: AtomicU64,
}

/// Routes typed messages between registered agents.
///
/// Producers may call [`send`](MessageBus::send) concurrently; all routing
/// decisions are evaluated by one dispatch task in strict enqueue order.
/// `send` never blocks on delivery - only ingress queue capacity applies
/// backpressure.
pub struct MessageBus {
    inner: Arc<BusInner>,
    tx: Mutex<Option<mpsc::Sender<Message>>>,
    rx: Mutex<Option<mpsc::Receiver<Message>>>,
}

impl MessageBus {
    /// Create a bus with the given ingress queue capacity.
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            inner: Arc::new(BusInner {
                registry: RwLock::new(Registry::default()),
                history: RwLock::new(History::default()),
                unroutable: RwLock::new(Vec::new()),
                delivery_failures: AtomicU64::new(0),
            }),
            tx: Mutex::new(Some(tx)),
            rx: Mutex::new(Some(rx)),
        }
    }

    /// Register an agent under a role.
    ///
    /// Initializes an empty subscription set for the role; re-registration
    /// overwrites the handle and re-initializes the subscriptions, matching
    /// a fresh registration.
    pub async fn register(&self, role: AgentRole, agent: Arc<dyn Agent>) {
        let mut registry = self.inner.registry.write().await;
        if !registry.order.contains(&role) {
            registry.order.push(role);
        }
        registry.agents.insert(role, agent);
        registry.subscriptions.insert(role, HashSet::new());
        info!(role = %role, "agent_registered");
    }

    /// Union `kinds` into the role's subscription set.
    ///
    /// Subscriptions only grow within a bus instance (until the role is
    /// re-registered).
    pub async fn subscribe(&self, role: AgentRole, kinds: &[MessageKind]) -> BusResult<()> {
        let mut registry = self.inner.registry.write().await;
        let subscriptions = registry
            .subscriptions
            .get_mut(&role)
            .ok_or(BusError::UnknownAgent(role))?;
        subscriptions.extend(kinds.iter().copied());
        info!(role = %role, kinds = ?kinds, "agent_subscribed");
        Ok(())
    }

    /// Check whether a role has a registered agent.
    pub async fn is_registered(&self, role: AgentRole) -> bool {
        self.inner.registry.read().await.agents.contains_key(&role)
    }

    /// Roles in registration order.
    pub async fn registered_roles(&self) -> Vec<AgentRole> {
        self.inner.registry.read().await.order.clone()
    }

    /// Build a message and enqueue it for dispatch.
    ///
    /// Assigns a fresh unique id and timestamp, appends to history, and
    /// returns the created message without waiting for delivery.
    pub async fn send(
        &self,
        sender: AgentRole,
        payload: impl Into<Payload>,
        recipient: Option<AgentRole>,
        kind: MessageKind,
        parent_id: Option<MessageId>,
    ) -> BusResult<Message> {
        let mut message = match recipient {
            Some(to) => Message::direct(sender, to, kind, payload),
            None => Message::broadcast(sender, kind, payload),
        };
        message.parent_id = parent_id;
        self.post(message).await
    }

    /// Enqueue a pre-built message (e.g. one carrying a conversation id).
    pub async fn post(&self, message: Message) -> BusResult<Message> {
        let tx = {
            let guard = self.tx.lock().expect("bus sender lock poisoned");
            guard.as_ref().cloned().ok_or(BusError::Closed)?
        };

        self.inner.history.write().await.append(&message);

        debug!(
            message_id = %message.id,
            sender = %message.sender,
            recipient = ?message.recipient,
            kind = %message.kind,
            "message_sent"
        );

        tx.send(message.clone()).await.map_err(|_| BusError::Closed)?;
        Ok(message)
    }

    /// Start the dispatch loop on a background task.
    ///
    /// There is exactly one consumer per bus instance; a second call
    /// returns `BusError::DispatcherAlreadyRunning`. The task ends when the
    /// bus is [`close`](MessageBus::close)d and the queue drains.
    pub fn spawn_dispatcher(&self) -> BusResult<JoinHandle<()>> {
        let mut rx = self
            .rx
            .lock()
            .expect("bus receiver lock poisoned")
            .take()
            .ok_or(BusError::DispatcherAlreadyRunning)?;
        let inner = Arc::clone(&self.inner);

        Ok(tokio::spawn(async move {
            info!("dispatch_loop_started");
            while let Some(message) = rx.recv().await {
                inner.route(message).await;
            }
            info!("dispatch_loop_stopped");
        }))
    }

    /// Close the ingress queue. In-flight messages still get routed.
    pub fn close(&self) {
        self.tx.lock().expect("bus sender lock poisoned").take();
    }

    /// Number of messages waiting for the dispatch loop.
    pub fn queue_depth(&self) -> usize {
        let guard = self.tx.lock().expect("bus sender lock poisoned");
        match guard.as_ref() {
            Some(tx) => tx.max_capacity() - tx.capacity(),
            None => 0,
        }
    }

    /// All messages for a conversation, in send order.
    pub async fn conversation(&self, conversation_id: &str) -> Vec<Message> {
        self.inner.history.read().await.conversation(conversation_id)
    }

    /// The last `limit` messages sent by a role.
    pub async fn messages_from(&self, sender: AgentRole, limit: Option<usize>) -> Vec<Message> {
        self.inner.history.read().await.from_sender(sender, limit)
    }

    pub async fn history_len(&self) -> usize {
        self.inner.history.read().await.len()
    }

    pub async fn clear_history(&self) {
        self.inner.history.write().await.clear();
        info!("message_history_cleared");
    }

    /// Directed messages dropped for lack of a registered recipient.
    pub async fn unroutable_events(&self) -> Vec<UnroutableEvent> {
        self.inner.unroutable.read().await.clone()
    }

    /// Count of recipient handlers that failed during delivery.
    pub fn delivery_failures(&self) -> u64 {
        self.inner.delivery_failures.load(Ordering::Relaxed)
    }
}

impl BusInner {
    /// Route one message. Directed messages go to their recipient if
    /// registered; broadcasts go to every subscriber of the kind except
    /// the sender, in registration order.
    async fn route(&self, message: Message) {
        match message.recipient {
            Some(recipient) => {
                let handle = self.registry.read().await.agents.get(&recipient).cloned();
                match handle {
                    Some(agent) => self.deliver(recipient, &agent, message).await,
                    None => {
                        warn!(
                            recipient = %recipient,
                            message_id = %message.id,
                            "recipient_not_found"
                        );
                        self.unroutable.write().await.push(UnroutableEvent {
                            message_id: message.id.clone(),
                            recipient,
                            timestamp: Utc::now(),
                        });
                    }
                }
            }
            None => {
                let targets: Vec<(AgentRole, Arc<dyn Agent>)> = {
                    let registry = self.registry.read().await;
                    registry
                        .order
                        .iter()
                        .filter(|role| **role != message.sender)
                        .filter(|role| {
                            registry
                                .subscriptions
                                .get(role)
                                .is_some_and(|kinds| kinds.contains(&message.kind))
                        })
                        .filter_map(|role| {
                            registry.agents.get(role).map(|a| (*role, Arc::clone(a)))
                        })
                        .collect()
                };
                for (role, agent) in targets {
                    self.deliver(role, &agent, message.clone()).await;
                }
            }
        }
    }

    /// Deliver to one recipient, isolating handler failures.
    async fn deliver(&self, role: AgentRole, agent: &Arc<dyn Agent>, message: Message) {
        let message_id = message.id.clone();
        match agent.receive_message(message).await {
            Ok(()) => {
                debug!(recipient = %role, message_id = %message_id, "message_delivered");
            }
            Err(err) => {
                self.delivery_failures.fetch_add(1, Ordering::Relaxed);
                error!(
                    recipient = %role,
                    message_id = %message_id,
                    error = %err,
                    "message_delivery_error"
                );
            }
        }
    }
}
