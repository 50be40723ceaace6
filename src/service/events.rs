//! In-process event bus. Sessions and profile updates publish typed events
//! that embedding hosts (UI layers, sync jobs) consume through global or
//! filtered broadcast subscriptions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use crate::engine::types::{DifficultyLevel, ExerciseKind, ProgressTrend, SessionResult};

const CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum TrainingEvent {
    #[serde(rename = "SESSION_STARTED")]
    SessionStarted(SessionStartedPayload),

    #[serde(rename = "TRIAL_RECORDED")]
    TrialRecorded(TrialRecordedPayload),

    #[serde(rename = "SESSION_COMPLETED")]
    SessionCompleted(SessionCompletedPayload),

    #[serde(rename = "PROFILE_UPDATED")]
    ProfileUpdated(ProfileUpdatedPayload),
}

impl TrainingEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            TrainingEvent::SessionStarted(_) => "SESSION_STARTED",
            TrainingEvent::TrialRecorded(_) => "TRIAL_RECORDED",
            TrainingEvent::SessionCompleted(_) => "SESSION_COMPLETED",
            TrainingEvent::ProfileUpdated(_) => "PROFILE_UPDATED",
        }
    }

    pub fn user_id(&self) -> &str {
        match self {
            TrainingEvent::SessionStarted(p) => &p.user_id,
            TrainingEvent::TrialRecorded(p) => &p.user_id,
            TrainingEvent::SessionCompleted(p) => &p.user_id,
            TrainingEvent::ProfileUpdated(p) => &p.user_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStartedPayload {
    pub user_id: String,
    pub session_id: String,
    pub exercise: ExerciseKind,
    pub starting_level: DifficultyLevel,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialRecordedPayload {
    pub user_id: String,
    pub session_id: String,
    pub trial_index: u32,
    pub correct: bool,
    pub next_level: DifficultyLevel,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionCompletedPayload {
    pub user_id: String,
    pub session_id: String,
    pub exercise: ExerciseKind,
    pub result: SessionResult,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileUpdatedPayload {
    pub user_id: String,
    pub progress_trend: ProgressTrend,
    pub overall_capacity: f64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct EventEnvelope {
    pub id: String,
    pub event: TrainingEvent,
    pub created_at: DateTime<Utc>,
}

impl EventEnvelope {
    pub fn new(event: TrainingEvent) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            event,
            created_at: Utc::now(),
        }
    }
}

type SubscriberId = String;

struct Subscriber {
    user_id: Option<String>,
    event_types: Option<Vec<String>>,
    sender: broadcast::Sender<EventEnvelope>,
}

impl Subscriber {
    fn matches(&self, envelope: &EventEnvelope) -> bool {
        if let Some(ref user_id) = self.user_id {
            if envelope.event.user_id() != user_id {
                return false;
            }
        }

        if let Some(ref event_types) = self.event_types {
            if !event_types.contains(&envelope.event.event_type().to_string()) {
                return false;
            }
        }

        true
    }
}

pub struct EventBus {
    global_sender: broadcast::Sender<EventEnvelope>,
    subscribers: RwLock<HashMap<SubscriberId, Subscriber>>,
    events_published: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        let (global_sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            global_sender,
            subscribers: RwLock::new(HashMap::new()),
            events_published: AtomicU64::new(0),
        }
    }

    pub async fn publish(&self, event: TrainingEvent) {
        let envelope = EventEnvelope::new(event);
        let event_type = envelope.event.event_type();
        let user_id = envelope.event.user_id().to_string();
        self.events_published.fetch_add(1, Ordering::Relaxed);

        let subscribers = self.subscribers.read().await;
        let mut sent_count = 0usize;

        for subscriber in subscribers.values() {
            if subscriber.matches(&envelope) && subscriber.sender.send(envelope.clone()).is_ok() {
                sent_count += 1;
            }
        }

        if self.global_sender.send(envelope.clone()).is_err() {
            debug!("no global subscribers for event");
        }

        debug!(
            event_type = event_type,
            user_id = user_id,
            sent_to = sent_count,
            "event published"
        );
    }

    pub fn subscribe_global(&self) -> broadcast::Receiver<EventEnvelope> {
        self.global_sender.subscribe()
    }

    pub async fn subscribe_filtered(
        &self,
        user_id: Option<String>,
        event_types: Option<Vec<String>>,
    ) -> (SubscriberId, broadcast::Receiver<EventEnvelope>) {
        let (sender, receiver) = broadcast::channel(CHANNEL_CAPACITY);
        let subscriber_id = uuid::Uuid::new_v4().to_string();

        let subscriber = Subscriber {
            user_id,
            event_types,
            sender,
        };

        {
            let mut subscribers = self.subscribers.write().await;
            subscribers.insert(subscriber_id.clone(), subscriber);
        }

        debug!(subscriber_id = %subscriber_id, "filtered subscription created");

        (subscriber_id, receiver)
    }

    pub async fn unsubscribe(&self, subscriber_id: &str) {
        let mut subscribers = self.subscribers.write().await;
        if subscribers.remove(subscriber_id).is_some() {
            debug!(subscriber_id = %subscriber_id, "subscription removed");
        }
    }

    pub async fn subscriber_count(&self) -> usize {
        let subscribers = self.subscribers.read().await;
        subscribers.len() + self.global_sender.receiver_count()
    }

    pub fn events_published(&self) -> u64 {
        self.events_published.load(Ordering::Relaxed)
    }

    pub async fn stats(&self) -> EventBusStats {
        EventBusStats {
            total_events: self.events_published(),
            subscriber_count: self.subscriber_count().await,
            global_subscribers: self.global_sender.receiver_count(),
            filtered_subscribers: self.subscribers.read().await.len(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct EventBusStats {
    pub total_events: u64,
    pub subscriber_count: usize,
    pub global_subscribers: usize,
    pub filtered_subscribers: usize,
}
