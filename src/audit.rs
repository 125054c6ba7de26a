//! Append-only audit trail.
//!
//! [`AuditLogger`] enriches each event with service and environment tags and
//! hands it to a pluggable [`AuditStorage`]. Stored events are never mutated
//! or deleted.

use crate::error::AuditError;
use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Whether the audited action succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Outcome {
    Success,
    Failure,
}

impl From<bool> for Outcome {
    fn from(success: bool) -> Self {
        if success {
            Outcome::Success
        } else {
            Outcome::Failure
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Success => write!(f, "success"),
            Outcome::Failure => write!(f, "failure"),
        }
    }
}

/// A single audited action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub timestamp: DateTime<Utc>,
    /// Open tag such as `PAYMENT_INITIATED`.
    pub event_type: String,
    pub actor: String,
    pub resource: String,
    pub action: String,
    pub outcome: Outcome,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, Value>>,
}

impl AuditEvent {
    /// Creates an event stamped with the current time.
    pub fn new(
        event_type: impl Into<String>,
        actor: impl Into<String>,
        resource: impl Into<String>,
        action: impl Into<String>,
        outcome: Outcome,
    ) -> Self {
        AuditEvent {
            timestamp: Utc::now(),
            event_type: event_type.into(),
            actor: actor.into(),
            resource: resource.into(),
            action: action.into(),
            outcome,
            details: None,
        }
    }

    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.details
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn detail(&self, key: &str) -> Option<&Value> {
        self.details.as_ref()?.get(key)
    }
}

/// Exact-match filter over event fields. Unset fields match anything, so the
/// default filter matches every event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditFilter {
    pub timestamp: Option<DateTime<Utc>>,
    pub event_type: Option<String>,
    pub actor: Option<String>,
    pub resource: Option<String>,
    pub action: Option<String>,
    pub outcome: Option<Outcome>,
}

impl AuditFilter {
    pub fn actor(actor: impl Into<String>) -> Self {
        AuditFilter {
            actor: Some(actor.into()),
            ..Default::default()
        }
    }

    pub fn resource(resource: impl Into<String>) -> Self {
        AuditFilter {
            resource: Some(resource.into()),
            ..Default::default()
        }
    }

    pub fn event_type(event_type: impl Into<String>) -> Self {
        AuditFilter {
            event_type: Some(event_type.into()),
            ..Default::default()
        }
    }

    pub fn outcome(outcome: Outcome) -> Self {
        AuditFilter {
            outcome: Some(outcome),
            ..Default::default()
        }
    }

    /// Returns `true` if every set field equals the event's.
    pub fn matches(&self, event: &AuditEvent) -> bool {
        fn field<T: PartialEq>(want: &Option<T>, have: &T) -> bool {
            want.as_ref().map_or(true, |w| w == have)
        }

        field(&self.timestamp, &event.timestamp)
            && field(&self.event_type, &event.event_type)
            && field(&self.actor, &event.actor)
            && field(&self.resource, &event.resource)
            && field(&self.action, &event.action)
            && field(&self.outcome, &event.outcome)
    }
}

/// Backing store for audit events.
#[async_trait::async_trait]
pub trait AuditStorage: Send + Sync {
    async fn save(&mut self, event: AuditEvent) -> Result<(), AuditError>;

    /// Events matching `filter`, in insertion order.
    async fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditEvent>, AuditError>;
}

/// Vec-backed storage.
#[derive(Debug, Default)]
pub struct InMemoryAuditStorage {
    events: Vec<AuditEvent>,
}

impl InMemoryAuditStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every stored event.
    pub fn all(&self) -> Vec<AuditEvent> {
        self.events.clone()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

#[async_trait::async_trait]
impl AuditStorage for InMemoryAuditStorage {
    async fn save(&mut self, event: AuditEvent) -> Result<(), AuditError> {
        self.events.push(event);
        Ok(())
    }

    async fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditEvent>, AuditError> {
        Ok(self
            .events
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }
}

/// Enriches and stores audit events.
pub struct AuditLogger {
    storage: Box<dyn AuditStorage>,
    service_name: String,
    environment: String,
}

impl AuditLogger {
    pub const DEFAULT_SERVICE: &'static str = "payment-service";
    pub const DEFAULT_ENVIRONMENT: &'static str = "development";

    pub fn new(storage: impl AuditStorage + 'static) -> Self {
        AuditLogger {
            storage: Box::new(storage),
            service_name: Self::DEFAULT_SERVICE.to_string(),
            environment: Self::DEFAULT_ENVIRONMENT.to_string(),
        }
    }

    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = service_name.into();
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    /// Stores an enriched copy of `event`.
    ///
    /// Never fails the caller: a storage error is logged and dropped.
    pub async fn log(&mut self, event: &AuditEvent) {
        let enriched = event
            .clone()
            .with_detail("service", self.service_name.as_str())
            .with_detail("environment", self.environment.as_str());

        debug!(
            "[AUDIT] {}: {} on {} by {} - {}",
            event.event_type, event.action, event.resource, event.actor, event.outcome
        );

        if let Err(e) = self.storage.save(enriched).await {
            warn!("Dropping audit event {}: {}", event.event_type, e);
        }
    }

    pub async fn query(&self, filter: &AuditFilter) -> Result<Vec<AuditEvent>, AuditError> {
        self.storage.query(filter).await
    }

    pub async fn events_by_actor(&self, actor: &str) -> Result<Vec<AuditEvent>, AuditError> {
        self.query(&AuditFilter::actor(actor)).await
    }

    pub async fn events_by_resource(&self, resource: &str) -> Result<Vec<AuditEvent>, AuditError> {
        self.query(&AuditFilter::resource(resource)).await
    }

    pub async fn failed_events(&self) -> Result<Vec<AuditEvent>, AuditError> {
        self.query(&AuditFilter::outcome(Outcome::Failure)).await
    }

    pub async fn events_by_type(&self, event_type: &str) -> Result<Vec<AuditEvent>, AuditError> {
        self.query(&AuditFilter::event_type(event_type)).await
    }
}

impl fmt::Debug for AuditLogger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuditLogger")
            .field("service_name", &self.service_name)
            .field("environment", &self.environment)
            .finish_non_exhaustive()
    }
}
