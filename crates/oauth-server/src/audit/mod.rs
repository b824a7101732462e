//! Audit events and sinks.
//!
//! The validator, principal builder and authorizer each hold an
//! `Arc<dyn AuditSink>` handed to them at construction. Recording never
//! blocks the caller and never fails it: when auditing is disabled the sink
//! is [`NoopAuditSink`], otherwise a [`ChannelAuditSink`] hands events to a
//! background task that writes them through `tracing`.

pub mod records;

pub use records::{AuthenticationRecord, AuthorizationRecord, OperationType, KAFKA_AUDIT_CATEGORY};

use crate::config::AuditConfig;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Authentication type for bearer-token logins.
pub const OAUTH_AUTHENTICATION_TYPE: &str = "OAUTHBEARER";
/// Authentication type for TLS client certificates.
pub const SSL_AUTHENTICATION_TYPE: &str = "SSL";
/// Authentication type for unauthenticated connections.
pub const ANONYMOUS_AUTHENTICATION_TYPE: &str = "ANONYMOUS";

/// Mailbox size of the background audit writer.
const AUDIT_CHANNEL_BUFFER: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuditEvent {
    Authentication(AuthenticationRecord),
    Authorization(AuthorizationRecord),
}

impl AuditEvent {
    pub fn timestamp(&self) -> DateTime<Utc> {
        match self {
            AuditEvent::Authentication(record) => record.timestamp,
            AuditEvent::Authorization(record) => record.timestamp,
        }
    }

    pub fn operation_type(&self) -> OperationType {
        match self {
            AuditEvent::Authentication(record) => record.operation_type,
            AuditEvent::Authorization(record) => record.operation_type,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            AuditEvent::Authentication(record) => &record.name,
            AuditEvent::Authorization(record) => &record.name,
        }
    }

    pub fn category(&self) -> &'static str {
        KAFKA_AUDIT_CATEGORY
    }

    pub fn extension(&self) -> &BTreeMap<String, String> {
        match self {
            AuditEvent::Authentication(record) => &record.extension,
            AuditEvent::Authorization(record) => &record.extension,
        }
    }
}

/// Receiver of audit events. Implementations must not block.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: AuditEvent) {}
}

/// Writes each event as a structured `tracing` record on `server.audit`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, event: AuditEvent) {
        tracing::info!(
            target: "server.audit",
            timestamp = %event.timestamp().to_rfc3339(),
            category = event.category(),
            operation_type = %event.operation_type(),
            extension = ?event.extension(),
            "{}",
            event.name()
        );
    }
}

/// Forwards events to a background task that writes them to another sink.
///
/// Events are dropped with a warning when the mailbox is full or the writer
/// has stopped.
#[derive(Debug, Clone)]
pub struct ChannelAuditSink {
    sender: mpsc::Sender<AuditEvent>,
}

impl ChannelAuditSink {
    /// Spawn the writer task on `runtime`.
    ///
    /// The task ends once every sender has been dropped.
    pub fn spawn(runtime: &Handle, writer: Arc<dyn AuditSink>) -> (Self, JoinHandle<()>) {
        let (sender, mut receiver) = mpsc::channel::<AuditEvent>(AUDIT_CHANNEL_BUFFER);

        let task = runtime.spawn(async move {
            while let Some(event) = receiver.recv().await {
                writer.record(event);
            }
            tracing::debug!(target: "server.audit", "Audit writer stopped");
        });

        (Self { sender }, task)
    }
}

impl AuditSink for ChannelAuditSink {
    fn record(&self, event: AuditEvent) {
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                tracing::warn!(
                    target: "server.audit",
                    operation_type = %event.operation_type(),
                    "Audit mailbox full, dropping event"
                );
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                tracing::warn!(
                    target: "server.audit",
                    operation_type = %event.operation_type(),
                    "Audit writer stopped, dropping event"
                );
            }
        }
    }
}

/// Keeps every event in memory, for tests and embedding diagnostics.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    events: Mutex<Vec<AuditEvent>>,
}

impl MemoryAuditSink {
    /// Snapshot of the recorded events, oldest first.
    pub fn events(&self) -> Vec<AuditEvent> {
        match self.events.lock() {
            Ok(events) => events.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: AuditEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

/// The sink for `config`, writing audit records to tracing.
pub fn audit_sink(config: AuditConfig) -> Arc<dyn AuditSink> {
    audit_sink_with_writer(config, Arc::new(TracingAuditSink))
}

/// The sink for `config`, writing audit records to `writer`.
///
/// Enabled auditing uses a [`ChannelAuditSink`] on the current tokio runtime.
/// Outside a runtime events are written synchronously instead.
pub fn audit_sink_with_writer(
    config: AuditConfig,
    writer: Arc<dyn AuditSink>,
) -> Arc<dyn AuditSink> {
    if !config.enabled {
        return Arc::new(NoopAuditSink);
    }

    match Handle::try_current() {
        Ok(runtime) => {
            let (sink, _task) = ChannelAuditSink::spawn(&runtime, writer);
            tracing::info!(target: "server.audit", "Audit logging enabled");
            Arc::new(sink)
        }
        Err(_) => {
            tracing::info!(
                target: "server.audit",
                "Audit logging enabled without a tokio runtime, writing synchronously"
            );
            writer
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn failed_login(principal: &str) -> AuditEvent {
        AuditEvent::Authentication(AuthenticationRecord::failed(
            Some(principal.to_string()),
            OAUTH_AUTHENTICATION_TYPE,
            "bad token",
            None,
        ))
    }

    #[test]
    fn test_event_accessors() {
        let event = failed_login("alice");

        assert_eq!(event.category(), "kafka.audit");
        assert_eq!(event.operation_type(), OperationType::AuthenticationFailed);
        assert!(event.name().starts_with("Failed authentication for principal 'alice'"));
        assert_eq!(event.extension().get("suser").map(String::as_str), Some("alice"));
    }

    #[test]
    fn test_memory_sink_keeps_order() {
        let sink = MemoryAuditSink::default();
        sink.record(failed_login("a"));
        sink.record(failed_login("b"));

        let users: Vec<_> = sink
            .events()
            .iter()
            .map(|e| e.extension().get("suser").cloned().unwrap())
            .collect();
        assert_eq!(users, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_channel_sink_forwards_to_writer() {
        let memory = Arc::new(MemoryAuditSink::default());
        let (sink, writer) = ChannelAuditSink::spawn(&Handle::current(), memory.clone());

        sink.record(failed_login("alice"));
        drop(sink);
        tokio::time::timeout(Duration::from_secs(1), writer)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(memory.events().len(), 1);
    }

    #[tokio::test]
    async fn test_channel_sink_drops_after_writer_stops() {
        let memory = Arc::new(MemoryAuditSink::default());
        let (sink, writer) = ChannelAuditSink::spawn(&Handle::current(), memory.clone());
        writer.abort();
        let _ = writer.await;

        sink.record(failed_login("alice"));

        assert!(memory.events().is_empty());
    }

    #[test]
    fn test_disabled_audit_records_nothing() {
        let memory = Arc::new(MemoryAuditSink::default());
        let sink = audit_sink_with_writer(AuditConfig { enabled: false }, memory.clone());

        sink.record(failed_login("alice"));

        assert!(memory.events().is_empty());
    }

    #[test]
    fn test_enabled_audit_without_runtime_writes_synchronously() {
        let memory = Arc::new(MemoryAuditSink::default());
        let sink = audit_sink_with_writer(AuditConfig { enabled: true }, memory.clone());

        sink.record(failed_login("alice"));

        assert_eq!(memory.events().len(), 1);
    }

    #[tokio::test]
    async fn test_enabled_audit_inside_runtime_delivers_in_background() {
        let memory = Arc::new(MemoryAuditSink::default());
        let sink = audit_sink_with_writer(AuditConfig { enabled: true }, memory.clone());

        sink.record(failed_login("alice"));

        tokio::time::timeout(Duration::from_secs(1), async {
            while memory.events().is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        let events = memory.events();
        assert_eq!(
            events.first().unwrap().extension().get("suser").map(String::as_str),
            Some("alice")
        );
    }
}
