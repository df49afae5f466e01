//! Audit trail for rejected verification attempts.
//!
//! Every failure leaves a row (or at least a log line) with enough context to
//! reconstruct the attempt: what was tried, from where, and which rules broke.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tracing::{info_span, warn, Instrument};
use uuid::Uuid;

use super::request::{ActionKind, DeviceType, Modality};
use super::violations::Violation;

/// One rejected attempt as handed to the sink.
///
/// Modality and device type are absent for registrations that carried no
/// biometric payload.
#[derive(Debug, Clone)]
pub struct FailedAttempt {
    pub action: ActionKind,
    pub modality: Option<Modality>,
    pub device_type: Option<DeviceType>,
    pub member_id: Option<Uuid>,
    pub email: Option<String>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub occurred_at: DateTime<Utc>,
    pub violations: Vec<Violation>,
}

impl FailedAttempt {
    fn violation_codes(&self) -> Vec<&'static str> {
        self.violations
            .iter()
            .map(|violation| violation.code.as_str())
            .collect()
    }
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record_failed_attempt(&self, attempt: &FailedAttempt) -> Result<()>;
}

/// Postgres-backed sink writing to `verification_audit_log`.
#[derive(Debug, Clone)]
pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn record_failed_attempt(&self, attempt: &FailedAttempt) -> Result<()> {
        let violations = serde_json::to_string(&attempt.violations)
            .context("failed to serialize violations")?;

        let query = r"
            INSERT INTO verification_audit_log
                (action, modality, device_type, member_id, email,
                 ip_address, user_agent, occurred_at, violations)
            VALUES ($1, $2, $3, $4, $5, $6::inet, $7, $8, $9::jsonb)
        ";
        let span = info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "INSERT",
            db.statement = query
        );
        sqlx::query(query)
            .bind(attempt.action.as_str())
            .bind(attempt.modality.map(|modality| modality.as_str()))
            .bind(attempt.device_type.map(|device| device.as_str()))
            .bind(attempt.member_id)
            .bind(attempt.email.as_deref())
            .bind(attempt.client_ip.as_deref())
            .bind(attempt.user_agent.as_deref())
            .bind(attempt.occurred_at)
            .bind(violations)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to write verification audit log")?;

        Ok(())
    }
}

/// Local dev sink that logs the rejection instead of persisting it.
#[derive(Clone, Debug)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record_failed_attempt(&self, attempt: &FailedAttempt) -> Result<()> {
        warn!(
            action = attempt.action.as_str(),
            modality = attempt.modality.map(|modality| modality.as_str()),
            device_type = attempt.device_type.map(|device| device.as_str()),
            member_id = ?attempt.member_id,
            client_ip = ?attempt.client_ip,
            violations = ?attempt.violation_codes(),
            "verification attempt rejected"
        );
        Ok(())
    }
}

/// In-memory sink for tests: records every attempt for later assertions.
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    attempts: tokio::sync::Mutex<Vec<FailedAttempt>>,
}

impl MemoryAuditSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn recorded(&self) -> Vec<FailedAttempt> {
        self.attempts.lock().await.clone()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn record_failed_attempt(&self, attempt: &FailedAttempt) -> Result<()> {
        self.attempts.lock().await.push(attempt.clone());
        Ok(())
    }
}
