//! Identity store: active-member lookups, uniqueness probes, and atomic
//! lockout mutations.
//!
//! Lockout state is read-modify-written under a row lock so concurrent failed
//! logins for the same account never under-count.

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

use super::lockout::{LockoutPolicy, LockoutState};

/// A member row as the workflow sees it. Lookups only surface active members,
/// so the type carries no status flag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: Uuid,
    pub email: String,
    pub cpf: Option<String>,
    pub phone: Option<String>,
    pub lockout: LockoutState,
}

#[async_trait]
pub trait IdentityStore: Send + Sync {
    async fn find_active_by_email(&self, email: &str) -> Result<Option<Member>>;
    async fn find_active_by_id(&self, id: Uuid) -> Result<Option<Member>>;

    async fn is_email_taken(&self, email: &str) -> Result<bool>;
    async fn is_cpf_taken(&self, cpf: &str) -> Result<bool>;
    async fn is_phone_taken(&self, phone: &str) -> Result<bool>;

    /// Applies one failed login atomically and returns the resulting state.
    async fn record_failed_login(
        &self,
        member_id: Uuid,
        policy: &LockoutPolicy,
        now: DateTime<Utc>,
    ) -> Result<LockoutState>;

    /// Clears the attempt counter and any lock window after a successful login.
    async fn reset_login_attempts(&self, member_id: Uuid) -> Result<()>;

    /// Administrative lock for an explicit number of minutes.
    async fn lock_account(&self, member_id: Uuid, minutes: i64, now: DateTime<Utc>) -> Result<()>;

    async fn unlock_account(&self, member_id: Uuid) -> Result<()>;
}

/// Postgres-backed identity store.
#[derive(Debug, Clone)]
pub struct PgIdentityStore {
    pool: PgPool,
}

impl PgIdentityStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn exists(&self, query: &'static str, value: &str) -> Result<bool> {
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(value)
            .fetch_one(&self.pool)
            .instrument(span)
            .await
            .context("failed to run uniqueness probe")?;

        Ok(row.get("taken"))
    }
}

fn member_from_row(row: &sqlx::postgres::PgRow) -> Member {
    let attempts: i32 = row.get("login_attempts");
    Member {
        id: row.get("id"),
        email: row.get("email"),
        cpf: row.get("cpf"),
        phone: row.get("phone"),
        lockout: LockoutState {
            login_attempts: u32::try_from(attempts).unwrap_or(0),
            locked_until: row.get("locked_until"),
        },
    }
}

#[async_trait]
impl IdentityStore for PgIdentityStore {
    async fn find_active_by_email(&self, email: &str) -> Result<Option<Member>> {
        let query = "SELECT id, email, cpf, phone, login_attempts, locked_until \
                     FROM members WHERE status = 'active' AND email = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(email)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to look up member by email")?;

        Ok(row.as_ref().map(member_from_row))
    }

    async fn find_active_by_id(&self, id: Uuid) -> Result<Option<Member>> {
        let query = "SELECT id, email, cpf, phone, login_attempts, locked_until \
                     FROM members WHERE status = 'active' AND id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(id)
            .fetch_optional(&self.pool)
            .instrument(span)
            .await
            .context("failed to look up member by id")?;

        Ok(row.as_ref().map(member_from_row))
    }

    async fn is_email_taken(&self, email: &str) -> Result<bool> {
        self.exists(
            "SELECT EXISTS(SELECT 1 FROM members WHERE email = $1) AS taken",
            email,
        )
        .await
    }

    async fn is_cpf_taken(&self, cpf: &str) -> Result<bool> {
        self.exists(
            "SELECT EXISTS(SELECT 1 FROM members WHERE cpf = $1) AS taken",
            cpf,
        )
        .await
    }

    async fn is_phone_taken(&self, phone: &str) -> Result<bool> {
        self.exists(
            "SELECT EXISTS(SELECT 1 FROM members WHERE phone = $1) AS taken",
            phone,
        )
        .await
    }

    async fn record_failed_login(
        &self,
        member_id: Uuid,
        policy: &LockoutPolicy,
        now: DateTime<Utc>,
    ) -> Result<LockoutState> {
        // Row lock keeps concurrent failures for one account serialized.
        let mut tx = self
            .pool
            .begin()
            .await
            .context("begin lockout transaction")?;

        let query = "SELECT login_attempts, locked_until FROM members WHERE id = $1 FOR UPDATE";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "SELECT",
            db.statement = query
        );
        let row = sqlx::query(query)
            .bind(member_id)
            .fetch_one(&mut *tx)
            .instrument(span)
            .await
            .context("failed to read lockout state")?;

        let attempts: i32 = row.get("login_attempts");
        let mut state = LockoutState {
            login_attempts: u32::try_from(attempts).unwrap_or(0),
            locked_until: row.get("locked_until"),
        };
        state.record_failure(policy, now);

        let query = "UPDATE members SET login_attempts = $2, locked_until = $3 WHERE id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(member_id)
            .bind(i32::try_from(state.login_attempts).unwrap_or(i32::MAX))
            .bind(state.locked_until)
            .execute(&mut *tx)
            .instrument(span)
            .await
            .context("failed to persist lockout state")?;

        tx.commit().await.context("commit lockout transaction")?;

        Ok(state)
    }

    async fn reset_login_attempts(&self, member_id: Uuid) -> Result<()> {
        let query = "UPDATE members SET login_attempts = 0, locked_until = NULL WHERE id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(member_id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to reset login attempts")?;

        Ok(())
    }

    async fn lock_account(&self, member_id: Uuid, minutes: i64, now: DateTime<Utc>) -> Result<()> {
        let until = now + Duration::minutes(minutes);
        let query = "UPDATE members SET locked_until = $2 WHERE id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(member_id)
            .bind(until)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to lock account")?;

        Ok(())
    }

    async fn unlock_account(&self, member_id: Uuid) -> Result<()> {
        let query = "UPDATE members SET login_attempts = 0, locked_until = NULL WHERE id = $1";
        let span = tracing::info_span!(
            "db.query",
            db.system = "postgresql",
            db.operation = "UPDATE",
            db.statement = query
        );
        sqlx::query(query)
            .bind(member_id)
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to unlock account")?;

        Ok(())
    }
}

/// In-memory identity store for tests and local runs without a database.
#[derive(Debug, Default)]
pub struct MemoryIdentityStore {
    members: tokio::sync::Mutex<Vec<MemberRecord>>,
}

#[derive(Debug, Clone)]
struct MemberRecord {
    member: Member,
    active: bool,
}

impl MemoryIdentityStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an active member.
    pub async fn seed(&self, member: Member) {
        self.members.lock().await.push(MemberRecord {
            member,
            active: true,
        });
    }

    /// Seeds a member that lookups must not surface.
    pub async fn seed_inactive(&self, member: Member) {
        self.members.lock().await.push(MemberRecord {
            member,
            active: false,
        });
    }

    /// Test hook: current lockout state for a member, active or not.
    pub async fn lockout_of(&self, member_id: Uuid) -> Option<LockoutState> {
        self.members
            .lock()
            .await
            .iter()
            .find(|record| record.member.id == member_id)
            .map(|record| record.member.lockout)
    }
}

#[async_trait]
impl IdentityStore for MemoryIdentityStore {
    async fn find_active_by_email(&self, email: &str) -> Result<Option<Member>> {
        Ok(self
            .members
            .lock()
            .await
            .iter()
            .find(|record| record.active && record.member.email == email)
            .map(|record| record.member.clone()))
    }

    async fn find_active_by_id(&self, id: Uuid) -> Result<Option<Member>> {
        Ok(self
            .members
            .lock()
            .await
            .iter()
            .find(|record| record.active && record.member.id == id)
            .map(|record| record.member.clone()))
    }

    async fn is_email_taken(&self, email: &str) -> Result<bool> {
        Ok(self
            .members
            .lock()
            .await
            .iter()
            .any(|record| record.member.email == email))
    }

    async fn is_cpf_taken(&self, cpf: &str) -> Result<bool> {
        Ok(self
            .members
            .lock()
            .await
            .iter()
            .any(|record| record.member.cpf.as_deref() == Some(cpf)))
    }

    async fn is_phone_taken(&self, phone: &str) -> Result<bool> {
        Ok(self
            .members
            .lock()
            .await
            .iter()
            .any(|record| record.member.phone.as_deref() == Some(phone)))
    }

    async fn record_failed_login(
        &self,
        member_id: Uuid,
        policy: &LockoutPolicy,
        now: DateTime<Utc>,
    ) -> Result<LockoutState> {
        let mut members = self.members.lock().await;
        let record = members
            .iter_mut()
            .find(|record| record.member.id == member_id)
            .context("member not found")?;

        record.member.lockout.record_failure(policy, now);
        Ok(record.member.lockout)
    }

    async fn reset_login_attempts(&self, member_id: Uuid) -> Result<()> {
        self.unlock_account(member_id).await
    }

    async fn lock_account(&self, member_id: Uuid, minutes: i64, now: DateTime<Utc>) -> Result<()> {
        let mut members = self.members.lock().await;
        let record = members
            .iter_mut()
            .find(|record| record.member.id == member_id)
            .context("member not found")?;

        record.member.lockout.lock(Duration::minutes(minutes), now);
        Ok(())
    }

    async fn unlock_account(&self, member_id: Uuid) -> Result<()> {
        let mut members = self.members.lock().await;
        let record = members
            .iter_mut()
            .find(|record| record.member.id == member_id)
            .context("member not found")?;

        record.member.lockout.unlock();
        Ok(())
    }
}
