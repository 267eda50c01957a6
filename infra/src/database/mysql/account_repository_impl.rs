//! MySQL implementation of the AccountRepository trait.
//!
//! Reads the active flag and the account-wide revocation timestamp from the
//! `accounts` table owned by the account subsystem:
//!
//! ```sql
//! CREATE TABLE accounts (
//!     id            CHAR(36)   NOT NULL PRIMARY KEY,
//!     is_active     BOOLEAN    NOT NULL DEFAULT TRUE,
//!     revoked_since TIMESTAMP  NULL
//! );
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{MySqlPool, Row};
use tracing::{debug, error};
use uuid::Uuid;

use sk_core::domain::entities::account::Account;
use sk_core::errors::{BackendError, DomainError};
use sk_core::repositories::AccountRepository;

/// MySQL implementation of AccountRepository
pub struct MySqlAccountRepository {
    /// Database connection pool
    pool: MySqlPool,
}

impl MySqlAccountRepository {
    /// Create a new MySQL account repository
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    /// Convert database row to the Account view
    fn row_to_account(row: &sqlx::mysql::MySqlRow) -> Result<Account, DomainError> {
        let id: String = row
            .try_get("id")
            .map_err(|e| DomainError::Internal { message: format!("Failed to get id: {}", e) })?;

        Ok(Account {
            id: Uuid::parse_str(&id).map_err(|e| DomainError::Internal {
                message: format!("Invalid account UUID: {}", e),
            })?,
            is_active: row.try_get("is_active").map_err(|e| DomainError::Internal {
                message: format!("Failed to get is_active: {}", e),
            })?,
            revoked_since: row
                .try_get::<Option<DateTime<Utc>>, _>("revoked_since")
                .map_err(|e| DomainError::Internal {
                    message: format!("Failed to get revoked_since: {}", e),
                })?,
        })
    }
}

/// Store outages are transient; the service turns them into retryable
/// errors or fails closed
fn store_unavailable(context: &str, e: sqlx::Error) -> DomainError {
    error!("{}: {}", context, e);
    BackendError::AccountStore(format!("{}: {}", context, e)).into()
}

#[async_trait]
impl AccountRepository for MySqlAccountRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, DomainError> {
        let query = r#"
            SELECT id, is_active, revoked_since
            FROM accounts
            WHERE id = ?
        "#;

        let row = sqlx::query(query)
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| store_unavailable("Failed to load account", e))?;

        match row {
            Some(row) => Ok(Some(Self::row_to_account(&row)?)),
            None => {
                debug!(user_id = %id, "Account not found");
                Ok(None)
            }
        }
    }

    async fn set_revoked_since(&self, id: Uuid, at: DateTime<Utc>) -> Result<bool, DomainError> {
        // Never moves the cutover backwards
        let query = r#"
            UPDATE accounts
            SET revoked_since = ?
            WHERE id = ? AND (revoked_since IS NULL OR revoked_since < ?)
        "#;

        let result = sqlx::query(query)
            .bind(at)
            .bind(id.to_string())
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| store_unavailable("Failed to set revoked_since", e))?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        // Nothing updated: either unknown, or already revoked at or after `at`
        let exists: bool = sqlx::query("SELECT COUNT(*) AS found FROM accounts WHERE id = ?")
            .bind(id.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| store_unavailable("Failed to check account existence", e))?
            .try_get::<i64, _>("found")
            .map(|found| found > 0)
            .map_err(|e| DomainError::Internal {
                message: format!("Failed to read existence result: {}", e),
            })?;

        Ok(exists)
    }
}
