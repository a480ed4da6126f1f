//! # Database Error Types
//!
//! Error types for storage and checkout operations.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Error Propagation                                    │
//! │                                                                         │
//! │  SQLite Error (sqlx::Error)          Business rule (CoreError)          │
//! │       │                                    │                            │
//! │       ▼                                    ▼                            │
//! │  DbError (this module) ← classifies constraints, wraps core errors      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ErrorCode ← what the chat front-end switches on                        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Front-end renders a user-facing message                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use shopfront_core::{CoreError, ErrorCode, ValidationError};
use thiserror::Error;

/// Storage and checkout errors.
#[derive(Debug, Error)]
pub enum DbError {
    /// Entity not found in database.
    ///
    /// ## When This Occurs
    /// - Unknown product id on a stock adjustment or cart add
    /// - Unknown order number on a status change
    /// - Unknown bonus id on removal
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// Unique constraint violation.
    ///
    /// ## When This Occurs
    /// - Creating a product whose name is taken
    /// - An order number raced in by another checkout
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Foreign key constraint violation.
    #[error("Foreign key violation: {message}")]
    ForeignKeyViolation { message: String },

    /// CHECK constraint violation (negative stock, out-of-range percent, ...).
    #[error("Check constraint violation: {message}")]
    CheckViolation { message: String },

    /// Order-number minting ran out of attempts.
    #[error("Could not mint a unique order number after {attempts} attempts")]
    GenerationExhausted { attempts: u32 },

    /// The checkout commit step failed and was rolled back.
    #[error("Order creation failed: {source}")]
    OrderCreationFailed {
        #[source]
        source: Box<DbError>,
    },

    /// Another writer holds the database lock past the busy timeout.
    #[error("Database is busy, try again")]
    Busy,

    /// Database connection failed.
    ///
    /// ## When This Occurs
    /// - Database file can't be created
    /// - File permissions issue
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Migration failed.
    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    /// Query execution failed.
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Transaction failed.
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    /// Pool exhausted (all connections in use).
    #[error("Connection pool exhausted")]
    PoolExhausted,

    /// Business rule violation raised while holding a connection.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// Internal database error.
    #[error("Internal database error: {0}")]
    Internal(String),
}

impl DbError {
    /// Creates a NotFound error for a given entity type and ID.
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Creates a UniqueViolation error.
    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Wraps a failure of the checkout commit step.
    pub fn order_creation_failed(source: DbError) -> Self {
        DbError::OrderCreationFailed {
            source: Box::new(source),
        }
    }

    /// Returns the front-end error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            DbError::NotFound { .. } => ErrorCode::NotFound,
            DbError::UniqueViolation { .. } => ErrorCode::ConstraintViolation,
            DbError::ForeignKeyViolation { .. } => ErrorCode::ConstraintViolation,
            DbError::CheckViolation { .. } => ErrorCode::ConstraintViolation,
            DbError::GenerationExhausted { .. } => ErrorCode::GenerationExhausted,
            DbError::OrderCreationFailed { .. } => ErrorCode::OrderCreationFailed,
            DbError::Busy | DbError::PoolExhausted | DbError::ConnectionFailed(_) => {
                ErrorCode::Unavailable
            }
            DbError::Core(core) => core.code(),
            DbError::MigrationFailed(_)
            | DbError::QueryFailed(_)
            | DbError::TransactionFailed(_)
            | DbError::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Storage was temporarily unavailable; the same call may succeed later.
    pub fn is_transient(&self) -> bool {
        match self {
            DbError::Busy | DbError::PoolExhausted => true,
            DbError::OrderCreationFailed { source } => source.is_transient(),
            _ => false,
        }
    }

    /// The underlying cause, looking through `OrderCreationFailed`.
    pub fn root(&self) -> &DbError {
        match self {
            DbError::OrderCreationFailed { source } => source.root(),
            other => other,
        }
    }

    /// Whether this is a UNIQUE violation on `field` (`table.column`).
    pub(crate) fn is_unique_violation_on(&self, field: &str) -> bool {
        matches!(self, DbError::UniqueViolation { field: f, .. } if f == field)
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Core(CoreError::Validation(err))
    }
}

/// Convert sqlx errors to DbError.
///
/// ## Error Mapping
/// ```text
/// sqlx::Error::RowNotFound    → DbError::NotFound
/// sqlx::Error::Database       → Analyze message for constraint type
/// "database is locked"        → DbError::Busy
/// sqlx::Error::PoolTimedOut   → DbError::PoolExhausted
/// Other                       → DbError::Internal
/// ```
impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::NotFound {
                entity: "Record".to_string(),
                id: "unknown".to_string(),
            },

            sqlx::Error::Database(db_err) => {
                let msg = db_err.message();

                // SQLite constraint messages:
                // "UNIQUE constraint failed: <table>.<column>"
                // "FOREIGN KEY constraint failed"
                // "CHECK constraint failed: <expr>"
                if let Some(field) = msg.strip_prefix("UNIQUE constraint failed: ") {
                    DbError::UniqueViolation {
                        field: field.to_string(),
                        value: "unknown".to_string(),
                    }
                } else if msg.contains("FOREIGN KEY constraint failed") {
                    DbError::ForeignKeyViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("CHECK constraint failed") {
                    DbError::CheckViolation {
                        message: msg.to_string(),
                    }
                } else if msg.contains("database is locked") || msg.contains("database is busy") {
                    DbError::Busy
                } else {
                    DbError::QueryFailed(msg.to_string())
                }
            }

            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,

            sqlx::Error::PoolClosed => DbError::ConnectionFailed("Pool is closed".to_string()),

            _ => DbError::Internal(err.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes() {
        assert_eq!(DbError::not_found("Product", 7).code(), ErrorCode::NotFound);
        assert_eq!(
            DbError::duplicate("products.name", "Tea").code(),
            ErrorCode::ConstraintViolation
        );
        assert_eq!(DbError::Busy.code(), ErrorCode::Unavailable);

        let err: DbError = CoreError::EmptyCart { user_id: 1 }.into();
        assert_eq!(err.code(), ErrorCode::EmptyCart);
    }

    #[test]
    fn test_order_creation_failed_keeps_cause() {
        let err = DbError::order_creation_failed(DbError::GenerationExhausted { attempts: 3 });

        assert_eq!(err.code(), ErrorCode::OrderCreationFailed);
        assert!(matches!(err.root(), DbError::GenerationExhausted { attempts: 3 }));
        assert!(!err.is_transient());

        let busy = DbError::order_creation_failed(DbError::Busy);
        assert!(busy.is_transient());
    }

    #[test]
    fn test_not_found_message() {
        let err = DbError::not_found("Order", "ORD-1");
        assert_eq!(err.to_string(), "Order not found: ORD-1");
    }
}
