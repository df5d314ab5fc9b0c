//! Order number allocation.
//!
//! Numbers are `{prefix}{integer}`, strictly increasing per prefix, with one
//! prefix per order type. The primary strategy is a single server-side
//! upsert-increment-returning statement against `order_sequences`; the row
//! lock it takes serializes concurrent allocations for the same prefix even
//! across concurrent transactions. The fallback strategy scans existing
//! order numbers and increments the maximum; it carries a duplicate
//! allocation race under concurrency and exists only as a degraded mode for
//! backends without upsert-returning support. Strategy selection is by
//! backend capability detection, never by catching failures at runtime.

use sea_orm::{ConnectionTrait, DatabaseBackend, Statement};
use tracing::{debug, warn};

use crate::{
    entities::order::{self, Entity as OrderEntity},
    errors::ServiceError,
    models::OrderType,
};
use sea_orm::{ColumnTrait, EntityTrait, QueryFilter, QuerySelect};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AllocationStrategy {
    /// Atomic upsert-increment-returning on the sequence row.
    AtomicSequence,
    /// Max-scan + 1. Racy under concurrency; degraded mode only.
    MaxScanFallback,
}

#[derive(Clone, Debug)]
pub struct OrderNumberAllocator {
    strategy: AllocationStrategy,
}

impl OrderNumberAllocator {
    /// Picks the allocation strategy the backend can support.
    pub fn for_backend(backend: DatabaseBackend) -> Self {
        let strategy = match backend {
            // Both support INSERT .. ON CONFLICT DO UPDATE .. RETURNING.
            DatabaseBackend::Postgres | DatabaseBackend::Sqlite => {
                AllocationStrategy::AtomicSequence
            }
            _ => {
                warn!(
                    ?backend,
                    "backend lacks atomic sequence support; order number \
                     allocation degraded to max-scan (racy under concurrency)"
                );
                AllocationStrategy::MaxScanFallback
            }
        };
        Self { strategy }
    }

    pub fn strategy(&self) -> AllocationStrategy {
        self.strategy
    }

    /// Allocates the next order number for the given type.
    ///
    /// Safe to call inside the order-creation transaction: on the atomic
    /// path the sequence row stays locked until that transaction resolves.
    pub async fn allocate<C: ConnectionTrait>(
        &self,
        conn: &C,
        order_type: OrderType,
    ) -> Result<String, ServiceError> {
        let prefix = order_type.number_prefix();
        let value = match self.strategy {
            AllocationStrategy::AtomicSequence => self.next_from_sequence(conn, prefix).await?,
            AllocationStrategy::MaxScanFallback => self.next_from_max_scan(conn, prefix).await?,
        };
        debug!(prefix, value, "allocated order number");
        Ok(format!("{}{}", prefix, value))
    }

    async fn next_from_sequence<C: ConnectionTrait>(
        &self,
        conn: &C,
        prefix: &str,
    ) -> Result<i64, ServiceError> {
        let backend = conn.get_database_backend();
        let sql = match backend {
            DatabaseBackend::Postgres => {
                "INSERT INTO order_sequences (prefix, last_value, updated_at) \
                 VALUES ($1, 1, CURRENT_TIMESTAMP) \
                 ON CONFLICT (prefix) DO UPDATE \
                 SET last_value = order_sequences.last_value + 1, \
                     updated_at = CURRENT_TIMESTAMP \
                 RETURNING last_value"
            }
            _ => {
                "INSERT INTO order_sequences (prefix, last_value, updated_at) \
                 VALUES (?, 1, CURRENT_TIMESTAMP) \
                 ON CONFLICT (prefix) DO UPDATE \
                 SET last_value = order_sequences.last_value + 1, \
                     updated_at = CURRENT_TIMESTAMP \
                 RETURNING last_value"
            }
        };
        let row = conn
            .query_one(Statement::from_sql_and_values(
                backend,
                sql,
                [prefix.into()],
            ))
            .await?
            .ok_or_else(|| {
                ServiceError::InternalError(format!(
                    "sequence allocation for prefix {} returned no row",
                    prefix
                ))
            })?;
        let value: i64 = row.try_get("", "last_value")?;
        Ok(value)
    }

    /// Degraded path: reads the maximum issued number for the prefix and
    /// increments it. Two concurrent callers can observe the same maximum.
    async fn next_from_max_scan<C: ConnectionTrait>(
        &self,
        conn: &C,
        prefix: &str,
    ) -> Result<i64, ServiceError> {
        let numbers: Vec<String> = OrderEntity::find()
            .filter(order::Column::OrderNumber.starts_with(prefix))
            .select_only()
            .column(order::Column::OrderNumber)
            .into_tuple()
            .all(conn)
            .await?;

        let max = numbers
            .iter()
            .filter_map(|n| n.strip_prefix(prefix))
            .filter_map(|suffix| suffix.parse::<i64>().ok())
            .max()
            .unwrap_or(0);
        Ok(max + 1)
    }
}
