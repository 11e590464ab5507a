//! PostgreSQL-backed channel and connection repository.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use strata_application::ChannelRepository;
use strata_core::{AppError, AppResult, DomainId};
use strata_domain::{Channel, Connection, EntityStatus};

use crate::postgres_support::{DatabaseRetryPolicy, StoreError, with_retry};

/// PostgreSQL implementation of the channel repository port.
#[derive(Clone)]
pub struct PostgresChannelRepository {
    pool: PgPool,
    retry: DatabaseRetryPolicy,
}

impl PostgresChannelRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            retry: DatabaseRetryPolicy::default(),
        }
    }

    /// Replaces the retry policy for transient failures.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: DatabaseRetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ChannelRow {
    id: String,
    domain_id: String,
    parent_group_id: Option<String>,
    name: String,
    status: String,
    created_by: String,
    created_at: DateTime<Utc>,
}

impl ChannelRow {
    fn into_channel(self) -> AppResult<Channel> {
        Channel::restore(
            self.id,
            DomainId::new(self.domain_id)?,
            self.parent_group_id,
            self.name,
            EntityStatus::from_str(self.status.as_str())?,
            self.created_by,
            self.created_at,
        )
    }
}

struct ConnectionColumns {
    channel_ids: Vec<String>,
    client_ids: Vec<String>,
    domain_ids: Vec<String>,
    connection_types: Vec<String>,
}

impl ConnectionColumns {
    fn from_connections(connections: &[Connection]) -> Self {
        Self {
            channel_ids: connections.iter().map(|c| c.channel_id.clone()).collect(),
            client_ids: connections.iter().map(|c| c.client_id.clone()).collect(),
            domain_ids: connections
                .iter()
                .map(|c| c.domain_id.as_str().to_owned())
                .collect(),
            connection_types: connections
                .iter()
                .map(|c| c.connection_type.as_str().to_owned())
                .collect(),
        }
    }
}

#[async_trait]
impl ChannelRepository for PostgresChannelRepository {
    async fn create_channel(&self, channel: Channel) -> AppResult<Channel> {
        with_retry(self.retry, "create channel", || async {
            sqlx::query(
                r#"
                INSERT INTO channels
                    (id, domain_id, parent_group_id, name, status, created_by, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(channel.id())
            .bind(channel.domain_id().as_str())
            .bind(channel.parent_group_id())
            .bind(channel.name())
            .bind(channel.status().as_str())
            .bind(channel.created_by())
            .bind(channel.created_at())
            .execute(&self.pool)
            .await?;
            Ok::<_, StoreError>(())
        })
        .await?;

        Ok(channel)
    }

    async fn find_channel(&self, channel_id: &str) -> AppResult<Option<Channel>> {
        let row = with_retry(self.retry, "find channel", || async {
            let row = sqlx::query_as::<_, ChannelRow>(
                r#"
                SELECT id, domain_id, parent_group_id, name, status, created_by, created_at
                FROM channels
                WHERE id = $1
                "#,
            )
            .bind(channel_id)
            .fetch_optional(&self.pool)
            .await?;
            Ok::<_, StoreError>(row)
        })
        .await?;

        row.map(ChannelRow::into_channel).transpose()
    }

    async fn update_channel(&self, channel: Channel) -> AppResult<Channel> {
        with_retry(self.retry, "update channel", || async {
            let updated = sqlx::query(
                r#"
                UPDATE channels
                SET parent_group_id = $2, name = $3, status = $4
                WHERE id = $1
                "#,
            )
            .bind(channel.id())
            .bind(channel.parent_group_id())
            .bind(channel.name())
            .bind(channel.status().as_str())
            .execute(&self.pool)
            .await?;

            if updated.rows_affected() == 0 {
                return Err(StoreError::from(AppError::NotFound(format!(
                    "channel '{}' was not found",
                    channel.id()
                ))));
            }
            Ok::<_, StoreError>(())
        })
        .await?;

        Ok(channel)
    }

    async fn delete_channel(&self, channel_id: &str) -> AppResult<()> {
        with_retry(self.retry, "delete channel", || async {
            let deleted = sqlx::query("DELETE FROM channels WHERE id = $1")
                .bind(channel_id)
                .execute(&self.pool)
                .await?;

            if deleted.rows_affected() == 0 {
                return Err(StoreError::from(AppError::NotFound(format!(
                    "channel '{channel_id}' was not found"
                ))));
            }
            Ok::<_, StoreError>(())
        })
        .await
    }

    async fn add_connections(&self, connections: &[Connection]) -> AppResult<()> {
        let columns = ConnectionColumns::from_connections(connections);

        with_retry(self.retry, "add channel connections", || async {
            let mut transaction = self.pool.begin().await?;
            let missing = sqlx::query_scalar::<_, String>(
                r#"
                SELECT requested.channel_id
                FROM UNNEST($1::text[]) AS requested(channel_id)
                WHERE NOT EXISTS (SELECT 1 FROM channels WHERE id = requested.channel_id)
                LIMIT 1
                "#,
            )
            .bind(&columns.channel_ids)
            .fetch_optional(&mut *transaction)
            .await?;
            if let Some(channel_id) = missing {
                return Err(StoreError::from(AppError::NotFound(format!(
                    "channel '{channel_id}' was not found"
                ))));
            }

            sqlx::query(
                r#"
                INSERT INTO channel_connections (channel_id, client_id, domain_id, connection_type)
                SELECT * FROM UNNEST($1::text[], $2::text[], $3::text[], $4::text[])
                ON CONFLICT DO NOTHING
                "#,
            )
            .bind(&columns.channel_ids)
            .bind(&columns.client_ids)
            .bind(&columns.domain_ids)
            .bind(&columns.connection_types)
            .execute(&mut *transaction)
            .await?;

            transaction.commit().await?;
            Ok::<_, StoreError>(())
        })
        .await
    }

    async fn remove_connections(&self, connections: &[Connection]) -> AppResult<()> {
        let columns = ConnectionColumns::from_connections(connections);

        with_retry(self.retry, "remove channel connections", || async {
            sqlx::query(
                r#"
                DELETE FROM channel_connections
                USING UNNEST($1::text[], $2::text[], $3::text[])
                    AS removed(channel_id, client_id, connection_type)
                WHERE channel_connections.channel_id = removed.channel_id
                  AND channel_connections.client_id = removed.client_id
                  AND channel_connections.connection_type = removed.connection_type
                "#,
            )
            .bind(&columns.channel_ids)
            .bind(&columns.client_ids)
            .bind(&columns.connection_types)
            .execute(&self.pool)
            .await?;
            Ok::<_, StoreError>(())
        })
        .await
    }

    async fn has_connection(&self, connection: &Connection) -> AppResult<bool> {
        with_retry(self.retry, "check channel connection", || async {
            let exists = sqlx::query_scalar::<_, bool>(
                r#"
                SELECT EXISTS (
                    SELECT 1 FROM channel_connections
                    WHERE channel_id = $1 AND client_id = $2
                      AND domain_id = $3 AND connection_type = $4
                )
                "#,
            )
            .bind(connection.channel_id.as_str())
            .bind(connection.client_id.as_str())
            .bind(connection.domain_id.as_str())
            .bind(connection.connection_type.as_str())
            .fetch_one(&self.pool)
            .await?;
            Ok::<_, StoreError>(exists)
        })
        .await
    }

    async fn remove_client_connections(&self, client_id: &str) -> AppResult<u64> {
        with_retry(self.retry, "remove client connections", || async {
            let removed = sqlx::query("DELETE FROM channel_connections WHERE client_id = $1")
                .bind(client_id)
                .execute(&self.pool)
                .await?;
            Ok::<_, StoreError>(removed.rows_affected())
        })
        .await
    }

    async fn unset_parent_groups(&self, group_ids: &[String]) -> AppResult<u64> {
        with_retry(self.retry, "unset channel parent groups", || async {
            let cleared = sqlx::query(
                "UPDATE channels SET parent_group_id = NULL WHERE parent_group_id = ANY($1)",
            )
            .bind(group_ids)
            .execute(&self.pool)
            .await?;
            Ok::<_, StoreError>(cleared.rows_affected())
        })
        .await
    }
}
