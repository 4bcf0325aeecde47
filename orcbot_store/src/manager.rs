use async_trait::async_trait;
use chrono::Utc;
use orcbot_core::{ConversationThread, ThreadStore};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema, Set,
};
use tracing::{debug, info};

use crate::entity::threads;

/// Thread store backed by any database sea-orm can reach.
pub struct SeaOrmThreadStore {
    db: DatabaseConnection,
}

impl SeaOrmThreadStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        info!("Connecting to thread store database");
        let mut options = ConnectOptions::new(database_url.to_owned());
        if database_url.contains(":memory:") {
            // every pooled connection would otherwise see its own empty database
            options.max_connections(1).min_connections(1);
        }
        let db = Database::connect(options).await?;
        Self::with_connection(db).await
    }

    /// Wrap an existing connection, creating the threads table if needed.
    pub async fn with_connection(db: DatabaseConnection) -> anyhow::Result<Self> {
        let backend = db.get_database_backend();
        let schema = Schema::new(backend);
        let mut stmt = schema.create_table_from_entity(threads::Entity);
        stmt.if_not_exists();
        db.execute_unprepared(&backend.build(&stmt).to_string())
            .await?;

        info!("SeaOrmThreadStore initialized");
        Ok(Self { db })
    }

    #[must_use]
    pub const fn db(&self) -> &DatabaseConnection {
        &self.db
    }
}

impl From<threads::Model> for ConversationThread {
    fn from(model: threads::Model) -> Self {
        Self {
            key: model.timestamp,
            session_id: model.session_id,
            updated_at: Some(model.updated_at.and_utc()),
        }
    }
}

#[async_trait]
impl ThreadStore for SeaOrmThreadStore {
    async fn load(&self, key: &str) -> anyhow::Result<Option<ConversationThread>> {
        let model = threads::Entity::find_by_id(key.to_owned())
            .one(&self.db)
            .await?;
        Ok(model.map(Into::into))
    }

    async fn save(&self, thread: &ConversationThread) -> anyhow::Result<()> {
        let updated_at = thread.updated_at.unwrap_or_else(Utc::now).naive_utc();
        let model = threads::ActiveModel {
            timestamp: Set(thread.key.clone()),
            session_id: Set(thread.session_id.clone()),
            updated_at: Set(updated_at),
        };

        threads::Entity::insert(model)
            .on_conflict(
                OnConflict::column(threads::Column::Timestamp)
                    .update_columns([threads::Column::SessionId, threads::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;

        debug!("Saved thread: {}", thread.key);
        Ok(())
    }
}
