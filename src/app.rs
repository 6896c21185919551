//! Application wiring: configuration to store, services and server units

use std::sync::Arc;

use chrono::Utc;

use crate::config::{AppConfig, ConfigResult};
use crate::grpc_server::GrpcServer;
use crate::http_server::HttpServer;
use crate::observability::{Logger, MetricsRegistry};
use crate::orders::{self, Order, MAX_ORDER_AMOUNT_CENTS};
use crate::store::MemoryStore;
use crate::supervisor::{Supervisor, SupervisorError};
use crate::txn::{run_in_transaction, RequestContext};
use crate::users::{repository, User, UserCreateInput, UserError, UserResult, UserService};

/// A configured, not yet running, application
pub struct App {
    config: AppConfig,
    store: MemoryStore,
    metrics: Arc<MetricsRegistry>,
}

impl App {
    /// Build the application; applies the configured log level
    pub fn new(config: AppConfig) -> ConfigResult<Self> {
        config.validate()?;
        Logger::set_min_severity(config.logging.severity()?);

        let store = MemoryStore::with_config(config.database.store_config());
        Ok(Self {
            config,
            store,
            metrics: Arc::new(MetricsRegistry::new()),
        })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &MemoryStore {
        &self.store
    }

    pub fn metrics(&self) -> Arc<MetricsRegistry> {
        Arc::clone(&self.metrics)
    }

    /// Insert `count` deterministic users in one transaction
    pub async fn seed_users(&self, count: usize) -> UserResult<Vec<User>> {
        let ctx = RequestContext::new("seed");
        let users = run_in_transaction(&self.store, &ctx, move |tx| {
            Box::pin(async move {
                let now = Utc::now();
                let mut users = Vec::with_capacity(count);
                for i in 0..count {
                    let input = UserCreateInput {
                        email: format!("seed-user-{}@example.com", i + 1),
                        age: (i % 61) as i32,
                    };
                    if repository::email_exists(tx, &input.email).await? {
                        continue;
                    }
                    users.push(repository::insert_user(tx, &input, now).await?);
                }
                Ok::<_, UserError>(users)
            })
        })
        .await?;

        Logger::info("USERS_SEEDED", &[("count", &users.len().to_string())]);
        Ok(users)
    }

    /// Top the orders table up to `count` rows, spread round-robin over the
    /// existing users with deterministic amounts
    pub async fn seed_orders(&self, count: usize) -> UserResult<Vec<Order>> {
        let ctx = RequestContext::new("seed");
        let seeded = run_in_transaction(&self.store, &ctx, move |tx| {
            Box::pin(async move {
                let user_ids = repository::all_user_ids(tx).await?;
                if user_ids.is_empty() {
                    return Err(UserError::Validation(
                        "users must be seeded before orders".to_string(),
                    ));
                }

                let existing = orders::repository::count_orders(tx).await? as usize;
                let now = Utc::now();
                let mut seeded = Vec::with_capacity(count.saturating_sub(existing));
                for n in existing..count {
                    let user_id = user_ids[n % user_ids.len()];
                    let amount_cents = (n as i64 * 7_919) % MAX_ORDER_AMOUNT_CENTS + 1;
                    seeded.push(
                        orders::repository::insert_order(tx, user_id, amount_cents, now).await?,
                    );
                }
                Ok::<_, UserError>(seeded)
            })
        })
        .await?;

        Logger::info("ORDERS_SEEDED", &[("count", &seeded.len().to_string())]);
        Ok(seeded)
    }

    /// Supervisor with the HTTP and gRPC units
    pub fn supervisor(&self) -> Supervisor {
        let http = HttpServer::new(
            self.config.http_server.clone(),
            UserService::new(self.store.clone()),
            Arc::clone(&self.metrics),
        );
        let grpc = GrpcServer::new(self.config.grpc_server.clone());

        Supervisor::new().with_unit(http).with_unit(grpc)
    }

    /// Serve until a termination signal or a unit failure
    pub async fn run(self) -> Result<(), SupervisorError> {
        Logger::info(
            "APP_STARTING",
            &[
                ("env", &self.config.env),
                ("http", &self.config.http_server.socket_addr()),
                ("http_enabled", &self.config.http_server.enabled.to_string()),
                ("grpc_enabled", &self.config.grpc_server.enabled.to_string()),
            ],
        );

        let result = self.supervisor().run().await;

        let stats = self.store.stats();
        Logger::info(
            "APP_STOPPED",
            &[
                ("tx_committed", &stats.committed.to_string()),
                ("tx_rolled_back", &stats.rolled_back.to_string()),
            ],
        );
        self.store.close();
        result
    }
}
