//! User operations, each in its own transaction

use chrono::Utc;

use crate::observability::Logger;
use crate::orders::{self, Order, OrderCreateInput};
use crate::pagination::{Page, PaginationWindow};
use crate::store::{RecordId, Store};
use crate::txn::{run_in_transaction, RequestContext};

use super::errors::{UserError, UserResult};
use super::model::{User, UserCreateInput, UserUpdateInput, UserWithOrders};
use super::repository;

/// Runs user operations against a store
#[derive(Debug, Clone)]
pub struct UserService<S> {
    store: S,
}

impl<S: Store> UserService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn get_user(&self, ctx: &RequestContext, id: RecordId) -> UserResult<User> {
        let result = run_in_transaction(&self.store, ctx, move |tx| {
            Box::pin(async move { repository::find_user(tx, id).await })
        })
        .await;
        log_failure(ctx, "USER_GET_FAILED", &result);
        result
    }

    pub async fn list_users(
        &self,
        ctx: &RequestContext,
        window: PaginationWindow,
    ) -> UserResult<Page<User>> {
        let result = run_in_transaction(&self.store, ctx, move |tx| {
            Box::pin(async move { repository::find_users(tx, &window).await })
        })
        .await;
        log_failure(ctx, "USER_LIST_FAILED", &result);
        result
    }

    /// A user and their orders, read in one transaction
    pub async fn get_user_with_orders(
        &self,
        ctx: &RequestContext,
        id: RecordId,
    ) -> UserResult<UserWithOrders> {
        let result = run_in_transaction(&self.store, ctx, move |tx| {
            Box::pin(async move {
                let user = repository::find_user(tx, id).await?;
                let orders = orders::repository::find_orders_by_user_id(tx, id).await?;
                Ok::<_, UserError>(UserWithOrders { user, orders })
            })
        })
        .await;
        log_failure(ctx, "USER_ORDERS_GET_FAILED", &result);
        result
    }

    /// Place an order for an existing user
    pub async fn create_order(
        &self,
        ctx: &RequestContext,
        user_id: RecordId,
        input: OrderCreateInput,
    ) -> UserResult<Order> {
        input.validate().map_err(UserError::Validation)?;

        let result = run_in_transaction(&self.store, ctx, move |tx| {
            Box::pin(async move {
                repository::find_user(tx, user_id).await?;
                let order =
                    orders::repository::insert_order(tx, user_id, input.amount_cents, Utc::now())
                        .await?;
                Ok::<_, UserError>(order)
            })
        })
        .await;

        match &result {
            Ok(order) => Logger::info(
                "ORDER_CREATED",
                &[
                    ("request_id", ctx.request_id()),
                    ("user_id", &user_id.to_string()),
                    ("order_id", &order.id.to_string()),
                ],
            ),
            Err(_) => log_failure(ctx, "ORDER_CREATE_FAILED", &result),
        }
        result
    }

    /// Create a user; the email must be unused
    pub async fn create_user(&self, ctx: &RequestContext, input: UserCreateInput) -> UserResult<User> {
        input.validate()?;

        let result = run_in_transaction(&self.store, ctx, move |tx| {
            Box::pin(async move {
                if repository::email_exists(tx, &input.email).await? {
                    return Err(UserError::AlreadyExists { email: input.email });
                }
                repository::insert_user(tx, &input, Utc::now()).await
            })
        })
        .await;

        match &result {
            Ok(user) => Logger::info(
                "USER_CREATED",
                &[
                    ("request_id", ctx.request_id()),
                    ("user_id", &user.id.to_string()),
                ],
            ),
            Err(_) => log_failure(ctx, "USER_CREATE_FAILED", &result),
        }
        result
    }

    /// Update a user if `input.version` is still current
    pub async fn update_user(
        &self,
        ctx: &RequestContext,
        id: RecordId,
        input: UserUpdateInput,
    ) -> UserResult<User> {
        input.validate()?;

        let result = run_in_transaction(&self.store, ctx, move |tx| {
            Box::pin(async move {
                if let Some(email) = &input.email {
                    let current = repository::find_user(tx, id).await?;
                    if &current.email != email && repository::email_exists(tx, email).await? {
                        return Err(UserError::AlreadyExists {
                            email: email.clone(),
                        });
                    }
                }
                repository::update_user(tx, id, &input, Utc::now()).await
            })
        })
        .await;

        match &result {
            Ok(user) => Logger::info(
                "USER_UPDATED",
                &[
                    ("request_id", ctx.request_id()),
                    ("user_id", &id.to_string()),
                    ("version", &user.version.to_string()),
                ],
            ),
            Err(UserError::Conflict { expected, .. }) => Logger::warn(
                "USER_VERSION_CONFLICT",
                &[
                    ("request_id", ctx.request_id()),
                    ("user_id", &id.to_string()),
                    ("expected_version", &expected.to_string()),
                ],
            ),
            Err(_) => log_failure(ctx, "USER_UPDATE_FAILED", &result),
        }
        result
    }
}

/// Infrastructure failures are logged as errors, business outcomes at trace
fn log_failure<T>(ctx: &RequestContext, event: &str, result: &UserResult<T>) {
    if let Err(err) = result {
        let fields = [
            ("request_id", ctx.request_id()),
            ("code", err.code()),
            ("error", &err.to_string()),
        ];
        if err.is_infrastructure() {
            Logger::error(event, &fields);
        } else {
            Logger::trace(event, &fields);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn service() -> UserService<MemoryStore> {
        UserService::new(MemoryStore::new())
    }

    fn create_input(email: &str) -> UserCreateInput {
        UserCreateInput {
            email: email.to_string(),
            age: 30,
        }
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let svc = service();
        let ctx = RequestContext::generated();

        let created = svc.create_user(&ctx, create_input("a@example.com")).await.unwrap();
        assert_eq!(created.version, 1);

        let fetched = svc.get_user(&ctx, created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let svc = service();
        let ctx = RequestContext::generated();

        svc.create_user(&ctx, create_input("dup@example.com")).await.unwrap();
        let err = svc
            .create_user(&ctx, create_input("dup@example.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, UserError::AlreadyExists { .. }));
        assert_eq!(svc.store().stats().committed, 1);
    }

    #[tokio::test]
    async fn test_update_advances_version() {
        let svc = service();
        let ctx = RequestContext::generated();
        let user = svc.create_user(&ctx, create_input("v@example.com")).await.unwrap();

        let updated = svc
            .update_user(
                &ctx,
                user.id,
                UserUpdateInput {
                    email: None,
                    age: Some(31),
                    version: user.version,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.version, user.version + 1);
        assert_eq!(updated.age, 31);
        assert_eq!(updated.email, user.email);

        let stale = svc
            .update_user(
                &ctx,
                user.id,
                UserUpdateInput {
                    email: None,
                    age: Some(32),
                    version: user.version,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(stale, UserError::Conflict { actual: Some(2), .. }));
    }

    #[tokio::test]
    async fn test_update_with_maximal_version_is_rejected() {
        let svc = service();
        let ctx = RequestContext::generated();
        let user = svc.create_user(&ctx, create_input("max@example.com")).await.unwrap();

        let err = svc
            .update_user(
                &ctx,
                user.id,
                UserUpdateInput {
                    email: None,
                    age: Some(4),
                    version: i64::MAX,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::Validation(_)));

        let stored = svc.get_user(&ctx, user.id).await.unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.age, 30);
    }

    #[tokio::test]
    async fn test_update_missing_user() {
        let svc = service();
        let err = svc
            .update_user(
                &RequestContext::generated(),
                404,
                UserUpdateInput {
                    email: None,
                    age: Some(1),
                    version: 1,
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::NotFound { id: 404 }));
    }

    #[tokio::test]
    async fn test_user_with_orders() {
        let svc = service();
        let ctx = RequestContext::generated();
        let owner = svc.create_user(&ctx, create_input("o@example.com")).await.unwrap();
        let other = svc.create_user(&ctx, create_input("p@example.com")).await.unwrap();

        let empty = svc.get_user_with_orders(&ctx, owner.id).await.unwrap();
        assert_eq!(empty.user, owner);
        assert!(empty.orders.is_empty());

        for amount_cents in [500, 1200] {
            svc.create_order(&ctx, owner.id, OrderCreateInput { amount_cents })
                .await
                .unwrap();
        }
        svc.create_order(&ctx, other.id, OrderCreateInput { amount_cents: 7 })
            .await
            .unwrap();

        let loaded = svc.get_user_with_orders(&ctx, owner.id).await.unwrap();
        let amounts: Vec<i64> = loaded.orders.iter().map(|o| o.amount_cents).collect();
        assert_eq!(amounts, vec![500, 1200]);
        assert!(loaded.orders.iter().all(|o| o.user_id == owner.id && o.version == 1));

        let missing = svc.get_user_with_orders(&ctx, 999).await.unwrap_err();
        assert!(matches!(missing, UserError::NotFound { id: 999 }));
    }

    #[tokio::test]
    async fn test_order_for_missing_user_rolls_back() {
        let svc = service();
        let ctx = RequestContext::generated();

        let err = svc
            .create_order(&ctx, 31, OrderCreateInput { amount_cents: 100 })
            .await
            .unwrap_err();
        assert!(matches!(err, UserError::NotFound { id: 31 }));
        assert_eq!(svc.store().stats().committed, 0);

        let invalid = svc
            .create_order(&ctx, 31, OrderCreateInput { amount_cents: 0 })
            .await
            .unwrap_err();
        assert!(matches!(invalid, UserError::Validation(_)));
    }

    #[tokio::test]
    async fn test_list_pages() {
        let svc = service();
        let ctx = RequestContext::generated();
        for i in 0..5 {
            svc.create_user(&ctx, create_input(&format!("u{}@example.com", i)))
                .await
                .unwrap();
        }

        let first = svc
            .list_users(&ctx, PaginationWindow::new(0, 2, true))
            .await
            .unwrap();
        assert_eq!(first.data.len(), 2);
        assert!(first.page_info.has_more);
        assert_eq!(first.page_info.total, Some(5));

        let last = svc
            .list_users(&ctx, PaginationWindow::new(4, 2, false))
            .await
            .unwrap();
        assert_eq!(last.data.len(), 1);
        assert!(!last.page_info.has_more);
        assert_eq!(last.page_info.total, None);
    }
}
