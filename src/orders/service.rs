//! Order workflow: pricing, persistence, role-filtered reads, status
//! transitions and best-effort notification dispatch.

use rust_decimal::Decimal;
use tracing::warn;
use uuid::Uuid;

use crate::auth::{Role, User};
use crate::error::ApiError;
use crate::state::AppState;

use super::dto::{CreateOrderRequest, CustomerInfo, LineDetails, OrderDetails};
use super::types::{delivery_fee, DeliveryType, NewOrder, Order, OrderItem, OrderStatus};

/// Subtotal, fee and total for a priced cart. Unit prices are the
/// client-supplied snapshot; the live menu is never consulted here.
/// Checked arithmetic: a cart whose totals overflow `Decimal` is a bad
/// request, not a panic.
pub fn order_totals(
    items: &[OrderItem],
    delivery_type: DeliveryType,
) -> Result<(Decimal, Decimal, Decimal), ApiError> {
    let out_of_range = || ApiError::validation("Order total is out of range");
    let mut subtotal = Decimal::ZERO;
    for item in items {
        let line = item
            .price
            .checked_mul(Decimal::from(item.quantity))
            .ok_or_else(out_of_range)?;
        subtotal = subtotal.checked_add(line).ok_or_else(out_of_range)?;
    }
    let fee = delivery_fee(delivery_type);
    let total = subtotal.checked_add(fee).ok_or_else(out_of_range)?;
    Ok((subtotal, fee, total))
}

pub async fn create_order(
    state: &AppState,
    caller: &User,
    req: CreateOrderRequest,
) -> Result<OrderDetails, ApiError> {
    if req.items.is_empty() {
        return Err(ApiError::validation("items must be non-empty"));
    }
    if req.items.iter().any(|item| item.quantity < 1) {
        return Err(ApiError::validation("quantity must be at least 1"));
    }

    let delivery_type = match req.delivery_type.as_deref() {
        None => DeliveryType::Delivery,
        Some(raw) => DeliveryType::parse(raw).ok_or_else(|| {
            ApiError::Validation(format!("Unrecognized delivery type '{raw}'"))
        })?,
    };

    // Exactly one of address / pickup time is stored, matching the type.
    let (delivery_address, pickup_date_time) = match delivery_type {
        DeliveryType::Delivery => {
            let address = req
                .delivery_address
                .filter(|a| !a.trim().is_empty())
                .ok_or_else(|| {
                    ApiError::validation("deliveryAddress is required for delivery orders")
                })?;
            (Some(address), None)
        }
        DeliveryType::Pickup => {
            let pickup = req
                .pickup_date_time
                .filter(|p| !p.trim().is_empty())
                .ok_or_else(|| {
                    ApiError::validation("pickupDateTime is required for pickup orders")
                })?;
            (None, Some(pickup))
        }
    };

    let items: Vec<OrderItem> = req
        .items
        .into_iter()
        .map(|item| OrderItem {
            menu_item_id: item.menu_item_id,
            quantity: item.quantity,
            price: item.price,
        })
        .collect();

    let (_, _, total_price) = order_totals(&items, delivery_type)?;

    let order = state
        .orders
        .create(NewOrder {
            user_id: caller.id,
            items,
            delivery_type,
            delivery_address,
            pickup_date_time,
            phone: req.phone,
            notes: req.notes,
            total_price,
        })
        .await?;

    let mut details = enrich(state, order, false).await;
    details.customer = Some(CustomerInfo {
        name: caller.name.clone(),
        email: caller.email.clone(),
    });

    // The order is the system of record; the receipt is best-effort.
    if let Err(e) = state.mailer.send_order_receipt(&details).await {
        warn!(order_id = %details.id, error = %e, "order receipt email failed");
    }

    Ok(details)
}

pub async fn list_orders(state: &AppState, caller: &User) -> Result<Vec<OrderDetails>, ApiError> {
    let (orders, with_customer) = if caller.role == Role::Customer {
        (state.orders.list_by_user(caller.id).await?, false)
    } else {
        (state.orders.list_all().await?, true)
    };

    let mut details = Vec::with_capacity(orders.len());
    for order in orders {
        details.push(enrich(state, order, with_customer).await);
    }
    Ok(details)
}

pub async fn get_order(
    state: &AppState,
    caller: &User,
    order_id: Uuid,
) -> Result<OrderDetails, ApiError> {
    let order = state
        .orders
        .find_by_id(order_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))?;

    if caller.role == Role::Customer && order.user_id != caller.id {
        return Err(ApiError::Forbidden);
    }

    Ok(enrich(state, order, true).await)
}

/// Staff-driven status transition. Terminal states are absorbing; the
/// check happens here, before the store write, so an invalid request
/// leaves the record untouched. A repeat of the current status is a
/// permitted no-op (idempotent retries).
pub async fn update_status(
    state: &AppState,
    order_id: Uuid,
    raw_status: &str,
) -> Result<OrderDetails, ApiError> {
    let new_status = OrderStatus::parse(raw_status)
        .ok_or_else(|| ApiError::Validation(format!("Unrecognized status '{raw_status}'")))?;

    let order = state
        .orders
        .find_by_id(order_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))?;

    if order.status.is_terminal() && new_status != order.status {
        return Err(ApiError::Validation(format!(
            "Cannot change status of a {} order",
            order.status.as_str()
        )));
    }

    let updated = state
        .orders
        .update_status(order_id, new_status)
        .await?
        .ok_or_else(|| ApiError::not_found("Order not found"))?;

    let details = enrich(state, updated, true).await;

    if let Err(e) = state.mailer.send_status_update(&details, new_status).await {
        warn!(order_id = %details.id, status = new_status.as_str(), error = %e,
              "status update email failed");
    }

    Ok(details)
}

/// Resolve menu item names (and optionally the owner) for display.
/// These are best-effort joins: a failed or empty lookup degrades to a
/// missing name, never to a failed request.
async fn enrich(state: &AppState, order: Order, with_customer: bool) -> OrderDetails {
    let mut items = Vec::with_capacity(order.items.len());
    for item in &order.items {
        let name = match state.menu.find_by_id(item.menu_item_id).await {
            Ok(found) => found.map(|m| m.name),
            Err(e) => {
                warn!(menu_item_id = %item.menu_item_id, error = %e, "menu lookup failed");
                None
            }
        };
        items.push(LineDetails {
            menu_item_id: item.menu_item_id,
            name,
            quantity: item.quantity,
            price: item.price,
            // Stored orders passed validation; saturate rather than
            // trust that forever.
            subtotal: item.price.saturating_mul(Decimal::from(item.quantity)),
        });
    }

    let customer = if with_customer {
        match state.users.find_by_id(order.user_id).await {
            Ok(found) => found.map(|u| CustomerInfo {
                name: u.name,
                email: u.email,
            }),
            Err(e) => {
                warn!(user_id = %order.user_id, error = %e, "user lookup failed");
                None
            }
        }
    } else {
        None
    };

    OrderDetails {
        id: order.id,
        user_id: order.user_id,
        items,
        delivery_type: order.delivery_type,
        delivery_address: order.delivery_address,
        pickup_date_time: order.pickup_date_time,
        phone: order.phone,
        notes: order.notes,
        total_price: order.total_price,
        status: order.status,
        customer,
        created_at: order.created_at,
        updated_at: order.updated_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::repo::NewUser;
    use crate::mail::{MailError, Mailer};
    use crate::menu::repo::NewMenuItem;
    use crate::orders::dto::OrderItemInput;
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct RecordingMailer {
        receipts: Mutex<Vec<Uuid>>,
        status_updates: Mutex<Vec<(Uuid, OrderStatus)>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send_order_receipt(&self, order: &OrderDetails) -> Result<(), MailError> {
            self.receipts.lock().expect("lock").push(order.id);
            Ok(())
        }

        async fn send_status_update(
            &self,
            order: &OrderDetails,
            status: OrderStatus,
        ) -> Result<(), MailError> {
            self.status_updates
                .lock()
                .expect("lock")
                .push((order.id, status));
            Ok(())
        }

        async fn send_test(&self, _: &str, _: &str, _: &str) -> Result<(), MailError> {
            Ok(())
        }
    }

    struct FailingMailer;

    #[async_trait]
    impl Mailer for FailingMailer {
        async fn send_order_receipt(&self, _: &OrderDetails) -> Result<(), MailError> {
            Err(MailError::Failed("smtp down".into()))
        }

        async fn send_status_update(
            &self,
            _: &OrderDetails,
            _: OrderStatus,
        ) -> Result<(), MailError> {
            Err(MailError::Failed("smtp down".into()))
        }

        async fn send_test(&self, _: &str, _: &str, _: &str) -> Result<(), MailError> {
            Err(MailError::Failed("smtp down".into()))
        }
    }

    fn state_with_mailer(mailer: Arc<dyn Mailer>) -> AppState {
        let mut state = AppState::fake();
        state.mailer = mailer;
        state
    }

    async fn seed_user(state: &AppState, email: &str, role: Role) -> User {
        state
            .users
            .create(NewUser {
                email: email.into(),
                name: format!("{} user", role.as_str()),
                password_hash: "hash".into(),
                role,
                phone: "0123456789".into(),
                address: "12 Jalan Besar".into(),
            })
            .await
            .expect("seed user")
    }

    fn cart() -> Vec<OrderItemInput> {
        vec![
            OrderItemInput {
                menu_item_id: Uuid::new_v4(),
                quantity: 2,
                price: Decimal::new(3850, 2),
            },
            OrderItemInput {
                menu_item_id: Uuid::new_v4(),
                quantity: 1,
                price: Decimal::new(6800, 2),
            },
        ]
    }

    fn delivery_request(items: Vec<OrderItemInput>) -> CreateOrderRequest {
        CreateOrderRequest {
            items,
            delivery_type: Some("delivery".into()),
            delivery_address: Some("12 Jalan Besar".into()),
            pickup_date_time: None,
            phone: "0123456789".into(),
            notes: None,
        }
    }

    fn pickup_request(items: Vec<OrderItemInput>) -> CreateOrderRequest {
        CreateOrderRequest {
            items,
            delivery_type: Some("pickup".into()),
            delivery_address: None,
            pickup_date_time: Some("2026-09-01T12:30".into()),
            phone: "0123456789".into(),
            notes: None,
        }
    }

    fn line_items(inputs: &[OrderItemInput]) -> Vec<OrderItem> {
        inputs
            .iter()
            .map(|i| OrderItem {
                menu_item_id: i.menu_item_id,
                quantity: i.quantity,
                price: i.price,
            })
            .collect()
    }

    #[test]
    fn delivery_total_is_subtotal_plus_fixed_fee() {
        let (subtotal, fee, total) =
            order_totals(&line_items(&cart()), DeliveryType::Delivery).expect("totals");
        assert_eq!(subtotal, Decimal::new(14500, 2));
        assert_eq!(fee, Decimal::new(500, 2));
        assert_eq!(total, Decimal::new(15000, 2));
    }

    #[test]
    fn pickup_total_has_no_fee() {
        let (subtotal, fee, total) =
            order_totals(&line_items(&cart()), DeliveryType::Pickup).expect("totals");
        assert_eq!(subtotal, Decimal::new(14500, 2));
        assert_eq!(fee, Decimal::ZERO);
        assert_eq!(total, Decimal::new(14500, 2));
    }

    #[test]
    fn overflowing_totals_are_a_validation_error_not_a_panic() {
        let items = vec![OrderItem {
            menu_item_id: Uuid::new_v4(),
            quantity: 1000,
            price: Decimal::MAX,
        }];
        let err = order_totals(&items, DeliveryType::Delivery).unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn create_rejects_empty_cart() {
        let state = AppState::fake();
        let user = seed_user(&state, "c@x.co", Role::Customer).await;
        let err = create_order(&state, &user, delivery_request(vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn create_rejects_zero_quantity() {
        let state = AppState::fake();
        let user = seed_user(&state, "c@x.co", Role::Customer).await;
        let mut items = cart();
        items[0].quantity = 0;
        let err = create_order(&state, &user, delivery_request(items))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
    }

    #[tokio::test]
    async fn create_rejects_cart_with_overflowing_total() {
        let state = AppState::fake();
        let user = seed_user(&state, "c@x.co", Role::Customer).await;
        let items = vec![OrderItemInput {
            menu_item_id: Uuid::new_v4(),
            quantity: 1000,
            price: Decimal::MAX,
        }];
        let err = create_order(&state, &user, delivery_request(items))
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));
        assert!(state.orders.list_all().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn create_rejects_unrecognized_delivery_type() {
        let state = AppState::fake();
        let user = seed_user(&state, "c@x.co", Role::Customer).await;
        let mut req = delivery_request(cart());
        req.delivery_type = Some("teleport".into());
        let err = create_order(&state, &user, req).await.unwrap_err();
        assert!(err.to_string().contains("teleport"));
    }

    #[tokio::test]
    async fn delivery_requires_address() {
        let state = AppState::fake();
        let user = seed_user(&state, "c@x.co", Role::Customer).await;
        let mut req = delivery_request(cart());
        req.delivery_address = None;
        let err = create_order(&state, &user, req).await.unwrap_err();
        assert!(err.to_string().contains("deliveryAddress"));
    }

    #[tokio::test]
    async fn pickup_requires_date_time() {
        let state = AppState::fake();
        let user = seed_user(&state, "c@x.co", Role::Customer).await;
        let mut req = pickup_request(cart());
        req.pickup_date_time = None;
        let err = create_order(&state, &user, req).await.unwrap_err();
        assert!(err.to_string().contains("pickupDateTime"));
    }

    #[tokio::test]
    async fn delivery_type_defaults_to_delivery() {
        let state = AppState::fake();
        let user = seed_user(&state, "c@x.co", Role::Customer).await;
        let mut req = delivery_request(cart());
        req.delivery_type = None;
        let details = create_order(&state, &user, req).await.expect("create");
        assert_eq!(details.delivery_type, DeliveryType::Delivery);
        assert_eq!(details.total_price, Decimal::new(15000, 2));
    }

    #[tokio::test]
    async fn create_persists_pending_order_and_sends_receipt_once() {
        let mailer = Arc::new(RecordingMailer::default());
        let state = state_with_mailer(mailer.clone());
        let user = seed_user(&state, "c@x.co", Role::Customer).await;

        let details = create_order(&state, &user, delivery_request(cart()))
            .await
            .expect("create");
        assert_eq!(details.status, OrderStatus::Pending);
        assert_eq!(details.total_price, Decimal::new(15000, 2));

        let stored = state
            .orders
            .find_by_id(details.id)
            .await
            .expect("find")
            .expect("persisted");
        assert_eq!(stored.total_price, Decimal::new(15000, 2));
        assert!(stored.delivery_address.is_some());
        assert!(stored.pickup_date_time.is_none());

        assert_eq!(*mailer.receipts.lock().expect("lock"), vec![details.id]);
    }

    #[tokio::test]
    async fn pickup_order_stores_pickup_time_only() {
        let state = AppState::fake();
        let user = seed_user(&state, "c@x.co", Role::Customer).await;
        let details = create_order(&state, &user, pickup_request(cart()))
            .await
            .expect("create");
        assert_eq!(details.total_price, Decimal::new(14500, 2));
        assert!(details.delivery_address.is_none());
        assert!(details.pickup_date_time.is_some());
    }

    #[tokio::test]
    async fn create_succeeds_when_mailer_fails() {
        let state = state_with_mailer(Arc::new(FailingMailer));
        let user = seed_user(&state, "c@x.co", Role::Customer).await;
        let details = create_order(&state, &user, delivery_request(cart()))
            .await
            .expect("order is the system of record");
        let stored = state.orders.find_by_id(details.id).await.expect("find");
        assert!(stored.is_some());
    }

    #[tokio::test]
    async fn enrichment_resolves_menu_names_best_effort() {
        let state = AppState::fake();
        let user = seed_user(&state, "c@x.co", Role::Customer).await;
        let item = state
            .menu
            .create(NewMenuItem {
                name: "Nasi Lemak".into(),
                description: None,
                price: Decimal::new(3850, 2),
                category: "mains".into(),
                image_url: None,
                available: true,
            })
            .await
            .expect("menu item");

        let req = delivery_request(vec![
            OrderItemInput {
                menu_item_id: item.id,
                quantity: 2,
                price: Decimal::new(3850, 2),
            },
            OrderItemInput {
                menu_item_id: Uuid::new_v4(),
                quantity: 1,
                price: Decimal::new(6800, 2),
            },
        ]);
        let details = create_order(&state, &user, req).await.expect("create");
        assert_eq!(details.items[0].name.as_deref(), Some("Nasi Lemak"));
        assert_eq!(details.items[0].subtotal, Decimal::new(7700, 2));
        assert!(details.items[1].name.is_none());
    }

    #[tokio::test]
    async fn status_update_rejects_unknown_status_and_leaves_order_unchanged() {
        let state = AppState::fake();
        let user = seed_user(&state, "c@x.co", Role::Customer).await;
        let details = create_order(&state, &user, delivery_request(cart()))
            .await
            .expect("create");

        let err = update_status(&state, details.id, "shipped").await.unwrap_err();
        assert!(matches!(err, ApiError::Validation(_)));

        let stored = state
            .orders
            .find_by_id(details.id)
            .await
            .expect("find")
            .expect("some");
        assert_eq!(stored.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn status_update_persists_and_notifies_exactly_once() {
        let mailer = Arc::new(RecordingMailer::default());
        let state = state_with_mailer(mailer.clone());
        let user = seed_user(&state, "c@x.co", Role::Customer).await;
        let details = create_order(&state, &user, delivery_request(cart()))
            .await
            .expect("create");

        let updated = update_status(&state, details.id, "preparing")
            .await
            .expect("update");
        assert_eq!(updated.status, OrderStatus::Preparing);
        assert_eq!(
            *mailer.status_updates.lock().expect("lock"),
            vec![(details.id, OrderStatus::Preparing)]
        );
    }

    #[tokio::test]
    async fn status_update_resolves_customer_for_notification() {
        let state = AppState::fake();
        let user = seed_user(&state, "aisyah@x.co", Role::Customer).await;
        let details = create_order(&state, &user, delivery_request(cart()))
            .await
            .expect("create");

        let updated = update_status(&state, details.id, "ready").await.expect("update");
        let customer = updated.customer.expect("customer enrichment");
        assert_eq!(customer.email, "aisyah@x.co");
    }

    #[tokio::test]
    async fn terminal_states_are_absorbing() {
        let state = AppState::fake();
        let user = seed_user(&state, "c@x.co", Role::Customer).await;
        let details = create_order(&state, &user, delivery_request(cart()))
            .await
            .expect("create");

        update_status(&state, details.id, "delivered").await.expect("deliver");
        let err = update_status(&state, details.id, "preparing").await.unwrap_err();
        assert!(err.to_string().contains("delivered"));

        // Repeating the current status is an idempotent no-op.
        let repeated = update_status(&state, details.id, "delivered")
            .await
            .expect("idempotent retry");
        assert_eq!(repeated.status, OrderStatus::Delivered);
    }

    #[tokio::test]
    async fn cancelled_orders_cannot_be_revived() {
        let state = AppState::fake();
        let user = seed_user(&state, "c@x.co", Role::Customer).await;
        let details = create_order(&state, &user, delivery_request(cart()))
            .await
            .expect("create");

        update_status(&state, details.id, "cancelled").await.expect("cancel");
        assert!(update_status(&state, details.id, "delivered").await.is_err());
    }

    #[tokio::test]
    async fn status_update_for_missing_order_is_not_found() {
        let state = AppState::fake();
        let err = update_status(&state, Uuid::new_v4(), "preparing")
            .await
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }

    #[tokio::test]
    async fn customers_only_see_their_own_orders() {
        let state = AppState::fake();
        let alice = seed_user(&state, "alice@x.co", Role::Customer).await;
        let bob = seed_user(&state, "bob@x.co", Role::Customer).await;
        create_order(&state, &alice, delivery_request(cart())).await.expect("create");
        create_order(&state, &bob, delivery_request(cart())).await.expect("create");

        let mine = list_orders(&state, &alice).await.expect("list");
        assert_eq!(mine.len(), 1);
        assert!(mine.iter().all(|o| o.user_id == alice.id));
        // Customer listings carry no owner enrichment.
        assert!(mine[0].customer.is_none());
    }

    #[tokio::test]
    async fn staff_see_all_orders_with_owner_names() {
        let state = AppState::fake();
        let alice = seed_user(&state, "alice@x.co", Role::Customer).await;
        let bob = seed_user(&state, "bob@x.co", Role::Customer).await;
        let staff = seed_user(&state, "staff@x.co", Role::Staff).await;
        create_order(&state, &alice, delivery_request(cart())).await.expect("create");
        create_order(&state, &bob, delivery_request(cart())).await.expect("create");

        let all = list_orders(&state, &staff).await.expect("list");
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|o| o.customer.is_some()));
    }

    #[tokio::test]
    async fn customer_cannot_read_someone_elses_order() {
        let state = AppState::fake();
        let alice = seed_user(&state, "alice@x.co", Role::Customer).await;
        let bob = seed_user(&state, "bob@x.co", Role::Customer).await;
        let details = create_order(&state, &alice, delivery_request(cart()))
            .await
            .expect("create");

        let err = get_order(&state, &bob, details.id).await.unwrap_err();
        assert!(matches!(err, ApiError::Forbidden));

        let staff = seed_user(&state, "staff@x.co", Role::Staff).await;
        assert!(get_order(&state, &staff, details.id).await.is_ok());
    }

    #[tokio::test]
    async fn get_order_missing_is_not_found() {
        let state = AppState::fake();
        let user = seed_user(&state, "c@x.co", Role::Customer).await;
        let err = get_order(&state, &user, Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, ApiError::NotFound(_)));
    }
}
