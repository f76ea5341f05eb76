use chrono::Utc;
use uuid::Uuid;

use crate::{
    dto::orders::{CreateOrderRequest, OrderList, UpdateOrderStatusRequest},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::{Order, OrderStatus},
    response::ApiResponse,
    state::AppState,
};

/// Create an order for the authenticated customer. The availability check,
/// the stock decrement, and the order append run inside one store
/// transaction, so concurrent purchases cannot oversell and a failed write
/// leaves the catalog untouched.
pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    let CreateOrderRequest {
        product_id,
        quantity,
        shipping_info,
    } = payload;

    if quantity == 0 {
        return Err(AppError::BadRequest("Quantity must be at least 1".into()));
    }
    if shipping_info.name.trim().is_empty()
        || shipping_info.phone.trim().is_empty()
        || shipping_info.address.trim().is_empty()
        || shipping_info.city.trim().is_empty()
    {
        return Err(AppError::BadRequest(
            "All shipping fields are required".into(),
        ));
    }

    let user_id = user.user_id;
    let order = state
        .store
        .transact_order(move |products, orders| {
            let product = products
                .iter_mut()
                .find(|p| p.id == product_id)
                .ok_or(AppError::NotFound)?;

            if quantity > product.quantity {
                return Err(AppError::InsufficientStock);
            }

            product.quantity -= quantity;
            product.updated_at = Utc::now();

            let order = Order {
                id: Uuid::new_v4(),
                user_id,
                product_id,
                product_name: product.name.clone(),
                quantity,
                total_price: product.price * i64::from(quantity),
                shipping_info,
                status: OrderStatus::Pending,
                created_at: Utc::now(),
            };
            orders.push(order.clone());
            Ok(order)
        })
        .await?;

    tracing::info!(order_id = %order.id, product_id = %product_id, "order created");

    Ok(ApiResponse::success("Order created", order))
}

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;

    let mut items = state.store.orders.all().await;
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(ApiResponse::success("Orders", OrderList { items }))
}

pub async fn list_my_orders(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<OrderList>> {
    let mut items: Vec<Order> = state
        .store
        .orders
        .all()
        .await
        .into_iter()
        .filter(|o| o.user_id == user.user_id)
        .collect();
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(ApiResponse::success("Orders", OrderList { items }))
}

pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;

    let status = OrderStatus::parse(&payload.status)
        .ok_or_else(|| AppError::BadRequest("Invalid status".into()))?;

    let order = state
        .store
        .orders
        .update(move |orders| {
            let order = orders
                .iter_mut()
                .find(|o| o.id == id)
                .ok_or(AppError::NotFound)?;

            if !OrderStatus::transition_allowed(order.status, status) {
                return Err(AppError::BadRequest("Invalid status transition".into()));
            }

            order.status = status;
            Ok(order.clone())
        })
        .await?;

    tracing::info!(order_id = %order.id, status = %order.status, "order status updated");

    Ok(ApiResponse::success("Status updated", order))
}
