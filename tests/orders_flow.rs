use std::path::Path;
use std::sync::Arc;

use beauty_shop_api::{
    config::AppConfig,
    dto::{
        auth::{LoginRequest, RegisterRequest},
        orders::{CreateOrderRequest, UpdateOrderStatusRequest},
        products::{CreateProductRequest, UpdateProductRequest},
    },
    error::AppError,
    middleware::auth::AuthUser,
    models::{OrderStatus, ShippingInfo},
    services::{auth_service, order_service, product_service},
    state::AppState,
    store::JsonStore,
};
use uuid::Uuid;

const BOOTSTRAP_ADMIN: &str = "owner@example.com";

async fn setup_state(data_dir: &Path) -> anyhow::Result<AppState> {
    let store = JsonStore::open(data_dir).await?;
    let config = AppConfig {
        host: "127.0.0.1".into(),
        port: 0,
        data_dir: data_dir.to_path_buf(),
        bootstrap_admin_email: Some(BOOTSTRAP_ADMIN.into()),
    };
    Ok(AppState {
        store: Arc::new(store),
        config,
    })
}

fn register_request(name: &str, email: &str) -> RegisterRequest {
    RegisterRequest {
        name: name.into(),
        email: email.into(),
        password: "secret123".into(),
    }
}

fn shipping() -> ShippingInfo {
    ShippingInfo {
        name: "Sara".into(),
        phone: "0550000000".into(),
        address: "12 Rue des Roses".into(),
        city: "Algiers".into(),
        delivery_type: None,
    }
}

// Full storefront flow: registration and the admin bootstrap rules, catalog
// management, order creation with stock decrement, and the status workflow.
#[tokio::test]
async fn register_order_and_status_flow() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let state = setup_state(dir.path()).await?;

    // First registrant becomes admin, second does not.
    let admin = auth_service::register_user(&state, register_request("Admin", "first@example.com"))
        .await?
        .data
        .unwrap();
    assert!(admin.user.is_admin);

    let customer = auth_service::register_user(&state, register_request("Sara", "sara@example.com"))
        .await?
        .data
        .unwrap();
    assert!(!customer.user.is_admin);

    // The configured bootstrap email is admin even when not first.
    let owner = auth_service::register_user(&state, register_request("Owner", BOOTSTRAP_ADMIN))
        .await?
        .data
        .unwrap();
    assert!(owner.user.is_admin);

    // Duplicate email and short password are rejected.
    let err = auth_service::register_user(&state, register_request("Dup", "sara@example.com"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = auth_service::register_user(
        &state,
        RegisterRequest {
            name: "Short".into(),
            email: "short@example.com".into(),
            password: "12345".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    // Login checks the hash.
    let login = auth_service::login_user(
        &state,
        LoginRequest {
            email: "sara@example.com".into(),
            password: "secret123".into(),
        },
    )
    .await?;
    assert!(!login.data.unwrap().token.is_empty());

    let err = auth_service::login_user(
        &state,
        LoginRequest {
            email: "sara@example.com".into(),
            password: "wrong-password".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Unauthorized(_)));

    let auth_admin = AuthUser {
        user_id: admin.user.id,
        is_admin: true,
    };
    let auth_customer = AuthUser {
        user_id: customer.user.id,
        is_admin: false,
    };

    // Catalog writes are admin-only.
    let product_req = CreateProductRequest {
        name: "Rose Cream".into(),
        description: "Hydrating face cream".into(),
        price: 10_000,
        image: None,
        quantity: 2,
    };
    let err = product_service::create_product(&state, &auth_customer, product_req)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let product = product_service::create_product(
        &state,
        &auth_admin,
        CreateProductRequest {
            name: "Rose Cream".into(),
            description: "Hydrating face cream".into(),
            price: 10_000,
            image: None,
            quantity: 2,
        },
    )
    .await?
    .data
    .unwrap();

    // Order creation decrements stock and snapshots name and total.
    let order = order_service::create_order(
        &state,
        &auth_customer,
        CreateOrderRequest {
            product_id: product.id,
            quantity: 1,
            shipping_info: shipping(),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(order.product_name, "Rose Cream");
    assert_eq!(order.total_price, 10_000);
    assert_eq!(order.status, OrderStatus::Pending);

    let stored = product_service::get_product(&state, product.id)
        .await?
        .data
        .unwrap();
    assert_eq!(stored.quantity, 1);

    // Oversized and unknown-product orders fail without writes.
    let err = order_service::create_order(
        &state,
        &auth_customer,
        CreateOrderRequest {
            product_id: product.id,
            quantity: 5,
            shipping_info: shipping(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::InsufficientStock));

    let err = order_service::create_order(
        &state,
        &auth_customer,
        CreateOrderRequest {
            product_id: Uuid::new_v4(),
            quantity: 1,
            shipping_info: shipping(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let stored = product_service::get_product(&state, product.id)
        .await?
        .data
        .unwrap();
    assert_eq!(stored.quantity, 1, "failed orders must not touch stock");
    assert_eq!(
        order_service::list_my_orders(&state, &auth_customer)
            .await?
            .data
            .unwrap()
            .items
            .len(),
        1
    );

    // Status workflow: admin-only, closed value set, unknown id is 404.
    let err = order_service::update_order_status(
        &state,
        &auth_customer,
        order.id,
        UpdateOrderStatusRequest {
            status: "shipped".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let err = order_service::update_order_status(
        &state,
        &auth_admin,
        order.id,
        UpdateOrderStatusRequest {
            status: "delivered".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));

    let err = order_service::update_order_status(
        &state,
        &auth_admin,
        Uuid::new_v4(),
        UpdateOrderStatusRequest {
            status: "shipped".into(),
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound));

    let updated = order_service::update_order_status(
        &state,
        &auth_admin,
        order.id,
        UpdateOrderStatusRequest {
            status: "shipped".into(),
        },
    )
    .await?
    .data
    .unwrap();
    assert_eq!(updated.status, OrderStatus::Shipped);
    assert_eq!(updated.total_price, order.total_price);
    assert_eq!(updated.quantity, order.quantity);
    assert_eq!(updated.created_at, order.created_at);

    // Order listings: admin sees everything, customers only their own.
    let err = order_service::list_all_orders(&state, &auth_customer)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden));

    let all = order_service::list_all_orders(&state, &auth_admin)
        .await?
        .data
        .unwrap();
    assert_eq!(all.items.len(), 1);

    Ok(())
}

#[tokio::test]
async fn order_listings_are_newest_first() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let state = setup_state(dir.path()).await?;

    let auth_admin = AuthUser {
        user_id: Uuid::new_v4(),
        is_admin: true,
    };
    let product = product_service::create_product(
        &state,
        &auth_admin,
        CreateProductRequest {
            name: "Argan Oil".into(),
            description: "Pure argan oil".into(),
            price: 2_500,
            image: None,
            quantity: 10,
        },
    )
    .await?
    .data
    .unwrap();

    let customer = AuthUser {
        user_id: Uuid::new_v4(),
        is_admin: false,
    };
    let mut created = Vec::new();
    for _ in 0..3 {
        let order = order_service::create_order(
            &state,
            &customer,
            CreateOrderRequest {
                product_id: product.id,
                quantity: 1,
                shipping_info: shipping(),
            },
        )
        .await?
        .data
        .unwrap();
        created.push(order.id);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let mine = order_service::list_my_orders(&state, &customer)
        .await?
        .data
        .unwrap();
    let ids: Vec<_> = mine.items.iter().map(|o| o.id).collect();
    created.reverse();
    assert_eq!(ids, created);

    Ok(())
}

#[tokio::test]
async fn product_update_does_not_rewrite_order_snapshot() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let state = setup_state(dir.path()).await?;

    let auth_admin = AuthUser {
        user_id: Uuid::new_v4(),
        is_admin: true,
    };
    let product = product_service::create_product(
        &state,
        &auth_admin,
        CreateProductRequest {
            name: "Old Name".into(),
            description: "desc".into(),
            price: 1_000,
            image: None,
            quantity: 5,
        },
    )
    .await?
    .data
    .unwrap();

    let customer = AuthUser {
        user_id: Uuid::new_v4(),
        is_admin: false,
    };
    let order = order_service::create_order(
        &state,
        &customer,
        CreateOrderRequest {
            product_id: product.id,
            quantity: 2,
            shipping_info: shipping(),
        },
    )
    .await?
    .data
    .unwrap();

    product_service::update_product(
        &state,
        &auth_admin,
        product.id,
        UpdateProductRequest {
            name: Some("New Name".into()),
            description: None,
            price: Some(9_999),
            image: None,
            quantity: None,
        },
    )
    .await?;

    let mine = order_service::list_my_orders(&state, &customer)
        .await?
        .data
        .unwrap();
    assert_eq!(mine.items[0].id, order.id);
    assert_eq!(mine.items[0].product_name, "Old Name");
    assert_eq!(mine.items[0].total_price, 2_000);

    Ok(())
}
