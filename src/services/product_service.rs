use chrono::Utc;
use uuid::Uuid;

use crate::{
    dto::products::{CreateProductRequest, ProductList, UpdateProductRequest},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Product,
    response::ApiResponse,
    state::AppState,
};

pub async fn list_products(state: &AppState) -> AppResult<ApiResponse<ProductList>> {
    let mut items = state.store.products.all().await;
    // Newest first.
    items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    Ok(ApiResponse::success("Products", ProductList { items }))
}

pub async fn get_product(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Product>> {
    let product = state
        .store
        .products
        .all()
        .await
        .into_iter()
        .find(|p| p.id == id)
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Product", product))
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;

    if payload.name.trim().is_empty() || payload.description.trim().is_empty() {
        return Err(AppError::BadRequest("All fields are required".into()));
    }
    if payload.price < 0 {
        return Err(AppError::BadRequest("Price must not be negative".into()));
    }

    let now = Utc::now();
    let product = Product {
        id: Uuid::new_v4(),
        name: payload.name,
        description: payload.description,
        price: payload.price,
        image: payload.image.filter(|url| !url.is_empty()),
        quantity: payload.quantity,
        created_at: now,
        updated_at: now,
    };

    let product = state
        .store
        .products
        .update(move |products| {
            products.push(product.clone());
            Ok(product)
        })
        .await?;

    Ok(ApiResponse::success("Product created", product))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;

    if payload.price.is_some_and(|price| price < 0) {
        return Err(AppError::BadRequest("Price must not be negative".into()));
    }

    let product = state
        .store
        .products
        .update(move |products| {
            let product = products
                .iter_mut()
                .find(|p| p.id == id)
                .ok_or(AppError::NotFound)?;

            if let Some(name) = payload.name {
                product.name = name;
            }
            if let Some(description) = payload.description {
                product.description = description;
            }
            if let Some(price) = payload.price {
                product.price = price;
            }
            if let Some(image) = payload.image {
                product.image = Some(image).filter(|url| !url.is_empty());
            }
            if let Some(quantity) = payload.quantity {
                product.quantity = quantity;
            }
            product.updated_at = Utc::now();

            Ok(product.clone())
        })
        .await?;

    Ok(ApiResponse::success("Updated", product))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;

    state
        .store
        .products
        .update(move |products| {
            let before = products.len();
            products.retain(|p| p.id != id);
            if products.len() == before {
                return Err(AppError::NotFound);
            }
            Ok(())
        })
        .await?;

    Ok(ApiResponse::success("Deleted", serde_json::json!({})))
}
