use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use crate::auth::middleware::AuthUser;
use crate::error::{ApiResult, AppError};
use crate::pagination::{PaginatedResponse, PaginationParams};
use crate::services::cache::{cache_keys, ttl};
use crate::AppState;
use duetrack_shared::Customer;

const SORTABLE_FIELDS: &[&str] = &["name", "due_date", "created_at"];

#[derive(Debug, Deserialize)]
pub struct CustomerFilter {
    pub search: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CustomerCreate {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub description: Option<String>,
    pub due_date: NaiveDate,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CustomerUpdate {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    pub phone: Option<String>,
    pub description: Option<String>,
    pub due_date: Option<NaiveDate>,
}

pub fn customer_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_customers).post(create_customer))
        .route(
            "/:id",
            get(get_customer).put(update_customer).delete(delete_customer),
        )
}

async fn list_customers(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Query(params): Query<PaginationParams>,
    Query(filter): Query<CustomerFilter>,
) -> ApiResult<Json<PaginatedResponse<Customer>>> {
    let sort_field = params.validated_sort_field(SORTABLE_FIELDS);
    let sort_label = sort_field.as_deref().unwrap_or("overdue");

    let search = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());

    let cache_key = cache_keys::customer_list(
        params.page.max(1),
        params.limit(),
        sort_label,
        params.sort_direction(),
        search,
    );

    // Cache misses and cache errors both fall through to the database.
    if let Ok(Some(cached)) = state
        .cache
        .get::<PaginatedResponse<Customer>>(&cache_key)
        .await
    {
        return Ok(Json(cached));
    }

    let where_clause = if search.is_some() {
        "WHERE name ILIKE $1 OR email ILIKE $1 OR phone ILIKE $1"
    } else {
        ""
    };

    // Default ordering puts overdue customers first, then nearest due date.
    // Sort fields are whitelisted above, never interpolated from raw input.
    let order_clause = match &sort_field {
        Some(field) => format!("ORDER BY {} {}, name ASC", field, params.sort_direction()),
        None => "ORDER BY (due_date < CURRENT_DATE) DESC, due_date ASC, name ASC".to_string(),
    };

    let pattern = search.map(|s| format!("%{}%", s));

    let total: i64 = if let Some(ref pattern) = pattern {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM customers {}", where_clause))
            .bind(pattern)
            .fetch_one(&state.db_pool)
            .await?
    } else {
        sqlx::query_scalar("SELECT COUNT(*) FROM customers")
            .fetch_one(&state.db_pool)
            .await?
    };

    let customers: Vec<Customer> = if let Some(ref pattern) = pattern {
        sqlx::query_as::<_, Customer>(&format!(
            "SELECT * FROM customers {} {} LIMIT $2 OFFSET $3",
            where_clause, order_clause
        ))
        .bind(pattern)
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&state.db_pool)
        .await?
    } else {
        sqlx::query_as::<_, Customer>(&format!(
            "SELECT * FROM customers {} LIMIT $1 OFFSET $2",
            order_clause
        ))
        .bind(params.limit())
        .bind(params.offset())
        .fetch_all(&state.db_pool)
        .await?
    };

    let response = PaginatedResponse::new(customers, &params, total);

    if let Err(e) = state.cache.set(&cache_key, &response, ttl::SHORT).await {
        tracing::warn!("Failed to cache customer list: {}", e);
    }

    Ok(Json(response))
}

async fn create_customer(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Json(payload): Json<CustomerCreate>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    payload.validate()?;

    if let Some(phone) = payload.phone.as_deref() {
        ensure_phone_unused(&state, phone, None).await?;
    }

    let customer = sqlx::query_as::<_, Customer>(
        r#"
        INSERT INTO customers (id, name, email, phone, description, due_date)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(&payload.name)
    .bind(&payload.email)
    .bind(&payload.phone)
    .bind(&payload.description)
    .bind(payload.due_date)
    .fetch_one(&state.db_pool)
    .await?;

    invalidate_customer_cache(&state).await;

    Ok((StatusCode::CREATED, Json(customer)))
}

async fn get_customer(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Customer>> {
    let customer = sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1")
        .bind(id)
        .fetch_one(&state.db_pool)
        .await?;

    Ok(Json(customer))
}

async fn update_customer(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<CustomerUpdate>,
) -> ApiResult<Json<Customer>> {
    payload.validate()?;

    if let Some(phone) = payload.phone.as_deref() {
        ensure_phone_unused(&state, phone, Some(id)).await?;
    }

    let customer = sqlx::query_as::<_, Customer>(
        r#"
        UPDATE customers SET
            name = COALESCE($2, name),
            email = COALESCE($3, email),
            phone = COALESCE($4, phone),
            description = COALESCE($5, description),
            due_date = COALESCE($6, due_date)
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(&payload.name)
    .bind(&payload.email)
    .bind(&payload.phone)
    .bind(&payload.description)
    .bind(payload.due_date)
    .fetch_one(&state.db_pool)
    .await?;

    invalidate_customer_cache(&state).await;

    Ok(Json(customer))
}

async fn delete_customer(
    State(state): State<Arc<AppState>>,
    _auth: AuthUser,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let result = sqlx::query("DELETE FROM customers WHERE id = $1")
        .bind(id)
        .execute(&state.db_pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("Customer".to_string()));
    }

    invalidate_customer_cache(&state).await;

    Ok(StatusCode::NO_CONTENT)
}

async fn ensure_phone_unused(
    state: &AppState,
    phone: &str,
    exclude: Option<Uuid>,
) -> Result<(), AppError> {
    let existing: Option<(Uuid,)> = sqlx::query_as("SELECT id FROM customers WHERE phone = $1")
        .bind(phone)
        .fetch_optional(&state.db_pool)
        .await?;

    match existing {
        Some((id,)) if Some(id) != exclude => Err(AppError::Conflict(format!(
            "Another customer already uses phone number {}",
            phone
        ))),
        _ => Ok(()),
    }
}

async fn invalidate_customer_cache(state: &AppState) {
    if let Err(e) = state
        .cache
        .invalidate_pattern(&cache_keys::customers_pattern())
        .await
    {
        tracing::warn!("Failed to invalidate customer cache: {}", e);
    }
}
