use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get},
    Router,
};
use serde::Deserialize;
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::error::{ApiError, ApiErrorResponse, ApiErrorsResponse};
use crate::store::{self, Entity};
use crate::views::PizzaSummary;

use super::{with_connection, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/pizzas", get(list_pizzas).post(create_pizza))
        .route("/pizzas/{id}", delete(delete_pizza))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreatePizzaRequest {
    /// Name of the pizza
    pub name: String,
    /// Ingredients, e.g. "Dough, Tomato Sauce, Cheese"
    pub ingredients: String,
}

#[utoipa::path(
    get,
    path = "/pizzas",
    responses(
        (status = 200, description = "All pizzas", body = [PizzaSummary]),
    ),
    tag = "pizzas"
)]
#[instrument(skip(state))]
pub async fn list_pizzas(State(state): State<AppState>) -> Result<Json<Vec<PizzaSummary>>, ApiError> {
    let pizzas = with_connection(&state, store::list_pizzas).await?;

    Ok(Json(pizzas.iter().map(PizzaSummary::from).collect()))
}

#[utoipa::path(
    post,
    path = "/pizzas",
    request_body = CreatePizzaRequest,
    responses(
        (status = 201, description = "Pizza created", body = PizzaSummary),
        (status = 400, description = "Malformed request or empty name", body = ApiErrorsResponse),
    ),
    tag = "pizzas"
)]
#[instrument(skip(state))]
pub async fn create_pizza(
    State(state): State<AppState>,
    payload: Result<Json<CreatePizzaRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PizzaSummary>), ApiError> {
    let Json(payload) = payload?;

    let pizza = with_connection(&state, move |conn| {
        store::create_pizza(conn, &payload.name, &payload.ingredients)
    })
    .await?;
    info!(pizza_id = pizza.id, "created pizza");

    Ok((StatusCode::CREATED, Json(PizzaSummary::from(&pizza))))
}

#[utoipa::path(
    delete,
    path = "/pizzas/{id}",
    params(
        ("id" = i32, Path, description = "Pizza ID")
    ),
    responses(
        (status = 204, description = "Pizza deleted along with every restaurant's offer of it"),
        (status = 404, description = "Pizza not found", body = ApiErrorResponse),
    ),
    tag = "pizzas"
)]
#[instrument(skip(state))]
pub async fn delete_pizza(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(id) = path.map_err(|_| ApiError::NotFound(Entity::Pizza))?;

    let removed = with_connection(&state, move |conn| store::delete_pizza(conn, id)).await?;
    info!(pizza_id = id, removed, "deleted pizza");

    Ok(StatusCode::NO_CONTENT)
}
