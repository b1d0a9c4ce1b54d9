use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::Json,
    routing::post,
    Router,
};
use serde::Deserialize;
use tracing::{info, instrument};
use utoipa::ToSchema;

use crate::error::{ApiError, ApiErrorsResponse};
use crate::store;
use crate::views::{serialize_restaurant_pizza_created, RestaurantPizzaCreated};

use super::{with_connection, AppState};

pub fn router() -> Router<AppState> {
    Router::new().route("/restaurant_pizzas", post(create_restaurant_pizza))
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRestaurantPizzaRequest {
    /// Price in whole units, between 1 and 30 inclusive
    pub price: i64,
    pub pizza_id: i32,
    pub restaurant_id: i32,
}

#[utoipa::path(
    post,
    path = "/restaurant_pizzas",
    request_body = CreateRestaurantPizzaRequest,
    responses(
        (status = 201, description = "Restaurant pizza created", body = RestaurantPizzaCreated),
        (status = 400, description = "Invalid price, unknown pizza or restaurant, or malformed request", body = ApiErrorsResponse),
    ),
    tag = "restaurant_pizzas"
)]
#[instrument(skip(state))]
pub async fn create_restaurant_pizza(
    State(state): State<AppState>,
    payload: Result<Json<CreateRestaurantPizzaRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RestaurantPizzaCreated>), ApiError> {
    let Json(payload) = payload?;

    let (restaurant_pizza, pizza, restaurant) = with_connection(&state, move |conn| {
        store::create_restaurant_pizza(
            conn,
            payload.price,
            payload.pizza_id,
            payload.restaurant_id,
        )
    })
    .await?;
    info!(
        restaurant_pizza_id = restaurant_pizza.id,
        price = restaurant_pizza.price,
        "created restaurant pizza"
    );

    Ok((
        StatusCode::CREATED,
        Json(serialize_restaurant_pizza_created(
            &restaurant_pizza,
            &pizza,
            &restaurant,
        )),
    ))
}
