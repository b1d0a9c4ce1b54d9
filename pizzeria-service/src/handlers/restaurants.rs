use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::{info, instrument};
use utoipa::{IntoParams, ToSchema};

use crate::error::{ApiError, ApiErrorResponse, ApiErrorsResponse};
use crate::store::{self, Entity};
use crate::views::{
    serialize_restaurant_detail, serialize_restaurant_detail_flat, RestaurantDetail,
    RestaurantSummary,
};

use super::{with_connection, AppState};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/restaurants", get(list_restaurants).post(create_restaurant))
        .route(
            "/restaurants/{id}",
            get(get_restaurant).delete(delete_restaurant),
        )
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateRestaurantRequest {
    /// Name of the restaurant
    pub name: String,
    /// Address of the restaurant
    pub address: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DetailView {
    /// Each restaurant pizza carries its pizza
    #[default]
    Nested,
    /// Each restaurant pizza carries only `pizza_id`
    Flat,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DetailParams {
    /// Shape of the nested restaurant pizzas
    pub view: Option<DetailView>,
}

/// Ids that are not integers name no restaurant.
fn restaurant_id(path: Result<Path<i32>, PathRejection>) -> Result<i32, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|_| ApiError::NotFound(Entity::Restaurant))
}

#[utoipa::path(
    get,
    path = "/restaurants",
    responses(
        (status = 200, description = "All restaurants", body = [RestaurantSummary]),
    ),
    tag = "restaurants"
)]
#[instrument(skip(state))]
pub async fn list_restaurants(
    State(state): State<AppState>,
) -> Result<Json<Vec<RestaurantSummary>>, ApiError> {
    let restaurants = with_connection(&state, store::list_restaurants).await?;

    Ok(Json(restaurants.iter().map(RestaurantSummary::from).collect()))
}

#[utoipa::path(
    post,
    path = "/restaurants",
    request_body = CreateRestaurantRequest,
    responses(
        (status = 201, description = "Restaurant created", body = RestaurantSummary),
        (status = 400, description = "Malformed request or empty name/address", body = ApiErrorsResponse),
    ),
    tag = "restaurants"
)]
#[instrument(skip(state))]
pub async fn create_restaurant(
    State(state): State<AppState>,
    payload: Result<Json<CreateRestaurantRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RestaurantSummary>), ApiError> {
    let Json(payload) = payload?;

    let restaurant = with_connection(&state, move |conn| {
        store::create_restaurant(conn, &payload.name, &payload.address)
    })
    .await?;
    info!(restaurant_id = restaurant.id, "created restaurant");

    Ok((StatusCode::CREATED, Json(RestaurantSummary::from(&restaurant))))
}

#[utoipa::path(
    get,
    path = "/restaurants/{id}",
    params(
        ("id" = i32, Path, description = "Restaurant ID"),
        DetailParams,
    ),
    responses(
        (status = 200, description = "Restaurant with its pizzas. `view=flat` returns RestaurantDetailFlat", body = RestaurantDetail),
        (status = 400, description = "Unknown view", body = ApiErrorsResponse),
        (status = 404, description = "Restaurant not found", body = ApiErrorResponse),
    ),
    tag = "restaurants"
)]
#[instrument(skip(state))]
pub async fn get_restaurant(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
    params: Result<Query<DetailParams>, QueryRejection>,
) -> Result<Response, ApiError> {
    let id = restaurant_id(path)?;

    let (restaurant, restaurant_pizzas) = with_connection(&state, move |conn| {
        let restaurant = store::get_restaurant(conn, id)?;
        let restaurant_pizzas = store::restaurant_pizzas_for_restaurant(conn, &restaurant)?;
        Ok((restaurant, restaurant_pizzas))
    })
    .await?;

    // An unknown restaurant is reported before a malformed query string.
    let Query(params) = params?;
    let response = match params.view.unwrap_or_default() {
        DetailView::Nested => {
            Json(serialize_restaurant_detail(&restaurant, &restaurant_pizzas)).into_response()
        }
        DetailView::Flat => {
            Json(serialize_restaurant_detail_flat(&restaurant, &restaurant_pizzas)).into_response()
        }
    };
    Ok(response)
}

#[utoipa::path(
    delete,
    path = "/restaurants/{id}",
    params(
        ("id" = i32, Path, description = "Restaurant ID")
    ),
    responses(
        (status = 204, description = "Restaurant and its restaurant pizzas deleted"),
        (status = 404, description = "Restaurant not found", body = ApiErrorResponse),
    ),
    tag = "restaurants"
)]
#[instrument(skip(state))]
pub async fn delete_restaurant(
    State(state): State<AppState>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = restaurant_id(path)?;

    let removed = with_connection(&state, move |conn| store::delete_restaurant(conn, id)).await?;
    info!(restaurant_id = id, removed, "deleted restaurant");

    Ok(StatusCode::NO_CONTENT)
}
