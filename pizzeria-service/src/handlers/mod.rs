pub mod pizzas;
pub mod restaurant_pizzas;
pub mod restaurants;

use axum::{response::Html, response::Json, routing::get, Router};
use diesel::SqliteConnection;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;

use crate::error::ApiError;
use crate::store::StoreError;
use crate::DbPool;

#[derive(Clone)]
pub struct AppState {
    pub pool: DbPool,
}

pub fn router(pool: DbPool) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api-docs/openapi.json", get(openapi))
        .merge(restaurants::router())
        .merge(pizzas::router())
        .merge(restaurant_pizzas::router())
        .with_state(AppState { pool })
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn index() -> Html<&'static str> {
    Html("<h1>Code challenge</h1>")
}

async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Runs `f` with a pooled connection on the blocking thread pool.
async fn with_connection<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&mut SqliteConnection) -> Result<T, StoreError> + Send + 'static,
    T: Send + 'static,
{
    let pool = state.pool.clone();
    let result = tokio::task::spawn_blocking(move || -> Result<T, StoreError> {
        let mut conn = pool.get()?;
        f(&mut *conn)
    })
    .await?;

    Ok(result?)
}

#[derive(OpenApi)]
#[openapi(
    paths(
        restaurants::list_restaurants,
        restaurants::create_restaurant,
        restaurants::get_restaurant,
        restaurants::delete_restaurant,
        pizzas::list_pizzas,
        pizzas::create_pizza,
        pizzas::delete_pizza,
        restaurant_pizzas::create_restaurant_pizza,
    ),
    components(
        schemas(
            crate::views::RestaurantSummary,
            crate::views::RestaurantDetail,
            crate::views::RestaurantDetailFlat,
            crate::views::RestaurantPizzaWithPizza,
            crate::views::RestaurantPizzaRef,
            crate::views::RestaurantPizzaCreated,
            crate::views::PizzaSummary,
            restaurants::CreateRestaurantRequest,
            pizzas::CreatePizzaRequest,
            restaurant_pizzas::CreateRestaurantPizzaRequest,
            crate::error::ApiErrorResponse,
            crate::error::ApiErrorsResponse,
        )
    ),
    tags(
        (name = "restaurants", description = "Restaurant endpoints"),
        (name = "pizzas", description = "Pizza endpoints"),
        (name = "restaurant_pizzas", description = "Pizzas offered by restaurants, with prices")
    ),
    info(
        title = "Pizzeria API",
        description = "Restaurants, pizzas and the prices restaurants charge for them",
        version = "1.0.0"
    )
)]
pub struct ApiDoc;
