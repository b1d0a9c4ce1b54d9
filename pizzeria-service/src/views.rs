//! JSON projections returned by the HTTP handlers.
//!
//! Each response shape has its own type. A restaurant or pizza nested under a
//! restaurant pizza has no `restaurant_pizzas` field, and a restaurant pizza
//! nested under a restaurant has no `restaurant` field, so every response is a
//! finite tree.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::{Pizza, Restaurant, RestaurantPizza};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RestaurantSummary {
    pub id: i32,
    pub name: String,
    pub address: String,
}

impl From<&Restaurant> for RestaurantSummary {
    fn from(r: &Restaurant) -> Self {
        Self {
            id: r.id,
            name: r.name.clone(),
            address: r.address.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PizzaSummary {
    pub id: i32,
    pub name: String,
    /// Free text, usually a comma separated list
    pub ingredients: String,
}

impl From<&Pizza> for PizzaSummary {
    fn from(p: &Pizza) -> Self {
        Self {
            id: p.id,
            name: p.name.clone(),
            ingredients: p.ingredients.clone(),
        }
    }
}

/// A restaurant pizza as seen from its restaurant, with the pizza expanded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RestaurantPizzaWithPizza {
    pub id: i32,
    pub price: i32,
    pub pizza: PizzaSummary,
}

/// A restaurant pizza as seen from its restaurant, pizza by id only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RestaurantPizzaRef {
    pub id: i32,
    pub price: i32,
    pub pizza_id: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RestaurantDetail {
    pub id: i32,
    pub name: String,
    pub address: String,
    pub restaurant_pizzas: Vec<RestaurantPizzaWithPizza>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RestaurantDetailFlat {
    pub id: i32,
    pub name: String,
    pub address: String,
    pub restaurant_pizzas: Vec<RestaurantPizzaRef>,
}

/// Response of a successful `POST /restaurant_pizzas`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RestaurantPizzaCreated {
    pub id: i32,
    pub price: i32,
    pub pizza_id: i32,
    pub restaurant_id: i32,
    pub pizza: PizzaSummary,
    pub restaurant: RestaurantSummary,
}

pub fn serialize_restaurant_detail(
    restaurant: &Restaurant,
    restaurant_pizzas: &[(RestaurantPizza, Pizza)],
) -> RestaurantDetail {
    RestaurantDetail {
        id: restaurant.id,
        name: restaurant.name.clone(),
        address: restaurant.address.clone(),
        restaurant_pizzas: restaurant_pizzas
            .iter()
            .map(|(rp, pizza)| RestaurantPizzaWithPizza {
                id: rp.id,
                price: rp.price,
                pizza: pizza.into(),
            })
            .collect(),
    }
}

pub fn serialize_restaurant_detail_flat(
    restaurant: &Restaurant,
    restaurant_pizzas: &[(RestaurantPizza, Pizza)],
) -> RestaurantDetailFlat {
    RestaurantDetailFlat {
        id: restaurant.id,
        name: restaurant.name.clone(),
        address: restaurant.address.clone(),
        restaurant_pizzas: restaurant_pizzas
            .iter()
            .map(|(rp, _)| RestaurantPizzaRef {
                id: rp.id,
                price: rp.price,
                pizza_id: rp.pizza_id,
            })
            .collect(),
    }
}

pub fn serialize_restaurant_pizza_created(
    restaurant_pizza: &RestaurantPizza,
    pizza: &Pizza,
    restaurant: &Restaurant,
) -> RestaurantPizzaCreated {
    RestaurantPizzaCreated {
        id: restaurant_pizza.id,
        price: restaurant_pizza.price,
        pizza_id: restaurant_pizza.pizza_id,
        restaurant_id: restaurant_pizza.restaurant_id,
        pizza: pizza.into(),
        restaurant: restaurant.into(),
    }
}
