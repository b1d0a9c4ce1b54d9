use diesel::prelude::*;
use diesel::SqliteConnection;
use tracing::info;

use crate::models::NewRestaurantPizza;
use crate::store::{self, StoreError};

const RESTAURANTS: &[(&str, &str)] = &[
    ("Karen's Pizza Shack", "address1"),
    ("Sanjay's Pizza", "address2"),
    ("Kiki's Pizza", "address3"),
];

const PIZZAS: &[(&str, &str)] = &[
    ("Emma", "Dough, Tomato Sauce, Cheese"),
    ("Geri", "Dough, Tomato Sauce, Cheese, Pepperoni"),
    ("Melanie", "Dough, Sauce, Ricotta, Red peppers, Mustard"),
];

/// (restaurant index, pizza index, price)
const OFFERS: &[(usize, usize, i64)] = &[(0, 0, 1), (1, 1, 4), (2, 2, 5)];

/// Replaces the contents of the database with a small sample menu.
pub fn run(conn: &mut SqliteConnection) -> Result<(), StoreError> {
    conn.immediate_transaction::<_, StoreError, _>(|conn| {
        store::clear(conn)?;

        let restaurants = RESTAURANTS
            .iter()
            .map(|(name, address)| store::create_restaurant(conn, name, address))
            .collect::<Result<Vec<_>, _>>()?;
        let pizzas = PIZZAS
            .iter()
            .map(|(name, ingredients)| store::create_pizza(conn, name, ingredients))
            .collect::<Result<Vec<_>, _>>()?;

        for &(restaurant, pizza, price) in OFFERS {
            let new_restaurant_pizza =
                NewRestaurantPizza::new(price, pizzas[pizza].id, restaurants[restaurant].id)?;
            store::insert_restaurant_pizza(conn, &new_restaurant_pizza)?;
        }

        info!(
            restaurants = restaurants.len(),
            pizzas = pizzas.len(),
            restaurant_pizzas = OFFERS.len(),
            "seeded database"
        );
        Ok(())
    })
}
