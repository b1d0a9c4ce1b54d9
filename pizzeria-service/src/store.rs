//! Entity store over the `restaurants`, `pizzas` and `restaurant_pizzas`
//! tables.
//!
//! Every function takes the connection it runs on. Operations that touch more
//! than one row run inside a single transaction, so a cascade either removes
//! the parent together with all of its dependents or nothing at all. Those
//! that read before writing take SQLite's write lock when they begin
//! (`BEGIN IMMEDIATE`), so concurrent writers wait on the busy timeout instead
//! of failing with SQLITE_BUSY at the read-to-write upgrade.

use std::fmt;

use diesel::prelude::*;
use diesel::result::DatabaseErrorKind;
use diesel::SqliteConnection;
use diesel_migrations::MigrationHarness;
use tracing::{debug, info};

use crate::models::{
    NewPizza, NewRestaurant, NewRestaurantPizza, Pizza, Restaurant, RestaurantPizza,
    ValidationError,
};
use crate::schema::{pizzas, restaurant_pizzas, restaurants};
use crate::MIGRATIONS;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Restaurant,
    Pizza,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entity::Restaurant => f.write_str("Restaurant"),
            Entity::Pizza => f.write_str("Pizza"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(Entity),
    #[error("{0} {1} does not exist")]
    ReferencedEntityMissing(Entity, i32),
    #[error("Invalid {0}: {1}")]
    ConstraintViolation(Entity, String),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),
    #[error("connection pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),
    #[error("migration failed: {0}")]
    Migration(String),
}

/// Schema constraints (`NOT NULL`, non-empty `CHECK`s) reject the value
/// itself, so they are reported apart from other database failures.
fn constraint_violation(entity: Entity) -> impl FnOnce(diesel::result::Error) -> StoreError {
    move |e| match e {
        diesel::result::Error::DatabaseError(
            DatabaseErrorKind::CheckViolation | DatabaseErrorKind::NotNullViolation,
            info,
        ) => StoreError::ConstraintViolation(entity, info.message().to_string()),
        e => StoreError::Database(e),
    }
}

pub fn run_migrations(conn: &mut SqliteConnection) -> Result<(), StoreError> {
    let applied = conn
        .run_pending_migrations(MIGRATIONS)
        .map_err(|e| StoreError::Migration(e.to_string()))?;
    for version in applied {
        info!(%version, "applied migration");
    }
    Ok(())
}

pub fn create_restaurant(
    conn: &mut SqliteConnection,
    name: &str,
    address: &str,
) -> Result<Restaurant, StoreError> {
    let restaurant = diesel::insert_into(restaurants::table)
        .values(NewRestaurant {
            name: name.to_string(),
            address: address.to_string(),
        })
        .returning(Restaurant::as_returning())
        .get_result(conn)
        .map_err(constraint_violation(Entity::Restaurant))?;
    Ok(restaurant)
}

pub fn get_restaurant(conn: &mut SqliteConnection, id: i32) -> Result<Restaurant, StoreError> {
    restaurants::table
        .find(id)
        .select(Restaurant::as_select())
        .first(conn)
        .optional()?
        .ok_or(StoreError::NotFound(Entity::Restaurant))
}

pub fn list_restaurants(conn: &mut SqliteConnection) -> Result<Vec<Restaurant>, StoreError> {
    let results = restaurants::table
        .order(restaurants::id.asc())
        .select(Restaurant::as_select())
        .load(conn)?;
    Ok(results)
}

/// Deletes a restaurant and its restaurant pizzas, returning how many
/// restaurant pizzas went with it.
pub fn delete_restaurant(conn: &mut SqliteConnection, id: i32) -> Result<usize, StoreError> {
    conn.immediate_transaction::<_, StoreError, _>(|conn| {
        let restaurant = get_restaurant(conn, id)?;
        let removed = diesel::delete(
            restaurant_pizzas::table.filter(restaurant_pizzas::restaurant_id.eq(restaurant.id)),
        )
        .execute(conn)?;
        diesel::delete(&restaurant).execute(conn)?;
        debug!(restaurant_id = id, removed, "deleted restaurant");
        Ok(removed)
    })
}

pub fn create_pizza(
    conn: &mut SqliteConnection,
    name: &str,
    ingredients: &str,
) -> Result<Pizza, StoreError> {
    let pizza = diesel::insert_into(pizzas::table)
        .values(NewPizza {
            name: name.to_string(),
            ingredients: ingredients.to_string(),
        })
        .returning(Pizza::as_returning())
        .get_result(conn)
        .map_err(constraint_violation(Entity::Pizza))?;
    Ok(pizza)
}

pub fn get_pizza(conn: &mut SqliteConnection, id: i32) -> Result<Pizza, StoreError> {
    pizzas::table
        .find(id)
        .select(Pizza::as_select())
        .first(conn)
        .optional()?
        .ok_or(StoreError::NotFound(Entity::Pizza))
}

pub fn list_pizzas(conn: &mut SqliteConnection) -> Result<Vec<Pizza>, StoreError> {
    let results = pizzas::table
        .order(pizzas::id.asc())
        .select(Pizza::as_select())
        .load(conn)?;
    Ok(results)
}

/// Deletes a pizza and every restaurant's offer of it.
pub fn delete_pizza(conn: &mut SqliteConnection, id: i32) -> Result<usize, StoreError> {
    conn.immediate_transaction::<_, StoreError, _>(|conn| {
        let pizza = get_pizza(conn, id)?;
        let removed =
            diesel::delete(restaurant_pizzas::table.filter(restaurant_pizzas::pizza_id.eq(pizza.id)))
                .execute(conn)?;
        diesel::delete(&pizza).execute(conn)?;
        debug!(pizza_id = id, removed, "deleted pizza");
        Ok(removed)
    })
}

/// The restaurant pizzas offered by `restaurant`, each with its pizza.
pub fn restaurant_pizzas_for_restaurant(
    conn: &mut SqliteConnection,
    restaurant: &Restaurant,
) -> Result<Vec<(RestaurantPizza, Pizza)>, StoreError> {
    let results = RestaurantPizza::belonging_to(restaurant)
        .inner_join(pizzas::table)
        .order(restaurant_pizzas::id.asc())
        .select((RestaurantPizza::as_select(), Pizza::as_select()))
        .load(conn)?;
    Ok(results)
}

/// Validates the price, checks both parents exist, then stores the new row.
///
/// Returns the stored row together with the pizza and restaurant it links.
pub fn create_restaurant_pizza(
    conn: &mut SqliteConnection,
    price: i64,
    pizza_id: i32,
    restaurant_id: i32,
) -> Result<(RestaurantPizza, Pizza, Restaurant), StoreError> {
    let new_restaurant_pizza = NewRestaurantPizza::new(price, pizza_id, restaurant_id)?;

    conn.immediate_transaction::<_, StoreError, _>(|conn| {
        insert_restaurant_pizza(conn, &new_restaurant_pizza)
    })
}

/// The body of [`create_restaurant_pizza`] for callers that already hold a
/// transaction. SQLite cannot nest `BEGIN IMMEDIATE`.
pub(crate) fn insert_restaurant_pizza(
    conn: &mut SqliteConnection,
    new_restaurant_pizza: &NewRestaurantPizza,
) -> Result<(RestaurantPizza, Pizza, Restaurant), StoreError> {
    let pizza_id = new_restaurant_pizza.pizza_id();
    let restaurant_id = new_restaurant_pizza.restaurant_id();

    let pizza = get_pizza(conn, pizza_id).map_err(|e| match e {
        StoreError::NotFound(entity) => StoreError::ReferencedEntityMissing(entity, pizza_id),
        e => e,
    })?;
    let restaurant = get_restaurant(conn, restaurant_id).map_err(|e| match e {
        StoreError::NotFound(entity) => StoreError::ReferencedEntityMissing(entity, restaurant_id),
        e => e,
    })?;

    let restaurant_pizza = diesel::insert_into(restaurant_pizzas::table)
        .values(new_restaurant_pizza)
        .returning(RestaurantPizza::as_returning())
        .get_result(conn)?;

    Ok((restaurant_pizza, pizza, restaurant))
}

/// Removes every row, dependents first.
pub fn clear(conn: &mut SqliteConnection) -> Result<(), StoreError> {
    conn.transaction::<_, StoreError, _>(|conn| {
        diesel::delete(restaurant_pizzas::table).execute(conn)?;
        diesel::delete(restaurants::table).execute(conn)?;
        diesel::delete(pizzas::table).execute(conn)?;
        Ok(())
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn establish_test_connection() -> SqliteConnection {
        let mut conn = SqliteConnection::establish(":memory:").unwrap();
        diesel::sql_query("PRAGMA foreign_keys = ON")
            .execute(&mut conn)
            .unwrap();
        run_migrations(&mut conn).unwrap();
        conn
    }

    fn count_restaurant_pizzas(conn: &mut SqliteConnection) -> i64 {
        restaurant_pizzas::table.count().get_result(conn).unwrap()
    }

    #[test]
    fn test_get_restaurant() {
        let conn = &mut establish_test_connection();
        let created = create_restaurant(conn, "Karen's Pizza Shack", "address1").unwrap();

        let found = get_restaurant(conn, created.id).unwrap();
        assert_eq!(found, created);
        assert_eq!(found.name, "Karen's Pizza Shack");

        assert!(matches!(
            get_restaurant(conn, created.id + 1),
            Err(StoreError::NotFound(Entity::Restaurant))
        ));
    }

    #[test]
    fn test_list_restaurants_in_id_order() {
        let conn = &mut establish_test_connection();
        let first = create_restaurant(conn, "First", "1 Main St").unwrap();
        let second = create_restaurant(conn, "Second", "2 Main St").unwrap();

        assert_eq!(list_restaurants(conn).unwrap(), vec![first, second]);
    }

    #[test]
    fn test_create_restaurant_pizza_resolves_parents() {
        let conn = &mut establish_test_connection();
        let restaurant = create_restaurant(conn, "Sanjay's Pizza", "address2").unwrap();
        let pizza = create_pizza(conn, "Emma", "Dough, Tomato Sauce, Cheese").unwrap();

        let (restaurant_pizza, resolved_pizza, resolved_restaurant) =
            create_restaurant_pizza(conn, 12, pizza.id, restaurant.id).unwrap();

        assert_eq!(restaurant_pizza.price, 12);
        assert_eq!(restaurant_pizza.pizza_id, pizza.id);
        assert_eq!(restaurant_pizza.restaurant_id, restaurant.id);
        assert_eq!(resolved_pizza, pizza);
        assert_eq!(resolved_restaurant, restaurant);
    }

    #[test]
    fn test_create_restaurant_pizza_invalid_price_persists_nothing() {
        let conn = &mut establish_test_connection();
        let restaurant = create_restaurant(conn, "Kiki's Pizza", "address3").unwrap();
        let pizza = create_pizza(conn, "Geri", "Dough, Tomato Sauce, Cheese, Pepperoni").unwrap();

        for price in [0, 31, -5] {
            let result = create_restaurant_pizza(conn, price, pizza.id, restaurant.id);
            assert!(matches!(
                result,
                Err(StoreError::Validation(ValidationError::PriceOutOfRange { .. }))
            ));
        }
        assert_eq!(count_restaurant_pizzas(conn), 0);
    }

    #[test]
    fn test_create_restaurant_pizza_missing_reference() {
        let conn = &mut establish_test_connection();
        let restaurant = create_restaurant(conn, "Kiki's Pizza", "address3").unwrap();
        let pizza = create_pizza(conn, "Melanie", "Dough, Sauce, Ricotta, Red peppers").unwrap();

        assert!(matches!(
            create_restaurant_pizza(conn, 10, pizza.id + 100, restaurant.id),
            Err(StoreError::ReferencedEntityMissing(Entity::Pizza, _))
        ));
        assert!(matches!(
            create_restaurant_pizza(conn, 10, pizza.id, restaurant.id + 100),
            Err(StoreError::ReferencedEntityMissing(Entity::Restaurant, _))
        ));
        assert_eq!(count_restaurant_pizzas(conn), 0);
    }

    #[test]
    fn test_delete_restaurant_cascades() {
        let conn = &mut establish_test_connection();
        let doomed = create_restaurant(conn, "Doomed", "nowhere").unwrap();
        let kept = create_restaurant(conn, "Kept", "somewhere").unwrap();
        let margherita = create_pizza(conn, "Margherita", "Tomato, Mozzarella").unwrap();
        let marinara = create_pizza(conn, "Marinara", "Tomato, Garlic").unwrap();

        create_restaurant_pizza(conn, 10, margherita.id, doomed.id).unwrap();
        create_restaurant_pizza(conn, 11, marinara.id, doomed.id).unwrap();
        create_restaurant_pizza(conn, 12, margherita.id, kept.id).unwrap();

        assert_eq!(delete_restaurant(conn, doomed.id).unwrap(), 2);

        assert!(matches!(
            get_restaurant(conn, doomed.id),
            Err(StoreError::NotFound(Entity::Restaurant))
        ));
        assert_eq!(count_restaurant_pizzas(conn), 1);
        assert_eq!(list_pizzas(conn).unwrap(), vec![margherita, marinara]);
        assert_eq!(restaurant_pizzas_for_restaurant(conn, &kept).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_missing_restaurant_changes_nothing() {
        let conn = &mut establish_test_connection();
        let restaurant = create_restaurant(conn, "Only", "here").unwrap();
        let pizza = create_pizza(conn, "Margherita", "Tomato, Mozzarella").unwrap();
        create_restaurant_pizza(conn, 9, pizza.id, restaurant.id).unwrap();

        assert!(matches!(
            delete_restaurant(conn, restaurant.id + 1),
            Err(StoreError::NotFound(Entity::Restaurant))
        ));
        assert_eq!(list_restaurants(conn).unwrap(), vec![restaurant]);
        assert_eq!(count_restaurant_pizzas(conn), 1);
    }

    #[test]
    fn test_delete_pizza_cascades() {
        let conn = &mut establish_test_connection();
        let first = create_restaurant(conn, "First", "1 Main St").unwrap();
        let second = create_restaurant(conn, "Second", "2 Main St").unwrap();
        let pizza = create_pizza(conn, "Margherita", "Tomato, Mozzarella").unwrap();
        create_restaurant_pizza(conn, 10, pizza.id, first.id).unwrap();
        create_restaurant_pizza(conn, 14, pizza.id, second.id).unwrap();

        assert_eq!(delete_pizza(conn, pizza.id).unwrap(), 2);

        assert!(list_pizzas(conn).unwrap().is_empty());
        assert_eq!(list_restaurants(conn).unwrap(), vec![first, second]);
        assert_eq!(count_restaurant_pizzas(conn), 0);
    }

    #[test]
    fn test_restaurant_pizzas_for_restaurant() {
        let conn = &mut establish_test_connection();
        let restaurant = create_restaurant(conn, "First", "1 Main St").unwrap();
        let other = create_restaurant(conn, "Other", "2 Main St").unwrap();
        let margherita = create_pizza(conn, "Margherita", "Tomato, Mozzarella").unwrap();
        let marinara = create_pizza(conn, "Marinara", "Tomato, Garlic").unwrap();
        create_restaurant_pizza(conn, 12, margherita.id, restaurant.id).unwrap();
        create_restaurant_pizza(conn, 8, marinara.id, restaurant.id).unwrap();
        create_restaurant_pizza(conn, 20, marinara.id, other.id).unwrap();

        let offered = restaurant_pizzas_for_restaurant(conn, &restaurant).unwrap();
        let summary: Vec<_> = offered
            .iter()
            .map(|(rp, p)| (rp.price, p.name.as_str()))
            .collect();
        assert_eq!(summary, vec![(12, "Margherita"), (8, "Marinara")]);
    }

    #[test]
    fn test_foreign_keys_are_enforced() {
        let conn = &mut establish_test_connection();
        let orphan = NewRestaurantPizza::new(5, 1, 1).unwrap();
        let result = diesel::insert_into(restaurant_pizzas::table)
            .values(&orphan)
            .execute(conn);
        assert!(result.is_err());
    }

    #[test]
    fn test_clear() {
        let conn = &mut establish_test_connection();
        let restaurant = create_restaurant(conn, "First", "1 Main St").unwrap();
        let pizza = create_pizza(conn, "Margherita", "Tomato, Mozzarella").unwrap();
        create_restaurant_pizza(conn, 12, pizza.id, restaurant.id).unwrap();

        clear(conn).unwrap();

        assert!(list_restaurants(conn).unwrap().is_empty());
        assert!(list_pizzas(conn).unwrap().is_empty());
        assert_eq!(count_restaurant_pizzas(conn), 0);
    }

    #[test]
    fn test_empty_names_are_rejected() {
        let conn = &mut establish_test_connection();

        for (name, address) in [("", "1 Main St"), ("Luigi's", ""), ("", "")] {
            assert!(matches!(
                create_restaurant(conn, name, address),
                Err(StoreError::ConstraintViolation(Entity::Restaurant, _))
            ));
        }
        assert!(matches!(
            create_pizza(conn, "", "Tomato"),
            Err(StoreError::ConstraintViolation(Entity::Pizza, _))
        ));

        assert!(list_restaurants(conn).unwrap().is_empty());
        assert!(list_pizzas(conn).unwrap().is_empty());
    }

    #[test]
    fn test_concurrent_creates_on_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pizzeria.db");
        let pool = crate::establish_pool(path.to_str().unwrap()).unwrap();

        let (pizza_id, restaurant_id) = {
            let conn = &mut *pool.get().unwrap();
            run_migrations(conn).unwrap();
            let restaurant = create_restaurant(conn, "Busy", "1 Main St").unwrap();
            let pizza = create_pizza(conn, "Margherita", "Tomato, Mozzarella").unwrap();
            (pizza.id, restaurant.id)
        };

        let workers: Vec<_> = (0..8i64)
            .map(|worker| {
                let pool = pool.clone();
                std::thread::spawn(move || {
                    let conn = &mut *pool.get().unwrap();
                    for i in 0..5 {
                        create_restaurant_pizza(conn, 1 + (worker + i) % 30, pizza_id, restaurant_id)
                            .unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let conn = &mut *pool.get().unwrap();
        assert_eq!(count_restaurant_pizzas(conn), 40);
    }
}
