use std::ops::RangeInclusive;

use diesel::prelude::*;

use crate::schema::{pizzas, restaurant_pizzas, restaurants};

/// Prices a restaurant may charge for a pizza, inclusive on both ends.
pub const PRICE_RANGE: RangeInclusive<i32> = 1..=30;

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = restaurants)]
pub struct Restaurant {
    pub id: i32,
    pub name: String,
    pub address: String,
}

#[derive(Insertable, Debug, PartialEq)]
#[diesel(table_name = restaurants)]
pub struct NewRestaurant {
    pub name: String,
    pub address: String,
}

#[derive(Queryable, Selectable, Identifiable, Debug, Clone, PartialEq)]
#[diesel(table_name = pizzas)]
pub struct Pizza {
    pub id: i32,
    pub name: String,
    pub ingredients: String,
}

#[derive(Insertable, Debug, PartialEq)]
#[diesel(table_name = pizzas)]
pub struct NewPizza {
    pub name: String,
    pub ingredients: String,
}

#[derive(Queryable, Selectable, Identifiable, Associations, Debug, Clone, PartialEq)]
#[diesel(belongs_to(Restaurant))]
#[diesel(belongs_to(Pizza))]
#[diesel(table_name = restaurant_pizzas)]
pub struct RestaurantPizza {
    pub id: i32,
    pub price: i32,
    pub restaurant_id: i32,
    pub pizza_id: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Price must be between 1 and 30, got {price}")]
    PriceOutOfRange { price: i64 },
}

/// A restaurant pizza that has not been stored yet.
///
/// The only way to obtain one is [`NewRestaurantPizza::new`], so every value
/// that reaches the database already carries a price inside [`PRICE_RANGE`].
#[derive(Insertable, Debug, Clone, PartialEq)]
#[diesel(table_name = restaurant_pizzas)]
pub struct NewRestaurantPizza {
    price: i32,
    restaurant_id: i32,
    pizza_id: i32,
}

impl NewRestaurantPizza {
    pub fn new(price: i64, pizza_id: i32, restaurant_id: i32) -> Result<Self, ValidationError> {
        let price = i32::try_from(price)
            .ok()
            .filter(|p| PRICE_RANGE.contains(p))
            .ok_or(ValidationError::PriceOutOfRange { price })?;

        Ok(Self {
            price,
            restaurant_id,
            pizza_id,
        })
    }

    pub fn price(&self) -> i32 {
        self.price
    }

    pub fn pizza_id(&self) -> i32 {
        self.pizza_id
    }

    pub fn restaurant_id(&self) -> i32 {
        self.restaurant_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_every_price_in_range() {
        for price in 1..=30 {
            let new = NewRestaurantPizza::new(price, 1, 2).unwrap();
            assert_eq!(new.price(), price as i32);
            assert_eq!(new.pizza_id(), 1);
            assert_eq!(new.restaurant_id(), 2);
        }
    }

    #[test]
    fn test_rejects_prices_outside_range() {
        for price in [i64::MIN, -1, 0, 31, 100, i64::from(i32::MAX) + 1] {
            assert_eq!(
                NewRestaurantPizza::new(price, 1, 1),
                Err(ValidationError::PriceOutOfRange { price })
            );
        }
    }
}
