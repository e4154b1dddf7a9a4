//! Query modules for the data service.
//!
//! Each module provides a query struct that borrows a [`DataService`](crate::service::DataService)
//! and implements the cache policy for one collection: set list, cards for a set, or card pricing.

pub mod cards;
pub mod prices;
pub mod sets;

pub use cards::{attach_images, CardQuery};
pub use prices::PriceQuery;
pub use sets::{assign_set_ids, SetQuery};
