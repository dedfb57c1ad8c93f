//! Product catalog and stock reservation.
//!
//! The catalog exposes exactly one way to take stock away from a product:
//! [`CatalogStore::try_decrement`], a compare-and-decrement that is atomic per
//! product. The [`ReservationEngine`] builds multi-line reservations on top of
//! it and undoes earlier decrements in reverse order when a later line cannot
//! be satisfied, so a reservation either commits every line or none.

pub mod error;
pub mod memory;
pub mod postgres;
pub mod product;
pub mod reservation;
pub mod store;

pub use error::{CatalogError, ReservationError};
pub use memory::InMemoryCatalog;
pub use postgres::PostgresCatalog;
pub use product::Product;
pub use reservation::{LineRequest, Reservation, ReservationEngine, ReservedLine};
pub use store::CatalogStore;
