//! Contract line items and CSV import

mod data;
pub mod loader;

pub use data::{LineItem, ProductType};
pub use loader::{load_line_items, load_line_items_from_reader};
