pub mod menu;
pub mod repository;
pub mod service;

pub use menu::{MenuItem, MenuItemSnapshot, MenuItemUpdate, NewMenuItem, NewRestaurant, Restaurant};
pub use repository::{CatalogRepository, MenuCatalog};
pub use service::{CatalogError, CatalogService};
