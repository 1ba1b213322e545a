pub mod app_config;
pub mod catalog_repo;
pub mod database;
pub mod memory;
pub mod order_repo;

pub use app_config::{Config, StorageBackend};
pub use catalog_repo::PgCatalogRepository;
pub use database::DbClient;
pub use memory::InMemoryStore;
pub use order_repo::PgOrderRepository;
