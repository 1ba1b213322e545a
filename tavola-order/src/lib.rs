pub mod models;
pub mod lifecycle;
pub mod changes;
pub mod error;
pub mod repository;
pub mod manager;
pub mod statistics;

pub use models::{NewLineItem, NewOrder, Order, OrderItem};
pub use lifecycle::OrderStatus;
pub use changes::ChangeHandler;
pub use error::{OrderError, ValidationError};
pub use repository::{OrderRepository, StatusTally};
pub use manager::OrderManager;
pub use statistics::OrderStatistics;
