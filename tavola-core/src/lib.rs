pub mod error;
pub mod money;
pub mod pii;

pub use error::{StoreError, StoreResult};
pub use money::{round_currency, CURRENCY_DECIMAL_PLACES};
pub use pii::Masked;
