//! Types that represent the core data model, such as `Transaction` and `Amount`.
mod amount;
mod category;
mod transaction;

pub use amount::{format_money, Amount, AmountError};
pub use category::Categories;
pub use transaction::{Transaction, TransactionType, TransactionUpdates};
