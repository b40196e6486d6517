//! Persistence workflows behind the REST handlers
//!
//! Handlers stay thin: they decode the request, call one of these functions
//! with the injected store and map the outcome to a response.

pub mod transactions;
pub mod users;

pub use transactions::{create_transaction, list_transactions, parse_month_filter};
pub use users::create_user_with_goals;
