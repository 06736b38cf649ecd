#![warn(clippy::uninlined_format_args)]

pub mod model;
pub mod services;

pub use model::{Expense, ExpenseError, Ledger, Money, Statement, User};
pub use services::SettlementOptimizer;
