//! Ledger domain models: accounts, marks, transactions, groups, periods.

pub mod account;
pub mod group;
pub mod irr;
pub mod period;
pub mod value;

pub use account::{Account, Performance, Valuation, ValueStatus};
pub use group::{Group, MetaAccount};
pub use irr::{RateRange, Timing};
pub use period::Period;
pub use value::{Transaction, Value};
