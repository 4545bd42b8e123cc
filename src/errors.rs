use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised by ledger mutations and queries.
///
/// Every variant is a data error surfaced synchronously at the call that
/// detects it; nothing here is retried. Callers replaying records either
/// propagate, or (for best-effort paths like bulk carry-forward) log and
/// move on to the next account.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    #[error("{account}: opening date must be after {min}")]
    InvalidOpening { account: String, min: NaiveDate },

    #[error("end of time window {end} precedes its start {start}")]
    InvalidWindow { start: NaiveDate, end: NaiveDate },

    #[error("{account}: can't perform account operations at {time}, outside the open interval")]
    TemporalBounds { account: String, time: NaiveDate },

    #[error("{account}: transaction window and value mark overlap at {time}")]
    Overlap { account: String, time: NaiveDate },

    #[error("{account}: {time} has already been valued at {existing}")]
    DuplicateMark {
        account: String,
        time: NaiveDate,
        existing: Decimal,
    },

    #[error("{account}: can't mark a value at close except via set_closing")]
    MarkAtClose { account: String, time: NaiveDate },

    #[error("{account}: can't close an account twice")]
    AlreadyClosed { account: String },

    #[error("{account}: {time} is not a valid closing date")]
    InvalidClosingDate { account: String, time: NaiveDate },

    #[error("{account}: can't close at a mark of {amount}, expected zero")]
    NonZeroAtClose { account: String, amount: Decimal },

    #[error("{account}: a transaction ends after the closing date {time}")]
    PendingTransaction { account: String, time: NaiveDate },

    #[error("{account}: no value resolvable at period boundary {boundary}")]
    NoValueAtBoundary { account: String, boundary: NaiveDate },

    #[error("{account}: a transaction window spans the period boundary {boundary}")]
    BoundarySpanned { account: String, boundary: NaiveDate },

    #[error("{account}: carry target {target} precedes the last mark at {last}")]
    InvalidCarryTarget {
        account: String,
        target: NaiveDate,
        last: NaiveDate,
    },

    #[error("{account}: rate search failed to converge between {start} and {end}")]
    IrrNotFound {
        account: String,
        start: NaiveDate,
        end: NaiveDate,
    },
}
