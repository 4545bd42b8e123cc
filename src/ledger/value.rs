use std::cmp::Ordering;
use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// An account valuation asserted to hold at a moment in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Value {
    pub t: NaiveDate,
    pub amount: Decimal,
}

impl Value {
    pub fn new(t: NaiveDate, amount: Decimal) -> Self {
        Self { t, amount }
    }

    /// The same balance asserted at a different date.
    pub fn replicate(&self, t: NaiveDate) -> Self {
        Self {
            t,
            amount: self.amount,
        }
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.t, self.amount).cmp(&(other.t, other.amount))
    }
}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:.2}", self.t, self.amount)
    }
}

/// A movement of money that occurred somewhere within `[tstart, tend]`;
/// the exact instant is unknown. Positive amounts are deposits, negative
/// amounts withdrawals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub tstart: NaiveDate,
    pub tend: NaiveDate,
    pub amount: Decimal,
}

impl Transaction {
    pub fn new(tstart: NaiveDate, tend: NaiveDate, amount: Decimal) -> Self {
        Self {
            tstart,
            tend,
            amount,
        }
    }

    pub fn is_deposit(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    /// Timing that keeps the money in the account as long as possible:
    /// deposits at the start of the window, withdrawals at the end.
    pub fn long_money(&self) -> NaiveDate {
        if self.is_deposit() {
            self.tstart
        } else {
            self.tend
        }
    }

    /// Timing that keeps the money in the account as briefly as possible.
    pub fn short_money(&self) -> NaiveDate {
        if self.is_deposit() {
            self.tend
        } else {
            self.tstart
        }
    }

    /// True when the half-open window `[tstart, tend)` contains `t`.
    /// Window endpoints sort before marks at the same date, so a mark may
    /// sit exactly at `tend` but never inside the window.
    pub(crate) fn spans(&self, t: NaiveDate) -> bool {
        self.tstart <= t && t < self.tend
    }
}

impl fmt::Display for Transaction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "from {} until {}: {:.2}",
            self.tstart, self.tend, self.amount
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn values_order_by_time_then_amount() {
        let a = Value::new(d(2012, 1, 1), dec!(100));
        let b = Value::new(d(2012, 1, 1), dec!(200));
        let c = Value::new(d(2012, 2, 1), dec!(0));
        assert!(a < b);
        assert!(b < c);
        assert_eq!(a, a.replicate(d(2012, 1, 1)));
    }

    #[test]
    fn timing_projections_follow_sign() {
        let deposit = Transaction::new(d(2012, 1, 1), d(2012, 1, 31), dec!(100));
        assert_eq!(deposit.long_money(), d(2012, 1, 1));
        assert_eq!(deposit.short_money(), d(2012, 1, 31));

        let withdrawal = Transaction::new(d(2012, 1, 1), d(2012, 1, 31), dec!(-100));
        assert!(!withdrawal.is_deposit());
        assert_eq!(withdrawal.long_money(), d(2012, 1, 31));
        assert_eq!(withdrawal.short_money(), d(2012, 1, 1));
    }

    #[test]
    fn window_is_half_open() {
        let t = Transaction::new(d(2012, 1, 1), d(2012, 1, 31), dec!(100));
        assert!(t.spans(d(2012, 1, 1)));
        assert!(t.spans(d(2012, 1, 30)));
        assert!(!t.spans(d(2012, 1, 31)));

        let instant = Transaction::new(d(2012, 1, 1), d(2012, 1, 1), dec!(5));
        assert!(!instant.spans(d(2012, 1, 1)));
    }
}
