//! Internal-rate-of-return search over uncertain transaction timing.
//!
//! Transaction timing inside a window is unknown, so a single period does
//! not have one rate of return; it has an envelope. Two synthetic
//! schedules bound it: "long money" assumes deposits land at the start of
//! their windows and withdrawals at the end, "short money" the reverse.
//! Each schedule is solved for the periodic rate by bisection over decimal
//! arithmetic, then annualized.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

use crate::ledger::value::Transaction;

/// Bisection search interval, in percent per period unit.
const RATE_MIN: Decimal = dec!(-50);
const RATE_MAX: Decimal = dec!(50);

/// Convergence tolerance on the schedule value, in account currency.
const TOLERANCE: Decimal = dec!(0.00001);

/// The interval above brackets every realistic rate; the bound only trips
/// when a schedule cannot reach its target at all.
const MAX_ITERATIONS: usize = 200;

/// Cap on compounded growth factors so that probe rates at the interval
/// edges cannot overflow `Decimal`.
const GROWTH_CAP: Decimal = dec!(1_000_000_000_000_000);

const HUNDRED: Decimal = dec!(100);

/// The two extreme assumptions about in-window transaction timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Timing {
    LongMoney,
    ShortMoney,
}

/// A single flow in a synthetic schedule, expressed in days before the
/// period end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CashFlow {
    pub days: i64,
    pub amount: Decimal,
}

/// An envelope of possible annualized rates, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateRange {
    pub min: Decimal,
    pub max: Decimal,
}

impl RateRange {
    /// Order-independent construction; long money does not always
    /// dominate, so min/max are taken explicitly.
    pub fn new(a: Decimal, b: Decimal) -> Self {
        if a <= b {
            Self { min: a, max: b }
        } else {
            Self { min: b, max: a }
        }
    }

    /// True when timing ambiguity has collapsed to a single rate.
    pub fn is_point(&self) -> bool {
        self.min == self.max
    }
}

impl fmt::Display for RateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.min, self.max)
    }
}

/// Build the flow schedule for one timing assumption. `transactions` must
/// already be restricted to the period; the opening balance enters as a
/// flow dated at the period start.
pub fn schedule(
    transactions: &[Transaction],
    start: NaiveDate,
    end: NaiveDate,
    start_balance: Decimal,
    timing: Timing,
) -> Vec<CashFlow> {
    let mut flows = Vec::with_capacity(transactions.len() + 1);
    flows.push(CashFlow {
        days: (end - start).num_days(),
        amount: start_balance,
    });
    for trans in transactions {
        let assumed = match timing {
            Timing::LongMoney => trans.long_money(),
            Timing::ShortMoney => trans.short_money(),
        };
        flows.push(CashFlow {
            days: (end - assumed).num_days(),
            amount: trans.amount,
        });
    }
    flows
}

/// Find the periodic percent rate `r` such that
/// `Σ amount_i · (1 + r/100)^days_i` hits `target` to within `TOLERANCE`.
///
/// Returns `None` when the search does not converge within the iteration
/// bound; the caller treats that as a fatal internal error.
pub fn solve(flows: &[CashFlow], target: Decimal) -> Option<Decimal> {
    let mut lo = RATE_MIN;
    let mut hi = RATE_MAX;
    for _ in 0..MAX_ITERATIONS {
        let mid = (lo + hi) / dec!(2);
        let value: Decimal = flows
            .iter()
            .map(|f| scaled(f.amount, growth(mid, f.days)))
            .sum();
        let miss = value - target;
        if miss.abs() <= TOLERANCE {
            return Some(mid);
        }
        if value < target {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    None
}

/// Annualized percentage for a periodic percent rate, under the original
/// 365-day compounding convention (leap years intentionally ignored; the
/// reference fixtures were generated against this exact convention).
pub fn annualize(rate: Decimal) -> Decimal {
    (pow(Decimal::ONE + rate / HUNDRED, 365) - Decimal::ONE) * HUNDRED
}

fn growth(rate: Decimal, days: i64) -> Decimal {
    pow(Decimal::ONE + rate / HUNDRED, days.max(0) as u64)
}

fn scaled(amount: Decimal, factor: Decimal) -> Decimal {
    amount.checked_mul(factor).unwrap_or_else(|| {
        if amount.is_sign_negative() {
            Decimal::MIN
        } else {
            Decimal::MAX
        }
    })
}

/// Square-and-multiply power, capped rather than overflowing: extreme
/// probe rates compound far past any balance the ledger can hold, and the
/// bisection only needs the ordering to stay correct out there.
fn pow(base: Decimal, mut exp: u64) -> Decimal {
    let mut result = Decimal::ONE;
    let mut base = base;
    loop {
        if exp & 1 == 1 {
            result = match result.checked_mul(base) {
                Some(r) if r <= GROWTH_CAP => r,
                _ => return GROWTH_CAP,
            };
        }
        exp >>= 1;
        if exp == 0 {
            break;
        }
        base = match base.checked_mul(base) {
            Some(b) if b <= GROWTH_CAP => b,
            _ => {
                // the remaining squarings can only grow the result
                return if exp == 0 { result } else { GROWTH_CAP };
            }
        };
    }
    result
}
