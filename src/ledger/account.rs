//! The account ledger: an ordered sequence of value marks and an
//! unordered collection of windowed transactions for one entity.
//!
//! An account is a black box with an opening date `topen` and an optional
//! closing date `tclose`. Before opening and after closing the balance is
//! zero. Marks assert the balance at an instant; transactions move money
//! somewhere inside a window of time. The two must never contradict each
//! other:
//!
//! - every mark and transaction falls in `(topen, tclose]`
//! - a transaction window `[tstart, tend)` never contains a mark, so a
//!   mark may sit exactly at a window's end but not at its start
//!   (unless the window is empty)
//!
//! With those invariants enforced at insertion time, the account can
//! answer balance, gain, and rate-of-return queries over any period whose
//! endpoints resolve to a mark, even though the data is incomplete.

use std::io;

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::LedgerError;
use crate::ledger::irr::{self, RateRange, Timing};
use crate::ledger::value::{Transaction, Value};

/// How a balance lookup was satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueStatus {
    /// The query date precedes the opening date.
    NotOpen,
    /// The account is closed and the query date follows the closing date.
    Closed,
    /// A mark exists exactly at the query date.
    Marked,
    /// No mark at the query date; the balance was carried forward from a
    /// mark `days` days earlier, inside the configured carry window.
    Carried { days: i64 },
    /// Nothing known at or near the query date.
    NoData,
}

/// The result of a balance lookup. `amount` is meaningful only for the
/// `Marked` and `Carried` statuses (and is zero for `NotOpen`/`Closed`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Valuation {
    pub amount: Decimal,
    pub status: ValueStatus,
}

impl Valuation {
    fn new(amount: Decimal, status: ValueStatus) -> Self {
        Self { amount, status }
    }

    pub fn is_resolved(&self) -> bool {
        matches!(
            self.status,
            ValueStatus::Marked | ValueStatus::Carried { .. }
        )
    }
}

/// Performance measures over a period whose endpoints resolve to marks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Performance {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub start_balance: Decimal,
    pub end_balance: Decimal,
    pub additions: Decimal,
    pub subtractions: Decimal,
    pub net_additions: Decimal,
    pub gain: Decimal,
    pub irr: RateRange,
    /// Longest carry used to resolve either boundary, in days. Zero when
    /// both boundaries were real marks.
    pub carry_days: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    name: String,
    topen: NaiveDate,
    tclose: Option<NaiveDate>,
    /// Sorted by `(t, amount)`; seeded with a zero mark at `topen` and
    /// never emptied afterwards.
    values: Vec<Value>,
    transactions: Vec<Transaction>,
    carry_window: Option<Duration>,
    carried: i64,
}

impl Account {
    /// Creates a new account with the specified opening date and a zero
    /// balance mark at that date.
    pub fn new(name: impl Into<String>, topen: NaiveDate) -> Result<Self, LedgerError> {
        let name = name.into();
        if topen <= NaiveDate::MIN {
            return Err(LedgerError::InvalidOpening {
                account: name,
                min: NaiveDate::MIN,
            });
        }
        Ok(Self {
            name,
            topen,
            tclose: None,
            values: vec![Value::new(topen, Decimal::ZERO)],
            transactions: Vec::new(),
            carry_window: None,
            carried: 0,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn opened(&self) -> NaiveDate {
        self.topen
    }

    pub fn closed(&self) -> Option<NaiveDate> {
        self.tclose
    }

    pub fn is_closed(&self) -> bool {
        self.tclose.is_some()
    }

    /// Value marks in chronological order.
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Transactions in insertion order; queries scan, they never index.
    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn carry_window(&self) -> Option<Duration> {
        self.carry_window
    }

    /// Enables or disables carry-forward lookups. `None` or a
    /// non-positive duration disables them.
    pub fn set_carry_window(&mut self, window: Option<Duration>) {
        self.carry_window = window.filter(|w| w.num_days() > 0);
    }

    /// Days the last balance was carried forward by [`Account::carry_last`],
    /// for stale-data annotation in reports.
    pub fn carried_days(&self) -> i64 {
        self.carried
    }

    // The opening mark is inserted at construction and never removed.
    fn last_mark(&self) -> Value {
        self.values[self.values.len() - 1]
    }

    /// Ensure a time window is well formed and lies in `(topen, tclose]`.
    fn check_window(&self, start: NaiveDate, end: NaiveDate) -> Result<(), LedgerError> {
        if end < start {
            return Err(LedgerError::InvalidWindow { start, end });
        }
        if start <= self.topen {
            return Err(LedgerError::TemporalBounds {
                account: self.name.clone(),
                time: start,
            });
        }
        if let Some(tclose) = self.tclose {
            if end > tclose {
                return Err(LedgerError::TemporalBounds {
                    account: self.name.clone(),
                    time: end,
                });
            }
        }
        Ok(())
    }

    /// Add a transaction to the account.
    pub fn add_transaction(&mut self, trans: Transaction) -> Result<(), LedgerError> {
        self.check_window(trans.tstart, trans.tend)?;
        if let Some(val) = self.values.iter().find(|v| trans.spans(v.t)) {
            return Err(LedgerError::Overlap {
                account: self.name.clone(),
                time: val.t,
            });
        }
        self.transactions.push(trans);
        Ok(())
    }

    /// Mark the account's value at a specific moment in time.
    ///
    /// Re-marking an existing `(t, amount)` pair is a silent no-op;
    /// re-marking an existing time with a different amount fails.
    pub fn mark_value(&mut self, value: Value) -> Result<(), LedgerError> {
        self.check_window(value.t, value.t)?;
        if self.tclose == Some(value.t) {
            return Err(LedgerError::MarkAtClose {
                account: self.name.clone(),
                time: value.t,
            });
        }
        if self.transactions.iter().any(|t| t.spans(value.t)) {
            return Err(LedgerError::Overlap {
                account: self.name.clone(),
                time: value.t,
            });
        }

        // insertion point to the right of any equal entry
        let at = self.values.partition_point(|v| *v <= value);
        for neighbor in [at.checked_sub(1), Some(at)] {
            let Some(existing) = neighbor.and_then(|i| self.values.get(i)) else {
                continue;
            };
            if existing.t == value.t {
                if existing.amount == value.amount {
                    return Ok(()); // nothing to do
                }
                return Err(LedgerError::DuplicateMark {
                    account: self.name.clone(),
                    time: value.t,
                    existing: existing.amount,
                });
            }
        }
        self.values.insert(at, value);
        Ok(())
    }

    /// Set the account's closing date. On and after it the balance is
    /// zero; a synthetic zero mark is appended unless one already exists
    /// exactly at `t`.
    pub fn set_closing(&mut self, t: NaiveDate) -> Result<(), LedgerError> {
        if self.tclose.is_some() {
            return Err(LedgerError::AlreadyClosed {
                account: self.name.clone(),
            });
        }
        if t <= self.topen {
            return Err(LedgerError::InvalidClosingDate {
                account: self.name.clone(),
                time: t,
            });
        }
        if self.transactions.iter().any(|trans| trans.tend > t) {
            return Err(LedgerError::PendingTransaction {
                account: self.name.clone(),
                time: t,
            });
        }
        let last = self.last_mark();
        if last.t > t {
            return Err(LedgerError::InvalidClosingDate {
                account: self.name.clone(),
                time: t,
            });
        }
        if last.t == t {
            if !last.amount.is_zero() {
                return Err(LedgerError::NonZeroAtClose {
                    account: self.name.clone(),
                    amount: last.amount,
                });
            }
        } else {
            self.values.push(Value::new(t, Decimal::ZERO));
        }
        self.tclose = Some(t);
        Ok(())
    }

    /// Determine the account value at time `t`.
    pub fn get_value(&self, t: NaiveDate) -> Valuation {
        if t < self.topen {
            return Valuation::new(Decimal::ZERO, ValueStatus::NotOpen);
        }
        if let Some(tclose) = self.tclose {
            if t > tclose {
                return Valuation::new(Decimal::ZERO, ValueStatus::Closed);
            }
        }
        if let Some(val) = self.values.iter().find(|v| v.t == t) {
            return Valuation::new(val.amount, ValueStatus::Marked);
        }
        if let Some(window) = self.carry_window {
            // most recent mark wins; anything older is farther away
            if let Some(val) = self.values.iter().rev().find(|v| v.t < t) {
                let elapsed = t - val.t;
                if elapsed <= window {
                    return Valuation::new(
                        val.amount,
                        ValueStatus::Carried {
                            days: elapsed.num_days(),
                        },
                    );
                }
            }
        }
        Valuation::new(Decimal::ZERO, ValueStatus::NoData)
    }

    /// Resolve a period boundary to a balance and the carry length used.
    fn resolve_boundary(&self, t: NaiveDate) -> Result<(Decimal, i64), LedgerError> {
        let valuation = self.get_value(t);
        match valuation.status {
            ValueStatus::Marked => Ok((valuation.amount, 0)),
            ValueStatus::Carried { days } => Ok((valuation.amount, days)),
            _ => Err(LedgerError::NoValueAtBoundary {
                account: self.name.clone(),
                boundary: t,
            }),
        }
    }

    /// Transactions may not straddle a marked boundary. Carried
    /// boundaries are synthetic, so the caller skips the check for them.
    fn check_boundary(&self, boundary: NaiveDate) -> Result<(), LedgerError> {
        if self.transactions.iter().any(|trans| trans.spans(boundary)) {
            return Err(LedgerError::BoundarySpanned {
                account: self.name.clone(),
                boundary,
            });
        }
        Ok(())
    }

    /// Get performance measures over a period. `start` defaults to the
    /// opening date, `end` to the latest mark. Both endpoints must
    /// resolve to a marked or carried value.
    pub fn get_performance(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Performance, LedgerError> {
        let start = start.unwrap_or(self.topen);
        let end = end.unwrap_or_else(|| self.last_mark().t);
        if end < start {
            return Err(LedgerError::InvalidWindow { start, end });
        }

        let (start_balance, start_carry) = self.resolve_boundary(start)?;
        let (end_balance, end_carry) = self.resolve_boundary(end)?;
        if start_carry == 0 {
            self.check_boundary(start)?;
        }
        if end_carry == 0 {
            self.check_boundary(end)?;
        }

        let mut additions = Decimal::ZERO;
        let mut subtractions = Decimal::ZERO;
        for trans in self.in_period(start, end) {
            if trans.is_deposit() {
                additions += trans.amount;
            } else {
                subtractions -= trans.amount;
            }
        }

        let gain = end_balance - start_balance - additions + subtractions;
        let irr = self.solve_irr(start, end, start_balance, end_balance)?;

        Ok(Performance {
            start,
            end,
            start_balance,
            end_balance,
            additions,
            subtractions,
            net_additions: additions - subtractions,
            gain,
            irr,
            carry_days: start_carry.max(end_carry),
        })
    }

    /// Compute the envelope of possible annualized rates of return over a
    /// period; see [`crate::ledger::irr`]. `start`/`end` default as in
    /// [`Account::get_performance`].
    pub fn get_irr(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<RateRange, LedgerError> {
        let start = start.unwrap_or(self.topen);
        let end = end.unwrap_or_else(|| self.last_mark().t);
        if end < start {
            return Err(LedgerError::InvalidWindow { start, end });
        }
        let (start_balance, _) = self.resolve_boundary(start)?;
        let (end_balance, _) = self.resolve_boundary(end)?;
        self.solve_irr(start, end, start_balance, end_balance)
    }

    fn in_period(&self, start: NaiveDate, end: NaiveDate) -> impl Iterator<Item = &Transaction> {
        self.transactions
            .iter()
            .filter(move |t| t.tstart > start && t.tend <= end)
    }

    fn solve_irr(
        &self,
        start: NaiveDate,
        end: NaiveDate,
        start_balance: Decimal,
        end_balance: Decimal,
    ) -> Result<RateRange, LedgerError> {
        let in_period: Vec<Transaction> = self.in_period(start, end).copied().collect();
        let mut rates = [Decimal::ZERO; 2];
        for (slot, timing) in rates
            .iter_mut()
            .zip([Timing::LongMoney, Timing::ShortMoney])
        {
            let flows = irr::schedule(&in_period, start, end, start_balance, timing);
            let rate = irr::solve(&flows, end_balance).ok_or_else(|| LedgerError::IrrNotFound {
                account: self.name.clone(),
                start,
                end,
            })?;
            *slot = irr::annualize(rate);
        }
        Ok(RateRange::new(rates[0], rates[1]))
    }

    /// Carry the last known balance forward to `todate` by appending a
    /// synthetic mark, when no mark resolves there already. Records the
    /// carry length for stale-data annotation. Fails when `todate`
    /// precedes the last mark.
    pub fn carry_last(&mut self, todate: NaiveDate) -> Result<i64, LedgerError> {
        let last = self.last_mark();
        if todate < last.t {
            return Err(LedgerError::InvalidCarryTarget {
                account: self.name.clone(),
                target: todate,
                last: last.t,
            });
        }
        match self.get_value(todate).status {
            ValueStatus::NoData | ValueStatus::Carried { .. } => {
                let days = (todate - last.t).num_days();
                self.mark_value(last.replicate(todate))?;
                self.carried = days;
                debug!(account = %self.name, days, "carried last mark forward");
                Ok(days)
            }
            _ => Ok(0),
        }
    }

    /// Export the ledger as CSV: one row per item, interleaved and sorted
    /// by date (transactions before marks on equal dates), with each
    /// transaction's long-money/short-money timing projections. Column
    /// order is stable for diff-based testing.
    pub fn write_csv<W: io::Write>(&self, writer: W) -> csv::Result<()> {
        let mut out = csv::Writer::from_writer(writer);
        out.write_record([
            "date",
            "kind",
            "amount",
            "window start",
            "window end",
            "long money",
            "short money",
        ])?;

        let mut rows: Vec<(NaiveDate, u8, [String; 7])> = Vec::new();
        for trans in &self.transactions {
            rows.push((
                trans.tstart,
                0,
                [
                    trans.tstart.to_string(),
                    "transaction".to_string(),
                    trans.amount.to_string(),
                    trans.tstart.to_string(),
                    trans.tend.to_string(),
                    trans.long_money().to_string(),
                    trans.short_money().to_string(),
                ],
            ));
        }
        for val in &self.values {
            rows.push((
                val.t,
                1,
                [
                    val.t.to_string(),
                    "mark".to_string(),
                    val.amount.to_string(),
                    String::new(),
                    String::new(),
                    String::new(),
                    String::new(),
                ],
            ));
        }
        rows.sort_by_key(|(date, kind, _)| (*date, *kind));
        for (_, _, row) in &rows {
            out.write_record(row)?;
        }
        out.flush()?;
        Ok(())
    }
}
