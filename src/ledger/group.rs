//! Account groups and synthesized portfolio accounts.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::LedgerError;
use crate::ledger::account::{Account, Performance, Valuation};
use crate::ledger::irr::RateRange;
use crate::ledger::value::Value;

/// A named, ordered, read-only collection of related entities, e.g.
/// "liquid" or "retirement" accounts. Membership in one group does not
/// preclude membership in another; a group has no balance of its own.
///
/// Members are referenced by name (accounts or nested groups) and
/// resolved against the session's side tables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Group {
    name: String,
    members: Vec<String>,
}

impl Group {
    pub fn new<I, S>(name: impl Into<String>, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            members: members.into_iter().map(Into::into).collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Member names in construction order.
    pub fn members(&self) -> &[String] {
        &self.members
    }

    pub fn contains(&self, name: &str) -> bool {
        self.members.iter().any(|m| m == name)
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.members.get(index).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.members.iter().map(String::as_str)
    }
}

impl std::ops::Index<usize> for Group {
    type Output = str;

    fn index(&self, index: usize) -> &str {
        &self.members[index]
    }
}

/// A single account capturing all the transactions and reconciled
/// valuations of a set of contributor accounts, useful for whole-portfolio
/// performance.
///
/// Built once from fully-populated contributors and never separately
/// mutated afterwards; contributors are read, not changed. The inner
/// account is plain, and all ledger invariants are enforced during the
/// merge by replaying through the ordinary mutation paths.
#[derive(Debug, Clone)]
pub struct MetaAccount {
    account: Account,
    contributors: Group,
    contributor_carry: i64,
}

impl MetaAccount {
    /// Merge `contributors` into a synthetic account.
    ///
    /// The opening date is the earliest contributor's. Value marks are
    /// placed only at dates where every contributor that is already open
    /// has a real mark of its own (dates before a contributor opens are
    /// free: it contributes zero there). All contributor transactions are
    /// replayed through [`Account::add_transaction`], so a collision with
    /// the reconciled mark set fails construction with the usual errors.
    pub fn new(name: impl Into<String>, contributors: &[&Account]) -> Result<Self, LedgerError> {
        let name = name.into();
        if contributors.is_empty() {
            // no earliest opening date to inherit
            return Err(LedgerError::InvalidOpening {
                account: name,
                min: NaiveDate::MIN,
            });
        }

        let mut sorted: Vec<&Account> = contributors.to_vec();
        sorted.sort_by_key(|a| a.opened());
        let topen = sorted[0].opened();
        let mut account = Account::new(name, topen)?;

        // reconcile candidate mark dates across contributors
        let mut candidates: BTreeSet<NaiveDate> = sorted[0].values().iter().map(|v| v.t).collect();
        for contributor in &sorted[1..] {
            let own: BTreeSet<NaiveDate> =
                contributor.values().iter().map(|v| v.t).collect();
            candidates.retain(|d| *d <= contributor.opened() || own.contains(d));
        }
        // the synthetic opening gets its zero default from construction
        candidates.remove(&topen);

        for contributor in &sorted {
            for trans in contributor.transactions() {
                account.add_transaction(*trans)?;
            }
        }

        for date in &candidates {
            let mut total = Decimal::ZERO;
            for contributor in &sorted {
                if *date > contributor.opened() {
                    total += contributor.get_value(*date).amount;
                }
            }
            account.mark_value(Value::new(*date, total))?;
        }

        let contributor_carry = sorted.iter().map(|a| a.carried_days()).max().unwrap_or(0);
        let contributors = Group::new(account.name(), sorted.iter().map(|a| a.name()));

        Ok(Self {
            account,
            contributors,
            contributor_carry,
        })
    }

    pub fn name(&self) -> &str {
        self.account.name()
    }

    /// The merged ledger. Read-only: the meta account answers queries,
    /// it does not accept further records.
    pub fn account(&self) -> &Account {
        &self.account
    }

    /// Contributor names, sorted by opening date.
    pub fn contributors(&self) -> &Group {
        &self.contributors
    }

    /// Longest carry applied across contributors before the merge, for
    /// stale-data annotation.
    pub fn contributor_carry(&self) -> i64 {
        self.contributor_carry
    }

    pub fn set_carry_window(&mut self, window: Option<chrono::Duration>) {
        self.account.set_carry_window(window);
    }

    pub fn get_value(&self, t: NaiveDate) -> Valuation {
        self.account.get_value(t)
    }

    pub fn get_performance(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Performance, LedgerError> {
        self.account.get_performance(start, end)
    }

    pub fn get_irr(
        &self,
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<RateRange, LedgerError> {
        self.account.get_irr(start, end)
    }
}
