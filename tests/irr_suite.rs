//! Rate-of-return envelopes computed from record scripts, checked
//! against spreadsheet XIRR results for the same flows.

use chrono::NaiveDate;
use markbook::errors::LedgerError;
use markbook::parse::read_accounts;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn assert_close(actual: Decimal, expected: Decimal, tolerance: Decimal) {
    assert!(
        (actual - expected).abs() < tolerance,
        "{actual} not within {tolerance} of {expected}"
    );
}

#[test]
fn growth_without_flows_is_exact() {
    let recs = "\
12-30-2009 open a

12-31-2009 balances
---
a 100000

12-31-2010 balances
---
a 110000
";
    let accounts = read_accounts(recs).unwrap();
    let irr = accounts["a"]
        .get_irr(Some(d(2009, 12, 31)), Some(d(2010, 12, 31)))
        .unwrap();
    assert!(irr.is_point());
    assert_close(irr.min, dec!(10), dec!(0.001));
}

#[test]
fn deposit_at_the_period_end_contributes_no_growth() {
    let recs = "\
12-30-2009 open a
12-30-2000 open Assets

12-31-2009 balances
---
a 100000

from 12-31-2010 until 12-31-2010
---
Assets -> a 50000

12-31-2010 balances
---
a 160000
";
    let accounts = read_accounts(recs).unwrap();
    let irr = accounts["a"]
        .get_irr(Some(d(2009, 12, 31)), Some(d(2010, 12, 31)))
        .unwrap();
    assert!(irr.is_point());
    assert_close(irr.min, dec!(10), dec!(0.001));
}

#[test]
fn deposit_one_day_earlier_drags_the_rate() {
    let recs = "\
12-30-2009 open a
12-30-2000 open Assets

12-31-2009 balances
---
a 100000

from 12-30-2010 until 12-30-2010
---
Assets -> a 50000

12-31-2010 balances
---
a 160000
";
    let accounts = read_accounts(recs).unwrap();
    let irr = accounts["a"]
        .get_irr(Some(d(2009, 12, 31)), Some(d(2010, 12, 31)))
        .unwrap();
    assert!(irr.is_point());
    // XIRR gives 9.98696 for the same flows
    assert_close(irr.min, dec!(9.98696), dec!(0.001));
}

#[test]
fn ambiguous_window_widens_the_envelope() {
    let recs = "\
12-30-2009 open a
12-30-2000 open Assets

12-31-2009 balances
---
a 100000

from 12-30-2010 until 12-31-2010
---
Assets -> a 50000

12-31-2010 balances
---
a 160000
";
    let accounts = read_accounts(recs).unwrap();
    let irr = accounts["a"]
        .get_irr(Some(d(2009, 12, 31)), Some(d(2010, 12, 31)))
        .unwrap();
    assert!(!irr.is_point());
    assert_close(irr.min, dec!(9.98696), dec!(0.001));
    assert_close(irr.max, dec!(10), dec!(0.001));
}

#[test]
fn degenerate_windows_collapse_the_envelope() {
    // every flow happens at a known instant, so both timing assumptions
    // agree and the rate matches XIRR (5.967)
    let recs = "\
12-30-2000 open a
12-30-2000 open b

12-31-2000 balances
---
a 0
b 100

from 01-01-2002 until 01-01-2002
---
b -> a 12340000

from 12-31-2002 until 12-31-2002
---
a -> b 3620000

01-01-2003 balances
---
a 0

from 12-31-2003 until 12-31-2003
---
a -> b 5480000

01-01-2004 balances
---
a 0

from 12-31-2004 until 12-31-2004
---
a -> b 4810000

01-01-2005 balances
---
a 0

01-02-2005 close a
";
    let accounts = read_accounts(recs).unwrap();
    let irr = accounts["a"]
        .get_irr(Some(d(2000, 12, 31)), Some(d(2005, 1, 1)))
        .unwrap();
    assert!(irr.is_point());
    assert_close(irr.min, dec!(5.967), dec!(0.01));
}

#[test]
fn overlapping_windows_stay_ordered() {
    let recs = "\
12-30-2000 open a
12-30-2000 open b

12-31-2000 balances
---
a 0
b 0

from 01-01-2002 until 06-30-2002
---
b -> a 50000

from 02-01-2002 until 03-31-2002
---
b -> a 50000

from 03-01-2002 until 04-01-2002
---
b -> a 50000

06-30-2002 balances
---
a 120000

12-31-2002 balances
---
a 175000
";
    let accounts = read_accounts(recs).unwrap();

    let gaining = accounts["a"]
        .get_irr(Some(d(2000, 12, 31)), Some(d(2002, 12, 31)))
        .unwrap();
    assert!(gaining.min < gaining.max);
    assert!(gaining.min > dec!(15) && gaining.max < dec!(30));

    // by mid-2002 the account is under water on its deposits
    let losing = accounts["a"]
        .get_irr(Some(d(2000, 12, 31)), Some(d(2002, 6, 30)))
        .unwrap();
    assert!(losing.max < Decimal::ZERO);
    assert!(losing.min < losing.max);
}

#[test]
fn total_loss_pins_the_rate_at_the_floor() {
    // wiped out with no withdrawals: the daily rate solves deep in the
    // loss bracket and annualizes to exactly -100%
    let recs = "\
12-30-2009 open a

12-31-2009 balances
---
a 100

12-31-2010 balances
---
a 0
";
    let accounts = read_accounts(recs).unwrap();
    let irr = accounts["a"]
        .get_irr(Some(d(2009, 12, 31)), Some(d(2010, 12, 31)))
        .unwrap();
    assert!(irr.is_point());
    assert_eq!(irr.min, dec!(-100));
}

#[test]
fn unreachable_rates_are_reported() {
    // no rate inside the search bracket reaches this ending balance
    let recs = "\
12-30-2009 open a

12-31-2009 balances
---
a 100

12-31-2010 balances
---
a 1000000000000000000
";
    let accounts = read_accounts(recs).unwrap();
    let result = accounts["a"].get_irr(Some(d(2009, 12, 31)), Some(d(2010, 12, 31)));
    assert!(matches!(result, Err(LedgerError::IrrNotFound { .. })));
}
