//! Reporting periods anchored to the fiscal quarters.

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Quarter end month/day pairs, in calendar order.
const QUARTER_ENDS: [(u32, u32); 4] = [(3, 31), (6, 30), (9, 30), (12, 31)];

/// A named reporting period. `start == None` means "since inception":
/// performance queries resolve it to each account's opening date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start: Option<NaiveDate>,
    pub end: NaiveDate,
    pub name: String,
}

impl Period {
    pub fn new(start: impl Into<Option<NaiveDate>>, end: NaiveDate, name: impl Into<String>) -> Self {
        Self {
            start: start.into(),
            end,
            name: name.into(),
        }
    }
}

fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
    // only called with quarter-end month/day pairs
    NaiveDate::from_ymd_opt(year, month, day).expect("valid calendar date")
}

/// The name of the quarter containing the given date, e.g. `Q2-2012`.
pub fn name_of_quarter(date: NaiveDate) -> String {
    format!("Q{}-{}", 1 + (date.month() - 1) / 3, date.year())
}

/// The end date of the quarter containing the given date.
pub fn end_of_quarter(date: NaiveDate) -> NaiveDate {
    let index = ((date.month() - 1) / 3) as usize;
    let (month, day) = QUARTER_ENDS[index];
    ymd(date.year(), month, day)
}

/// The latest quarter end on or before the given date.
pub fn end_of_completed_quarter(date: NaiveDate) -> NaiveDate {
    if QUARTER_ENDS.contains(&(date.month(), date.day())) {
        return date;
    }
    let quarter = ((date.month() - 1) / 3) as usize;
    let previous = (quarter + 3) % 4;
    let year = if previous == 3 {
        date.year() - 1
    } else {
        date.year()
    };
    let (month, day) = QUARTER_ENDS[previous];
    ymd(year, month, day)
}

/// The most recently completed quarter as a period: the last quarter that
/// ends on or before `date`.
pub fn period_of_preceding_quarter(date: NaiveDate) -> Period {
    let end = end_of_completed_quarter(date);
    let start = end_of_completed_quarter(end - Duration::days(1));
    Period::new(start, end, name_of_quarter(end))
}

/// Quarters whose end dates fall in the given span: the quarter containing
/// `from` first, then every subsequent quarter starting before `to`.
pub fn quarters(from: NaiveDate, to: NaiveDate) -> Vec<Period> {
    let mut year = from.year();
    let mut index = ((from.month() - 1) / 3) as usize;

    let quarter = |year: i32, index: usize| {
        let previous = (index + 3) % 4;
        let start_year = if index == 0 { year - 1 } else { year };
        let (sm, sd) = QUARTER_ENDS[previous];
        let (em, ed) = QUARTER_ENDS[index];
        let end = ymd(year, em, ed);
        Period::new(ymd(start_year, sm, sd), end, name_of_quarter(end))
    };

    let mut periods = vec![quarter(year, index)];
    loop {
        index += 1;
        if index == 4 {
            index = 0;
            year += 1;
        }
        let next = quarter(year, index);
        match next.start {
            Some(start) if start < to => periods.push(next),
            _ => break,
        }
    }
    periods
}

/// The standard report periods anchored at `end`: preceding quarter, year
/// to date (except after Q4), one/three/five year, ten year after Q4, and
/// lifetime. Returns `None` unless `end` is a quarter end.
pub fn standard_periods(end: NaiveDate) -> Option<Vec<Period>> {
    let quarter = QUARTER_ENDS
        .iter()
        .position(|&md| md == (end.month(), end.day()))?;

    let mut periods = vec![period_of_preceding_quarter(end)];
    if quarter != 3 {
        periods.push(Period::new(
            ymd(end.year() - 1, 12, 31),
            end,
            "Year to Date",
        ));
    }
    for (years, name) in [(1, "One Year"), (3, "Three Year"), (5, "Five Year")] {
        periods.push(Period::new(
            ymd(end.year() - years, end.month(), end.day()),
            end,
            name,
        ));
    }
    if quarter == 3 {
        periods.push(Period::new(
            ymd(end.year() - 10, end.month(), end.day()),
            end,
            "Ten Year",
        ));
    }
    periods.push(Period::new(None, end, "Lifetime"));
    Some(periods)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn quarter_names_and_ends() {
        assert_eq!(name_of_quarter(d(2015, 2, 10)), "Q1-2015");
        assert_eq!(name_of_quarter(d(2015, 12, 31)), "Q4-2015");
        assert_eq!(end_of_quarter(d(2015, 2, 10)), d(2015, 3, 31));
        assert_eq!(end_of_quarter(d(2015, 7, 1)), d(2015, 9, 30));
    }

    #[test]
    fn completed_quarter_snaps_backwards() {
        assert_eq!(end_of_completed_quarter(d(2015, 3, 31)), d(2015, 3, 31));
        assert_eq!(end_of_completed_quarter(d(2015, 4, 1)), d(2015, 3, 31));
        assert_eq!(end_of_completed_quarter(d(2015, 1, 1)), d(2014, 12, 31));
        assert_eq!(end_of_completed_quarter(d(2015, 11, 30)), d(2015, 9, 30));
    }

    #[test]
    fn preceding_quarter_period() {
        let p = period_of_preceding_quarter(d(2015, 5, 20));
        assert_eq!(p.start, Some(d(2014, 12, 31)));
        assert_eq!(p.end, d(2015, 3, 31));
        assert_eq!(p.name, "Q1-2015");
    }

    #[test]
    fn quarters_cover_span() {
        let qs = quarters(d(2014, 11, 1), d(2015, 6, 30));
        let names: Vec<&str> = qs.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Q4-2014", "Q1-2015", "Q2-2015"]);
        assert_eq!(qs[0].start, Some(d(2014, 9, 30)));
        assert_eq!(qs[1].start, Some(d(2014, 12, 31)));
        assert_eq!(qs[2].end, d(2015, 6, 30));
    }

    #[test]
    fn standard_periods_at_quarter_ends() {
        assert!(standard_periods(d(2015, 5, 20)).is_none());

        let mid = standard_periods(d(2015, 6, 30)).unwrap();
        let names: Vec<&str> = mid.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Q2-2015",
                "Year to Date",
                "One Year",
                "Three Year",
                "Five Year",
                "Lifetime"
            ]
        );

        let q4 = standard_periods(d(2015, 12, 31)).unwrap();
        let names: Vec<&str> = q4.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Q4-2015",
                "One Year",
                "Three Year",
                "Five Year",
                "Ten Year",
                "Lifetime"
            ]
        );
        assert_eq!(q4.last().unwrap().start, None);
    }
}
