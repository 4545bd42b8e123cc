//! Report tables over accounts and periods.
//!
//! Each builder lays accounts out against a set of periods or dates and
//! returns a [`Table`] ready for terminal rendering. A cell that cannot
//! be computed (no mark at a boundary, account not yet open) renders as
//! `---` rather than failing the whole report; the reason is logged at
//! debug level.
//!
//! Stale data is annotated rather than hidden: a row label gains
//! `[cN]` when a period boundary was resolved by carrying a balance
//! N days, and an account label gains `[clN]` when its last balance
//! was carried to the report date.

use chrono::NaiveDate;
use colored::Colorize;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::debug;

use crate::ledger::{Account, MetaAccount, Performance, Period, RateRange};

/// A report row subject: an account plus its display label.
pub struct Entry<'a> {
    label: String,
    account: &'a Account,
}

impl<'a> Entry<'a> {
    pub fn account(account: &'a Account) -> Self {
        Self {
            label: annotate_carry_last(account.name(), account.carried_days()),
            account,
        }
    }

    pub fn meta(meta: &'a MetaAccount) -> Self {
        Self {
            label: annotate_carry_last(meta.name(), meta.contributor_carry()),
            account: meta.account(),
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

fn annotate_carry_last(name: &str, days: i64) -> String {
    if days > 0 {
        format!("{name} [cl{days}]")
    } else {
        name.to_string()
    }
}

#[derive(Debug, Clone)]
struct Cell {
    text: String,
    negative: bool,
}

impl Cell {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            negative: false,
        }
    }

    fn empty() -> Self {
        Self::text("---")
    }

    fn amount(v: Decimal) -> Self {
        Self {
            text: format!("{v:.2}"),
            negative: v.is_sign_negative(),
        }
    }

    fn rate(r: RateRange) -> Self {
        Self {
            text: r.to_string(),
            negative: r.max.is_sign_negative(),
        }
    }
}

/// A rendered-on-demand table: a left-aligned label column plus
/// right-aligned data columns, with an optional totals footer.
#[derive(Debug)]
pub struct Table {
    title: String,
    header: Vec<String>,
    rows: Vec<(String, Vec<Cell>)>,
    footer: Option<(String, Vec<Cell>)>,
}

impl Table {
    fn new(title: impl Into<String>, header: Vec<String>) -> Self {
        Self {
            title: title.into(),
            header,
            rows: Vec::new(),
            footer: None,
        }
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Render to text. With `color`, negative cells come out red; widths
    /// are computed before coloring so alignment is unaffected.
    pub fn render(&self, color: bool) -> String {
        let columns = self.header.len();
        let mut widths: Vec<usize> = self.header.iter().map(String::len).collect();
        let labels = self.rows.iter().map(|(label, _)| label).chain(
            self.footer.iter().map(|(label, _)| label),
        );
        for label in labels {
            widths[0] = widths[0].max(label.len());
        }
        let cells = self.rows.iter().chain(self.footer.iter());
        for (_, row) in cells {
            for (i, cell) in row.iter().enumerate() {
                widths[i + 1] = widths[i + 1].max(cell.text.len());
            }
        }
        let total: usize = widths.iter().sum::<usize>() + 2 * (columns - 1);

        let mut out = String::new();
        let banner = "-".repeat(40_usize.saturating_sub(self.title.len() / 2));
        out.push_str(&format!("{banner} {} {banner}\n", self.title));

        out.push_str(&format!("{:<width$}", self.header[0], width = widths[0]));
        for (text, width) in self.header[1..].iter().zip(widths[1..].iter().copied()) {
            out.push_str(&format!("  {text:>width$}"));
        }
        out.push('\n');
        out.push_str(&"-".repeat(total));
        out.push('\n');

        for (label, row) in &self.rows {
            Self::render_row(&mut out, label, row, &widths, color);
        }
        if let Some((label, row)) = &self.footer {
            out.push_str(&"-".repeat(total));
            out.push('\n');
            Self::render_row(&mut out, label, row, &widths, color);
        }
        out
    }

    fn render_row(out: &mut String, label: &str, row: &[Cell], widths: &[usize], color: bool) {
        out.push_str(&format!("{label:<width$}", width = widths[0]));
        for (cell, width) in row.iter().zip(widths[1..].iter().copied()) {
            let padded = format!("{:>width$}", cell.text);
            if color && cell.negative {
                out.push_str(&format!("  {}", padded.red()));
            } else {
                out.push_str(&format!("  {padded}"));
            }
        }
        out.push('\n');
    }
}

/// The per-period statistics a stats table can report on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Metric {
    Gain,
    Additions,
    Subtractions,
    NetAdditions,
}

impl Metric {
    pub fn title(self) -> &'static str {
        match self {
            Metric::Gain => "Gain",
            Metric::Additions => "Additions",
            Metric::Subtractions => "Subtractions",
            Metric::NetAdditions => "Net Additions",
        }
    }

    fn pick(self, perf: &Performance) -> Decimal {
        match self {
            Metric::Gain => perf.gain,
            Metric::Additions => perf.additions,
            Metric::Subtractions => perf.subtractions,
            Metric::NetAdditions => perf.net_additions,
        }
    }
}

fn period_header(periods: &[Period]) -> Vec<String> {
    std::iter::once("Account".to_string())
        .chain(periods.iter().map(|p| p.name.clone()))
        .collect()
}

/// Accounts against periods, one annualized rate envelope per cell.
pub fn overview(entries: &[Entry<'_>], periods: &[Period]) -> Table {
    let mut table = Table::new("Performance Overview", period_header(periods));
    for entry in entries {
        let mut row = Vec::with_capacity(periods.len());
        for period in periods {
            match entry.account.get_irr(period.start, Some(period.end)) {
                Ok(rate) => row.push(Cell::rate(rate)),
                Err(error) => {
                    debug!(account = entry.label(), period = %period.name, %error, "empty cell");
                    row.push(Cell::empty());
                }
            }
        }
        table.rows.push((entry.label.clone(), row));
    }
    table
}

/// Accounts against periods for a single statistic, with column totals.
pub fn stats(entries: &[Entry<'_>], periods: &[Period], metric: Metric) -> Table {
    let mut table = Table::new(metric.title(), period_header(periods));
    let mut totals = vec![Decimal::ZERO; periods.len()];
    for entry in entries {
        let mut row = Vec::with_capacity(periods.len());
        let mut carry = 0;
        for (period, total) in periods.iter().zip(&mut totals) {
            match entry.account.get_performance(period.start, Some(period.end)) {
                Ok(perf) => {
                    carry = carry.max(perf.carry_days);
                    *total += metric.pick(&perf);
                    row.push(Cell::amount(metric.pick(&perf)));
                }
                Err(error) => {
                    debug!(account = entry.label(), period = %period.name, %error, "empty cell");
                    row.push(Cell::empty());
                }
            }
        }
        table.rows.push((annotate_carried(&entry.label, carry), row));
    }
    table.footer = Some((
        "Total:".to_string(),
        totals.into_iter().map(Cell::amount).collect(),
    ));
    table
}

/// Accounts against dates, one balance per cell, with column totals.
pub fn net_worth(entries: &[Entry<'_>], dates: &[NaiveDate]) -> Table {
    let header = std::iter::once("Account".to_string())
        .chain(dates.iter().map(|d| d.to_string()))
        .collect();
    let mut table = Table::new("Net Worth", header);
    let mut totals = vec![Decimal::ZERO; dates.len()];
    for entry in entries {
        let mut row = Vec::with_capacity(dates.len());
        let mut carry = 0;
        for (date, total) in dates.iter().zip(&mut totals) {
            let valuation = entry.account.get_value(*date);
            if valuation.is_resolved() {
                if let crate::ledger::ValueStatus::Carried { days } = valuation.status {
                    carry = carry.max(days);
                }
                *total += valuation.amount;
                row.push(Cell::amount(valuation.amount));
            } else {
                debug!(account = entry.label(), %date, status = ?valuation.status, "empty cell");
                row.push(Cell::empty());
            }
        }
        table.rows.push((annotate_carried(&entry.label, carry), row));
    }
    table.footer = Some((
        "Total:".to_string(),
        totals.into_iter().map(Cell::amount).collect(),
    ));
    table
}

/// Periods against statistics for a single account.
pub fn detail(entry: &Entry<'_>, periods: &[Period]) -> Table {
    let header = ["Period", "Start Date", "Performance", "Adds", "Subs", "St. Value", "End Value", "Gain"]
        .into_iter()
        .map(String::from)
        .collect();
    let mut table = Table::new(format!("{} -- Detail", entry.label), header);
    for period in periods {
        match entry.account.get_performance(period.start, Some(period.end)) {
            Ok(perf) => {
                table.rows.push((
                    annotate_carried(&period.name, perf.carry_days),
                    vec![
                        Cell::text(perf.start.to_string()),
                        Cell::rate(perf.irr),
                        Cell::amount(perf.additions),
                        Cell::amount(perf.subtractions),
                        Cell::amount(perf.start_balance),
                        Cell::amount(perf.end_balance),
                        Cell::amount(perf.gain),
                    ],
                ));
            }
            Err(error) => {
                debug!(account = entry.label(), period = %period.name, %error, "empty row");
                table
                    .rows
                    .push((period.name.clone(), vec![Cell::empty(); 7]));
            }
        }
    }
    table
}

fn annotate_carried(label: &str, days: i64) -> String {
    if days > 0 {
        format!("{label} [c{days}]")
    } else {
        label.to_string()
    }
}

/// One machine-readable performance result.
#[derive(Debug, Serialize)]
pub struct PerformanceRow {
    pub account: String,
    pub period: String,
    #[serde(flatten)]
    pub performance: Performance,
}

/// Flatten every computable account/period combination for JSON output.
pub fn performance_rows(entries: &[Entry<'_>], periods: &[Period]) -> Vec<PerformanceRow> {
    let mut rows = Vec::new();
    for entry in entries {
        for period in periods {
            if let Ok(performance) = entry.account.get_performance(period.start, Some(period.end))
            {
                rows.push(PerformanceRow {
                    account: entry.label.clone(),
                    period: period.name.clone(),
                    performance,
                });
            }
        }
    }
    rows
}
