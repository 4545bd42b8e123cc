#![doc(test(attr(deny(warnings))))]

//! markbook offers ledger primitives for financial analysis with
//! incomplete information: accounts built from sparse value marks and
//! time-windowed transactions, with gain and rate-of-return queries,
//! a record language for data files, and report tables.

pub mod errors;
pub mod ledger;
pub mod parse;
pub mod report;

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing once; later calls are no-ops.
pub fn init() {
    INIT_TRACING.call_once(|| {
        use tracing_subscriber::{fmt, EnvFilter};

        let filter = match "markbook=info".parse() {
            Ok(directive) => EnvFilter::from_default_env().add_directive(directive),
            Err(_) => EnvFilter::from_default_env(),
        };
        fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        tracing::debug!("tracing initialized");
    });
}
