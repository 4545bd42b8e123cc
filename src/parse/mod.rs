//! Reading record files into ledgers.
//!
//! A record file is a sequence of statements: account openings and
//! closings, dated balance blocks, transfer blocks over a window, and
//! group/meta declarations. Parsing happens in two phases: statements
//! are checked and collected into a [`Session`] in file order, then the
//! session replays them through the ordinary [`Account`] mutation paths
//! so every ledger invariant applies to file input exactly as it does
//! to code.

mod lexer;

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDate};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, warn};

use crate::errors::LedgerError;
use crate::ledger::{Account, Group, MetaAccount, Transaction, Value};
use lexer::{Spanned, Token};

/// Opening date for accounts referenced before an `open` statement in
/// non-strict mode. Early enough that every real record falls after it.
fn implicit_opening() -> NaiveDate {
    NaiveDate::MIN + Duration::days(1)
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("line {line}: unrecognized input '{lexeme}'")]
    Syntax { line: usize, lexeme: String },
    #[error("unexpected end of input")]
    UnexpectedEof,
    #[error("line {line}: unexpected '{token}'")]
    Unexpected { line: usize, token: String },
    #[error("line {line}: account '{name}' has no opening date")]
    UnknownAccount { line: usize, name: String },
    #[error("line {line}: account '{name}' is already open")]
    DuplicateAccount { line: usize, name: String },
    #[error("line {line}: block entries must sum to zero, got {sum}")]
    NonZeroSum { line: usize, sum: Decimal },
    #[error("line {line}: '{collection}' references unknown account '{member}'")]
    UnknownMember {
        line: usize,
        collection: String,
        member: String,
    },
    #[error("line {line}: {source}")]
    Ledger {
        line: usize,
        #[source]
        source: LedgerError,
    },
}

/// Options for [`read_ledger`].
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    /// Fail on records for accounts without an opening statement instead
    /// of opening them implicitly.
    pub strict: bool,
    /// Carry each open account's last balance forward to `to_date`.
    pub carry_last: bool,
    /// Target date for `carry_last`.
    pub to_date: Option<NaiveDate>,
}

/// Everything a record file declares.
#[derive(Debug, Default)]
pub struct LedgerData {
    pub accounts: BTreeMap<String, Account>,
    pub groups: BTreeMap<String, Group>,
    pub metas: BTreeMap<String, MetaAccount>,
}

/// Parse a record file and build its ledgers.
pub fn read_ledger(input: &str, options: &ReadOptions) -> Result<LedgerData, ParseError> {
    let tokens = lexer::lex(input)?;
    let mut session = Session::new(options.strict);
    Parser {
        tokens: &tokens,
        pos: 0,
    }
    .statements(&mut session)?;
    session.finish(options)
}

/// Parse a record file, keeping only the plain accounts.
pub fn read_accounts(input: &str) -> Result<BTreeMap<String, Account>, ParseError> {
    Ok(read_ledger(input, &ReadOptions::default())?.accounts)
}

/// A deferred statement: applied to its account during replay, in file
/// order, so closings see the balances recorded before them.
#[derive(Debug)]
struct Record {
    line: usize,
    account: String,
    payload: Payload,
}

#[derive(Debug)]
enum Payload {
    Mark(Value),
    Flow(Transaction),
    Close(NaiveDate),
}

#[derive(Debug)]
struct CollectionDef {
    line: usize,
    meta: bool,
    name: String,
    members: Vec<String>,
}

/// Parse-time state: the accounts opened so far plus everything waiting
/// for replay.
struct Session {
    strict: bool,
    accounts: BTreeMap<String, Account>,
    records: Vec<Record>,
    collections: Vec<CollectionDef>,
}

impl Session {
    fn new(strict: bool) -> Self {
        Self {
            strict,
            accounts: BTreeMap::new(),
            records: Vec::new(),
            collections: Vec::new(),
        }
    }

    fn open(&mut self, line: usize, name: String, date: NaiveDate) -> Result<(), ParseError> {
        if self.accounts.contains_key(&name) {
            return Err(ParseError::DuplicateAccount { line, name });
        }
        let account = Account::new(name.clone(), date)
            .map_err(|source| ParseError::Ledger { line, source })?;
        self.accounts.insert(name, account);
        Ok(())
    }

    fn close(&mut self, line: usize, name: String, date: NaiveDate) -> Result<(), ParseError> {
        if !self.accounts.contains_key(&name) {
            return Err(ParseError::UnknownAccount { line, name });
        }
        self.records.push(Record {
            line,
            account: name,
            payload: Payload::Close(date),
        });
        Ok(())
    }

    fn record(&mut self, line: usize, name: String, payload: Payload) -> Result<(), ParseError> {
        if !self.accounts.contains_key(&name) {
            if self.strict {
                return Err(ParseError::UnknownAccount { line, name });
            }
            warn!(account = %name, line, "no opening date, assuming a distant one");
            let account = Account::new(name.clone(), implicit_opening())
                .map_err(|source| ParseError::Ledger { line, source })?;
            self.accounts.insert(name.clone(), account);
        }
        self.records.push(Record {
            line,
            account: name,
            payload,
        });
        Ok(())
    }

    fn define(&mut self, def: CollectionDef) {
        self.collections.push(def);
    }

    fn finish(self, options: &ReadOptions) -> Result<LedgerData, ParseError> {
        let Session {
            mut accounts,
            records,
            collections,
            ..
        } = self;

        for record in records {
            let account = accounts
                .get_mut(&record.account)
                .unwrap_or_else(|| unreachable!("records only name opened accounts"));
            match record.payload {
                Payload::Mark(value) => account.mark_value(value),
                Payload::Flow(trans) => account.add_transaction(trans),
                Payload::Close(date) => account.set_closing(date),
            }
            .map_err(|source| ParseError::Ledger {
                line: record.line,
                source,
            })?;
        }

        if options.carry_last {
            if let Some(todate) = options.to_date {
                for account in accounts.values_mut().filter(|a| !a.is_closed()) {
                    if let Err(error) = account.carry_last(todate) {
                        debug!(%error, "not carrying last balance");
                    }
                }
            }
        }

        let mut groups = BTreeMap::new();
        let mut metas = BTreeMap::new();
        for def in collections {
            if let Some(member) = def.members.iter().find(|m| !accounts.contains_key(*m)) {
                return Err(ParseError::UnknownMember {
                    line: def.line,
                    collection: def.name,
                    member: member.clone(),
                });
            }
            if def.meta {
                let contributors: Vec<&Account> =
                    def.members.iter().map(|m| &accounts[m]).collect();
                let meta = MetaAccount::new(&def.name, &contributors).map_err(|source| {
                    ParseError::Ledger {
                        line: def.line,
                        source,
                    }
                })?;
                metas.insert(def.name, meta);
            } else {
                groups.insert(def.name.clone(), Group::new(def.name, def.members));
            }
        }

        Ok(LedgerData {
            accounts,
            groups,
            metas,
        })
    }
}

struct Parser<'t> {
    tokens: &'t [Spanned],
    pos: usize,
}

impl Parser<'_> {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn advance(&mut self) -> Result<&Spanned, ParseError> {
        let spanned = self.tokens.get(self.pos).ok_or(ParseError::UnexpectedEof)?;
        self.pos += 1;
        Ok(spanned)
    }

    fn unexpected(spanned: &Spanned) -> ParseError {
        ParseError::Unexpected {
            line: spanned.line,
            token: spanned.token.to_string(),
        }
    }

    fn expect_date(&mut self) -> Result<NaiveDate, ParseError> {
        let spanned = self.advance()?;
        match spanned.token {
            Token::Date(date) => Ok(date),
            _ => Err(Self::unexpected(spanned)),
        }
    }

    fn expect_ident(&mut self) -> Result<(String, usize), ParseError> {
        let spanned = self.advance()?;
        match &spanned.token {
            Token::Ident(name) => Ok((name.clone(), spanned.line)),
            _ => Err(Self::unexpected(spanned)),
        }
    }

    fn expect_number(&mut self) -> Result<Decimal, ParseError> {
        let spanned = self.advance()?;
        match spanned.token {
            Token::Number(number) => Ok(number),
            _ => Err(Self::unexpected(spanned)),
        }
    }

    fn expect(&mut self, token: Token) -> Result<(), ParseError> {
        let spanned = self.advance()?;
        if spanned.token == token {
            Ok(())
        } else {
            Err(Self::unexpected(spanned))
        }
    }

    fn statements(&mut self, session: &mut Session) -> Result<(), ParseError> {
        while let Some(token) = self.peek() {
            match token {
                Token::Date(_) => self.dated_statement(session)?,
                Token::Balances => {
                    self.advance()?;
                    let date = self.expect_date()?;
                    self.expect(Token::Separator)?;
                    self.balance_entries(session, date)?;
                }
                Token::From | Token::During => self.flow_block(session)?,
                Token::Group => self.collection(session, false)?,
                Token::Meta => self.collection(session, true)?,
                _ => return Err(Self::unexpected(&self.tokens[self.pos])),
            }
        }
        Ok(())
    }

    /// `DATE open NAME`, `DATE close NAME`, or `DATE balances --- ...`.
    fn dated_statement(&mut self, session: &mut Session) -> Result<(), ParseError> {
        let date = self.expect_date()?;
        let spanned = self.advance()?;
        match spanned.token {
            Token::Open => {
                let (name, line) = self.expect_ident()?;
                session.open(line, name, date)
            }
            Token::Close => {
                let (name, line) = self.expect_ident()?;
                session.close(line, name, date)
            }
            Token::Balances => {
                self.expect(Token::Separator)?;
                self.balance_entries(session, date)
            }
            _ => Err(Self::unexpected(spanned)),
        }
    }

    fn balance_entries(
        &mut self,
        session: &mut Session,
        date: NaiveDate,
    ) -> Result<(), ParseError> {
        loop {
            let (name, line) = self.expect_ident()?;
            let amount = self.expect_number()?;
            session.record(line, name, Payload::Mark(Value::new(date, amount)))?;
            if !matches!(self.peek(), Some(Token::Ident(_))) {
                return Ok(());
            }
        }
    }

    /// A window followed by entries. Transfers move money between two
    /// accounts and are zero-sum by construction; plain entries must
    /// cancel out across the block.
    fn flow_block(&mut self, session: &mut Session) -> Result<(), ParseError> {
        let (start, end) = self.date_range()?;
        let block = self.tokens[self.pos - 1].line;
        self.expect(Token::Separator)?;

        let mut sum = Decimal::ZERO;
        loop {
            let (name, line) = self.expect_ident()?;
            if matches!(self.peek(), Some(Token::Arrow)) {
                self.advance()?;
                let (dest, _) = self.expect_ident()?;
                let amount = self.expect_number()?;
                session.record(line, name, Payload::Flow(Transaction::new(start, end, -amount)))?;
                session.record(line, dest, Payload::Flow(Transaction::new(start, end, amount)))?;
            } else {
                let amount = self.expect_number()?;
                sum += amount;
                session.record(line, name, Payload::Flow(Transaction::new(start, end, amount)))?;
            }
            if !matches!(self.peek(), Some(Token::Ident(_))) {
                break;
            }
        }
        if !sum.is_zero() {
            return Err(ParseError::NonZeroSum { line: block, sum });
        }
        Ok(())
    }

    /// `from DATE until DATE`, `during Q*-YYYY`, or `during YYYY`.
    fn date_range(&mut self) -> Result<(NaiveDate, NaiveDate), ParseError> {
        let spanned = self.advance()?;
        match spanned.token {
            Token::From => {
                let start = self.expect_date()?;
                self.expect(Token::Until)?;
                let end = self.expect_date()?;
                Ok((start, end))
            }
            Token::During => {
                let spanned = self.advance()?;
                match spanned.token {
                    Token::Quarter(start, end) => Ok((start, end)),
                    Token::Number(n) => {
                        let year = n
                            .fract()
                            .is_zero()
                            .then(|| n.to_i32())
                            .flatten()
                            .filter(|y| (1..=9999).contains(y))
                            .ok_or_else(|| Self::unexpected(spanned))?;
                        Ok((
                            NaiveDate::from_ymd_opt(year, 1, 1).unwrap_or_else(|| {
                                unreachable!("year is range checked")
                            }),
                            NaiveDate::from_ymd_opt(year, 12, 31).unwrap_or_else(|| {
                                unreachable!("year is range checked")
                            }),
                        ))
                    }
                    _ => Err(Self::unexpected(spanned)),
                }
            }
            _ => Err(Self::unexpected(spanned)),
        }
    }

    /// `group NAME -> (MEMBER...)` or `meta NAME -> (MEMBER...)`.
    fn collection(&mut self, session: &mut Session, meta: bool) -> Result<(), ParseError> {
        self.advance()?;
        let (name, line) = self.expect_ident()?;
        self.expect(Token::Arrow)?;
        self.expect(Token::LParen)?;
        let mut members = Vec::new();
        while matches!(self.peek(), Some(Token::Ident(_))) {
            members.push(self.expect_ident()?.0);
        }
        self.expect(Token::RParen)?;
        session.define(CollectionDef {
            line,
            meta,
            name,
            members,
        });
        Ok(())
    }
}
