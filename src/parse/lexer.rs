//! Tokenization of the record language.
//!
//! The language is whitespace-separated: statements like
//! `12-30-2001 open savings` or transfer blocks introduced by
//! `from ... until ... ---`. Tokens never contain spaces, so the lexer
//! splits each line on whitespace (after stripping `//` comments) and
//! classifies every lexeme by pattern.

use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;

use super::ParseError;

static DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{2})-(\d{2})-(\d{4})$").expect("static pattern"));
static QUARTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Q([1-4])-(\d{4})$").expect("static pattern"));
static NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^-?\d+\.?\d{0,2}$").expect("static pattern"));
static IDENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w:]+$").expect("static pattern"));
static SEPARATOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^--+$").expect("static pattern"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Date(NaiveDate),
    /// Quarter shorthand like `Q2-2012`, already expanded to its
    /// start/end dates.
    Quarter(NaiveDate, NaiveDate),
    Number(Decimal),
    Ident(String),
    Separator,
    Arrow,
    LParen,
    RParen,
    Open,
    Close,
    From,
    Until,
    During,
    Balances,
    Group,
    Meta,
}

impl std::fmt::Display for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Token::Date(d) => write!(f, "{}", d.format("%m-%d-%Y")),
            Token::Quarter(start, _) => {
                write!(f, "Q{}-{}", 1 + (start.month0() / 3), start.year())
            }
            Token::Number(n) => write!(f, "{n}"),
            Token::Ident(name) => write!(f, "{name}"),
            Token::Separator => write!(f, "---"),
            Token::Arrow => write!(f, "->"),
            Token::LParen => write!(f, "("),
            Token::RParen => write!(f, ")"),
            Token::Open => write!(f, "open"),
            Token::Close => write!(f, "close"),
            Token::From => write!(f, "from"),
            Token::Until => write!(f, "until"),
            Token::During => write!(f, "during"),
            Token::Balances => write!(f, "balances"),
            Token::Group => write!(f, "group"),
            Token::Meta => write!(f, "meta"),
        }
    }
}

/// A token plus the 1-based line it was read from, for error reporting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Spanned {
    pub token: Token,
    pub line: usize,
}

/// Quarter start/end month-day pairs, keyed by quarter number - 1.
const QUARTER_SPANS: [((u32, u32), (u32, u32)); 4] = [
    ((1, 1), (3, 31)),
    ((4, 1), (6, 30)),
    ((7, 1), (9, 30)),
    ((10, 1), (12, 31)),
];

pub fn lex(input: &str) -> Result<Vec<Spanned>, ParseError> {
    let mut tokens = Vec::new();
    for (index, raw) in input.lines().enumerate() {
        let line = index + 1;
        let content = raw.split("//").next().unwrap_or("");
        for chunk in content.split_whitespace() {
            // parens bind tightly in member lists, e.g. `(a b)`
            let lexeme = chunk.trim_start_matches('(');
            for _ in 0..chunk.len() - lexeme.len() {
                tokens.push(Spanned {
                    token: Token::LParen,
                    line,
                });
            }
            let inner = lexeme.trim_end_matches(')');
            if !inner.is_empty() {
                tokens.push(Spanned {
                    token: classify(inner, line)?,
                    line,
                });
            }
            for _ in 0..lexeme.len() - inner.len() {
                tokens.push(Spanned {
                    token: Token::RParen,
                    line,
                });
            }
        }
    }
    Ok(tokens)
}

fn classify(lexeme: &str, line: usize) -> Result<Token, ParseError> {
    match lexeme {
        "open" => return Ok(Token::Open),
        "close" => return Ok(Token::Close),
        "from" => return Ok(Token::From),
        "until" => return Ok(Token::Until),
        "during" => return Ok(Token::During),
        "balances" => return Ok(Token::Balances),
        "group" => return Ok(Token::Group),
        "meta" => return Ok(Token::Meta),
        "->" => return Ok(Token::Arrow),
        _ => {}
    }
    if SEPARATOR_RE.is_match(lexeme) {
        return Ok(Token::Separator);
    }
    if let Some(caps) = DATE_RE.captures(lexeme) {
        let month: u32 = caps[1].parse().expect("digits");
        let day: u32 = caps[2].parse().expect("digits");
        let year: i32 = caps[3].parse().expect("digits");
        let date = NaiveDate::from_ymd_opt(year, month, day).ok_or_else(|| {
            ParseError::Syntax {
                line,
                lexeme: lexeme.to_string(),
            }
        })?;
        return Ok(Token::Date(date));
    }
    if let Some(caps) = QUARTER_RE.captures(lexeme) {
        let quarter: usize = caps[1].parse().expect("digits");
        let year: i32 = caps[2].parse().expect("digits");
        let ((sm, sd), (em, ed)) = QUARTER_SPANS[quarter - 1];
        let start = NaiveDate::from_ymd_opt(year, sm, sd).expect("quarter start");
        let end = NaiveDate::from_ymd_opt(year, em, ed).expect("quarter end");
        return Ok(Token::Quarter(start, end));
    }
    if NUMBER_RE.is_match(lexeme) {
        let trimmed = lexeme.trim_end_matches('.');
        let number = trimmed.parse::<Decimal>().map_err(|_| ParseError::Syntax {
            line,
            lexeme: lexeme.to_string(),
        })?;
        return Ok(Token::Number(number));
    }
    if IDENT_RE.is_match(lexeme) {
        return Ok(Token::Ident(lexeme.to_string()));
    }
    Err(ParseError::Syntax {
        line,
        lexeme: lexeme.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn lexes_statement_tokens() {
        let tokens = lex("12-30-2001 open a\nfrom 01-01-2002 until 06-30-2002\n---\na -> b 50.25\n")
            .unwrap();
        let kinds: Vec<Token> = tokens.into_iter().map(|s| s.token).collect();
        assert_eq!(
            kinds,
            vec![
                Token::Date(d(2001, 12, 30)),
                Token::Open,
                Token::Ident("a".into()),
                Token::From,
                Token::Date(d(2002, 1, 1)),
                Token::Until,
                Token::Date(d(2002, 6, 30)),
                Token::Separator,
                Token::Ident("a".into()),
                Token::Arrow,
                Token::Ident("b".into()),
                Token::Number(dec!(50.25)),
            ]
        );
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let tokens = lex("// header\n\n12-31-2001 balances // trailing\n").unwrap();
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].line, 3);
    }

    #[test]
    fn quarters_expand_to_spans() {
        let tokens = lex("during Q2-2012").unwrap();
        assert_eq!(
            tokens[1].token,
            Token::Quarter(d(2012, 4, 1), d(2012, 6, 30))
        );
    }

    #[test]
    fn negative_and_trailing_dot_numbers() {
        let tokens = lex("-50 100.").unwrap();
        assert_eq!(tokens[0].token, Token::Number(dec!(-50)));
        assert_eq!(tokens[1].token, Token::Number(dec!(100)));
    }

    #[test]
    fn parens_split_off_member_lists() {
        let tokens = lex("group ab -> (a b)").unwrap();
        let kinds: Vec<Token> = tokens.into_iter().map(|s| s.token).collect();
        assert_eq!(
            kinds,
            vec![
                Token::Group,
                Token::Ident("ab".into()),
                Token::Arrow,
                Token::LParen,
                Token::Ident("a".into()),
                Token::Ident("b".into()),
                Token::RParen,
            ]
        );
    }

    #[test]
    fn malformed_dates_are_rejected() {
        // two-digit years don't parse as dates, and the dashes make the
        // lexeme invalid as anything else
        assert!(matches!(
            lex("10-20-20 open c"),
            Err(ParseError::Syntax { line: 1, .. })
        ));
        // a well-formed pattern with an impossible day
        assert!(matches!(
            lex("02-30-2012 open c"),
            Err(ParseError::Syntax { .. })
        ));
    }
}
