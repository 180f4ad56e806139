//! Event query language for node subscriptions.
//!
//! A query is one or more conditions joined by `AND`:
//!
//! ```text
//! tm.event = 'Tx' AND tx.height > 5 AND transfer.recipient CONTAINS 'tbnb1'
//! ```
//!
//! Operators are `=`, `<`, `<=`, `>`, `>=`, `CONTAINS` and `EXISTS`. Operands
//! are single-quoted strings, numbers, `TIME <rfc3339>` or `DATE <yyyy-mm-dd>`.
//! Queries are validated locally so a malformed query fails before any
//! connection is opened.

use std::fmt;
use std::str::FromStr;

/// Parse failure with the byte offset where it happened.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at position {position}")]
pub struct QueryError {
    pub position: usize,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Lt,
    Le,
    Gt,
    Ge,
    Contains,
    Exists,
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Operator::Eq => "=",
            Operator::Lt => "<",
            Operator::Le => "<=",
            Operator::Gt => ">",
            Operator::Ge => ">=",
            Operator::Contains => "CONTAINS",
            Operator::Exists => "EXISTS",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Str(String),
    /// Kept as written (`5`, `-1.25`).
    Number(String),
    Time(String),
    Date(String),
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Str(s) => write!(f, "'{s}'"),
            Operand::Number(n) => f.write_str(n),
            Operand::Time(t) => write!(f, "TIME {t}"),
            Operand::Date(d) => write!(f, "DATE {d}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Condition {
    pub tag: String,
    pub op: Operator,
    /// `None` only for `EXISTS`.
    pub operand: Option<Operand>,
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.operand {
            Some(operand) => write!(f, "{} {} {}", self.tag, self.op, operand),
            None => write!(f, "{} {}", self.tag, self.op),
        }
    }
}

/// A validated event query. `Display` yields the normalized text sent to the node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    conditions: Vec<Condition>,
}

impl Query {
    pub fn parse(input: &str) -> Result<Self, QueryError> {
        Parser::new(input).parse()
    }

    /// All committed transactions: `tm.event = 'Tx'`.
    pub fn txs() -> Self {
        Self {
            conditions: vec![Condition {
                tag: "tm.event".to_string(),
                op: Operator::Eq,
                operand: Some(Operand::Str("Tx".to_string())),
            }],
        }
    }

    /// Committed transactions paying `recipient`.
    pub fn txs_to(recipient: &str) -> Self {
        Self::txs().and_eq("transfer.recipient", recipient)
    }

    /// Append `tag = 'value'`.
    pub fn and_eq(mut self, tag: impl Into<String>, value: impl Into<String>) -> Self {
        self.conditions.push(Condition {
            tag: tag.into(),
            op: Operator::Eq,
            operand: Some(Operand::Str(value.into())),
        });
        self
    }

    pub fn conditions(&self) -> &[Condition] {
        &self.conditions
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, condition) in self.conditions.iter().enumerate() {
            if i > 0 {
                f.write_str(" AND ")?;
            }
            write!(f, "{condition}")?;
        }
        Ok(())
    }
}

impl FromStr for Query {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

struct Parser<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn parse(mut self) -> Result<Query, QueryError> {
        let mut conditions = Vec::new();
        self.skip_ws();
        if self.at_end() {
            return Err(self.error("empty query"));
        }
        loop {
            conditions.push(self.condition()?);
            self.skip_ws();
            if self.at_end() {
                break;
            }
            if !self.keyword("AND") {
                return Err(self.error("expected AND"));
            }
        }
        Ok(Query { conditions })
    }

    fn condition(&mut self) -> Result<Condition, QueryError> {
        self.skip_ws();
        let tag = self.tag()?;
        self.skip_ws();
        let op_pos = self.pos;
        let op = self.operator()?;
        if op == Operator::Exists {
            return Ok(Condition {
                tag,
                op,
                operand: None,
            });
        }
        self.skip_ws();
        let operand = self.operand()?;
        if op == Operator::Contains && !matches!(operand, Operand::Str(_)) {
            return Err(QueryError {
                position: op_pos,
                message: "CONTAINS requires a string operand".to_string(),
            });
        }
        Ok(Condition {
            tag,
            op,
            operand: Some(operand),
        })
    }

    fn tag(&mut self) -> Result<String, QueryError> {
        let tag = self.take_while(is_tag_char);
        if tag.is_empty() {
            return Err(self.error("expected tag"));
        }
        Ok(tag.to_string())
    }

    fn operator(&mut self) -> Result<Operator, QueryError> {
        let rest = self.rest();
        let (op, len) = if rest.starts_with("<=") {
            (Operator::Le, 2)
        } else if rest.starts_with(">=") {
            (Operator::Ge, 2)
        } else if rest.starts_with('<') {
            (Operator::Lt, 1)
        } else if rest.starts_with('>') {
            (Operator::Gt, 1)
        } else if rest.starts_with('=') {
            (Operator::Eq, 1)
        } else if self.keyword("CONTAINS") {
            return Ok(Operator::Contains);
        } else if self.keyword("EXISTS") {
            return Ok(Operator::Exists);
        } else {
            return Err(self.error("expected operator"));
        };
        self.pos += len;
        Ok(op)
    }

    fn operand(&mut self) -> Result<Operand, QueryError> {
        let start = self.pos;
        if self.rest().starts_with('\'') {
            self.pos += 1;
            let body = self.take_while(|c| c != '\'').to_string();
            if self.at_end() {
                return Err(QueryError {
                    position: start,
                    message: "unterminated string".to_string(),
                });
            }
            self.pos += 1;
            return Ok(Operand::Str(body));
        }
        if self.keyword("TIME") {
            self.skip_ws();
            let at = self.pos;
            let value = self.take_while(|c| !c.is_whitespace());
            if !is_rfc3339(value) {
                return Err(QueryError {
                    position: at,
                    message: format!("invalid TIME value '{value}'"),
                });
            }
            return Ok(Operand::Time(value.to_string()));
        }
        if self.keyword("DATE") {
            self.skip_ws();
            let at = self.pos;
            let value = self.take_while(|c| !c.is_whitespace());
            if !is_date(value) {
                return Err(QueryError {
                    position: at,
                    message: format!("invalid DATE value '{value}'"),
                });
            }
            return Ok(Operand::Date(value.to_string()));
        }
        let value = self.take_while(|c| !c.is_whitespace());
        if value.is_empty() {
            return Err(self.error("expected operand"));
        }
        if !is_number(value) {
            return Err(QueryError {
                position: start,
                message: format!("invalid operand '{value}'"),
            });
        }
        Ok(Operand::Number(value.to_string()))
    }

    /// Consume `word` if it appears next as a whole word.
    fn keyword(&mut self, word: &str) -> bool {
        let rest = self.rest();
        if !rest.starts_with(word) {
            return false;
        }
        let boundary = rest[word.len()..]
            .chars()
            .next()
            .map_or(true, char::is_whitespace);
        if boundary {
            self.pos += word.len();
        }
        boundary
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> &'a str {
        let src: &'a str = self.src;
        let rest = &src[self.pos..];
        let len = rest.find(|c: char| !pred(c)).unwrap_or(rest.len());
        self.pos += len;
        &rest[..len]
    }

    fn skip_ws(&mut self) {
        self.take_while(char::is_whitespace);
    }

    fn rest(&self) -> &'a str {
        let src: &'a str = self.src;
        &src[self.pos..]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.src.len()
    }

    fn error(&self, message: &str) -> QueryError {
        QueryError {
            position: self.pos,
            message: message.to_string(),
        }
    }
}

fn is_tag_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '\\' | '(' | ')' | '"' | '\'' | '=' | '<' | '>')
}

fn is_number(s: &str) -> bool {
    let digits = s.strip_prefix(['-', '+']).unwrap_or(s);
    let (int, frac) = match digits.split_once('.') {
        Some((int, frac)) => (int, Some(frac)),
        None => (digits, None),
    };
    !int.is_empty()
        && int.bytes().all(|b| b.is_ascii_digit())
        && frac.map_or(true, |f| f.bytes().all(|b| b.is_ascii_digit()))
}

fn all_digits(s: &str, len: usize) -> bool {
    s.len() == len && s.bytes().all(|b| b.is_ascii_digit())
}

/// `yyyy-mm-dd`
fn is_date(s: &str) -> bool {
    let mut parts = s.split('-');
    matches!(
        (parts.next(), parts.next(), parts.next(), parts.next()),
        (Some(y), Some(m), Some(d), None)
            if all_digits(y, 4) && all_digits(m, 2) && all_digits(d, 2)
    )
}

/// `yyyy-mm-ddThh:mm:ss[.frac](Z|±hh:mm)`
fn is_rfc3339(s: &str) -> bool {
    let Some((date, time)) = s.split_once('T') else {
        return false;
    };
    if !is_date(date) {
        return false;
    }
    let (clock, zone) = if let Some(clock) = time.strip_suffix('Z') {
        (clock, None)
    } else if let Some(idx) = time.rfind(['+', '-']) {
        (&time[..idx], Some(&time[idx + 1..]))
    } else {
        return false;
    };
    if let Some(zone) = zone {
        match zone.split_once(':') {
            Some((h, m)) if all_digits(h, 2) && all_digits(m, 2) => {}
            _ => return false,
        }
    }
    let (hms, frac) = match clock.split_once('.') {
        Some((hms, frac)) => (hms, Some(frac)),
        None => (clock, None),
    };
    if let Some(frac) = frac {
        if frac.is_empty() || !frac.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
    }
    let mut fields = hms.split(':');
    matches!(
        (fields.next(), fields.next(), fields.next(), fields.next()),
        (Some(h), Some(m), Some(s), None)
            if all_digits(h, 2) && all_digits(m, 2) && all_digits(s, 2)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tx_event_query() {
        let q = Query::parse("tm.event = 'Tx'").unwrap();
        assert_eq!(q, Query::txs());
        assert_eq!(q.to_string(), "tm.event = 'Tx'");
    }

    #[test]
    fn test_normalizes_whitespace() {
        let q = Query::parse("  tm.event='Tx'   AND  tx.height>=5 ").unwrap();
        assert_eq!(q.to_string(), "tm.event = 'Tx' AND tx.height >= 5");
        assert_eq!(q.conditions()[1].op, Operator::Ge);
    }

    #[test]
    fn test_all_operators() {
        let q = Query::parse(
            "a < 1 AND b <= 2.5 AND c > -3 AND d = 'x' AND e CONTAINS 'tbnb' AND f EXISTS",
        )
        .unwrap();
        let ops: Vec<_> = q.conditions().iter().map(|c| c.op).collect();
        assert_eq!(
            ops,
            vec![
                Operator::Lt,
                Operator::Le,
                Operator::Gt,
                Operator::Eq,
                Operator::Contains,
                Operator::Exists
            ]
        );
        assert_eq!(q.conditions()[5].operand, None);
    }

    #[test]
    fn test_time_and_date() {
        let q = Query::parse(
            "tx.time >= TIME 2013-05-03T14:45:00Z AND tx.date < DATE 2013-05-04",
        )
        .unwrap();
        assert_eq!(
            q.conditions()[0].operand,
            Some(Operand::Time("2013-05-03T14:45:00Z".to_string()))
        );
        assert_eq!(
            q.to_string(),
            "tx.time >= TIME 2013-05-03T14:45:00Z AND tx.date < DATE 2013-05-04"
        );
        assert!(Query::parse("t > TIME 2013-05-03T14:45:00.123+07:00").is_ok());
    }

    #[test]
    fn test_txs_to() {
        assert_eq!(
            Query::txs_to("tbnb1abc").to_string(),
            "tm.event = 'Tx' AND transfer.recipient = 'tbnb1abc'"
        );
    }

    #[test]
    fn test_errors_report_position() {
        let err = Query::parse("").unwrap_err();
        assert_eq!(err.position, 0);

        let err = Query::parse("tm.event 'Tx'").unwrap_err();
        assert_eq!(err.position, 9);
        assert_eq!(err.message, "expected operator");

        let err = Query::parse("tm.event = 'Tx").unwrap_err();
        assert_eq!(err.position, 11);
        assert_eq!(err.to_string(), "unterminated string at position 11");

        let err = Query::parse("a = 1 OR b = 2").unwrap_err();
        assert_eq!(err.message, "expected AND");
        assert_eq!(err.position, 6);
    }

    #[test]
    fn test_rejects_bad_operands() {
        assert!(Query::parse("a = abc").is_err());
        assert!(Query::parse("a CONTAINS 5").is_err());
        assert!(Query::parse("a > TIME yesterday").is_err());
        assert!(Query::parse("a > DATE 2013-5-4").is_err());
        assert!(Query::parse("a =").is_err());
        assert!(Query::parse("tm.event = 'Tx' AND").is_err());
    }

    #[test]
    fn test_keyword_needs_boundary() {
        // `ANDx` is not the AND keyword.
        assert!(Query::parse("a = 1 ANDx b = 2").is_err());
        let q: Query = "ANDROID EXISTS".parse().unwrap();
        assert_eq!(q.conditions()[0].tag, "ANDROID");
    }
}
