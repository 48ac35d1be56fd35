//! SQL fragments and filter expressions.

use crate::error::{Error, Result};
use crate::orm::value::Value;
use std::fmt;
use std::str::FromStr;

/// Kind of clause a [`Statement`] renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClauseKind {
    Select,
    Where,
    Order,
    Limit,
    Offset,
    CreateTable,
    Insert,
    Update,
    Delete,
}

/// An immutable SQL fragment with its bound parameters
#[derive(Debug, Clone, PartialEq)]
pub struct Statement {
    kind: ClauseKind,
    sql: String,
    params: Vec<Value>,
}

impl Statement {
    pub fn new(kind: ClauseKind, sql: impl Into<String>, params: Vec<Value>) -> Self {
        Statement {
            kind,
            sql: sql.into(),
            params,
        }
    }

    pub fn kind(&self) -> ClauseKind {
        self.kind
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    /// A final statement stands alone and takes no trailing clauses.
    pub fn is_final(&self) -> bool {
        matches!(
            self.kind,
            ClauseKind::CreateTable | ClauseKind::Insert | ClauseKind::Update | ClauseKind::Delete
        )
    }
}

/// Comparison operator of a filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predicate {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Like,
    Is,
    IsNot,
}

impl Predicate {
    pub fn as_str(&self) -> &'static str {
        match self {
            Predicate::Eq => "=",
            Predicate::NotEq => "!=",
            Predicate::Lt => "<",
            Predicate::LtEq => "<=",
            Predicate::Gt => ">",
            Predicate::GtEq => ">=",
            Predicate::Like => "LIKE",
            Predicate::Is => "IS",
            Predicate::IsNot => "IS NOT",
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Predicate {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let normalized = s.split_whitespace().collect::<Vec<_>>().join(" ");
        match normalized.to_uppercase().as_str() {
            "=" | "==" => Ok(Predicate::Eq),
            "!=" | "<>" => Ok(Predicate::NotEq),
            "<" => Ok(Predicate::Lt),
            "<=" => Ok(Predicate::LtEq),
            ">" => Ok(Predicate::Gt),
            ">=" => Ok(Predicate::GtEq),
            "LIKE" => Ok(Predicate::Like),
            "IS" => Ok(Predicate::Is),
            "IS NOT" => Ok(Predicate::IsNot),
            _ => Err(Error::Syntax(format!("Unexpected predicate {s}"))),
        }
    }
}

/// Sort direction of an `ORDER BY` term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

impl FromStr for Direction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "ASC" => Ok(Direction::Asc),
            "DESC" => Ok(Direction::Desc),
            _ => Err(Error::Syntax(format!("Unexpected ORDER type {s}"))),
        }
    }
}

/// Filter expression, combined left to right in call order
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    Compare {
        column: String,
        predicate: Predicate,
        value: Value,
    },
    And(Box<Condition>, Box<Condition>),
    Or(Box<Condition>, Box<Condition>),
}

impl Condition {
    /// A NULL operand always compares with `IS`, whatever predicate was
    /// given; a `LIKE` operand is wrapped in `%` wildcards.
    pub fn compare(column: impl Into<String>, predicate: Predicate, value: Value) -> Self {
        let predicate = match (&value, predicate) {
            (Value::Null, _) => Predicate::Is,
            (_, p) => p,
        };
        let value = match (predicate, value) {
            (Predicate::Like, Value::Text(term)) => Value::Text(format!("%{term}%")),
            (Predicate::Like, other) => Value::Text(format!("%{other}%")),
            (_, other) => other,
        };
        Condition::Compare {
            column: column.into(),
            predicate,
            value,
        }
    }

    pub fn and(self, other: Condition) -> Self {
        Condition::And(Box::new(self), Box::new(other))
    }

    pub fn or(self, other: Condition) -> Self {
        Condition::Or(Box::new(self), Box::new(other))
    }

    /// Append the expression (without `WHERE`) and its parameters.
    pub fn render(&self, sql: &mut String, params: &mut Vec<Value>) {
        match self {
            Condition::Compare {
                column,
                predicate,
                value,
            } => {
                sql.push_str(&format!("\"{column}\" {predicate} ?"));
                params.push(value.clone());
            }
            Condition::And(left, right) => {
                left.render_operand_of_and(sql, params);
                sql.push_str(" AND ");
                right.render_operand_of_and(sql, params);
            }
            Condition::Or(left, right) => {
                left.render(sql, params);
                sql.push_str(" OR ");
                right.render(sql, params);
            }
        }
    }

    fn render_operand_of_and(&self, sql: &mut String, params: &mut Vec<Value>) {
        if matches!(self, Condition::Or(..)) {
            sql.push('(');
            self.render(sql, params);
            sql.push(')');
        } else {
            self.render(sql, params);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(condition: &Condition) -> (String, Vec<Value>) {
        let mut sql = String::new();
        let mut params = Vec::new();
        condition.render(&mut sql, &mut params);
        (sql, params)
    }

    #[test]
    fn test_final_statements() {
        assert!(Statement::new(ClauseKind::Insert, "INSERT", vec![]).is_final());
        assert!(Statement::new(ClauseKind::CreateTable, "CREATE", vec![]).is_final());
        assert!(!Statement::new(ClauseKind::Select, "SELECT", vec![]).is_final());
        assert!(!Statement::new(ClauseKind::Limit, "LIMIT ?", vec![]).is_final());
    }

    #[test]
    fn test_null_forces_is() {
        let condition = Condition::compare("desc", Predicate::Eq, Value::Null);
        assert_eq!(render(&condition).0, "\"desc\" IS ?");

        let condition = Condition::compare("desc", Predicate::IsNot, Value::Null);
        let (sql, params) = render(&condition);
        assert_eq!(sql, "\"desc\" IS ?");
        assert_eq!(params, [Value::Null]);

        let condition = Condition::compare("desc", Predicate::Like, Value::Null);
        assert_eq!(render(&condition).0, "\"desc\" IS ?");
    }

    #[test]
    fn test_like_wraps_wildcards() {
        let condition = Condition::compare("body", Predicate::Like, Value::from("milk"));
        let (sql, params) = render(&condition);
        assert_eq!(sql, "\"body\" LIKE ?");
        assert_eq!(params, [Value::from("%milk%")]);
    }

    #[test]
    fn test_chain_rendering() {
        let a = Condition::compare("a", Predicate::Eq, Value::Integer(1));
        let b = Condition::compare("b", Predicate::Eq, Value::Integer(2));
        let c = Condition::compare("c", Predicate::Eq, Value::Integer(3));

        let (sql, params) = render(&a.clone().and(b.clone()).or(c.clone()));
        assert_eq!(sql, "\"a\" = ? AND \"b\" = ? OR \"c\" = ?");
        assert_eq!(params.len(), 3);

        let (sql, _) = render(&a.or(b).and(c));
        assert_eq!(sql, "(\"a\" = ? OR \"b\" = ?) AND \"c\" = ?");
    }

    #[test]
    fn test_parse_tokens() {
        assert_eq!("=".parse::<Predicate>().unwrap(), Predicate::Eq);
        assert_eq!("like".parse::<Predicate>().unwrap(), Predicate::Like);
        assert_eq!("IS  NOT".parse::<Predicate>().unwrap(), Predicate::IsNot);
        assert!(matches!("~".parse::<Predicate>(), Err(Error::Syntax(_))));

        assert_eq!("DESC".parse::<Direction>().unwrap(), Direction::Desc);
        assert!(matches!(
            "SIDEWAYS".parse::<Direction>(),
            Err(Error::Syntax(_))
        ));
    }
}
