//! Declarative record filters.
//!
//! Odoo expresses record filters as "domains": a list of condition triples
//! with optional prefix operators (`&`, `|`, `!`) and an implicit AND between
//! remaining terms. The source configuration stores these as JSON arrays,
//! e.g. `[["ttype", "!=", "binary"], ["store", "=", true]]`.
//!
//! This module parses that list form once into a tagged expression tree and
//! evaluates it against JSON records. The grammar is closed: an unknown
//! operator is a parse error, and nothing is ever interpreted as code.

use std::fmt;

use serde_json::Value;

/// A comparison operator inside a domain condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    /// `=` — equality.
    Eq,
    /// `!=` — inequality.
    Ne,
    /// `in` — membership in a list operand.
    In,
    /// `not in` — absence from a list operand.
    NotIn,
    /// `like` — case-sensitive substring.
    Like,
    /// `ilike` — case-insensitive substring.
    Ilike,
    /// `>` — numeric or lexicographic greater-than.
    Gt,
    /// `>=` — greater-than-or-equal.
    Ge,
    /// `<` — less-than.
    Lt,
    /// `<=` — less-than-or-equal.
    Le,
}

impl CompareOp {
    fn parse(op: &str) -> Option<Self> {
        match op {
            "=" | "==" => Some(Self::Eq),
            "!=" | "<>" => Some(Self::Ne),
            "in" => Some(Self::In),
            "not in" => Some(Self::NotIn),
            "like" => Some(Self::Like),
            "ilike" => Some(Self::Ilike),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::Ge),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::Le),
            _ => None,
        }
    }

    const fn as_str(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Ne => "!=",
            Self::In => "in",
            Self::NotIn => "not in",
            Self::Like => "like",
            Self::Ilike => "ilike",
            Self::Gt => ">",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Le => "<=",
        }
    }
}

/// A single `[field, op, value]` condition.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
    /// The record field the condition reads.
    pub field: String,
    /// The comparison operator.
    pub op: CompareOp,
    /// The operand, as parsed from the domain list.
    pub value: Value,
}

/// A parsed domain expression.
#[derive(Debug, Clone, PartialEq)]
pub enum DomainExpr {
    /// All sub-expressions must hold.
    And(Vec<DomainExpr>),
    /// At least one sub-expression must hold.
    Or(Box<DomainExpr>, Box<DomainExpr>),
    /// The sub-expression must not hold.
    Not(Box<DomainExpr>),
    /// A leaf condition.
    Condition(Condition),
}

/// Errors raised while parsing a domain list.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParseError {
    /// The top-level value was not an array.
    #[error("Domain must be an array, got {0}")]
    NotAnArray(String),

    /// A prefix operator had too few operands.
    #[error("Operator '{0}' is missing operands")]
    MissingOperand(char),

    /// A term was neither a prefix operator nor a condition triple.
    #[error("Invalid domain term: {0}")]
    InvalidTerm(String),

    /// A condition used an operator outside the closed grammar.
    #[error("Unknown comparison operator '{0}'")]
    UnknownOperator(String),
}

impl DomainExpr {
    /// Parses the Odoo list form.
    ///
    /// An empty array parses to an expression that matches every record.
    ///
    /// # Errors
    ///
    /// Returns a [`ParseError`] when the value is not an array, a prefix
    /// operator lacks operands, a term is malformed, or an operator is not
    /// part of the grammar.
    pub fn parse(domain: &Value) -> Result<Self, ParseError> {
        let Value::Array(terms) = domain else {
            return Err(ParseError::NotAnArray(type_name(domain).to_string()));
        };

        let mut iter = terms.iter();
        let mut parsed = Vec::new();
        while iter.len() > 0 {
            parsed.push(Self::parse_term(&mut iter, '&')?);
        }

        if parsed.len() == 1 {
            Ok(parsed.remove(0))
        } else {
            Ok(Self::And(parsed))
        }
    }

    fn parse_term(
        iter: &mut std::slice::Iter<'_, Value>,
        context: char,
    ) -> Result<Self, ParseError> {
        let term = iter.next().ok_or(ParseError::MissingOperand(context))?;

        match term {
            Value::String(op) if op == "&" => Ok(Self::And(vec![
                Self::parse_term(iter, '&')?,
                Self::parse_term(iter, '&')?,
            ])),
            Value::String(op) if op == "|" => Ok(Self::Or(
                Box::new(Self::parse_term(iter, '|')?),
                Box::new(Self::parse_term(iter, '|')?),
            )),
            Value::String(op) if op == "!" => {
                Ok(Self::Not(Box::new(Self::parse_term(iter, '!')?)))
            }
            Value::Array(triple) => Self::parse_condition(triple),
            other => Err(ParseError::InvalidTerm(other.to_string())),
        }
    }

    fn parse_condition(triple: &[Value]) -> Result<Self, ParseError> {
        let [Value::String(field), Value::String(op), value] = triple else {
            return Err(ParseError::InvalidTerm(
                Value::Array(triple.to_vec()).to_string(),
            ));
        };

        let op = CompareOp::parse(op).ok_or_else(|| ParseError::UnknownOperator(op.clone()))?;

        Ok(Self::Condition(Condition {
            field: field.clone(),
            op,
            value: value.clone(),
        }))
    }

    /// Evaluates the expression against a JSON record.
    ///
    /// A field absent from the record compares as JSON `null`.
    #[must_use]
    pub fn matches(&self, record: &serde_json::Map<String, Value>) -> bool {
        match self {
            Self::And(terms) => terms.iter().all(|t| t.matches(record)),
            Self::Or(left, right) => left.matches(record) || right.matches(record),
            Self::Not(inner) => !inner.matches(record),
            Self::Condition(cond) => cond.matches(record),
        }
    }

    /// Number of leaf conditions in the expression.
    #[must_use]
    pub fn condition_count(&self) -> usize {
        match self {
            Self::And(terms) => terms.iter().map(Self::condition_count).sum(),
            Self::Or(left, right) => left.condition_count() + right.condition_count(),
            Self::Not(inner) => inner.condition_count(),
            Self::Condition(_) => 1,
        }
    }
}

impl Condition {
    fn matches(&self, record: &serde_json::Map<String, Value>) -> bool {
        let actual = record.get(&self.field).unwrap_or(&Value::Null);

        match self.op {
            CompareOp::Eq => actual == &self.value,
            CompareOp::Ne => actual != &self.value,
            CompareOp::In => self
                .value
                .as_array()
                .is_some_and(|list| list.contains(actual)),
            CompareOp::NotIn => self
                .value
                .as_array()
                .is_some_and(|list| !list.contains(actual)),
            CompareOp::Like => contains_substring(actual, &self.value, false),
            CompareOp::Ilike => contains_substring(actual, &self.value, true),
            CompareOp::Gt => compare(actual, &self.value).is_some_and(std::cmp::Ordering::is_gt),
            CompareOp::Ge => compare(actual, &self.value).is_some_and(std::cmp::Ordering::is_ge),
            CompareOp::Lt => compare(actual, &self.value).is_some_and(std::cmp::Ordering::is_lt),
            CompareOp::Le => compare(actual, &self.value).is_some_and(std::cmp::Ordering::is_le),
        }
    }
}

impl fmt::Display for Condition {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{} {} {}", self.field, self.op.as_str(), self.value)
    }
}

fn contains_substring(actual: &Value, pattern: &Value, case_insensitive: bool) -> bool {
    let (Value::String(haystack), Value::String(needle)) = (actual, pattern) else {
        return false;
    };
    if case_insensitive {
        haystack.to_lowercase().contains(&needle.to_lowercase())
    } else {
        haystack.contains(needle.as_str())
    }
}

fn compare(actual: &Value, operand: &Value) -> Option<std::cmp::Ordering> {
    match (actual, operand) {
        (Value::Number(a), Value::Number(b)) => a.as_f64().partial_cmp(&b.as_f64()),
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

const fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(value: Value) -> serde_json::Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn empty_domain_matches_everything() {
        let expr = DomainExpr::parse(&json!([])).unwrap();
        assert!(expr.matches(&record(json!({"name": "x"}))));
        assert_eq!(expr.condition_count(), 0);
    }

    #[test]
    fn implicit_and_between_terms() {
        let expr = DomainExpr::parse(&json!([
            ["ttype", "!=", "binary"],
            ["store", "=", true]
        ]))
        .unwrap();

        assert!(expr.matches(&record(json!({"ttype": "char", "store": true}))));
        assert!(!expr.matches(&record(json!({"ttype": "binary", "store": true}))));
        assert!(!expr.matches(&record(json!({"ttype": "char", "store": false}))));
        assert_eq!(expr.condition_count(), 2);
    }

    #[test]
    fn prefix_or_takes_two_operands() {
        let expr = DomainExpr::parse(&json!([
            "|",
            ["state", "=", "draft"],
            ["state", "=", "sent"],
            ["active", "=", true]
        ]))
        .unwrap();

        assert!(expr.matches(&record(json!({"state": "sent", "active": true}))));
        assert!(!expr.matches(&record(json!({"state": "done", "active": true}))));
        assert!(!expr.matches(&record(json!({"state": "draft", "active": false}))));
    }

    #[test]
    fn prefix_not_negates() {
        let expr = DomainExpr::parse(&json!(["!", ["name", "like", "x_"]])).unwrap();
        assert!(expr.matches(&record(json!({"name": "regular"}))));
        assert!(!expr.matches(&record(json!({"name": "x_custom"}))));
    }

    #[test]
    fn membership_operators() {
        let expr = DomainExpr::parse(&json!([
            ["ttype", "in", ["many2one", "one2many", "many2many"]]
        ]))
        .unwrap();
        assert!(expr.matches(&record(json!({"ttype": "many2one"}))));
        assert!(!expr.matches(&record(json!({"ttype": "char"}))));

        let expr = DomainExpr::parse(&json!([["ttype", "not in", ["binary"]]])).unwrap();
        assert!(expr.matches(&record(json!({"ttype": "char"}))));
        assert!(!expr.matches(&record(json!({"ttype": "binary"}))));
    }

    #[test]
    fn ilike_is_case_insensitive() {
        let expr = DomainExpr::parse(&json!([["name", "ilike", "credit"]])).unwrap();
        assert!(expr.matches(&record(json!({"name": "[rwx] Check Credit"}))));

        let expr = DomainExpr::parse(&json!([["name", "like", "credit"]])).unwrap();
        assert!(!expr.matches(&record(json!({"name": "[rwx] Check Credit"}))));
    }

    #[test]
    fn ordering_operators_compare_numbers() {
        let expr = DomainExpr::parse(&json!([["priority", ">=", 2]])).unwrap();
        assert!(expr.matches(&record(json!({"priority": 3}))));
        assert!(expr.matches(&record(json!({"priority": 2}))));
        assert!(!expr.matches(&record(json!({"priority": 1}))));
        // Type mismatch is simply no match, not an error.
        assert!(!expr.matches(&record(json!({"priority": "high"}))));
    }

    #[test]
    fn missing_field_compares_as_null() {
        let expr = DomainExpr::parse(&json!([["missing", "=", null]])).unwrap();
        assert!(expr.matches(&record(json!({}))));
    }

    #[test]
    fn unknown_operator_is_a_parse_error() {
        let err = DomainExpr::parse(&json!([["name", "=ilike", "x"]])).unwrap_err();
        assert_eq!(err, ParseError::UnknownOperator("=ilike".to_string()));
    }

    #[test]
    fn operator_without_operands_is_a_parse_error() {
        let err = DomainExpr::parse(&json!(["|", ["a", "=", 1]])).unwrap_err();
        assert_eq!(err, ParseError::MissingOperand('|'));
    }

    #[test]
    fn non_array_domain_is_a_parse_error() {
        let err = DomainExpr::parse(&json!("[('a','=',1)]")).unwrap_err();
        assert_eq!(err, ParseError::NotAnArray("string".to_string()));
    }

    #[test]
    fn condition_count_descends_into_operators() {
        let expr = DomainExpr::parse(&json!([
            "|",
            ["a", "=", 1],
            "!",
            ["b", "=", 2],
            ["c", "=", 3]
        ]))
        .unwrap();
        assert_eq!(expr.condition_count(), 3);
    }
}
