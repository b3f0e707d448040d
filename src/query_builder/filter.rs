use std::str::FromStr;

use serde_json::Value as JsonValue;

use crate::error::PeachySqlError;
use crate::types::{SqlParams, SqlValue};

use super::QueryBuilder;

/// Comparison operators accepted inside an operator map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    /// `=`, or `IN` for lists, or `IS NULL`
    Eq,
    /// `<>`, or `NOT IN` for lists, or `IS NOT NULL`
    Ne,
    /// `LIKE`
    Lk,
    /// `NOT LIKE`
    Nl,
    /// `>=`
    Ge,
    /// `>`
    Gt,
    /// `<=`
    Le,
    /// `<`
    Lt,
}

impl Operator {
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Ne => "ne",
            Operator::Lk => "lk",
            Operator::Nl => "nl",
            Operator::Ge => "ge",
            Operator::Gt => "gt",
            Operator::Le => "le",
            Operator::Lt => "lt",
        }
    }

    fn sql(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Ne => "<>",
            Operator::Lk => "LIKE",
            Operator::Nl => "NOT LIKE",
            Operator::Ge => ">=",
            Operator::Gt => ">",
            Operator::Le => "<=",
            Operator::Lt => "<",
        }
    }

    fn is_like(self) -> bool {
        matches!(self, Operator::Lk | Operator::Nl)
    }
}

impl FromStr for Operator {
    type Err = PeachySqlError;

    fn from_str(tag: &str) -> Result<Self, Self::Err> {
        match tag {
            "eq" => Ok(Operator::Eq),
            "ne" => Ok(Operator::Ne),
            "lk" => Ok(Operator::Lk),
            "nl" => Ok(Operator::Nl),
            "ge" => Ok(Operator::Ge),
            "gt" => Ok(Operator::Gt),
            "le" => Ok(Operator::Le),
            "lt" => Ok(Operator::Lt),
            other => Err(PeachySqlError::InvalidArgument(format!(
                "{other} is not a valid operator"
            ))),
        }
    }
}

/// Right-hand side of an operator: one value or a list.
#[derive(Debug, Clone, PartialEq)]
pub enum Operand {
    Value(SqlValue),
    List(Vec<SqlValue>),
}

impl Operand {
    pub fn value(value: impl Into<SqlValue>) -> Self {
        Operand::Value(value.into())
    }

    pub fn list<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        Operand::List(values.into_iter().map(Into::into).collect())
    }
}

/// What one column is compared against.
#[derive(Debug, Clone, PartialEq)]
pub enum Condition {
    /// Equality, or `IS NULL` for [`SqlValue::Null`]
    Value(SqlValue),
    /// `IN(...)`
    In(Vec<SqlValue>),
    /// Operator map, applied in order and AND-joined
    Ops(Vec<(Operator, Operand)>),
}

/// Ordered column → condition mapping rendered as an AND-joined `WHERE` body.
///
/// ```rust
/// use peachy_sql::prelude::*;
///
/// let filter = Filter::new()
///     .eq("status", "active")
///     .op("age", Operator::Ge, Operand::value(18))
///     .op("age", Operator::Lt, Operand::value(65));
/// # let _ = filter;
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Filter {
    conditions: Vec<(String, Condition)>,
}

impl Filter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Condition)> {
        self.conditions.iter().map(|(c, cond)| (c.as_str(), cond))
    }

    /// Set the condition for `column`, replacing any earlier one in place.
    #[must_use]
    pub fn condition(mut self, column: impl Into<String>, condition: Condition) -> Self {
        let column = column.into();
        match self.conditions.iter_mut().find(|(c, _)| *c == column) {
            Some(entry) => entry.1 = condition,
            None => self.conditions.push((column, condition)),
        }
        self
    }

    #[must_use]
    pub fn eq(self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.condition(column, Condition::Value(value.into()))
    }

    #[must_use]
    pub fn is_in<I, V>(self, column: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<SqlValue>,
    {
        self.condition(
            column,
            Condition::In(values.into_iter().map(Into::into).collect()),
        )
    }

    /// Add one operator to the column's operator map.
    #[must_use]
    pub fn op(mut self, column: impl Into<String>, op: Operator, operand: Operand) -> Self {
        let column = column.into();
        match self.conditions.iter_mut().find(|(c, _)| *c == column) {
            Some((_, Condition::Ops(ops))) => ops.push((op, operand)),
            Some(entry) => entry.1 = Condition::Ops(vec![(op, operand)]),
            None => self
                .conditions
                .push((column, Condition::Ops(vec![(op, operand)]))),
        }
        self
    }

    /// Parse the JSON form: an object of column → scalar | array | object of operator tags.
    ///
    /// ```rust
    /// use peachy_sql::prelude::*;
    ///
    /// let filter = Filter::from_json(&serde_json::json!({
    ///     "age": {"ge": 18, "lt": 65},
    ///     "role": ["admin", "owner"],
    ///     "deleted_at": null,
    /// }))?;
    /// # let _ = filter;
    /// # Ok::<(), PeachySqlError>(())
    /// ```
    ///
    /// # Errors
    /// Returns `PeachySqlError::InvalidArgument` for unknown operator tags or values that are
    /// not scalars where scalars are required.
    pub fn from_json(value: &JsonValue) -> Result<Self, PeachySqlError> {
        let JsonValue::Object(map) = value else {
            return Err(PeachySqlError::InvalidArgument(
                "Filter must be a JSON object".into(),
            ));
        };

        let mut filter = Filter::new();
        for (column, shape) in map {
            let condition = match shape {
                JsonValue::Array(items) => Condition::In(json_scalars(column, items)?),
                JsonValue::Object(ops) => {
                    let mut parsed = Vec::with_capacity(ops.len());
                    for (tag, operand) in ops {
                        let op: Operator = tag.parse()?;
                        let operand = match operand {
                            JsonValue::Array(items) => Operand::List(json_scalars(column, items)?),
                            other => Operand::Value(json_scalar(column, other)?),
                        };
                        parsed.push((op, operand));
                    }
                    Condition::Ops(parsed)
                }
                other => Condition::Value(json_scalar(column, other)?),
            };
            filter = filter.condition(column.clone(), condition);
        }
        Ok(filter)
    }
}

fn json_scalar(column: &str, value: &JsonValue) -> Result<SqlValue, PeachySqlError> {
    match value {
        JsonValue::Array(_) | JsonValue::Object(_) => Err(PeachySqlError::InvalidArgument(
            format!("Unexpected nested value for column {column}"),
        )),
        scalar => Ok(SqlValue::from(scalar.clone())),
    }
}

fn json_scalars(column: &str, items: &[JsonValue]) -> Result<Vec<SqlValue>, PeachySqlError> {
    items.iter().map(|item| json_scalar(column, item)).collect()
}

/// Render `filter` as a `WHERE` body (without the keyword).
pub(super) fn build_where(
    filter: &Filter,
    builder: &QueryBuilder<'_>,
) -> Result<SqlParams, PeachySqlError> {
    let mut clauses: Vec<String> = Vec::new();
    let mut params: Vec<SqlValue> = Vec::new();

    for (column, condition) in filter.iter() {
        builder.options().validate_column(column)?;
        let col = builder.escape(column)?;

        match condition {
            Condition::Value(value) => comparison(&col, Operator::Eq, value, &mut clauses, &mut params),
            Condition::In(values) => list_comparison(
                column,
                &col,
                Operator::Eq,
                values,
                &mut clauses,
                &mut params,
            )?,
            Condition::Ops(ops) => {
                if ops.is_empty() {
                    return Err(empty_conditions(column));
                }
                for (op, operand) in ops {
                    match operand {
                        Operand::Value(SqlValue::Null) if op.is_like() => {
                            return Err(PeachySqlError::InvalidArgument(format!(
                                "{} operator cannot be used with a null value for column {column}",
                                op.tag()
                            )));
                        }
                        Operand::Value(value) => {
                            comparison(&col, *op, value, &mut clauses, &mut params);
                        }
                        Operand::List(values) => list_comparison(
                            column,
                            &col,
                            *op,
                            values,
                            &mut clauses,
                            &mut params,
                        )?,
                    }
                }
            }
        }
    }

    Ok(SqlParams::new(clauses.join(" AND "), params))
}

fn empty_conditions(column: &str) -> PeachySqlError {
    PeachySqlError::InvalidArgument(format!("Filter conditions cannot be empty for column {column}"))
}

fn comparison(
    col: &str,
    op: Operator,
    value: &SqlValue,
    clauses: &mut Vec<String>,
    params: &mut Vec<SqlValue>,
) {
    match (op, value) {
        (Operator::Eq, SqlValue::Null) => clauses.push(format!("{col} IS NULL")),
        (Operator::Ne, SqlValue::Null) => clauses.push(format!("{col} IS NOT NULL")),
        _ => {
            clauses.push(format!("{col} {} ?", op.sql()));
            params.push(value.clone());
        }
    }
}

fn list_comparison(
    column: &str,
    col: &str,
    op: Operator,
    values: &[SqlValue],
    clauses: &mut Vec<String>,
    params: &mut Vec<SqlValue>,
) -> Result<(), PeachySqlError> {
    if values.is_empty() {
        return Err(empty_conditions(column));
    }

    match op {
        Operator::Eq | Operator::Ne => {
            let keyword = if op == Operator::Eq { "IN" } else { "NOT IN" };
            let placeholders = vec!["?"; values.len()].join(",");
            clauses.push(format!("{col} {keyword}({placeholders})"));
            params.extend(values.iter().cloned());
        }
        // LIKE has no list form: one clause per pattern.
        Operator::Lk | Operator::Nl => {
            for value in values {
                if value.is_null() {
                    return Err(PeachySqlError::InvalidArgument(format!(
                        "{} operator cannot be used with a null value for column {column}",
                        op.tag()
                    )));
                }
                clauses.push(format!("{col} {} ?", op.sql()));
                params.push(value.clone());
            }
        }
        Operator::Ge | Operator::Gt | Operator::Le | Operator::Lt => {
            return Err(PeachySqlError::InvalidArgument(format!(
                "{} operator cannot be used with an array for column {column}",
                op.tag()
            )));
        }
    }
    Ok(())
}
