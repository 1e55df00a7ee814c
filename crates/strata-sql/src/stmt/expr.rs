//! Boolean expression trees.
//!
//! Expressions appear in WHERE, HAVING, and join conditions. They serve
//! two purposes: read-time evaluation against rows, and join
//! compilation: finding the *joint column* of a data source that an
//! equality condition binds, so the join can seek instead of scanning.

use std::collections::HashMap;

use crate::error::{SqlError, SqlResult};
use crate::reader::Row;
use crate::value::Value;

use super::SelectStmt;

/// Comparison operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    /// `=`
    Eq,
    /// `<>`
    Ne,
    /// `<`
    Lt,
    /// `<=`
    Le,
    /// `>`
    Gt,
    /// `>=`
    Ge,
}

/// Logical connective.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    /// `AND`
    And,
    /// `OR`
    Or,
}

/// A column reference: optional database, optional table, mandatory
/// column, optional output alias.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColSelector {
    /// Database name; defaults to the implicit database.
    pub db: Option<String>,
    /// Table name; unqualified references resolve by column name.
    pub table: Option<String>,
    /// Column name.
    pub col: String,
    /// Output alias.
    pub alias: Option<String>,
}

impl ColSelector {
    /// Creates an unqualified column reference.
    #[must_use]
    pub fn new(col: impl Into<String>) -> Self {
        Self {
            db: None,
            table: None,
            col: col.into(),
            alias: None,
        }
    }

    /// Creates a table-qualified column reference.
    #[must_use]
    pub fn with_table(table: impl Into<String>, col: impl Into<String>) -> Self {
        Self {
            db: None,
            table: Some(table.into()),
            col: col.into(),
            alias: None,
        }
    }

    /// Returns true if this selector binds to the target column: the
    /// column names match and any db/table qualifiers agree.
    #[must_use]
    pub fn binds_to(&self, target: &JointTarget<'_>) -> bool {
        if let Some(db) = &self.db {
            if db != target.db {
                return false;
            }
        }
        if let Some(table) = &self.table {
            if table != target.table {
                return false;
            }
        }
        self.col == target.col
    }

    fn same_column(&self, other: &Self) -> bool {
        self.db == other.db && self.table == other.table && self.col == other.col
    }
}

/// The fully-named column a join condition is matched against.
#[derive(Debug, Clone, Copy)]
pub struct JointTarget<'a> {
    /// Database name of the join target.
    pub db: &'a str,
    /// Table name of the join target.
    pub table: &'a str,
    /// Candidate column name.
    pub col: &'a str,
}

/// Context for read-time expression evaluation.
#[derive(Debug, Clone, Default)]
pub struct EvalContext {
    /// The engine's implicit database at query start.
    pub implicit_db: Option<String>,
    /// Bound named parameters.
    pub params: HashMap<String, Value>,
    /// Query-start timestamp (microseconds since epoch), the value of
    /// `NOW()`.
    pub query_time: i64,
}

/// A boolean expression tree.
#[derive(Debug, Clone, PartialEq)]
pub enum BoolExp {
    /// A literal, placeholder, or system function.
    Const(Value),
    /// A column reference.
    Col(ColSelector),
    /// Logical negation.
    Not(Box<BoolExp>),
    /// `LIKE` pattern match (`%` and `_` wildcards).
    Like {
        /// The matched column.
        sel: ColSelector,
        /// The pattern.
        pattern: String,
    },
    /// Comparison of two operands.
    Cmp {
        /// Comparison operator.
        op: CmpOp,
        /// Left operand.
        left: Box<BoolExp>,
        /// Right operand.
        right: Box<BoolExp>,
    },
    /// Logical connective of two sub-expressions.
    Bin {
        /// Connective.
        op: LogicOp,
        /// Left sub-expression.
        left: Box<BoolExp>,
        /// Right sub-expression.
        right: Box<BoolExp>,
    },
    /// `EXISTS (sub-query)`. Accepted and forwarded, not evaluated.
    Exists(Box<SelectStmt>),
}

impl BoolExp {
    /// Builds an equality comparison between a column and a value.
    #[must_use]
    pub fn eq(sel: ColSelector, value: Value) -> Self {
        BoolExp::Cmp {
            op: CmpOp::Eq,
            left: Box::new(BoolExp::Col(sel)),
            right: Box::new(BoolExp::Const(value)),
        }
    }

    /// Finds the selector this expression equates with the target
    /// column, if any.
    ///
    /// Returns the *opposite* side of the matching equality: the
    /// expression whose value, taken from the outer row, becomes the
    /// seek key into the join target. `Ok(None)` means the expression
    /// does not reference the target column; `InvalidJointColumn` means
    /// it binds it inconsistently.
    pub fn joint_column_to(&self, target: &JointTarget<'_>) -> SqlResult<Option<ColSelector>> {
        match self {
            BoolExp::Const(_) | BoolExp::Like { .. } | BoolExp::Exists(_) => Ok(None),
            BoolExp::Col(sel) => Ok(sel.binds_to(target).then(|| sel.clone())),
            BoolExp::Not(exp) => exp.joint_column_to(target),
            BoolExp::Cmp { op, left, right } => {
                if *op != CmpOp::Eq {
                    return Ok(None);
                }
                let (BoolExp::Col(l), BoolExp::Col(r)) = (left.as_ref(), right.as_ref()) else {
                    return Ok(None);
                };
                match (l.binds_to(target), r.binds_to(target)) {
                    (true, true) => Err(SqlError::InvalidJointColumn),
                    (true, false) => Ok(Some(r.clone())),
                    (false, true) => Ok(Some(l.clone())),
                    (false, false) => Ok(None),
                }
            }
            BoolExp::Bin { left, right, .. } => {
                let jl = left.joint_column_to(target)?;
                let jr = right.joint_column_to(target)?;
                match (jl, jr) {
                    (Some(a), Some(b)) if !a.same_column(&b) => Err(SqlError::InvalidJointColumn),
                    (Some(a), _) => Ok(Some(a)),
                    (None, Some(b)) => Ok(Some(b)),
                    (None, None) => Ok(None),
                }
            }
        }
    }

    /// Evaluates the expression against a row.
    pub fn eval(&self, row: &Row, ctx: &EvalContext) -> SqlResult<bool> {
        match self {
            BoolExp::Const(value) => expect_bool(&resolve_value(value, ctx)?),
            BoolExp::Col(sel) => expect_bool(row.value_for(sel, ctx.implicit_db.as_deref())?),
            BoolExp::Not(exp) => Ok(!exp.eval(row, ctx)?),
            BoolExp::Like { sel, pattern } => {
                let value = row.value_for(sel, ctx.implicit_db.as_deref())?;
                match value {
                    Value::Str(s) => Ok(like_match(s, pattern)),
                    other => Err(SqlError::TypeMismatch {
                        expected: "STRING",
                        actual: other.type_name(),
                    }),
                }
            }
            BoolExp::Cmp { op, left, right } => {
                let lv = left.eval_value(row, ctx)?;
                let rv = right.eval_value(row, ctx)?;
                let ord = lv.compare(&rv).ok_or(SqlError::TypeMismatch {
                    expected: lv.type_name(),
                    actual: rv.type_name(),
                })?;
                Ok(match op {
                    CmpOp::Eq => ord.is_eq(),
                    CmpOp::Ne => ord.is_ne(),
                    CmpOp::Lt => ord.is_lt(),
                    CmpOp::Le => ord.is_le(),
                    CmpOp::Gt => ord.is_gt(),
                    CmpOp::Ge => ord.is_ge(),
                })
            }
            BoolExp::Bin { op, left, right } => {
                let l = left.eval(row, ctx)?;
                match (op, l) {
                    (LogicOp::And, false) => Ok(false),
                    (LogicOp::Or, true) => Ok(true),
                    _ => right.eval(row, ctx),
                }
            }
            BoolExp::Exists(_) => Err(SqlError::NotYetSupported {
                operation: "EXISTS",
            }),
        }
    }

    fn eval_value(&self, row: &Row, ctx: &EvalContext) -> SqlResult<Value> {
        match self {
            BoolExp::Const(value) => resolve_value(value, ctx),
            BoolExp::Col(sel) => Ok(row.value_for(sel, ctx.implicit_db.as_deref())?.clone()),
            _ => Err(SqlError::IllegalArguments),
        }
    }
}

/// Resolves placeholders and system functions into literal values.
pub fn resolve_value(value: &Value, ctx: &EvalContext) -> SqlResult<Value> {
    match value {
        Value::Param(name) => ctx
            .params
            .get(name)
            .cloned()
            .ok_or_else(|| SqlError::UnboundParameter { name: name.clone() }),
        Value::SysFn(name) if name == "NOW" => Ok(Value::Timestamp(ctx.query_time)),
        Value::SysFn(_) => Err(SqlError::NotYetSupported {
            operation: "system function",
        }),
        literal => Ok(literal.clone()),
    }
}

fn expect_bool(value: &Value) -> SqlResult<bool> {
    match value {
        Value::Bool(b) => Ok(*b),
        other => Err(SqlError::TypeMismatch {
            expected: "BOOLEAN",
            actual: other.type_name(),
        }),
    }
}

/// SQL LIKE matching: `%` matches any run, `_` any single character.
fn like_match(value: &str, pattern: &str) -> bool {
    fn matches(v: &[char], p: &[char]) -> bool {
        match p.split_first() {
            None => v.is_empty(),
            Some(('%', rest)) => (0..=v.len()).any(|i| matches(&v[i..], rest)),
            Some(('_', rest)) => v.split_first().is_some_and(|(_, tail)| matches(tail, rest)),
            Some((c, rest)) => v
                .split_first()
                .is_some_and(|(head, tail)| head == c && matches(tail, rest)),
        }
    }
    let value: Vec<char> = value.chars().collect();
    let pattern: Vec<char> = pattern.chars().collect();
    matches(&value, &pattern)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target<'a>() -> JointTarget<'a> {
        JointTarget {
            db: "db1",
            table: "orders",
            col: "user_id",
        }
    }

    fn col(table: &str, name: &str) -> ColSelector {
        ColSelector::with_table(table, name)
    }

    #[test]
    fn test_like_match() {
        assert!(like_match("hello", "hello"));
        assert!(like_match("hello", "h%"));
        assert!(like_match("hello", "%llo"));
        assert!(like_match("hello", "h_llo"));
        assert!(like_match("hello", "%"));
        assert!(!like_match("hello", "h_o"));
        assert!(!like_match("hello", "world"));
        assert!(like_match("", "%"));
        assert!(!like_match("", "_"));
    }

    #[test]
    fn test_value_nodes_have_no_joint_column() {
        let exp = BoolExp::Const(Value::Number(1));
        assert!(exp.joint_column_to(&target()).unwrap().is_none());

        let exp = BoolExp::Like {
            sel: col("orders", "user_id"),
            pattern: "%".into(),
        };
        assert!(exp.joint_column_to(&target()).unwrap().is_none());
    }

    #[test]
    fn test_eq_comparison_yields_opposite_side() {
        // users.id = orders.user_id, probed for orders.user_id: the
        // seek expression is users.id.
        let exp = BoolExp::Cmp {
            op: CmpOp::Eq,
            left: Box::new(BoolExp::Col(col("users", "id"))),
            right: Box::new(BoolExp::Col(col("orders", "user_id"))),
        };
        let joint = exp.joint_column_to(&target()).unwrap().unwrap();
        assert_eq!(joint.table.as_deref(), Some("users"));
        assert_eq!(joint.col, "id");
    }

    #[test]
    fn test_non_eq_comparison_has_no_joint_column() {
        let exp = BoolExp::Cmp {
            op: CmpOp::Lt,
            left: Box::new(BoolExp::Col(col("users", "id"))),
            right: Box::new(BoolExp::Col(col("orders", "user_id"))),
        };
        assert!(exp.joint_column_to(&target()).unwrap().is_none());
    }

    #[test]
    fn test_both_sides_binding_is_invalid() {
        let exp = BoolExp::Cmp {
            op: CmpOp::Eq,
            left: Box::new(BoolExp::Col(col("orders", "user_id"))),
            right: Box::new(BoolExp::Col(ColSelector::new("user_id"))),
        };
        assert!(matches!(
            exp.joint_column_to(&target()),
            Err(SqlError::InvalidJointColumn)
        ));
    }

    #[test]
    fn test_and_combines_consistent_sides() {
        let eq = BoolExp::Cmp {
            op: CmpOp::Eq,
            left: Box::new(BoolExp::Col(col("users", "id"))),
            right: Box::new(BoolExp::Col(col("orders", "user_id"))),
        };
        let exp = BoolExp::Bin {
            op: LogicOp::And,
            left: Box::new(eq.clone()),
            right: Box::new(BoolExp::Const(Value::Bool(true))),
        };
        let joint = exp.joint_column_to(&target()).unwrap().unwrap();
        assert_eq!(joint.col, "id");

        // Conflicting joint columns on the two sides are invalid.
        let other = BoolExp::Cmp {
            op: CmpOp::Eq,
            left: Box::new(BoolExp::Col(col("users", "age"))),
            right: Box::new(BoolExp::Col(col("orders", "user_id"))),
        };
        let exp = BoolExp::Bin {
            op: LogicOp::And,
            left: Box::new(eq),
            right: Box::new(other),
        };
        assert!(matches!(
            exp.joint_column_to(&target()),
            Err(SqlError::InvalidJointColumn)
        ));
    }

    #[test]
    fn test_eval_comparisons() {
        let mut row = Row::new();
        row.insert("db1.t.id", Value::Number(5));
        row.insert("db1.t.name", Value::Str("alice".into()));
        let ctx = EvalContext {
            implicit_db: Some("db1".into()),
            ..Default::default()
        };

        let exp = BoolExp::eq(ColSelector::new("id"), Value::Number(5));
        assert!(exp.eval(&row, &ctx).unwrap());

        let exp = BoolExp::Cmp {
            op: CmpOp::Gt,
            left: Box::new(BoolExp::Col(ColSelector::new("id"))),
            right: Box::new(BoolExp::Const(Value::Number(9))),
        };
        assert!(!exp.eval(&row, &ctx).unwrap());

        let exp = BoolExp::Like {
            sel: ColSelector::new("name"),
            pattern: "a%".into(),
        };
        assert!(exp.eval(&row, &ctx).unwrap());
    }

    #[test]
    fn test_eval_logic_and_not() {
        let mut row = Row::new();
        row.insert("db1.t.id", Value::Number(5));
        let ctx = EvalContext {
            implicit_db: Some("db1".into()),
            ..Default::default()
        };

        let t = BoolExp::Const(Value::Bool(true));
        let f = BoolExp::Const(Value::Bool(false));

        let and = BoolExp::Bin {
            op: LogicOp::And,
            left: Box::new(t.clone()),
            right: Box::new(f.clone()),
        };
        assert!(!and.eval(&row, &ctx).unwrap());

        let or = BoolExp::Bin {
            op: LogicOp::Or,
            left: Box::new(f),
            right: Box::new(t),
        };
        assert!(or.eval(&row, &ctx).unwrap());

        let not = BoolExp::Not(Box::new(or));
        assert!(!not.eval(&row, &ctx).unwrap());
    }

    #[test]
    fn test_eval_params_and_sysfn() {
        let mut row = Row::new();
        row.insert("db1.t.id", Value::Number(5));
        let mut ctx = EvalContext {
            implicit_db: Some("db1".into()),
            query_time: 1_000,
            ..Default::default()
        };

        let exp = BoolExp::eq(ColSelector::new("id"), Value::Param("id".into()));
        assert!(matches!(
            exp.eval(&row, &ctx),
            Err(SqlError::UnboundParameter { .. })
        ));

        ctx.params.insert("id".into(), Value::Number(5));
        assert!(exp.eval(&row, &ctx).unwrap());

        let now = resolve_value(&Value::SysFn("NOW".into()), &ctx).unwrap();
        assert_eq!(now, Value::Timestamp(1_000));
    }
}
