//! 条件评估器
//!
//! 实现比较操作符在各类型值上的语义。跨类型比较一律视为类型不匹配，
//! 排序操作符只对数值和字符串有定义。

use crate::ast::Literal;
use crate::operators::Operator;
use serde_json::{Map, Value};
use std::cmp::Ordering;

/// 比较一侧解析后的值
///
/// 借用数据记录或语法树中的字面量，评估过程不复制数据。
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Scalar<'a> {
    Null,
    Bool(bool),
    /// 数据记录中的整数，保持精确值
    Integer(i128),
    Number(f64),
    String(&'a str),
    Array(&'a [Value]),
    Object(&'a Map<String, Value>),
}

impl<'a> Scalar<'a> {
    pub fn from_json(value: &'a Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => match (n.as_i64(), n.as_u64()) {
                (Some(i), _) => Self::Integer(i128::from(i)),
                (None, Some(u)) => Self::Integer(i128::from(u)),
                (None, None) => Self::Number(n.as_f64().unwrap_or(f64::NAN)),
            },
            Value::String(s) => Self::String(s),
            Value::Array(arr) => Self::Array(arr),
            Value::Object(obj) => Self::Object(obj),
        }
    }

    pub fn from_literal(literal: &'a Literal) -> Self {
        match literal {
            Literal::Bool(b) => Self::Bool(*b),
            Literal::Number(n) => Self::Number(*n),
            Literal::String(s) => Self::String(s),
        }
    }

    /// 获取值的类型名称
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Integer(_) | Self::Number(_) => "number",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
        }
    }
}

/// 比较两侧类型不兼容
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TypeConflict {
    pub expected: &'static str,
    pub actual: &'static str,
}

/// 条件评估器
pub struct ConditionEvaluator;

impl ConditionEvaluator {
    /// 评估比较
    ///
    /// # Arguments
    /// * `operator` - 比较操作符
    /// * `left` - 左侧解析后的值
    /// * `right` - 右侧解析后的值
    pub fn evaluate(
        operator: Operator,
        left: &Scalar<'_>,
        right: &Scalar<'_>,
    ) -> Result<bool, TypeConflict> {
        match (left, right) {
            (
                Scalar::Integer(_) | Scalar::Number(_),
                Scalar::Integer(_) | Scalar::Number(_),
            ) => Ok(match Self::numeric_ordering(left, right) {
                Some(ordering) => Self::apply(operator, ordering),
                // NaN 与任何值都不相等也不可排序
                None => operator == Operator::Neq,
            }),
            (Scalar::String(a), Scalar::String(b)) => Ok(Self::apply(operator, a.cmp(b))),
            (Scalar::Bool(a), Scalar::Bool(b)) => Self::equality(operator, left, a == b),
            (Scalar::Null, Scalar::Null) => Self::equality(operator, left, true),
            (Scalar::Array(a), Scalar::Array(b)) => Self::equality(operator, left, a == b),
            (Scalar::Object(a), Scalar::Object(b)) => Self::equality(operator, left, a == b),
            _ => Err(TypeConflict {
                expected: left.type_name(),
                actual: right.type_name(),
            }),
        }
    }

    /// 数值排序；`==` 与 `<`/`>` 基于同一个排序结果，三者互斥
    fn numeric_ordering(left: &Scalar<'_>, right: &Scalar<'_>) -> Option<Ordering> {
        match (*left, *right) {
            (Scalar::Integer(a), Scalar::Integer(b)) => Some(a.cmp(&b)),
            (Scalar::Integer(a), Scalar::Number(b)) => Self::integer_float_ordering(a, b),
            (Scalar::Number(a), Scalar::Integer(b)) => {
                Self::integer_float_ordering(b, a).map(Ordering::reverse)
            }
            (Scalar::Number(a), Scalar::Number(b)) => a.partial_cmp(&b),
            _ => None,
        }
    }

    /// 整数与浮点比较；浮点值为整数时按整数精确比较（100 == 100.0）
    fn integer_float_ordering(integer: i128, float: f64) -> Option<Ordering> {
        if float.is_nan() {
            return None;
        }
        if float.fract() == 0.0 && float.abs() < 1e38 {
            return Some(integer.cmp(&(float as i128)));
        }
        (integer as f64).partial_cmp(&float)
    }

    fn apply(operator: Operator, ordering: Ordering) -> bool {
        match operator {
            Operator::Eq => ordering == Ordering::Equal,
            Operator::Neq => ordering != Ordering::Equal,
            Operator::Gt => ordering == Ordering::Greater,
            Operator::Gte => ordering != Ordering::Less,
            Operator::Lt => ordering == Ordering::Less,
            Operator::Lte => ordering != Ordering::Greater,
        }
    }

    /// 只支持 `==`/`!=` 的类型
    fn equality(operator: Operator, operand: &Scalar<'_>, equal: bool) -> Result<bool, TypeConflict> {
        if operator.is_ordering() {
            return Err(TypeConflict {
                expected: "number or string",
                actual: operand.type_name(),
            });
        }
        Ok(if operator == Operator::Eq { equal } else { !equal })
    }
}
