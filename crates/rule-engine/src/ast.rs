//! 表达式语法树
//!
//! 解析器产出、组合器与评估器共享的不可变数据结构。树一旦构建就不再修改，
//! 组合只会构造新树，存储中的树通过 `Arc` 共享。

use crate::operators::{LogicalOperator, Operator};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 字面量
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Bool(bool),
    Number(f64),
    String(String),
}

impl Literal {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Number(_) => "number",
            Self::String(_) => "string",
        }
    }
}

impl From<bool> for Literal {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Literal {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i64> for Literal {
    fn from(value: i64) -> Self {
        Self::Number(value as f64)
    }
}

impl From<&str> for Literal {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Literal {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

/// 表达式节点
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Expression {
    Literal { value: Literal },
    /// 点号分隔的字段路径，如 `user.profile.age`
    Field { path: String },
    Comparison(Comparison),
    Logical(LogicalGroup),
}

/// 比较节点，两侧为字面量或字段引用
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub operator: Operator,
    pub left: Box<Expression>,
    pub right: Box<Expression>,
}

/// 逻辑组节点；`AND`/`OR` 至少两个子节点，`NOT` 恰好一个
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogicalGroup {
    pub operator: LogicalOperator,
    pub children: Vec<Expression>,
}

impl Expression {
    pub fn literal(value: impl Into<Literal>) -> Self {
        Self::Literal {
            value: value.into(),
        }
    }

    pub fn field(path: impl Into<String>) -> Self {
        Self::Field { path: path.into() }
    }

    pub fn compare(operator: Operator, left: Expression, right: Expression) -> Self {
        Self::Comparison(Comparison {
            operator,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    pub fn logical(operator: LogicalOperator, children: Vec<Expression>) -> Self {
        Self::Logical(LogicalGroup { operator, children })
    }

    pub fn and(children: Vec<Expression>) -> Self {
        Self::logical(LogicalOperator::And, children)
    }

    pub fn or(children: Vec<Expression>) -> Self {
        Self::logical(LogicalOperator::Or, children)
    }

    pub fn not(child: Expression) -> Self {
        Self::logical(LogicalOperator::Not, vec![child])
    }

    /// 该节点能否出现在需要布尔值的位置
    pub fn is_predicate(&self) -> bool {
        match self {
            Self::Literal { value } => matches!(value, Literal::Bool(_)),
            Self::Field { .. } => false,
            Self::Comparison(_) | Self::Logical(_) => true,
        }
    }

    /// 表达式引用的所有字段路径
    pub fn fields(&self) -> BTreeSet<&str> {
        let mut fields = BTreeSet::new();
        self.collect_fields(&mut fields);
        fields
    }

    fn collect_fields<'a>(&'a self, fields: &mut BTreeSet<&'a str>) {
        match self {
            Self::Literal { .. } => {}
            Self::Field { path } => {
                fields.insert(path.as_str());
            }
            Self::Comparison(cmp) => {
                cmp.left.collect_fields(fields);
                cmp.right.collect_fields(fields);
            }
            Self::Logical(group) => {
                for child in &group.children {
                    child.collect_fields(fields);
                }
            }
        }
    }

    /// 逻辑连接词数量（`a AND b AND c` 计 2），用作组合排序的代价
    pub fn connective_count(&self) -> usize {
        match self {
            Self::Literal { .. } | Self::Field { .. } | Self::Comparison(_) => 0,
            Self::Logical(group) => {
                let own = match group.operator {
                    LogicalOperator::Not => 0,
                    _ => group.children.len().saturating_sub(1),
                };
                own + group
                    .children
                    .iter()
                    .map(Expression::connective_count)
                    .sum::<usize>()
            }
        }
    }

    /// 树的深度，叶子节点为 1
    pub fn depth(&self) -> usize {
        match self {
            Self::Literal { .. } | Self::Field { .. } => 1,
            Self::Comparison(cmp) => 1 + cmp.left.depth().max(cmp.right.depth()),
            Self::Logical(group) => {
                1 + group
                    .children
                    .iter()
                    .map(Expression::depth)
                    .max()
                    .unwrap_or(0)
            }
        }
    }
}
