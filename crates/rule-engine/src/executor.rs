//! 表达式执行器
//!
//! 对语法树做短路求值：`AND` 遇到 false 立即返回，`OR` 遇到 true 立即返回，
//! 被跳过的子节点即使会出错也不再评估。可选记录评估轨迹。

use crate::ast::{Comparison, Expression, LogicalGroup};
use crate::error::EvalError;
use crate::evaluator::{ConditionEvaluator, Scalar};
use crate::models::DataRecord;
use crate::operators::LogicalOperator;
use std::time::Instant;

/// 一次执行的结果
#[derive(Debug, Clone)]
pub struct Execution {
    pub result: Result<bool, EvalError>,
    pub trace: Vec<String>,
    pub evaluation_time_us: u64,
}

/// 表达式执行器
#[derive(Debug, Clone, Default)]
pub struct RuleExecutor {
    /// 是否记录详细评估追踪
    trace_enabled: bool,
}

impl RuleExecutor {
    pub fn new() -> Self {
        Self {
            trace_enabled: false,
        }
    }

    /// 启用评估追踪
    pub fn with_trace(mut self) -> Self {
        self.trace_enabled = true;
        self
    }

    pub fn trace_enabled(&self) -> bool {
        self.trace_enabled
    }

    /// 评估表达式，返回布尔结果
    pub fn evaluate(&self, expr: &Expression, record: &DataRecord) -> Result<bool, EvalError> {
        let mut trace = Vec::new();
        self.evaluate_node(expr, record, &mut trace, "root")
    }

    /// 评估表达式并返回轨迹与耗时
    pub fn execute(&self, expr: &Expression, record: &DataRecord) -> Execution {
        let start = Instant::now();
        let mut trace = Vec::new();

        let result = self.evaluate_node(expr, record, &mut trace, "root");

        Execution {
            result,
            trace,
            evaluation_time_us: start.elapsed().as_micros() as u64,
        }
    }

    /// 递归评估需要布尔值的节点
    fn evaluate_node(
        &self,
        node: &Expression,
        record: &DataRecord,
        trace: &mut Vec<String>,
        path: &str,
    ) -> Result<bool, EvalError> {
        match node {
            Expression::Comparison(cmp) => self.evaluate_comparison(cmp, record, trace, path),
            Expression::Logical(group) => self.evaluate_group(group, record, trace, path),
            Expression::Literal { .. } | Expression::Field { .. } => {
                match self.resolve(node, record, trace, path)? {
                    Scalar::Bool(b) => Ok(b),
                    other => Err(EvalError::TypeMismatch {
                        expression: node.to_string(),
                        expected: "boolean".to_string(),
                        actual: other.type_name().to_string(),
                    }),
                }
            }
        }
    }

    /// 解析比较的一侧
    fn resolve<'a>(
        &self,
        node: &'a Expression,
        record: &'a DataRecord,
        trace: &mut Vec<String>,
        path: &str,
    ) -> Result<Scalar<'a>, EvalError> {
        match node {
            Expression::Literal { value } => Ok(Scalar::from_literal(value)),
            Expression::Field { path: field } => record
                .get_field(field)
                .map(Scalar::from_json)
                .ok_or_else(|| EvalError::FieldNotFound(field.clone())),
            nested => self
                .evaluate_node(nested, record, trace, path)
                .map(Scalar::Bool),
        }
    }

    /// 评估比较节点
    fn evaluate_comparison(
        &self,
        cmp: &Comparison,
        record: &DataRecord,
        trace: &mut Vec<String>,
        path: &str,
    ) -> Result<bool, EvalError> {
        let left = self.resolve(&cmp.left, record, trace, path)?;
        let right = self.resolve(&cmp.right, record, trace, path)?;

        let matched = ConditionEvaluator::evaluate(cmp.operator, &left, &right).map_err(|c| {
            EvalError::TypeMismatch {
                expression: format!("{} {} {}", cmp.left, cmp.operator, cmp.right),
                expected: c.expected.to_string(),
                actual: c.actual.to_string(),
            }
        })?;

        if self.trace_enabled {
            trace.push(format!(
                "{}: {} {} {} => {}",
                path,
                cmp.left,
                cmp.operator,
                cmp.right,
                if matched { "MATCHED" } else { "NOT_MATCHED" }
            ));
        }

        Ok(matched)
    }

    /// 评估逻辑组节点（短路求值）
    fn evaluate_group(
        &self,
        group: &LogicalGroup,
        record: &DataRecord,
        trace: &mut Vec<String>,
        path: &str,
    ) -> Result<bool, EvalError> {
        match group.operator {
            LogicalOperator::And => {
                for (i, child) in group.children.iter().enumerate() {
                    let child_path = self.child_path(path, i);
                    if !self.evaluate_node(child, record, trace, &child_path)? {
                        if self.trace_enabled {
                            trace.push(format!("{}: AND 短路 - 子节点 {} 不匹配", path, i));
                        }
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            LogicalOperator::Or => {
                for (i, child) in group.children.iter().enumerate() {
                    let child_path = self.child_path(path, i);
                    if self.evaluate_node(child, record, trace, &child_path)? {
                        if self.trace_enabled {
                            trace.push(format!("{}: OR 短路 - 子节点 {} 匹配", path, i));
                        }
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            LogicalOperator::Not => {
                let [child] = group.children.as_slice() else {
                    return Err(EvalError::TypeMismatch {
                        expression: Expression::Logical(group.clone()).to_string(),
                        expected: "NOT 恰好一个子节点".to_string(),
                        actual: format!("{} 个子节点", group.children.len()),
                    });
                };
                let child_path = self.child_path(path, 0);
                let negated = !self.evaluate_node(child, record, trace, &child_path)?;
                if self.trace_enabled {
                    trace.push(format!("{}: NOT => {}", path, negated));
                }
                Ok(negated)
            }
        }
    }

    fn child_path(&self, path: &str, index: usize) -> String {
        if self.trace_enabled {
            format!("{}.children[{}]", path, index)
        } else {
            String::new()
        }
    }
}
