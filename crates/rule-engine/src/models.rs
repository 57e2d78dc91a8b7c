//! 规则引擎领域模型

use crate::ast::Expression;
use crate::error::{EvalError, ParseError};
use crate::parser;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;

/// 已存储的规则
///
/// 语法树在构造时解析并缓存，之后不可变；克隆只复制 `Arc`。
#[derive(Debug, Clone, Serialize)]
pub struct Rule {
    id: String,
    expression: String,
    #[serde(skip)]
    ast: Arc<Expression>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Rule {
    /// 解析表达式文本并构造规则
    pub fn parse(id: impl Into<String>, expression: &str) -> Result<Self, ParseError> {
        let expression = expression.trim();
        let ast = parser::parse(expression)?;
        let now = Utc::now();

        Ok(Self {
            id: id.into(),
            expression: expression.to_string(),
            ast: Arc::new(ast),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// 创建时的原始表达式文本
    pub fn expression(&self) -> &str {
        &self.expression
    }

    pub fn ast(&self) -> &Arc<Expression> {
        &self.ast
    }

    /// 规范化后的表达式文本
    pub fn canonical(&self) -> String {
        self.ast.to_string()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// 以新版本覆盖时保留首次创建时间
    pub(crate) fn replacing(mut self, previous: &Rule) -> Self {
        self.created_at = previous.created_at;
        self
    }
}

/// 数据记录 - 提供给评估器的输入数据
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataRecord {
    data: Value,
}

impl DataRecord {
    pub fn new(data: Value) -> Self {
        Self { data }
    }

    /// 从 JSON 字符串创建
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let data: Value = serde_json::from_str(json)?;
        Ok(Self { data })
    }

    /// 获取字段值（支持点号分隔的路径，如 "event.type" 或 "order.items.0.name"）
    pub fn get_field(&self, path: &str) -> Option<&Value> {
        let mut current = &self.data;

        for part in path.split('.') {
            match current {
                Value::Object(map) => {
                    current = map.get(part)?;
                }
                Value::Array(arr) => {
                    let index: usize = part.parse().ok()?;
                    current = arr.get(index)?;
                }
                _ => return None,
            }
        }

        Some(current)
    }

    pub fn data(&self) -> &Value {
        &self.data
    }
}

impl From<Value> for DataRecord {
    fn from(data: Value) -> Self {
        Self::new(data)
    }
}

/// 单条规则的评估结果
#[derive(Debug, Clone)]
pub struct RuleOutcome {
    pub rule_id: String,
    pub result: Result<bool, EvalError>,
}

/// 多规则评估报告
#[derive(Debug, Clone)]
pub struct EvaluationReport {
    /// 与 `evaluate` 相同的短路聚合结果
    pub result: Result<bool, EvalError>,
    /// 参与评估的组合表达式文本
    pub combined_expression: String,
    /// 每条规则独立评估的结果（按请求顺序）
    pub rules: Vec<RuleOutcome>,
    /// 启用追踪时的评估轨迹
    pub trace: Vec<String>,
    pub evaluation_time_us: u64,
}
