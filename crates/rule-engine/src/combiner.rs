//! 规则组合器
//!
//! 把多条已存储规则的语法树合并为一棵 `AND` 树，并渲染为规范文本。
//! 只有一条规则时直接返回该规则的语法树，不做包装。

use crate::ast::Expression;
use crate::error::CombineError;
use crate::operators::LogicalOperator;
use crate::store::RuleStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// 组合时的规则顺序
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleOrder {
    /// 按请求给出的顺序
    #[default]
    Given,
    /// 按逻辑连接词数量升序（稳定排序），简单的规则先评估
    CostAscending,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CombineOptions {
    #[serde(default)]
    pub order: RuleOrder,
}

/// 组合结果
#[derive(Debug, Clone)]
pub struct CombinedExpression {
    /// 实际参与组合的规则 ID（排序后）
    pub rule_ids: Vec<String>,
    pub expression: Arc<Expression>,
    /// 规范文本
    pub text: String,
}

/// 规则组合器
#[derive(Debug, Clone)]
pub struct Combiner {
    store: RuleStore,
}

impl Combiner {
    pub fn new(store: RuleStore) -> Self {
        Self { store }
    }

    /// 按默认顺序组合
    pub fn combine(&self, rule_ids: &[String]) -> Result<CombinedExpression, CombineError> {
        self.combine_with(rule_ids, CombineOptions::default())
    }

    pub fn combine_with(
        &self,
        rule_ids: &[String],
        options: CombineOptions,
    ) -> Result<CombinedExpression, CombineError> {
        if rule_ids.is_empty() {
            return Err(CombineError::EmptyInput);
        }

        let mut rules = self
            .store
            .get_many(rule_ids)
            .map_err(CombineError::UnknownRule)?;

        if options.order == RuleOrder::CostAscending {
            rules.sort_by_key(|rule| rule.ast().connective_count());
        }

        let expression = match rules.as_slice() {
            [single] => Arc::clone(single.ast()),
            _ => Arc::new(Expression::logical(
                LogicalOperator::And,
                rules.iter().map(|r| r.ast().as_ref().clone()).collect(),
            )),
        };

        Ok(CombinedExpression {
            rule_ids: rules.iter().map(|r| r.id().to_string()).collect(),
            text: expression.to_string(),
            expression,
        })
    }
}
