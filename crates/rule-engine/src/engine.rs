//! 规则引擎门面
//!
//! 组合存储、组合器与执行器，对外提供创建、查询、组合和评估操作，
//! 并在这一层记录日志与指标。

use crate::combiner::{CombineOptions, CombinedExpression, Combiner};
use crate::error::{EvalError, Result, RuleError};
use crate::executor::RuleExecutor;
use crate::models::{DataRecord, EvaluationReport, Rule, RuleOutcome};
use crate::parser;
use crate::store::{RuleStore, RuleStoreStats};
use rulekit_shared::config::EngineConfig;
use rulekit_shared::observability::metrics as engine_metrics;
use std::time::Instant;
use tracing::{debug, instrument, warn};

/// 规则引擎
#[derive(Debug, Clone)]
pub struct RuleEngine {
    store: RuleStore,
    combiner: Combiner,
    executor: RuleExecutor,
    /// 表达式最大字节长度，0 表示不限制
    max_expression_length: usize,
}

impl RuleEngine {
    pub fn new() -> Self {
        Self::with_store(RuleStore::new())
    }

    /// 使用已有存储创建引擎
    pub fn with_store(store: RuleStore) -> Self {
        Self {
            combiner: Combiner::new(store.clone()),
            store,
            executor: RuleExecutor::new(),
            max_expression_length: 0,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        let mut engine = Self::new();
        engine.max_expression_length = config.max_expression_length;
        if config.trace_enabled {
            engine.executor = RuleExecutor::new().with_trace();
        }
        engine
    }

    pub fn store(&self) -> &RuleStore {
        &self.store
    }

    /// 创建或覆盖规则
    #[instrument(skip(self, expression), fields(len = expression.len()))]
    pub fn create_rule(&self, id: &str, expression: &str) -> Result<Rule> {
        self.check_length(expression)?;

        let rule = self.store.put(id, expression).inspect_err(|e| {
            if let RuleError::Parse(parse_error) = e {
                warn!(rule_id = %id, error = %parse_error, "规则解析失败");
                engine_metrics::record_parse_failure();
            }
        })?;

        engine_metrics::set_rules_stored(self.store.len());
        Ok(rule)
    }

    pub fn get_rule(&self, id: &str) -> Result<Rule> {
        self.store.get(id)
    }

    /// 所有规则（插入顺序）
    pub fn list_rules(&self) -> Vec<Rule> {
        self.store.list()
    }

    #[instrument(skip(self))]
    pub fn delete_rule(&self, id: &str) -> Result<Rule> {
        let rule = self.store.delete(id)?;
        engine_metrics::set_rules_stored(self.store.len());
        Ok(rule)
    }

    #[instrument(skip(self))]
    pub fn clear(&self) -> usize {
        let count = self.store.clear();
        engine_metrics::set_rules_stored(0);
        count
    }

    pub fn stats(&self) -> RuleStoreStats {
        self.store.stats()
    }

    /// 组合多条规则
    #[instrument(skip(self), fields(rules = rule_ids.len()))]
    pub fn combine(
        &self,
        rule_ids: &[String],
        options: CombineOptions,
    ) -> Result<CombinedExpression> {
        let combined = self.combiner.combine_with(rule_ids, options)?;
        debug!(expression = %combined.text, "规则组合完成");
        Ok(combined)
    }

    /// 评估多条规则，结果为各规则的 `AND`
    ///
    /// 所有 ID 在评估前先解析；规则依次评估，遇到 false 立即返回。
    /// 多条规则时错误附带出错的规则 ID。
    pub fn evaluate(
        &self,
        rule_ids: &[String],
        record: &DataRecord,
    ) -> std::result::Result<bool, EvalError> {
        self.run(rule_ids, record, false)?.result
    }

    /// 与 [`Self::evaluate`] 相同，额外返回组合文本、轨迹与耗时
    pub fn evaluate_report(
        &self,
        rule_ids: &[String],
        record: &DataRecord,
    ) -> std::result::Result<EvaluationReport, EvalError> {
        self.run(rule_ids, record, false)
    }

    /// 评估多条规则并返回详细报告
    ///
    /// 外层错误只来自 ID 解析（空列表或未知规则）；评估错误放在
    /// [`EvaluationReport::result`] 中。报告额外包含每条规则独立评估的结果。
    pub fn evaluate_detailed(
        &self,
        rule_ids: &[String],
        record: &DataRecord,
    ) -> std::result::Result<EvaluationReport, EvalError> {
        self.run(rule_ids, record, true)
    }

    /// 解析并评估表达式，不保存
    #[instrument(skip(self, expression, record))]
    pub fn test_expression(&self, expression: &str, record: &DataRecord) -> Result<bool> {
        self.check_length(expression)?;

        let expr = parser::parse(expression.trim()).inspect_err(|_| {
            engine_metrics::record_parse_failure();
        })?;

        let start = Instant::now();
        let result = self.executor.evaluate(&expr, record);
        record_outcome(&result, start);

        Ok(result?)
    }

    #[instrument(skip(self, record), fields(rules = rule_ids.len()))]
    fn run(
        &self,
        rule_ids: &[String],
        record: &DataRecord,
        detailed: bool,
    ) -> std::result::Result<EvaluationReport, EvalError> {
        if rule_ids.is_empty() {
            return Err(EvalError::EmptyInput);
        }

        let rules = self
            .store
            .get_many(rule_ids)
            .map_err(EvalError::UnknownRule)?;

        let start = Instant::now();
        let mut trace = Vec::new();
        let result = self.evaluate_all(&rules, record, &mut trace);
        let elapsed = start.elapsed();
        record_outcome(&result, start);

        let rules_outcome = if detailed {
            rules
                .iter()
                .map(|rule| RuleOutcome {
                    rule_id: rule.id().to_string(),
                    result: self.executor.evaluate(rule.ast(), record),
                })
                .collect()
        } else {
            Vec::new()
        };

        debug!(result = ?result, elapsed_us = elapsed.as_micros() as u64, "规则评估完成");

        Ok(EvaluationReport {
            result,
            combined_expression: combined_text(&rules),
            rules: rules_outcome,
            trace,
            evaluation_time_us: elapsed.as_micros() as u64,
        })
    }

    fn evaluate_all(
        &self,
        rules: &[Rule],
        record: &DataRecord,
        trace: &mut Vec<String>,
    ) -> std::result::Result<bool, EvalError> {
        let attribute = rules.len() > 1;

        for rule in rules {
            let execution = self.executor.execute(rule.ast(), record);
            trace.extend(
                execution
                    .trace
                    .into_iter()
                    .map(|line| format!("[{}] {}", rule.id(), line)),
            );

            match execution.result {
                Ok(true) => {}
                Ok(false) => return Ok(false),
                Err(e) if attribute => {
                    return Err(EvalError::InRule {
                        rule_id: rule.id().to_string(),
                        source: Box::new(e),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        Ok(true)
    }

    fn check_length(&self, expression: &str) -> Result<()> {
        if self.max_expression_length > 0 && expression.len() > self.max_expression_length {
            return Err(RuleError::InvalidRule(format!(
                "表达式长度 {} 超过上限 {}",
                expression.len(),
                self.max_expression_length
            )));
        }
        Ok(())
    }
}

impl Default for RuleEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// 与 [`Combiner`] 默认顺序一致的组合文本
fn combined_text(rules: &[Rule]) -> String {
    match rules {
        [single] => single.canonical(),
        _ => rules
            .iter()
            .map(|r| format!("({})", r.ast()))
            .collect::<Vec<_>>()
            .join(" AND "),
    }
}

fn record_outcome(result: &std::result::Result<bool, EvalError>, start: Instant) {
    let outcome = match result {
        Ok(true) => "matched",
        Ok(false) => "not_matched",
        Err(_) => "error",
    };
    engine_metrics::record_rule_evaluation(outcome, start.elapsed().as_secs_f64());
}
