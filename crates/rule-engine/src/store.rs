//! 规则存储管理
//!
//! 按插入顺序保存规则。写入前先完成解析，读写锁内只做替换，
//! 读者不会看到文本与语法树不一致的规则。

use crate::error::{Result, RuleError};
use crate::models::Rule;
use parking_lot::RwLock;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::{info, instrument, warn};

#[derive(Debug, Default)]
struct Inner {
    rules: HashMap<String, Rule>,
    /// 插入顺序；覆盖已有规则时位置不变
    order: Vec<String>,
}

/// 规则存储
#[derive(Debug, Clone, Default)]
pub struct RuleStore {
    inner: Arc<RwLock<Inner>>,
}

impl RuleStore {
    /// 创建新的规则存储
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取当前存储的规则数量
    pub fn len(&self) -> usize {
        self.inner.read().rules.len()
    }

    /// 检查存储是否为空
    pub fn is_empty(&self) -> bool {
        self.inner.read().rules.is_empty()
    }

    /// 解析并保存规则
    ///
    /// 相同 ID 已存在时覆盖；若文本完全相同则不做任何修改。
    #[instrument(skip(self, expression))]
    pub fn put(&self, id: &str, expression: &str) -> Result<Rule> {
        let id = id.trim();
        if id.is_empty() {
            return Err(RuleError::InvalidRule("规则 ID 不能为空".to_string()));
        }

        // 锁外解析
        let rule = Rule::parse(id, expression)?;

        let mut inner = self.inner.write();
        let stored = match inner.rules.get(id).cloned() {
            Some(existing) if existing.expression() == rule.expression() => {
                return Ok(existing);
            }
            Some(existing) => {
                let updated = rule.replacing(&existing);
                info!("规则已更新: {}", id);
                updated
            }
            None => {
                inner.order.push(id.to_string());
                info!("规则已加载: {}", id);
                rule
            }
        };

        inner.rules.insert(id.to_string(), stored.clone());
        Ok(stored)
    }

    /// 获取规则
    pub fn get(&self, rule_id: &str) -> Result<Rule> {
        self.inner
            .read()
            .rules
            .get(rule_id.trim())
            .cloned()
            .ok_or_else(|| RuleError::NotFound(rule_id.to_string()))
    }

    /// 按顺序一次性取出多条规则，任一缺失则返回缺失的 ID
    pub fn get_many(&self, rule_ids: &[String]) -> std::result::Result<Vec<Rule>, String> {
        let inner = self.inner.read();
        rule_ids
            .iter()
            .map(|id| {
                inner
                    .rules
                    .get(id.trim())
                    .cloned()
                    .ok_or_else(|| id.clone())
            })
            .collect()
    }

    /// 检查规则是否存在
    pub fn contains(&self, rule_id: &str) -> bool {
        self.inner.read().rules.contains_key(rule_id.trim())
    }

    /// 获取所有规则 ID（插入顺序）
    pub fn list_ids(&self) -> Vec<String> {
        self.inner.read().order.clone()
    }

    /// 获取所有规则（插入顺序）
    pub fn list(&self) -> Vec<Rule> {
        let inner = self.inner.read();
        inner
            .order
            .iter()
            .filter_map(|id| inner.rules.get(id).cloned())
            .collect()
    }

    /// 删除规则
    #[instrument(skip(self))]
    pub fn delete(&self, rule_id: &str) -> Result<Rule> {
        let rule_id = rule_id.trim();
        let mut inner = self.inner.write();

        match inner.rules.remove(rule_id) {
            Some(rule) => {
                inner.order.retain(|id| id != rule_id);
                info!("规则已删除: {}", rule_id);
                Ok(rule)
            }
            None => {
                warn!("删除不存在的规则: {}", rule_id);
                Err(RuleError::NotFound(rule_id.to_string()))
            }
        }
    }

    /// 清空所有规则，返回清除的数量
    #[instrument(skip(self))]
    pub fn clear(&self) -> usize {
        let mut inner = self.inner.write();
        let count = inner.rules.len();
        inner.rules.clear();
        inner.order.clear();
        info!("已清空 {} 条规则", count);
        count
    }

    /// 获取规则统计信息
    pub fn stats(&self) -> RuleStoreStats {
        let inner = self.inner.read();
        let rules_count = inner.rules.len();
        let total_fields: usize = inner
            .rules
            .values()
            .map(|r| r.ast().fields().len())
            .sum();
        let distinct_fields: BTreeSet<&str> = inner
            .rules
            .values()
            .flat_map(|r| r.ast().fields())
            .collect();

        RuleStoreStats {
            rules_count,
            total_fields,
            distinct_fields: distinct_fields.len(),
            avg_fields_per_rule: if rules_count > 0 {
                total_fields as f64 / rules_count as f64
            } else {
                0.0
            },
        }
    }
}

/// 规则存储统计信息
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct RuleStoreStats {
    /// 规则总数
    pub rules_count: usize,
    /// 各规则引用的字段数之和
    pub total_fields: usize,
    /// 所有规则引用的不同字段数
    pub distinct_fields: usize,
    /// 平均每条规则使用的字段数
    pub avg_fields_per_rule: f64,
}
