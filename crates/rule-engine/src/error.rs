//! 规则引擎错误类型
//!
//! 每个组件返回自己的错误类型：解析器返回 [`ParseError`]，组合器返回
//! [`CombineError`]，评估器返回 [`EvalError`]。[`RuleError`] 汇总这些错误，
//! 供存储和引擎门面使用。

use thiserror::Error;

/// 规则表达式解析错误
///
/// `position` 是出错 token 在输入中的字节偏移（从 0 开始）；
/// 输入意外结束时为输入长度。
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("解析失败 (位置 {position}): {message}")]
pub struct ParseError {
    pub position: usize,
    pub message: String,
}

impl ParseError {
    pub fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

/// 规则组合错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CombineError {
    #[error("规则未找到: {0}")]
    UnknownRule(String),

    #[error("规则 ID 列表不能为空")]
    EmptyInput,
}

/// 规则评估错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("字段不存在: {0}")]
    FieldNotFound(String),

    #[error("类型不匹配 `{expression}`: 期望 {expected}, 实际 {actual}")]
    TypeMismatch {
        expression: String,
        expected: String,
        actual: String,
    },

    #[error("规则未找到: {0}")]
    UnknownRule(String),

    #[error("规则 ID 列表不能为空")]
    EmptyInput,

    /// 组合评估时附带出错的源规则 ID
    #[error("规则 {rule_id} 评估失败: {source}")]
    InRule {
        rule_id: String,
        #[source]
        source: Box<EvalError>,
    },
}

impl EvalError {
    /// 剥离 [`EvalError::InRule`] 包装，返回最内层的错误
    pub fn root_cause(&self) -> &EvalError {
        match self {
            Self::InRule { source, .. } => source.root_cause(),
            other => other,
        }
    }

    /// 出错的源规则 ID（仅在组合评估时存在）
    pub fn rule_id(&self) -> Option<&str> {
        match self {
            Self::InRule { rule_id, .. } => Some(rule_id),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum RuleError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Combine(#[from] CombineError),

    #[error(transparent)]
    Eval(#[from] EvalError),

    #[error("规则未找到: {0}")]
    NotFound(String),

    #[error("无效的规则: {0}")]
    InvalidRule(String),

    #[error("JSON 序列化错误: {0}")]
    JsonError(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, RuleError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_display() {
        let err = ParseError::new(4, "缺少右括号");
        assert_eq!(err.to_string(), "解析失败 (位置 4): 缺少右括号");
    }

    #[test]
    fn test_root_cause_unwraps_nested_rule_errors() {
        let err = EvalError::InRule {
            rule_id: "r2".to_string(),
            source: Box::new(EvalError::FieldNotFound("age".to_string())),
        };

        assert_eq!(err.rule_id(), Some("r2"));
        assert_eq!(
            err.root_cause(),
            &EvalError::FieldNotFound("age".to_string())
        );
        assert!(err.to_string().contains("r2"));
    }

    #[test]
    fn test_rule_error_from_components() {
        let err: RuleError = CombineError::UnknownRule("missing".to_string()).into();
        assert!(matches!(err, RuleError::Combine(CombineError::UnknownRule(_))));

        let err: RuleError = ParseError::new(0, "表达式不能为空").into();
        assert!(err.to_string().contains("表达式不能为空"));
    }
}
