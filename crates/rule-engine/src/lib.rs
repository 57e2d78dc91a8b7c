//! 规则表达式引擎
//!
//! 提供规则表达式的解析、组合与评估：
//! - 文本表达式解析为语法树，并可渲染回规范文本
//! - 多条命名规则按 `AND` 组合
//! - 短路求值执行
//! - 线程安全、保持插入顺序的规则存储
//! - HTTP 接口

pub mod api;
pub mod ast;
pub mod combiner;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod executor;
pub mod lexer;
pub mod models;
pub mod operators;
pub mod parser;
pub mod render;
pub mod store;

pub use ast::{Comparison, Expression, Literal, LogicalGroup};
pub use combiner::{CombineOptions, CombinedExpression, Combiner, RuleOrder};
pub use engine::RuleEngine;
pub use error::{CombineError, EvalError, ParseError, Result, RuleError};
pub use executor::{Execution, RuleExecutor};
pub use models::{DataRecord, EvaluationReport, Rule, RuleOutcome};
pub use operators::{LogicalOperator, Operator};
pub use parser::parse;
pub use render::render;
pub use store::{RuleStore, RuleStoreStats};
