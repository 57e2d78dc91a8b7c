//! 规则引擎集成测试
//!
//! 测试完整的规则创建、组合、评估工作流。

use rule_engine::{
    CombineError, CombineOptions, DataRecord, EvalError, Expression, RuleEngine, RuleError,
    RuleExecutor, RuleStore, parse, render,
};
use serde_json::{Value, json};
use std::sync::Arc;

fn ids(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

fn record(value: Value) -> DataRecord {
    DataRecord::new(value)
}

/// 创建测试数据：模拟一个购买事件
fn create_purchase_record() -> DataRecord {
    record(json!({
        "event": {
            "type": "PURCHASE",
            "source": "mobile_app"
        },
        "order": {
            "id": "order-12345",
            "amount": 1500,
            "currency": "CNY",
            "items": [
                {"sku": "TICKET-001", "price": 500, "quantity": 2},
                {"sku": "FOOD-001", "price": 500, "quantity": 1}
            ]
        },
        "user": {
            "id": "user-67890",
            "level": "gold",
            "is_vip": true,
            "total_purchases": 15000
        }
    }))
}

// ============================================================================
// 渲染往返
// ============================================================================

#[test]
fn test_render_round_trip() {
    let inputs = [
        "age > 30",
        "TRUE",
        "a == 1 and b == 2 or c == 3",
        "a == 1 and (b == 2 or c == 3)",
        "not (x != 'y') or not z <= -1.5",
        "((a.b.c == \"q\" AND d.0.e >= 2e2))",
        "user.name == 'O\\'Brien' OR user.tag == 'tab\\there'",
        "flag = false",
        "NOT NOT NOT done == true",
        "a < b AND 3 > 2 AND 'x' != 'y'",
    ];

    for input in inputs {
        let tree = parse(input).unwrap();
        let text = render(&tree);
        let reparsed = parse(&text).unwrap();
        assert_eq!(reparsed, tree, "round trip failed for {:?} -> {:?}", input, text);
        assert_eq!(render(&reparsed), text, "rendering is not stable for {:?}", input);
    }
}

// ============================================================================
// 组合
// ============================================================================

#[test]
fn test_combine_identity() {
    let engine = RuleEngine::new();
    engine
        .create_rule("r1", "order.amount > 1000 AND (user.is_vip == true OR user.level == 'gold')")
        .unwrap();

    let combined = engine
        .combine(&ids(&["r1"]), CombineOptions::default())
        .unwrap();
    let stored = engine.get_rule("r1").unwrap();

    assert!(Arc::ptr_eq(&combined.expression, stored.ast()));
    assert_eq!(combined.text, stored.canonical());
}

#[test]
fn test_combine_associativity() {
    let engine = RuleEngine::new();
    engine.create_rule("a", "x > 1").unwrap();
    engine.create_rule("b", "y == 'on'").unwrap();
    engine.create_rule("c", "z != true").unwrap();

    let flat = engine
        .combine(&ids(&["a", "b", "c"]), CombineOptions::default())
        .unwrap();
    let ab = engine
        .combine(&ids(&["a", "b"]), CombineOptions::default())
        .unwrap();
    let nested = Expression::and(vec![
        ab.expression.as_ref().clone(),
        engine.get_rule("c").unwrap().ast().as_ref().clone(),
    ]);

    let executor = RuleExecutor::new();
    let records = [
        json!({"x": 2, "y": "on", "z": false}),
        json!({"x": 0, "y": "on", "z": false}),
        json!({"x": 2, "y": "off", "z": false}),
        json!({"x": 2, "y": "on", "z": true}),
        json!({"x": 0}),
        json!({"x": 2, "y": 5, "z": false}),
        json!({}),
    ];

    for data in records {
        let data = record(data);
        assert_eq!(
            executor.evaluate(&flat.expression, &data),
            executor.evaluate(&nested, &data),
            "AND(a,b,c) and AND(AND(a,b),c) disagree on {:?}",
            data
        );
    }
}

#[test]
fn test_combine_errors() {
    let engine = RuleEngine::new();
    engine.create_rule("r1", "age > 30").unwrap();

    assert!(matches!(
        engine.combine(&ids(&["missing"]), CombineOptions::default()),
        Err(RuleError::Combine(CombineError::UnknownRule(id))) if id == "missing"
    ));
    assert!(matches!(
        engine.combine(&[], CombineOptions::default()),
        Err(RuleError::Combine(CombineError::EmptyInput))
    ));
}

// ============================================================================
// 短路求值
// ============================================================================

#[test]
fn test_short_circuit_and() {
    let engine = RuleEngine::new();
    engine.create_rule("false_rule", "false").unwrap();
    engine.create_rule("error_rule", "missing.field > 1").unwrap();

    let data = DataRecord::default();
    assert_eq!(
        engine.evaluate(&ids(&["false_rule", "error_rule"]), &data),
        Ok(false)
    );

    let combined = engine
        .combine(&ids(&["false_rule", "error_rule"]), CombineOptions::default())
        .unwrap();
    assert_eq!(
        RuleExecutor::new().evaluate(&combined.expression, &data),
        Ok(false)
    );
}

#[test]
fn test_short_circuit_or() {
    let expr = parse("true OR missing.field > 1").unwrap();
    assert_eq!(
        RuleExecutor::new().evaluate(&expr, &DataRecord::default()),
        Ok(true)
    );

    let expr = parse("user.is_vip == true OR user.level > 3").unwrap();
    assert_eq!(
        RuleExecutor::new().evaluate(&expr, &create_purchase_record()),
        Ok(true)
    );
}

// ============================================================================
// 未知规则
// ============================================================================

#[test]
fn test_unknown_rule() {
    let engine = RuleEngine::new();

    assert!(engine
        .combine(&ids(&["missing"]), CombineOptions::default())
        .is_err());
    assert_eq!(
        engine.evaluate(&ids(&["missing"]), &record(json!({}))),
        Err(EvalError::UnknownRule("missing".to_string()))
    );
}

// ============================================================================
// 场景
// ============================================================================

#[test]
fn test_scenario_single_rule() {
    let engine = RuleEngine::new();
    engine.create_rule("r1", "age > 30").unwrap();

    assert_eq!(engine.evaluate(&ids(&["r1"]), &record(json!({"age": 42}))), Ok(true));
    assert_eq!(engine.evaluate(&ids(&["r1"]), &record(json!({"age": 10}))), Ok(false));
}

#[test]
fn test_scenario_combined_rules() {
    let engine = RuleEngine::new();
    engine.create_rule("r1", "age > 30").unwrap();
    engine.create_rule("r2", "status == 'active'").unwrap();

    let combined = engine
        .combine(&ids(&["r1", "r2"]), CombineOptions::default())
        .unwrap();
    assert_eq!(combined.text, "(age > 30) AND (status == 'active')");

    let executor = RuleExecutor::new();
    let active = record(json!({"age": 42, "status": "active"}));
    let inactive = record(json!({"age": 42, "status": "inactive"}));

    assert_eq!(executor.evaluate(&combined.expression, &active), Ok(true));
    assert_eq!(executor.evaluate(&combined.expression, &inactive), Ok(false));

    let reparsed = parse(&combined.text).unwrap();
    assert_eq!(executor.evaluate(&reparsed, &active), Ok(true));
}

#[test]
fn test_scenario_missing_field() {
    let engine = RuleEngine::new();
    engine.create_rule("r1", "age > 30").unwrap();

    assert_eq!(
        engine.evaluate(&ids(&["r1"]), &record(json!({}))),
        Err(EvalError::FieldNotFound("age".to_string()))
    );
}

// ============================================================================
// 存储
// ============================================================================

#[test]
fn test_put_idempotence() {
    let once = RuleStore::new();
    once.put("r1", "age > 30").unwrap();

    let twice = RuleStore::new();
    twice.put("r1", "age > 30").unwrap();
    let first = twice.get("r1").unwrap();
    twice.put("r1", "age > 30").unwrap();
    let second = twice.get("r1").unwrap();

    assert_eq!(once.list_ids(), twice.list_ids());
    assert_eq!(once.len(), twice.len());
    assert_eq!(first.expression(), second.expression());
    assert_eq!(first.created_at(), second.created_at());
    assert_eq!(first.updated_at(), second.updated_at());
}

#[test]
fn test_concurrent_readers_see_consistent_rules() {
    use std::thread;

    let store = RuleStore::new();
    store.put("r1", "v == 0").unwrap();

    let writer = {
        let store = store.clone();
        thread::spawn(move || {
            for i in 1..200 {
                store.put("r1", &format!("v == {}", i)).unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = store.clone();
            thread::spawn(move || {
                for _ in 0..200 {
                    let rule = store.get("r1").unwrap();
                    // 文本与缓存的语法树始终一致
                    assert_eq!(parse(rule.expression()).unwrap(), **rule.ast());
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(store.get("r1").unwrap().expression(), "v == 199");
}

// ============================================================================
// 完整业务流程
// ============================================================================

#[test]
fn test_purchase_workflow() {
    let engine = RuleEngine::new();
    engine
        .create_rule("is_purchase", "event.type == 'PURCHASE'")
        .unwrap();
    engine
        .create_rule(
            "big_order",
            "order.amount >= 1000 AND order.items.0.price >= 500",
        )
        .unwrap();
    engine
        .create_rule("vip_or_gold", "user.is_vip == true OR user.level == 'gold'")
        .unwrap();
    engine
        .create_rule("not_cny", "NOT order.currency == 'CNY'")
        .unwrap();

    let data = create_purchase_record();

    assert_eq!(
        engine.evaluate(&ids(&["is_purchase", "big_order", "vip_or_gold"]), &data),
        Ok(true)
    );
    assert_eq!(
        engine.evaluate(&ids(&["is_purchase", "not_cny"]), &data),
        Ok(false)
    );

    let report = engine
        .evaluate_detailed(&ids(&["is_purchase", "not_cny", "vip_or_gold"]), &data)
        .unwrap();
    assert_eq!(report.result, Ok(false));
    let per_rule: Vec<_> = report.rules.iter().map(|r| r.result.clone()).collect();
    assert_eq!(per_rule, vec![Ok(true), Ok(false), Ok(true)]);

    let listed: Vec<String> = engine
        .list_rules()
        .iter()
        .map(|r| r.id().to_string())
        .collect();
    assert_eq!(listed, ids(&["is_purchase", "big_order", "vip_or_gold", "not_cny"]));
}

#[test]
fn test_type_mismatch_is_reported() {
    let engine = RuleEngine::new();
    engine.create_rule("r1", "user.level > 3").unwrap();
    engine.create_rule("r2", "order.amount > 0").unwrap();

    let err = engine
        .evaluate(&ids(&["r2", "r1"]), &create_purchase_record())
        .unwrap_err();

    assert_eq!(err.rule_id(), Some("r1"));
    assert!(matches!(err.root_cause(), EvalError::TypeMismatch { .. }));
}
