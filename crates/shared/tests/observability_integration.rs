//! 可观测性与配置集成测试
//!
//! 测试 metrics、middleware 和配置模块的核心功能。

// ============================================================================
// 指标记录测试
// ============================================================================

mod metrics_tests {
    use rulekit_shared::observability::metrics::{
        record_http_request, record_parse_failure, record_rule_evaluation, set_rules_stored,
    };

    #[test]
    fn test_record_http_request() {
        // 测试各种 HTTP 方法和状态码组合
        record_http_request("GET", "/api/rules", 200, 0.05);
        record_http_request("POST", "/api/rules", 200, 0.12);
        record_http_request("POST", "/api/rules/evaluate", 400, 0.08);
        record_http_request("DELETE", "/api/rules/r1", 404, 0.03);
    }

    #[test]
    fn test_record_rule_metrics() {
        record_rule_evaluation("matched", 0.001);
        record_rule_evaluation("not_matched", 0.002);
        record_rule_evaluation("error", 0.0005);
        record_parse_failure();
        set_rules_stored(0);
        set_rules_stored(1_000);
    }

    #[test]
    fn test_metrics_with_edge_cases() {
        // 空字符串
        record_http_request("", "", 0, 0.0);

        // 超长路径
        let long_path = "/api/rules/".to_string() + &"x".repeat(1000);
        record_http_request("GET", &long_path, 200, 0.01);

        // 极端持续时间
        record_rule_evaluation("matched", 999.99);
        record_rule_evaluation("matched", 0.000001);
    }
}

// ============================================================================
// 中间件测试
// ============================================================================

mod middleware_tests {
    use rulekit_shared::observability::middleware::RequestId;

    #[test]
    fn test_request_id_creation() {
        let id = RequestId("test-id-123".to_string());
        assert_eq!(id.as_str(), "test-id-123");
    }

    #[test]
    fn test_request_id_debug() {
        let id = RequestId("debug-test".to_string());
        let debug_str = format!("{:?}", id);
        assert!(debug_str.contains("debug-test"));
    }
}

// ============================================================================
// 配置测试
// ============================================================================

mod config_tests {
    use rulekit_shared::config::{AppConfig, EngineConfig};

    #[test]
    fn test_engine_config_default() {
        let config = EngineConfig::default();
        assert_eq!(config.max_expression_length, 4096);
        assert!(!config.trace_enabled);
    }

    #[test]
    fn test_observability_config_from_app_config() {
        let config = AppConfig::default();
        let obs = config.observability.clone().with_service_name("rule-engine");
        assert_eq!(obs.service_name, "rule-engine");
        assert!(obs.metrics_enabled);
    }
}
