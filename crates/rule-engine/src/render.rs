//! 规范文本渲染
//!
//! 将语法树渲染回解析器可接受的文本：逻辑组的每个子节点都加括号，
//! `NOT` 的子节点同样加括号，根级比较不加括号。重新解析渲染结果得到结构相同的树。

use crate::ast::{Expression, Literal};
use crate::operators::LogicalOperator;
use std::fmt::{self, Write};

/// 渲染为规范文本
pub fn render(expr: &Expression) -> String {
    expr.to_string()
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Number(n) => write!(f, "{}", n),
            Self::String(s) => {
                f.write_char('\'')?;
                for c in s.chars() {
                    match c {
                        '\'' => f.write_str("\\'")?,
                        '\\' => f.write_str("\\\\")?,
                        '\n' => f.write_str("\\n")?,
                        '\t' => f.write_str("\\t")?,
                        c => f.write_char(c)?,
                    }
                }
                f.write_char('\'')
            }
        }
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Literal { value } => write!(f, "{}", value),
            Self::Field { path } => f.write_str(path),
            Self::Comparison(cmp) => write!(f, "{} {} {}", cmp.left, cmp.operator, cmp.right),
            Self::Logical(group) => {
                if group.operator == LogicalOperator::Not {
                    for (i, child) in group.children.iter().enumerate() {
                        if i > 0 {
                            f.write_char(' ')?;
                        }
                        write!(f, "NOT ({})", child)?;
                    }
                    return Ok(());
                }

                for (i, child) in group.children.iter().enumerate() {
                    if i > 0 {
                        write!(f, " {} ", group.operator)?;
                    }
                    write!(f, "({})", child)?;
                }
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    #[test]
    fn test_render_comparison() {
        assert_eq!(render(&parse("age>30").unwrap()), "age > 30");
        assert_eq!(render(&parse("price <= 9.5").unwrap()), "price <= 9.5");
        assert_eq!(render(&parse("x = -2").unwrap()), "x == -2");
        assert_eq!(render(&parse("name == \"bob\"").unwrap()), "name == 'bob'");
    }

    #[test]
    fn test_render_logical() {
        assert_eq!(
            render(&parse("age > 30 and status == 'active'").unwrap()),
            "(age > 30) AND (status == 'active')"
        );
        assert_eq!(
            render(&parse("not (a == 1 or b == 2)").unwrap()),
            "NOT ((a == 1) OR (b == 2))"
        );
        assert_eq!(render(&parse("TRUE").unwrap()), "true");
    }

    #[test]
    fn test_render_escapes_strings() {
        let expr = parse(r#"msg == "it's a \\ test""#).unwrap();
        assert_eq!(render(&expr), r"msg == 'it\'s a \\ test'");
    }

    #[test]
    fn test_round_trip() {
        let inputs = [
            "age > 30",
            "true",
            "false OR a.b.c != 'x'",
            "a == 1 AND b == 2 AND c == 3",
            "(a == 1 AND b == 2) AND c == 3",
            "a == 1 OR (b == 2 AND NOT c >= 3)",
            "NOT NOT (x < -0.25)",
            "items.0.price >= 1e3 and tag == 'new\\nline'",
            "(((a == 'q\\'uote')))",
            "x == 0.1 OR y == 123456789.123 OR z == 1e-7",
            "flag == TRUE and 1 < 2",
        ];

        for input in inputs {
            let tree = parse(input).unwrap();
            let rendered = render(&tree);
            let reparsed = parse(&rendered)
                .unwrap_or_else(|e| panic!("re-parse of {:?} failed: {}", rendered, e));
            assert_eq!(reparsed, tree, "round trip mismatch for {:?}", input);
        }
    }
}
