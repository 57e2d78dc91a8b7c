//! 规则表达式解析器
//!
//! 递归下降解析，直接产出 [`Expression`] 语法树。优先级从低到高：
//! `OR` < `AND` < `NOT` < 比较 < 基本项，括号可改变优先级。
//!
//! 同一括号层级内相同连接词的链会被展平为一个逻辑组
//! （`a AND b AND c` 产出三个子节点），括号总是开启新的节点。
//! 单独的字段引用不是合法的条件，必须出现在比较中。

use crate::ast::Expression;
use crate::error::ParseError;
use crate::lexer::{Lexer, Token, TokenKind};
use crate::operators::LogicalOperator;

/// 括号与 NOT 的最大嵌套深度
pub const MAX_DEPTH: usize = 128;

/// 解析规则表达式文本
///
/// 要么整个文本产出一个根表达式，要么返回 [`ParseError`]，不存在部分成功。
pub fn parse(input: &str) -> Result<Expression, ParseError> {
    if input.trim().is_empty() {
        return Err(ParseError::new(0, "表达式不能为空"));
    }

    let tokens = Lexer::new(input).tokenize()?;
    let mut parser = Parser::new(tokens, input.len());
    let expr = parser.parse_expression()?;

    if let Some(token) = parser.peek() {
        let message = match token.kind {
            TokenKind::RightParen => "括号不匹配: 多余的 ')'".to_string(),
            TokenKind::Compare(_) => "比较操作符不能连用".to_string(),
            ref other => format!("意外的 {}", other.describe()),
        };
        return Err(ParseError::new(token.position, message));
    }

    Ok(expr)
}

/// 语法分析器
struct Parser {
    tokens: Vec<Token>,
    current: usize,
    /// 输入长度，用作输入结束时的错误位置
    end: usize,
    depth: usize,
}

impl Parser {
    fn new(tokens: Vec<Token>, end: usize) -> Self {
        Self {
            tokens,
            current: 0,
            end,
            depth: 0,
        }
    }

    fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        self.parse_or()
    }

    fn parse_or(&mut self) -> Result<Expression, ParseError> {
        self.parse_chain(LogicalOperator::Or, &TokenKind::Or, Self::parse_and)
    }

    fn parse_and(&mut self) -> Result<Expression, ParseError> {
        self.parse_chain(LogicalOperator::And, &TokenKind::And, Self::parse_not)
    }

    /// 解析 `operand (keyword operand)*`，两个以上的操作数展平为一个逻辑组
    fn parse_chain(
        &mut self,
        operator: LogicalOperator,
        keyword: &TokenKind,
        operand: fn(&mut Self) -> Result<Expression, ParseError>,
    ) -> Result<Expression, ParseError> {
        let first = operand(self)?;

        if !self.check(keyword) {
            return Ok(first);
        }

        let mut children = vec![first];
        while self.match_token(keyword) {
            children.push(operand(self)?);
        }

        Ok(Expression::logical(operator, children))
    }

    fn parse_not(&mut self) -> Result<Expression, ParseError> {
        if let Some(token) = self.peek()
            && token.kind == TokenKind::Not
        {
            let position = token.position;
            self.advance();
            self.enter(position)?;
            let child = self.parse_not()?;
            self.leave();
            return Ok(Expression::not(child));
        }

        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expression, ParseError> {
        if let Some(token) = self.peek()
            && token.kind == TokenKind::LeftParen
        {
            let open = token.position;
            self.advance();
            self.enter(open)?;
            let expr = self.parse_expression()?;
            self.expect_right_paren(open)?;
            self.leave();
            return Ok(expr);
        }

        let (left, left_position) = self.parse_operand()?;

        if let Some(Token {
            kind: TokenKind::Compare(operator),
            ..
        }) = self.peek()
        {
            let operator = *operator;
            self.advance();
            let (right, _) = self.parse_operand()?;
            return Ok(Expression::compare(operator, left, right));
        }

        if left.is_predicate() {
            return Ok(left);
        }
        match left {
            Expression::Field { path } => Err(ParseError::new(
                left_position,
                format!("字段引用 '{}' 不是布尔条件，缺少比较操作符", path),
            )),
            _ => Err(ParseError::new(
                left_position,
                "只有 true/false 字面量可以单独作为条件",
            )),
        }
    }

    /// 解析比较的一侧：字面量或字段引用
    fn parse_operand(&mut self) -> Result<(Expression, usize), ParseError> {
        let end = self.end;
        let Some(token) = self.advance() else {
            return Err(ParseError::new(end, "表达式意外结束"));
        };

        let position = token.position;
        let expr = match &token.kind {
            TokenKind::Number(n) => Expression::literal(*n),
            TokenKind::String(s) => Expression::literal(s.clone()),
            TokenKind::Boolean(b) => Expression::literal(*b),
            TokenKind::Path(p) => Expression::field(p.clone()),
            TokenKind::RightParen => {
                return Err(ParseError::new(position, "括号不匹配: 意外的 ')'"));
            }
            other => {
                return Err(ParseError::new(
                    position,
                    format!("期望字段或字面量，实际为 {}", other.describe()),
                ));
            }
        };

        Ok((expr, position))
    }

    fn expect_right_paren(&mut self, open: usize) -> Result<(), ParseError> {
        match self.peek() {
            Some(token) if token.kind == TokenKind::RightParen => {
                self.advance();
                Ok(())
            }
            Some(token) => Err(ParseError::new(
                token.position,
                format!("期望 ')'，实际为 {}", token.kind.describe()),
            )),
            None => Err(ParseError::new(
                self.end,
                format!("括号不匹配: 位置 {} 的 '(' 缺少对应的 ')'", open),
            )),
        }
    }

    fn enter(&mut self, position: usize) -> Result<(), ParseError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ParseError::new(
                position,
                format!("嵌套层级超过上限 {}", MAX_DEPTH),
            ));
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.current)
    }

    fn advance(&mut self) -> Option<&Token> {
        if self.current < self.tokens.len() {
            let token = &self.tokens[self.current];
            self.current += 1;
            Some(token)
        } else {
            None
        }
    }

    fn check(&self, expected: &TokenKind) -> bool {
        self.peek().is_some_and(|t| &t.kind == expected)
    }

    fn match_token(&mut self, expected: &TokenKind) -> bool {
        if self.check(expected) {
            self.advance();
            return true;
        }
        false
    }
}
