//! 词法分析
//!
//! 将规则表达式文本切分为带位置信息的 token 序列。
//! 关键字 `AND`/`OR`/`NOT`/`true`/`false` 不区分大小写；单个 `=` 视为 `==`。

use crate::error::ParseError;
use crate::operators::Operator;

/// token 类型
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // 字面量
    Number(f64),
    String(String),
    Boolean(bool),
    /// 标识符或点号路径
    Path(String),

    // 关键字
    And,
    Or,
    Not,

    Compare(Operator),
    LeftParen,
    RightParen,
}

impl TokenKind {
    /// 用于错误信息的描述
    pub fn describe(&self) -> String {
        match self {
            Self::Number(n) => format!("数值 {}", n),
            Self::String(s) => format!("字符串 '{}'", s),
            Self::Boolean(b) => format!("布尔值 {}", b),
            Self::Path(p) => format!("字段 {}", p),
            Self::And => "AND".to_string(),
            Self::Or => "OR".to_string(),
            Self::Not => "NOT".to_string(),
            Self::Compare(op) => format!("操作符 {}", op),
            Self::LeftParen => "'('".to_string(),
            Self::RightParen => "')'".to_string(),
        }
    }
}

/// 带起始字节偏移的 token
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub position: usize,
}

/// 词法分析器
pub struct Lexer<'a> {
    input: &'a str,
    chars: std::iter::Peekable<std::str::CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    /// 切分全部输入
    pub fn tokenize(mut self) -> Result<Vec<Token>, ParseError> {
        let mut tokens = Vec::new();

        while let Some(&(pos, ch)) = self.chars.peek() {
            let kind = match ch {
                c if c.is_whitespace() => {
                    self.chars.next();
                    continue;
                }
                '(' => {
                    self.chars.next();
                    TokenKind::LeftParen
                }
                ')' => {
                    self.chars.next();
                    TokenKind::RightParen
                }
                '=' | '!' | '<' | '>' => self.operator(pos, ch)?,
                '\'' | '"' => self.string(pos, ch)?,
                '-' | '0'..='9' => self.number(pos)?,
                c if c.is_ascii_alphabetic() || c == '_' => self.word(pos)?,
                other => {
                    return Err(ParseError::new(pos, format!("无效字符 '{}'", other)));
                }
            };

            tokens.push(Token {
                kind,
                position: pos,
            });
        }

        Ok(tokens)
    }

    fn next_is(&mut self, expected: char) -> bool {
        if matches!(self.chars.peek(), Some(&(_, c)) if c == expected) {
            self.chars.next();
            true
        } else {
            false
        }
    }

    fn operator(&mut self, pos: usize, first: char) -> Result<TokenKind, ParseError> {
        self.chars.next();
        let op = match first {
            // 单个 '=' 兼容旧规则写法
            '=' => {
                self.next_is('=');
                Operator::Eq
            }
            '!' => {
                if !self.next_is('=') {
                    return Err(ParseError::new(pos, "无效操作符 '!'，请使用 NOT 或 !="));
                }
                Operator::Neq
            }
            '<' => {
                if self.next_is('=') {
                    Operator::Lte
                } else {
                    Operator::Lt
                }
            }
            _ => {
                if self.next_is('=') {
                    Operator::Gte
                } else {
                    Operator::Gt
                }
            }
        };
        Ok(TokenKind::Compare(op))
    }

    fn string(&mut self, pos: usize, quote: char) -> Result<TokenKind, ParseError> {
        self.chars.next();
        let mut value = String::new();

        loop {
            let Some((at, ch)) = self.chars.next() else {
                return Err(ParseError::new(pos, "字符串未结束"));
            };

            match ch {
                c if c == quote => return Ok(TokenKind::String(value)),
                '\\' => {
                    let Some((_, escaped)) = self.chars.next() else {
                        return Err(ParseError::new(pos, "字符串未结束"));
                    };
                    match escaped {
                        '\\' | '\'' | '"' => value.push(escaped),
                        'n' => value.push('\n'),
                        't' => value.push('\t'),
                        other => {
                            return Err(ParseError::new(
                                at,
                                format!("无效的转义序列 '\\{}'", other),
                            ));
                        }
                    }
                }
                c => value.push(c),
            }
        }
    }

    fn number(&mut self, pos: usize) -> Result<TokenKind, ParseError> {
        let mut end = pos;

        if self.next_is('-') {
            end += 1;
            if !matches!(self.chars.peek(), Some(&(_, c)) if c.is_ascii_digit()) {
                return Err(ParseError::new(pos, "'-' 之后必须是数字"));
            }
        }

        end = self.digits(end);

        if matches!(self.chars.peek(), Some(&(_, '.'))) {
            self.chars.next();
            end += 1;
            if !matches!(self.chars.peek(), Some(&(_, c)) if c.is_ascii_digit()) {
                return Err(ParseError::new(pos, "小数点之后必须是数字"));
            }
            end = self.digits(end);
        }

        if matches!(self.chars.peek(), Some(&(_, 'e' | 'E'))) {
            self.chars.next();
            end += 1;
            if matches!(self.chars.peek(), Some(&(_, '+' | '-'))) {
                self.chars.next();
                end += 1;
            }
            if !matches!(self.chars.peek(), Some(&(_, c)) if c.is_ascii_digit()) {
                return Err(ParseError::new(pos, "指数部分必须是数字"));
            }
            end = self.digits(end);
        }

        let text = &self.input[pos..end];
        let value: f64 = text
            .parse()
            .map_err(|_| ParseError::new(pos, format!("无效数值: {}", text)))?;

        if !value.is_finite() {
            return Err(ParseError::new(pos, format!("数值超出范围: {}", text)));
        }

        Ok(TokenKind::Number(value))
    }

    /// 消费连续的 ASCII 数字，返回新的结束偏移
    fn digits(&mut self, mut end: usize) -> usize {
        while let Some(&(_, c)) = self.chars.peek() {
            if !c.is_ascii_digit() {
                break;
            }
            self.chars.next();
            end += 1;
        }
        end
    }

    fn word(&mut self, pos: usize) -> Result<TokenKind, ParseError> {
        let mut end = pos;
        while let Some(&(at, c)) = self.chars.peek() {
            if !(c.is_ascii_alphanumeric() || c == '_' || c == '.') {
                break;
            }
            self.chars.next();
            end = at + c.len_utf8();
        }

        let word = &self.input[pos..end];

        if !word.contains('.') {
            let kind = match word.to_ascii_uppercase().as_str() {
                "AND" => TokenKind::And,
                "OR" => TokenKind::Or,
                "NOT" => TokenKind::Not,
                "TRUE" => TokenKind::Boolean(true),
                "FALSE" => TokenKind::Boolean(false),
                _ => TokenKind::Path(word.to_string()),
            };
            return Ok(kind);
        }

        validate_path(word, pos)?;
        Ok(TokenKind::Path(word.to_string()))
    }
}

/// 校验点号路径：各段非空，首段为标识符，后续段为标识符或数组下标
fn validate_path(path: &str, pos: usize) -> Result<(), ParseError> {
    let mut offset = pos;
    for (i, segment) in path.split('.').enumerate() {
        if segment.is_empty() {
            return Err(ParseError::new(offset, format!("字段路径 '{}' 含有空段", path)));
        }

        let is_index = segment.chars().all(|c| c.is_ascii_digit());
        if i == 0 && is_index {
            return Err(ParseError::new(offset, format!("字段路径 '{}' 必须以标识符开头", path)));
        }

        if !is_index && segment.starts_with(|c: char| c.is_ascii_digit()) {
            return Err(ParseError::new(
                offset,
                format!("字段路径段 '{}' 不能以数字开头", segment),
            ));
        }

        offset += segment.len() + 1;
    }
    Ok(())
}
