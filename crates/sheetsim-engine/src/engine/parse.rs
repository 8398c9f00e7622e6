//! Formula tokenizer and recursive-descent parser.
//!
//! Grammar (the leading `=` is already stripped):
//!
//! ```text
//! formula      := expr
//! expr         := term (('+' | '-') term)*
//! term         := unary (('*' | '/') unary)*
//! unary        := ('-' | '+') unary | primary
//! primary      := number | string | cellRef | call | '(' expr ')'
//! call         := AGGREGATE '(' [aggArg (',' aggArg)*] ')'
//!               | 'IF' '(' condition ',' expr ',' expr ')'
//! aggArg       := cellRef ':' cellRef | expr
//! condition    := expr [compareOp expr]
//! compareOp    := '>' | '<' | '>=' | '<=' | '=' | '<>'
//! ```
//!
//! Whitespace outside string literals is stripped before tokenizing. The
//! tokenizer only accepts digits, `.`, letters, the operators above,
//! parentheses, `,`, `:` and quoted strings; any other character is a
//! syntax error, so nothing outside this language is ever evaluated.

use super::ast::{AggregateArg, AggregateFn, BinaryOp, CompareOp, Expr, UnaryOp};
use super::cell_ref::{CellRange, CellRef};
use super::error::{EvalError, EvalResult};

/// Deepest allowed nesting of parentheses and unary operators.
const MAX_NESTING: usize = 64;

/// Most binary and comparison operators in one formula. Operator chains
/// build left-deep trees, so this bounds the tree depth too.
const MAX_OPERATORS: usize = 256;

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Number(f64),
    Text(String),
    /// Function name, uppercased
    Ident(String),
    Cell(CellRef),
    Plus,
    Minus,
    Star,
    Slash,
    LeftParen,
    RightParen,
    Comma,
    Colon,
    Equal,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
}

fn syntax(message: impl Into<String>) -> EvalError {
    EvalError::Syntax(message.into())
}

/// Parse a formula (without its leading `=`) into an AST.
pub fn parse_formula(formula: &str) -> EvalResult<Expr> {
    let stripped = strip_whitespace(formula);
    let tokens = tokenize(&stripped)?;
    if tokens.is_empty() {
        return Err(syntax("empty formula"));
    }

    let mut parser = Parser {
        tokens,
        pos: 0,
        depth: 0,
        operators: 0,
    };
    let expr = parser.parse_expr()?;
    if let Some(token) = parser.peek() {
        return Err(syntax(format!("unexpected {:?} after expression", token)));
    }
    Ok(expr)
}

/// Remove whitespace outside `"..."` literals.
fn strip_whitespace(formula: &str) -> String {
    let mut out = String::with_capacity(formula.len());
    let mut in_string = false;
    for ch in formula.chars() {
        if ch == '"' {
            in_string = !in_string;
        }
        if in_string || ch == '"' || !ch.is_whitespace() {
            out.push(ch);
        }
    }
    out
}

fn tokenize(input: &str) -> EvalResult<Vec<Token>> {
    let chars: Vec<char> = input.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let token = match c {
            '+' => Token::Plus,
            '-' => Token::Minus,
            '*' => Token::Star,
            '/' => Token::Slash,
            '(' => Token::LeftParen,
            ')' => Token::RightParen,
            ',' => Token::Comma,
            ':' => Token::Colon,
            '=' => Token::Equal,
            '<' => match chars.get(i + 1) {
                Some('=') => {
                    i += 1;
                    Token::LessEqual
                }
                Some('>') => {
                    i += 1;
                    Token::NotEqual
                }
                _ => Token::LessThan,
            },
            '>' => {
                if chars.get(i + 1) == Some(&'=') {
                    i += 1;
                    Token::GreaterEqual
                } else {
                    Token::GreaterThan
                }
            }
            '"' => {
                let (text, next) = scan_string(&chars, i)?;
                tokens.push(Token::Text(text));
                i = next;
                continue;
            }
            c if c.is_ascii_digit() || c == '.' => {
                let start = i;
                while i < chars.len() && chars[i].is_ascii_digit() {
                    i += 1;
                }
                if i < chars.len() && chars[i] == '.' {
                    i += 1;
                    while i < chars.len() && chars[i].is_ascii_digit() {
                        i += 1;
                    }
                }
                let text: String = chars[start..i].iter().collect();
                let n = text
                    .parse::<f64>()
                    .map_err(|_| syntax(format!("invalid number '{}'", text)))?;
                tokens.push(Token::Number(n));
                continue;
            }
            c if c.is_ascii_alphabetic() => {
                let start = i;
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_') {
                    i += 1;
                }
                let text: String = chars[start..i].iter().collect();
                let is_call = chars.get(i) == Some(&'(');
                let token = match CellRef::from_str(&text) {
                    Some(cell) if !is_call => Token::Cell(cell),
                    _ if text.chars().all(|c| c.is_ascii_alphabetic() || c == '_') => {
                        Token::Ident(text.to_ascii_uppercase())
                    }
                    _ => return Err(syntax(format!("invalid reference '{}'", text))),
                };
                tokens.push(token);
                continue;
            }
            other => return Err(syntax(format!("unexpected character '{}'", other))),
        };
        tokens.push(token);
        i += 1;
    }

    Ok(tokens)
}

/// Scan a `"..."` literal starting at `start`; `""` is an escaped quote.
/// Returns the text and the index after the closing quote.
fn scan_string(chars: &[char], start: usize) -> EvalResult<(String, usize)> {
    let mut text = String::new();
    let mut i = start + 1;
    while i < chars.len() {
        if chars[i] == '"' {
            if chars.get(i + 1) == Some(&'"') {
                text.push('"');
                i += 2;
                continue;
            }
            return Ok((text, i + 1));
        }
        text.push(chars[i]);
        i += 1;
    }
    Err(syntax("unterminated string literal"))
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    depth: usize,
    operators: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset)
    }

    fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).cloned();
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    fn eat(&mut self, expected: &Token) -> bool {
        if self.peek() == Some(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token) -> EvalResult<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(syntax(format!("expected {:?}, got {:?}", expected, self.peek())))
        }
    }

    fn nested<T>(&mut self, f: impl FnOnce(&mut Self) -> EvalResult<T>) -> EvalResult<T> {
        if self.depth >= MAX_NESTING {
            return Err(syntax("formula is nested too deeply"));
        }
        self.depth += 1;
        let result = f(self);
        self.depth -= 1;
        result
    }

    /// Consume one binary or comparison operator token.
    fn take_operator(&mut self) -> EvalResult<()> {
        if self.operators >= MAX_OPERATORS {
            return Err(syntax(format!(
                "formula has more than {} operators",
                MAX_OPERATORS
            )));
        }
        self.operators += 1;
        self.pos += 1;
        Ok(())
    }

    fn parse_expr(&mut self) -> EvalResult<Expr> {
        let mut left = self.parse_term()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => BinaryOp::Add,
                Some(Token::Minus) => BinaryOp::Subtract,
                _ => break,
            };
            self.take_operator()?;
            let right = self.parse_term()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_term(&mut self) -> EvalResult<Expr> {
        let mut left = self.parse_unary()?;
        loop {
            let op = match self.peek() {
                Some(Token::Star) => BinaryOp::Multiply,
                Some(Token::Slash) => BinaryOp::Divide,
                _ => break,
            };
            self.take_operator()?;
            let right = self.parse_unary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn parse_unary(&mut self) -> EvalResult<Expr> {
        let op = match self.peek() {
            Some(Token::Minus) => UnaryOp::Negate,
            Some(Token::Plus) => UnaryOp::Plus,
            _ => return self.parse_primary(),
        };
        self.pos += 1;
        let operand = self.nested(Self::parse_unary)?;
        Ok(Expr::Unary {
            op,
            operand: Box::new(operand),
        })
    }

    fn parse_primary(&mut self) -> EvalResult<Expr> {
        match self.next() {
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::Text(s)) => Ok(Expr::Text(s)),
            Some(Token::Cell(cell)) => {
                if self.peek() == Some(&Token::Colon) {
                    return Err(syntax(format!(
                        "range starting at {} is only allowed as a function argument",
                        cell
                    )));
                }
                Ok(Expr::CellRef(cell))
            }
            Some(Token::Ident(name)) => {
                self.expect(&Token::LeftParen)?;
                self.nested(|p| p.parse_call(&name))
            }
            Some(Token::LeftParen) => {
                let expr = self.nested(Self::parse_expr)?;
                self.expect(&Token::RightParen)?;
                Ok(expr)
            }
            Some(token) => Err(syntax(format!("unexpected {:?}", token))),
            None => Err(syntax("unexpected end of formula")),
        }
    }

    /// Parse a call after its opening parenthesis, through the closing one.
    fn parse_call(&mut self, name: &str) -> EvalResult<Expr> {
        if let Some(func) = AggregateFn::from_name(name) {
            let args = self.parse_aggregate_args()?;
            return Ok(Expr::Aggregate { func, args });
        }
        if name == "IF" {
            return self.parse_if();
        }
        Err(EvalError::UnknownFunction(name.to_string()))
    }

    fn parse_aggregate_args(&mut self) -> EvalResult<Vec<AggregateArg>> {
        let mut args = Vec::new();
        if self.eat(&Token::RightParen) {
            return Ok(args);
        }
        loop {
            let arg = match (self.peek(), self.peek_at(1), self.peek_at(2)) {
                (Some(Token::Cell(start)), Some(Token::Colon), Some(Token::Cell(end))) => {
                    let range = CellRange::new(*start, *end);
                    self.pos += 3;
                    AggregateArg::Range(range)
                }
                _ => match self.parse_expr()? {
                    Expr::CellRef(cell) => AggregateArg::Cell(cell),
                    expr => AggregateArg::Expr(expr),
                },
            };
            args.push(arg);
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(&Token::RightParen)?;
            return Ok(args);
        }
    }

    fn parse_if(&mut self) -> EvalResult<Expr> {
        let condition = self.parse_condition()?;
        let mut branches = Vec::new();
        while self.eat(&Token::Comma) {
            branches.push(self.parse_expr()?);
        }
        self.expect(&Token::RightParen)?;

        let actual = branches.len() + 1;
        let (Some(else_branch), Some(then_branch), None) =
            (branches.pop(), branches.pop(), branches.pop())
        else {
            return Err(EvalError::Arity {
                function: "IF",
                expected: 3,
                actual,
            });
        };
        Ok(Expr::Conditional {
            condition: Box::new(condition),
            then_branch: Box::new(then_branch),
            else_branch: Box::new(else_branch),
        })
    }

    fn parse_condition(&mut self) -> EvalResult<Expr> {
        let left = self.parse_expr()?;
        let op = match self.peek() {
            Some(Token::Equal) => CompareOp::Equal,
            Some(Token::NotEqual) => CompareOp::NotEqual,
            Some(Token::LessThan) => CompareOp::LessThan,
            Some(Token::LessEqual) => CompareOp::LessEqual,
            Some(Token::GreaterThan) => CompareOp::GreaterThan,
            Some(Token::GreaterEqual) => CompareOp::GreaterEqual,
            _ => return Ok(left),
        };
        self.take_operator()?;
        let right = self.parse_expr()?;
        Ok(Expr::Compare {
            op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn cell(label: &str) -> Expr {
        Expr::CellRef(CellRef::from_str(label).unwrap())
    }

    fn bin(op: BinaryOp, left: Expr, right: Expr) -> Expr {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    #[test]
    fn test_precedence() {
        let expr = parse_formula("1+2*3").unwrap();
        assert_eq!(
            expr,
            bin(
                BinaryOp::Add,
                Expr::Number(1.0),
                bin(BinaryOp::Multiply, Expr::Number(2.0), Expr::Number(3.0))
            )
        );
    }

    #[test]
    fn test_left_associative() {
        let expr = parse_formula("A1-B1-C1").unwrap();
        assert_eq!(
            expr,
            bin(
                BinaryOp::Subtract,
                bin(BinaryOp::Subtract, cell("A1"), cell("B1")),
                cell("C1")
            )
        );
    }

    #[test]
    fn test_whitespace_is_insignificant() {
        assert_eq!(parse_formula(" A 1 + B1 ").unwrap(), parse_formula("A1+B1").unwrap());
        assert_eq!(
            parse_formula(r#"IF(A1>1, "a b", "c")"#).unwrap(),
            Expr::Conditional {
                condition: Box::new(Expr::Compare {
                    op: CompareOp::GreaterThan,
                    left: Box::new(cell("A1")),
                    right: Box::new(Expr::Number(1.0)),
                }),
                then_branch: Box::new(Expr::Text("a b".into())),
                else_branch: Box::new(Expr::Text("c".into())),
            }
        );
    }

    #[test]
    fn test_aggregate_arguments() {
        let expr = parse_formula("sum(A1:A5, B1, 2*3)").unwrap();
        let Expr::Aggregate { func, args } = expr else {
            panic!("expected aggregate");
        };
        assert_eq!(func, AggregateFn::Sum);
        assert_eq!(
            args,
            vec![
                AggregateArg::Range(CellRange::new(CellRef::new(0, 0), CellRef::new(4, 0))),
                AggregateArg::Cell(CellRef::new(0, 1)),
                AggregateArg::Expr(bin(BinaryOp::Multiply, Expr::Number(2.0), Expr::Number(3.0))),
            ]
        );
        assert_eq!(
            parse_formula("MAX()").unwrap(),
            Expr::Aggregate {
                func: AggregateFn::Max,
                args: vec![]
            }
        );
    }

    #[test]
    fn test_nested_if() {
        let expr = parse_formula(r#"IF(A1>=90,"A",IF(A1>=80,"B","F"))"#).unwrap();
        let Expr::Conditional { else_branch, .. } = expr else {
            panic!("expected conditional");
        };
        assert!(matches!(*else_branch, Expr::Conditional { .. }));
    }

    #[test]
    fn test_if_arity() {
        assert_eq!(
            parse_formula("IF(A1>1,2)").unwrap_err(),
            EvalError::Arity {
                function: "IF",
                expected: 3,
                actual: 2
            }
        );
        assert!(matches!(
            parse_formula("IF(1,2,3,4)").unwrap_err(),
            EvalError::Arity { actual: 4, .. }
        ));
    }

    #[test]
    fn test_escaped_quote() {
        assert_eq!(parse_formula(r#""say ""hi""""#).unwrap(), Expr::Text("say \"hi\"".into()));
    }

    #[test]
    fn test_rejects_disallowed_characters() {
        for bad in ["A1;B1", "1^2", "alert`x`", "A1&B1", "{1}", "1%", "$A$1"] {
            assert!(
                matches!(parse_formula(bad), Err(EvalError::Syntax(_))),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_syntax_errors() {
        for bad in ["", "1+", "(1", "1)", "1,2", "A0", "A1:B2", r#""open"#, "1.2.3", "SUM(A1:)"] {
            assert!(parse_formula(bad).is_err(), "{bad} should fail");
        }
    }

    #[test]
    fn test_comparison_outside_if_is_rejected() {
        assert!(parse_formula("A1>1").is_err());
    }

    #[test]
    fn test_unknown_function() {
        assert_eq!(
            parse_formula("FOO(1)").unwrap_err(),
            EvalError::UnknownFunction("FOO".into())
        );
        assert_eq!(
            parse_formula("LOG10(1)").unwrap_err(),
            EvalError::Syntax("invalid reference 'LOG10'".into())
        );
    }

    #[test]
    fn test_unary_minus() {
        assert_eq!(
            parse_formula("-A1").unwrap(),
            Expr::Unary {
                op: UnaryOp::Negate,
                operand: Box::new(cell("A1"))
            }
        );
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}1{}", "(".repeat(200), ")".repeat(200));
        assert_eq!(
            parse_formula(&deep).unwrap_err(),
            EvalError::Syntax("formula is nested too deeply".into())
        );
        let ok = format!("{}1{}", "(".repeat(10), ")".repeat(10));
        assert_eq!(parse_formula(&ok).unwrap(), Expr::Number(1.0));
    }

    #[test]
    fn test_operator_limit() {
        let long_sum = vec!["1"; 5000].join("+");
        assert_eq!(
            parse_formula(&long_sum).unwrap_err(),
            EvalError::Syntax("formula has more than 256 operators".into())
        );
        let long_product = vec!["A1"; 300].join("*");
        assert!(parse_formula(&long_product).is_err());

        let ok = vec!["1"; 257].join("+");
        assert!(parse_formula(&ok).is_ok());
    }
}
