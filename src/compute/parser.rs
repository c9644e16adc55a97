//! Recursive-descent parser producing a resolved [`Expr`].
//!
//! Precedence, lowest first: `?:`, `== !=`, `< <= > >=`, `+ -`, `* / %`,
//! unary `+ -`, `**`/`^` (right associative, binds tighter than unary on its
//! left operand, so `-2^2 == -4`).
//!
//! Every identifier is resolved here against a [`Scope`] and the math
//! namespace. The only member accesses are `values.<name>` and
//! `Math.<name>`; anything else is a compile error.
use super::ast::{lookup_constant, BinaryOp, Expr, MathFn, MATH_NAMESPACE, VALUES_NAMESPACE};
use super::error::CompileError;
use super::lexer::{tokenize, Spanned, Token};
use super::{is_reserved_name, Limits};

/// The names an expression may reference, mapped to ledger slots by position.
#[derive(Debug, Clone, Default)]
pub struct Scope {
    names: Vec<String>,
}

impl Scope {
    pub fn new<I, S>(names: I) -> Result<Self, CompileError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut scope = Scope::default();
        for name in names {
            scope.push(name.into())?;
        }
        Ok(scope)
    }

    pub fn push(&mut self, name: String) -> Result<u32, CompileError> {
        if is_reserved_name(&name) {
            return Err(CompileError::ReservedName { name });
        }
        if self.names.contains(&name) {
            return Err(CompileError::DuplicateName { name });
        }
        self.names.push(name);
        Ok((self.names.len() - 1) as u32)
    }

    pub fn slot(&self, name: &str) -> Option<u32> {
        self.names.iter().position(|n| n == name).map(|i| i as u32)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }
}

pub struct Parser<'a> {
    tokens: Vec<Spanned>,
    cursor: usize,
    scope: &'a Scope,
    limits: &'a Limits,
    depth: usize,
    nodes: usize,
}

pub fn parse(src: &str, scope: &Scope, limits: &Limits) -> Result<Expr, CompileError> {
    let len = src.chars().count();
    if len > limits.max_length {
        return Err(CompileError::TooLong { len, max: limits.max_length });
    }
    let tokens = tokenize(src)?;
    if tokens.is_empty() {
        return Err(CompileError::Empty);
    }

    let mut parser = Parser { tokens, cursor: 0, scope, limits, depth: 0, nodes: 0 };
    let expr = parser.expression()?;
    match parser.peek() {
        None => Ok(expr),
        Some(t) => Err(parser.unexpected(t.clone(), "end of expression")),
    }
}

impl<'a> Parser<'a> {
    // --- Cursor helpers ---

    fn peek(&self) -> Option<&Spanned> {
        self.tokens.get(self.cursor)
    }

    fn peek_token(&self) -> Option<&Token> {
        self.peek().map(|s| &s.token)
    }

    fn advance(&mut self) -> Option<Spanned> {
        let t = self.tokens.get(self.cursor).cloned();
        if t.is_some() {
            self.cursor += 1;
        }
        t
    }

    fn eat(&mut self, token: &Token) -> bool {
        if self.peek_token() == Some(token) {
            self.cursor += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token, expected: &'static str) -> Result<usize, CompileError> {
        match self.advance() {
            Some(s) if s.token == token => Ok(s.pos),
            Some(s) => Err(self.unexpected(s, expected)),
            None => Err(CompileError::UnexpectedEnd { expected }),
        }
    }

    fn unexpected(&self, found: Spanned, expected: &'static str) -> CompileError {
        CompileError::UnexpectedToken { found: found.token.describe(), expected, pos: found.pos }
    }

    // --- Limits ---

    fn enter(&mut self) -> Result<(), CompileError> {
        self.depth += 1;
        if self.depth > self.limits.max_depth {
            return Err(CompileError::TooDeep { max: self.limits.max_depth });
        }
        Ok(())
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    fn node(&mut self, expr: Expr) -> Result<Expr, CompileError> {
        self.nodes += 1;
        if self.nodes > self.limits.max_nodes {
            return Err(CompileError::TooManyNodes { max: self.limits.max_nodes });
        }
        Ok(expr)
    }

    // --- Grammar ---

    fn expression(&mut self) -> Result<Expr, CompileError> {
        self.enter()?;
        let result = self.conditional();
        self.leave();
        result
    }

    fn conditional(&mut self) -> Result<Expr, CompileError> {
        let cond = self.equality()?;
        if !self.eat(&Token::Question) {
            return Ok(cond);
        }
        let then = self.expression()?;
        self.expect(Token::Colon, "':'")?;
        let otherwise = self.expression()?;
        self.node(Expr::Conditional(Box::new(cond), Box::new(then), Box::new(otherwise)))
    }

    fn binary_level(
        &mut self,
        next: fn(&mut Self) -> Result<Expr, CompileError>,
        ops: &[(Token, BinaryOp)],
    ) -> Result<Expr, CompileError> {
        let mut lhs = next(self)?;
        loop {
            let op = match self.peek_token() {
                Some(t) => ops.iter().find(|(tok, _)| tok == t).map(|&(_, op)| op),
                None => None,
            };
            let Some(op) = op else { return Ok(lhs) };
            self.cursor += 1;
            let rhs = next(self)?;
            lhs = self.node(Expr::Binary(op, Box::new(lhs), Box::new(rhs)))?;
        }
    }

    fn equality(&mut self) -> Result<Expr, CompileError> {
        self.binary_level(Self::relational, &[(Token::EqEq, BinaryOp::Eq), (Token::NotEq, BinaryOp::Ne)])
    }

    fn relational(&mut self) -> Result<Expr, CompileError> {
        self.binary_level(
            Self::additive,
            &[
                (Token::Lt, BinaryOp::Lt),
                (Token::Le, BinaryOp::Le),
                (Token::Gt, BinaryOp::Gt),
                (Token::Ge, BinaryOp::Ge),
            ],
        )
    }

    fn additive(&mut self) -> Result<Expr, CompileError> {
        self.binary_level(Self::multiplicative, &[(Token::Plus, BinaryOp::Add), (Token::Minus, BinaryOp::Sub)])
    }

    fn multiplicative(&mut self) -> Result<Expr, CompileError> {
        self.binary_level(
            Self::unary,
            &[(Token::Star, BinaryOp::Mul), (Token::Slash, BinaryOp::Div), (Token::Percent, BinaryOp::Rem)],
        )
    }

    fn unary(&mut self) -> Result<Expr, CompileError> {
        self.enter()?;
        let result = if self.eat(&Token::Minus) {
            self.unary().and_then(|inner| self.node(Expr::Neg(Box::new(inner))))
        } else if self.eat(&Token::Plus) {
            self.unary()
        } else {
            self.power()
        };
        self.leave();
        result
    }

    fn power(&mut self) -> Result<Expr, CompileError> {
        let base = self.primary()?;
        if !self.eat(&Token::Power) {
            return Ok(base);
        }
        let exponent = self.unary()?;
        self.node(Expr::Binary(BinaryOp::Pow, Box::new(base), Box::new(exponent)))
    }

    fn primary(&mut self) -> Result<Expr, CompileError> {
        let Some(Spanned { token, pos }) = self.advance() else {
            return Err(CompileError::UnexpectedEnd { expected: "a value" });
        };
        match token {
            Token::Number(v) => self.node(Expr::Number(v)),
            Token::LParen => {
                let inner = self.expression()?;
                self.expect(Token::RParen, "')'")?;
                Ok(inner)
            }
            Token::Ident(name) => self.identifier(name, pos),
            other => Err(self.unexpected(Spanned { token: other, pos }, "a value")),
        }
    }

    fn identifier(&mut self, name: String, pos: usize) -> Result<Expr, CompileError> {
        if self.eat(&Token::Dot) {
            let member = match self.advance() {
                Some(Spanned { token: Token::Ident(m), .. }) => m,
                Some(s) => return Err(self.unexpected(s, "a member name")),
                None => return Err(CompileError::UnexpectedEnd { expected: "a member name" }),
            };
            let path = format!("{}.{}", name, member);
            if self.peek_token() == Some(&Token::Dot) {
                return Err(CompileError::ForbiddenAccess { path, pos });
            }
            return match name.as_str() {
                VALUES_NAMESPACE => {
                    if self.peek_token() == Some(&Token::LParen) {
                        return Err(CompileError::NotCallable { name: path, pos });
                    }
                    match self.scope.slot(&member) {
                        Some(slot) => self.node(Expr::Slot(slot)),
                        None => Err(CompileError::UnknownIdentifier { name: path, pos }),
                    }
                }
                MATH_NAMESPACE => self.math_member(&member, path, pos, true),
                _ => Err(CompileError::ForbiddenAccess { path, pos }),
            };
        }

        if name == VALUES_NAMESPACE || name == MATH_NAMESPACE {
            return Err(CompileError::ForbiddenAccess { path: name, pos });
        }
        if let Some(slot) = self.scope.slot(&name) {
            if self.peek_token() == Some(&Token::LParen) {
                return Err(CompileError::NotCallable { name, pos });
            }
            return self.node(Expr::Slot(slot));
        }
        let display = name.clone();
        self.math_member(&name, display, pos, false)
    }

    /// Resolves a function call or constant, bare or under `Math.`.
    fn math_member(&mut self, member: &str, display: String, pos: usize, namespaced: bool) -> Result<Expr, CompileError> {
        if self.peek_token() == Some(&Token::LParen) {
            let Some(func) = MathFn::lookup(member) else {
                return Err(CompileError::UnknownFunction { name: display, pos });
            };
            self.cursor += 1;
            let args = self.arguments()?;
            let arity = func.arity();
            if !arity.accepts(args.len()) {
                return Err(CompileError::Arity {
                    name: func.name(),
                    expected: arity.describe(),
                    found: args.len(),
                    pos,
                });
            }
            return self.node(Expr::Call(func, args));
        }
        if let Some(value) = lookup_constant(member, namespaced) {
            return self.node(Expr::Number(value));
        }
        if MathFn::lookup(member).is_some() {
            return Err(CompileError::NotAValue { name: display, pos });
        }
        if namespaced {
            Err(CompileError::ForbiddenAccess { path: display, pos })
        } else {
            Err(CompileError::UnknownIdentifier { name: display, pos })
        }
    }

    /// Parses the argument list after an opening parenthesis.
    fn arguments(&mut self) -> Result<Vec<Expr>, CompileError> {
        let mut args = Vec::new();
        if self.eat(&Token::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.expression()?);
            if self.eat(&Token::Comma) {
                continue;
            }
            self.expect(Token::RParen, "',' or ')'")?;
            return Ok(args);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn scope() -> Scope {
        Scope::new(["b", "h", "N"]).unwrap()
    }

    fn parse_ok(src: &str) -> Expr {
        parse(src, &scope(), &Limits::default()).unwrap()
    }

    fn parse_err(src: &str) -> CompileError {
        parse(src, &scope(), &Limits::default()).unwrap_err()
    }

    fn bin(op: BinaryOp, a: Expr, b: Expr) -> Expr {
        Expr::Binary(op, Box::new(a), Box::new(b))
    }

    #[test]
    fn test_bare_and_namespaced_params_resolve_to_the_same_slot() {
        assert_eq!(parse_ok("b * h"), parse_ok("values.b * values.h"));
        assert_eq!(parse_ok("b * h"), bin(BinaryOp::Mul, Expr::Slot(0), Expr::Slot(1)));
    }

    #[test]
    fn test_precedence() {
        // 1 + 2 * 3
        assert_eq!(
            parse_ok("1 + 2 * 3"),
            bin(BinaryOp::Add, Expr::Number(1.0), bin(BinaryOp::Mul, Expr::Number(2.0), Expr::Number(3.0)))
        );
        // power is right associative
        assert_eq!(
            parse_ok("2 ^ 3 ** 2"),
            bin(BinaryOp::Pow, Expr::Number(2.0), bin(BinaryOp::Pow, Expr::Number(3.0), Expr::Number(2.0)))
        );
        // unary minus applies after power
        assert_eq!(
            parse_ok("-2 ^ 2"),
            Expr::Neg(Box::new(bin(BinaryOp::Pow, Expr::Number(2.0), Expr::Number(2.0))))
        );
        // comparisons bind looser than arithmetic
        assert_eq!(
            parse_ok("b + 1 > h"),
            bin(BinaryOp::Gt, bin(BinaryOp::Add, Expr::Slot(0), Expr::Number(1.0)), Expr::Slot(1))
        );
    }

    #[test]
    fn test_conditional_nests_to_the_right() {
        let expr = parse_ok("b > 1 ? h : N > 0 ? 1 : 2");
        match expr {
            Expr::Conditional(_, then, otherwise) => {
                assert_eq!(*then, Expr::Slot(1));
                assert!(matches!(*otherwise, Expr::Conditional(..)));
            }
            other => panic!("expected conditional, got {:?}", other),
        }
    }

    #[test]
    fn test_math_namespace() {
        assert_eq!(parse_ok("Math.PI"), Expr::Number(std::f64::consts::PI));
        assert_eq!(parse_ok("π"), parse_ok("pi"));
        assert_eq!(parse_ok("Math.sqrt(b)"), parse_ok("sqrt(b)"));
        assert_eq!(parse_ok("max(b, h, N)"), Expr::Call(MathFn::Max, vec![Expr::Slot(0), Expr::Slot(1), Expr::Slot(2)]));
    }

    #[rstest]
    #[case("require('fs')", "string")]
    #[case("require(1)", "unknown function")]
    #[case("process.env", "forbidden")]
    #[case("values.constructor", "unknown identifier")]
    #[case("values.b.toString", "forbidden")]
    #[case("Math.constructor", "forbidden")]
    #[case("Math", "forbidden")]
    #[case("x + 1", "unknown identifier")]
    #[case("b(1)", "not callable")]
    #[case("sqrt", "not a value")]
    #[case("pow(2)", "arity")]
    #[case("(b", "end")]
    #[case("b h", "token")]
    #[case("", "empty")]
    #[case("   ", "empty")]
    fn test_rejections(#[case] src: &str, #[case] kind: &str) {
        let err = parse_err(src);
        let ok = match kind {
            "string" => matches!(err, CompileError::StringLiteral { .. }),
            "unknown function" => matches!(err, CompileError::UnknownFunction { .. }),
            "forbidden" => matches!(err, CompileError::ForbiddenAccess { .. }),
            "unknown identifier" => matches!(err, CompileError::UnknownIdentifier { .. }),
            "not callable" => matches!(err, CompileError::NotCallable { .. }),
            "not a value" => matches!(err, CompileError::NotAValue { .. }),
            "arity" => matches!(err, CompileError::Arity { .. }),
            "end" => matches!(err, CompileError::UnexpectedEnd { .. }),
            "token" => matches!(err, CompileError::UnexpectedToken { .. }),
            "empty" => matches!(err, CompileError::Empty),
            _ => false,
        };
        assert!(ok, "{:?} gave {:?}, wanted {}", src, err, kind);
    }

    #[test]
    fn test_limits() {
        let limits = Limits { max_length: 16, max_depth: 8, max_nodes: 5, ..Limits::default() };
        let scope = scope();

        let long = "1+".repeat(10) + "1";
        assert!(matches!(parse(&long, &scope, &limits), Err(CompileError::TooLong { .. })));

        let deep = format!("{}1{}", "(".repeat(9), ")".repeat(9));
        let deep_limits = Limits { max_length: 100, ..limits.clone() };
        assert!(matches!(parse(&deep, &scope, &deep_limits), Err(CompileError::TooDeep { max: 8 })));

        assert!(matches!(parse("1+1+1+1", &scope, &limits), Err(CompileError::TooManyNodes { max: 5 })));
    }

    #[test]
    fn test_scope_rejects_reserved_and_duplicate_names() {
        assert!(matches!(Scope::new(["b", "sqrt"]), Err(CompileError::ReservedName { .. })));
        assert!(matches!(Scope::new(["b", "b"]), Err(CompileError::DuplicateName { .. })));
        assert_eq!(scope().slot("N"), Some(2));
    }
}
