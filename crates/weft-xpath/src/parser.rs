//! Recursive-descent XPath 1.0 parser

use crate::ast::{ArithOp, Axis, CompareOp, Expr, NodeTest, PathExpr, PathStart, Step};
use crate::lexer::{tokenize, Spanned, Token};
use crate::XPathError;

/// Parse an expression string
pub fn parse(input: &str) -> Result<Expr, XPathError> {
    let tokens = tokenize(input)?;
    if tokens.is_empty() {
        return Err(XPathError::EmptyExpression);
    }
    let mut parser = Parser { tokens, pos: 0 };
    let expr = parser.or_expr()?;
    match parser.tokens.get(parser.pos) {
        None => Ok(expr),
        Some(extra) => Err(XPathError::UnexpectedToken {
            pos: extra.pos,
            found: format!("{:?}", extra.token),
        }),
    }
}

struct Parser {
    tokens: Vec<Spanned>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|s| &s.token)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token> {
        self.tokens.get(self.pos + offset).map(|s| &s.token)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|s| s.token.clone());
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

    fn expect(&mut self, expected: &Token) -> Result<(), XPathError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.unexpected())
        }
    }

    fn unexpected(&self) -> XPathError {
        match self.tokens.get(self.pos) {
            Some(s) => XPathError::UnexpectedToken { pos: s.pos, found: format!("{:?}", s.token) },
            None => XPathError::UnexpectedEnd,
        }
    }

    fn or_expr(&mut self) -> Result<Expr, XPathError> {
        let mut lhs = self.and_expr()?;
        while self.eat(&Token::Or) {
            let rhs = self.and_expr()?;
            lhs = Expr::Or(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn and_expr(&mut self) -> Result<Expr, XPathError> {
        let mut lhs = self.equality_expr()?;
        while self.eat(&Token::And) {
            let rhs = self.equality_expr()?;
            lhs = Expr::And(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    fn equality_expr(&mut self) -> Result<Expr, XPathError> {
        let mut lhs = self.relational_expr()?;
        loop {
            let op = match self.peek() {
                Some(Token::Eq) => CompareOp::Eq,
                Some(Token::NotEq) => CompareOp::NotEq,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.relational_expr()?;
            lhs = Expr::Compare(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn relational_expr(&mut self) -> Result<Expr, XPathError> {
        let mut lhs = self.additive_expr()?;
        loop {
            let op = match self.peek() {
                Some(Token::Lt) => CompareOp::Lt,
                Some(Token::Le) => CompareOp::Le,
                Some(Token::Gt) => CompareOp::Gt,
                Some(Token::Ge) => CompareOp::Ge,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.additive_expr()?;
            lhs = Expr::Compare(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn additive_expr(&mut self) -> Result<Expr, XPathError> {
        let mut lhs = self.multiplicative_expr()?;
        loop {
            let op = match self.peek() {
                Some(Token::Plus) => ArithOp::Add,
                Some(Token::Minus) => ArithOp::Sub,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.multiplicative_expr()?;
            lhs = Expr::Arith(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn multiplicative_expr(&mut self) -> Result<Expr, XPathError> {
        let mut lhs = self.unary_expr()?;
        loop {
            let op = match self.peek() {
                Some(Token::Multiply) => ArithOp::Mul,
                Some(Token::Div) => ArithOp::Div,
                Some(Token::Mod) => ArithOp::Mod,
                _ => return Ok(lhs),
            };
            self.pos += 1;
            let rhs = self.unary_expr()?;
            lhs = Expr::Arith(op, Box::new(lhs), Box::new(rhs));
        }
    }

    fn unary_expr(&mut self) -> Result<Expr, XPathError> {
        if self.eat(&Token::Minus) {
            let inner = self.unary_expr()?;
            return Ok(Expr::Negate(Box::new(inner)));
        }
        self.union_expr()
    }

    fn union_expr(&mut self) -> Result<Expr, XPathError> {
        let mut lhs = self.path_expr()?;
        while self.eat(&Token::Pipe) {
            let rhs = self.path_expr()?;
            lhs = Expr::Union(Box::new(lhs), Box::new(rhs));
        }
        Ok(lhs)
    }

    /// Whether the upcoming tokens start a filter expression rather than a
    /// location path
    fn at_filter_start(&self) -> bool {
        match self.peek() {
            Some(Token::Literal(_) | Token::Number(_) | Token::LParen | Token::Dollar) => true,
            Some(Token::Name(name)) => {
                self.peek_at(1) == Some(&Token::LParen) && !is_node_type(name)
            }
            _ => false,
        }
    }

    fn path_expr(&mut self) -> Result<Expr, XPathError> {
        if self.at_filter_start() {
            let primary = self.primary_expr()?;
            let predicates = self.predicates()?;

            let mut steps = Vec::new();
            if !self.continue_relative_path(&mut steps)? && predicates.is_empty() {
                return Ok(primary);
            }
            return Ok(Expr::Path(PathExpr {
                start: PathStart::Filter(Box::new(primary), predicates),
                steps,
            }));
        }
        self.location_path().map(Expr::Path)
    }

    /// Parse `('/' | '//') RelativeLocationPath` if present
    fn continue_relative_path(&mut self, steps: &mut Vec<Step>) -> Result<bool, XPathError> {
        match self.peek() {
            Some(Token::Slash) => {
                self.pos += 1;
                self.relative_path(steps)?;
                Ok(true)
            }
            Some(Token::DoubleSlash) => {
                self.pos += 1;
                steps.push(Step::descendant_or_self());
                self.relative_path(steps)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn location_path(&mut self) -> Result<PathExpr, XPathError> {
        let mut steps = Vec::new();
        match self.peek() {
            Some(Token::Slash) => {
                self.pos += 1;
                if self.at_step_start() {
                    self.relative_path(&mut steps)?;
                }
                Ok(PathExpr { start: PathStart::Root, steps })
            }
            Some(Token::DoubleSlash) => {
                self.pos += 1;
                steps.push(Step::descendant_or_self());
                self.relative_path(&mut steps)?;
                Ok(PathExpr { start: PathStart::Root, steps })
            }
            _ => {
                self.relative_path(&mut steps)?;
                Ok(PathExpr { start: PathStart::Context, steps })
            }
        }
    }

    fn at_step_start(&self) -> bool {
        matches!(
            self.peek(),
            Some(Token::Dot | Token::DotDot | Token::At | Token::Star | Token::Name(_))
        )
    }

    fn relative_path(&mut self, steps: &mut Vec<Step>) -> Result<(), XPathError> {
        steps.push(self.step()?);
        loop {
            match self.peek() {
                Some(Token::Slash) => {
                    self.pos += 1;
                    steps.push(self.step()?);
                }
                Some(Token::DoubleSlash) => {
                    self.pos += 1;
                    steps.push(Step::descendant_or_self());
                    steps.push(self.step()?);
                }
                _ => return Ok(()),
            }
        }
    }

    fn step(&mut self) -> Result<Step, XPathError> {
        if self.eat(&Token::Dot) {
            return Ok(Step { axis: Axis::SelfAxis, test: NodeTest::Node, predicates: Vec::new() });
        }
        if self.eat(&Token::DotDot) {
            return Ok(Step { axis: Axis::Parent, test: NodeTest::Node, predicates: Vec::new() });
        }

        let axis = if self.eat(&Token::At) {
            Axis::Attribute
        } else if let (Some(Token::Name(name)), Some(Token::DoubleColon)) =
            (self.peek(), self.peek_at(1))
        {
            let axis = Axis::parse(name).ok_or_else(|| XPathError::UnknownAxis(name.clone()))?;
            self.pos += 2;
            axis
        } else {
            Axis::Child
        };

        let test = self.node_test()?;
        let predicates = self.predicates()?;
        Ok(Step { axis, test, predicates })
    }

    fn node_test(&mut self) -> Result<NodeTest, XPathError> {
        match self.advance() {
            Some(Token::Star) => Ok(NodeTest::Any),
            Some(Token::Name(name)) => {
                if self.peek() == Some(&Token::LParen) && is_node_type(&name) {
                    self.pos += 1;
                    // processing-instruction('target') is accepted and ignored
                    if name == "processing-instruction" {
                        if let Some(Token::Literal(_)) = self.peek() {
                            self.pos += 1;
                        }
                    }
                    self.expect(&Token::RParen)?;
                    return Ok(match name.as_str() {
                        "node" => NodeTest::Node,
                        "text" => NodeTest::Text,
                        "comment" => NodeTest::Comment,
                        _ => NodeTest::ProcessingInstruction,
                    });
                }
                if name.ends_with(":*") {
                    Ok(NodeTest::Any)
                } else {
                    Ok(NodeTest::Name(name))
                }
            }
            other => {
                if other.is_some() {
                    self.pos -= 1;
                }
                Err(self.unexpected())
            }
        }
    }

    fn predicates(&mut self) -> Result<Vec<Expr>, XPathError> {
        let mut predicates = Vec::new();
        while self.eat(&Token::LBracket) {
            predicates.push(self.or_expr()?);
            self.expect(&Token::RBracket)?;
        }
        Ok(predicates)
    }

    fn primary_expr(&mut self) -> Result<Expr, XPathError> {
        match self.advance() {
            Some(Token::Literal(s)) => Ok(Expr::Literal(s)),
            Some(Token::Number(n)) => Ok(Expr::Number(n)),
            Some(Token::LParen) => {
                let inner = self.or_expr()?;
                self.expect(&Token::RParen)?;
                Ok(inner)
            }
            Some(Token::Dollar) => Err(XPathError::Unsupported("variable references".into())),
            Some(Token::Name(name)) => {
                self.expect(&Token::LParen)?;
                let mut args = Vec::new();
                if !self.eat(&Token::RParen) {
                    loop {
                        args.push(self.or_expr()?);
                        if self.eat(&Token::Comma) {
                            continue;
                        }
                        self.expect(&Token::RParen)?;
                        break;
                    }
                }
                Ok(Expr::Function(name, args))
            }
            other => {
                if other.is_some() {
                    self.pos -= 1;
                }
                Err(self.unexpected())
            }
        }
    }
}

fn is_node_type(name: &str) -> bool {
    matches!(name, "node" | "text" | "comment" | "processing-instruction")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn child(name: &str) -> Step {
        Step { axis: Axis::Child, test: NodeTest::Name(name.into()), predicates: Vec::new() }
    }

    #[test]
    fn test_absolute_descendant_path() {
        let expr = parse("//html").unwrap();
        assert_eq!(
            expr,
            Expr::Path(PathExpr {
                start: PathStart::Root,
                steps: vec![Step::descendant_or_self(), child("html")],
            })
        );
    }

    #[test]
    fn test_relative_path_with_predicate() {
        let expr = parse("./input[2]").unwrap();
        let Expr::Path(path) = expr else { panic!("expected path") };
        assert_eq!(path.start, PathStart::Context);
        assert_eq!(path.steps.len(), 2);
        assert_eq!(path.steps[0].axis, Axis::SelfAxis);
        assert_eq!(path.steps[1].predicates, vec![Expr::Number(2.0)]);
    }

    #[test]
    fn test_root_only() {
        assert_eq!(
            parse("/").unwrap(),
            Expr::Path(PathExpr { start: PathStart::Root, steps: vec![] })
        );
    }

    #[test]
    fn test_filter_expression() {
        let expr = parse("(//a)[1]/@href").unwrap();
        let Expr::Path(path) = expr else { panic!("expected path") };
        assert!(matches!(path.start, PathStart::Filter(_, ref preds) if preds.len() == 1));
        assert_eq!(path.steps[0].axis, Axis::Attribute);
    }

    #[test]
    fn test_function_call_not_path() {
        assert_eq!(
            parse("count(//a) > 1").unwrap(),
            Expr::Compare(
                CompareOp::Gt,
                Box::new(Expr::Function(
                    "count".into(),
                    vec![Expr::Path(PathExpr {
                        start: PathStart::Root,
                        steps: vec![Step::descendant_or_self(), child("a")],
                    })]
                )),
                Box::new(Expr::Number(1.0)),
            )
        );
    }

    #[test]
    fn test_text_node_test() {
        let Expr::Path(path) = parse("//p/text()").unwrap() else { panic!("expected path") };
        assert_eq!(path.steps[2].test, NodeTest::Text);
    }

    #[test]
    fn test_errors() {
        assert_eq!(parse(""), Err(XPathError::EmptyExpression));
        assert!(matches!(parse("//div["), Err(XPathError::UnexpectedEnd)));
        assert!(matches!(parse("bogus::div"), Err(XPathError::UnknownAxis(_))));
        assert!(matches!(parse("//a ]"), Err(XPathError::UnexpectedToken { .. })));
        assert!(matches!(parse("$v"), Err(XPathError::Unsupported(_))));
    }
}
