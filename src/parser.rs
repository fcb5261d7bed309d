use std::fmt;

use crate::{
    expr,
    scanner::{self, TokenType},
};

#[derive(Default)]
struct Parser {
    tokens: Vec<scanner::Token>,
    current: usize,
    next_id: u64,
    errors: Vec<Error>,
}

#[derive(Debug, Clone)]
pub enum Error {
    TokenMismatch {
        expected: scanner::TokenType,
        found: scanner::Token,
        maybe_on_err_string: Option<String>,
    },
    MaxParamsExceeded {
        line: usize,
        col: i64,
    },
    TooManyArguments {
        line: usize,
        col: i64,
    },
    ExpectedExpression {
        token_type: scanner::TokenType,
        line: usize,
        col: i64,
    },
    InvalidAssignmentTarget {
        line: usize,
        col: i64,
    },
    InvalidTokenInUnaryOp {
        token_type: scanner::TokenType,
        line: usize,
        col: i64,
    },
    InvalidTokenInBinaryOp {
        token_type: scanner::TokenType,
        line: usize,
        col: i64,
    },
    InvalidTokenInLogicalOp {
        token_type: scanner::TokenType,
        line: usize,
        col: i64,
    },
}

impl Error {
    pub fn position(&self) -> (usize, i64) {
        match self {
            Error::TokenMismatch { found, .. } => (found.line, found.col),
            Error::MaxParamsExceeded { line, col }
            | Error::TooManyArguments { line, col }
            | Error::ExpectedExpression { line, col, .. }
            | Error::InvalidAssignmentTarget { line, col }
            | Error::InvalidTokenInUnaryOp { line, col, .. }
            | Error::InvalidTokenInBinaryOp { line, col, .. }
            | Error::InvalidTokenInLogicalOp { line, col, .. } => (*line, *col),
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self {
            Error::TokenMismatch {
                maybe_on_err_string,
                expected,
                found,
            } => {
                write!(
                    f,
                    "Expected token {:?} but found {:?} at line={},col={}",
                    expected, found.ty, found.line, found.col
                )?;
                if let Some(on_err_string) = maybe_on_err_string {
                    write!(f, ": {}", on_err_string)?;
                }
                Ok(())
            }
            Error::MaxParamsExceeded { line, col } => write!(
                f,
                "Can't have more than 255 parameters. Line={},col={}",
                line, col
            ),
            Error::TooManyArguments { line, col } => write!(
                f,
                "Can't have more than 255 arguments. Line={},col={}",
                line, col
            ),
            Error::ExpectedExpression {
                token_type,
                line,
                col,
            } => write!(
                f,
                "Expected expression, but found token {:?} at line={},col={}",
                token_type, line, col
            ),
            Error::InvalidAssignmentTarget { line, col } => {
                write!(f, "Invalid assignment target at line={},col={}", line, col)
            }
            Error::InvalidTokenInUnaryOp {
                token_type,
                line,
                col,
            } => write!(
                f,
                "invalid token in unary op {:?} at line={},col={}",
                token_type, line, col
            ),
            Error::InvalidTokenInBinaryOp {
                token_type,
                line,
                col,
            } => write!(
                f,
                "invalid token in binary op {:?} at line={},col={}",
                token_type, line, col
            ),
            Error::InvalidTokenInLogicalOp {
                token_type,
                line,
                col,
            } => write!(
                f,
                "invalid token in logical op {:?} at line={},col={}",
                token_type, line, col
            ),
        }
    }
}

/// Parses a whole compilation unit. A syntax error inside one declaration
/// is recorded and the parser resynchronizes at the next statement
/// boundary, so the returned error list can hold one entry per malformed
/// declaration. Callers must not hand the statements to the resolver when
/// the error list is non-empty.
pub fn parse(tokens: Vec<scanner::Token>) -> (Vec<expr::Stmt>, Vec<Error>) {
    let (statements, _, errors) = parse_with_id_offset(tokens, 0);
    (statements, errors)
}

/// Like `parse`, but node ids start at `first_id`. The REPL threads the
/// returned next id through successive lines so distances recorded for
/// earlier lines stay valid.
pub fn parse_with_id_offset(
    tokens: Vec<scanner::Token>,
    first_id: u64,
) -> (Vec<expr::Stmt>, u64, Vec<Error>) {
    let mut p = Parser {
        tokens,
        next_id: first_id,
        ..Default::default()
    };
    let statements = p.parse();
    (statements, p.next_id, p.errors)
}

impl Parser {
    fn parse(&mut self) -> Vec<expr::Stmt> {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            match self.declaration() {
                Ok(stmt) => statements.push(stmt),
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize();
                }
            }
        }

        statements
    }

    fn declaration(&mut self) -> Result<expr::Stmt, Error> {
        if self.matches(TokenType::Class) {
            return self.class_decl();
        }

        if self.matches(TokenType::Fun) {
            return Ok(expr::Stmt::FunDecl(self.fun_decl("function")?));
        }

        if self.matches(TokenType::Var) {
            return self.var_decl();
        }

        self.statement()
    }

    fn class_decl(&mut self) -> Result<expr::Stmt, Error> {
        let name_tok = self
            .consume(TokenType::Identifier, "Expected class name.")?
            .clone();
        let name = Parser::symbol(&name_tok);

        let superclass = if self.matches(TokenType::Less) {
            let superclass_tok = self
                .consume(TokenType::Identifier, "Expected superclass name.")?
                .clone();
            Some((self.fresh_id(), Parser::symbol(&superclass_tok)))
        } else {
            None
        };

        self.consume(TokenType::LeftBrace, "Expected '{' before class body.")?;

        let mut methods = Vec::new();
        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            methods.push(self.fun_decl("method")?);
        }

        self.consume(TokenType::RightBrace, "Expected '}' after class body.")?;

        Ok(expr::Stmt::ClassDecl(expr::ClassDecl {
            name,
            superclass,
            methods,
        }))
    }

    fn fun_decl(&mut self, kind: &str) -> Result<expr::FunDecl, Error> {
        let name_tok = self
            .consume(TokenType::Identifier, &format!("Expected {} name.", kind))?
            .clone();
        let name = Parser::symbol(&name_tok);

        let (params, body) = self.params_and_body(kind)?;

        Ok(expr::FunDecl { name, params, body })
    }

    fn params_and_body(&mut self, kind: &str) -> Result<(Vec<expr::Symbol>, Vec<expr::Stmt>), Error> {
        self.consume(
            TokenType::LeftParen,
            &format!("Expected '(' after {} name.", kind),
        )?;

        let mut params = Vec::new();

        if !self.check(TokenType::RightParen) {
            loop {
                if params.len() >= 255 {
                    let (line, col) = (self.peek().line, self.peek().col);
                    // reported but not fatal: the declaration still parses
                    self.errors.push(Error::MaxParamsExceeded { line, col });
                }

                let param_tok = self
                    .consume(TokenType::Identifier, "Expected parameter name.")?
                    .clone();
                params.push(Parser::symbol(&param_tok));

                if !self.matches(TokenType::Comma) {
                    break;
                }
            }
        }

        self.consume(TokenType::RightParen, "Expected ')' after parameters.")?;
        self.consume(
            TokenType::LeftBrace,
            &format!("Expected '{{' before {} body.", kind),
        )?;
        let body = self.block()?;

        Ok((params, body))
    }

    fn var_decl(&mut self) -> Result<expr::Stmt, Error> {
        let name_tok = self
            .consume(TokenType::Identifier, "Expected variable name.")?
            .clone();

        let maybe_initializer = if self.matches(TokenType::Equal) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(
            TokenType::Semicolon,
            "Expected ';' after variable declaration.",
        )?;

        Ok(expr::Stmt::VarDecl(
            Parser::symbol(&name_tok),
            maybe_initializer,
        ))
    }

    fn statement(&mut self) -> Result<expr::Stmt, Error> {
        if self.matches(TokenType::For) {
            return self.for_statement();
        }

        if self.matches(TokenType::If) {
            return self.if_statement();
        }

        if self.matches(TokenType::Print) {
            return self.print_statement();
        }

        if self.matches(TokenType::Return) {
            return self.return_statement();
        }

        if self.matches(TokenType::While) {
            return self.while_statement();
        }

        if self.matches(TokenType::LeftBrace) {
            return Ok(expr::Stmt::Block(self.block()?));
        }

        self.expression_statement()
    }

    // `for` has no statement node of its own: it desugars into the
    // equivalent initializer/while/increment shape.
    fn for_statement(&mut self) -> Result<expr::Stmt, Error> {
        self.consume(TokenType::LeftParen, "Expected '(' after 'for'.")?;

        let initializer = if self.matches(TokenType::Semicolon) {
            None
        } else if self.matches(TokenType::Var) {
            Some(self.var_decl()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if !self.check(TokenType::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::Semicolon, "Expected ';' after loop condition.")?;

        let increment = if !self.check(TokenType::RightParen) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenType::RightParen, "Expected ')' after for clauses.")?;

        let mut body = self.statement()?;

        if let Some(increment) = increment {
            body = expr::Stmt::Block(vec![body, expr::Stmt::Expr(increment)]);
        }

        let condition = condition.unwrap_or(expr::Expr::Literal(expr::Literal::True));
        body = expr::Stmt::While(condition, Box::new(body));

        if let Some(initializer) = initializer {
            body = expr::Stmt::Block(vec![initializer, body]);
        }

        Ok(body)
    }

    fn if_statement(&mut self) -> Result<expr::Stmt, Error> {
        self.consume(TokenType::LeftParen, "Expected '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expected ')' after if condition.")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.matches(TokenType::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(expr::Stmt::If(condition, then_branch, else_branch))
    }

    fn print_statement(&mut self) -> Result<expr::Stmt, Error> {
        let expr = self.expression()?;
        self.consume(TokenType::Semicolon, "Expected ';' after value.")?;
        Ok(expr::Stmt::Print(expr))
    }

    fn return_statement(&mut self) -> Result<expr::Stmt, Error> {
        let prev_tok = self.previous().clone();

        let maybe_retval = if !self.check(TokenType::Semicolon) {
            Some(self.expression()?)
        } else {
            None
        };

        self.consume(TokenType::Semicolon, "Expected ';' after return value.")?;

        Ok(expr::Stmt::Return(
            expr::SourceLocation {
                line: prev_tok.line,
                col: prev_tok.col,
            },
            maybe_retval,
        ))
    }

    fn while_statement(&mut self) -> Result<expr::Stmt, Error> {
        self.consume(TokenType::LeftParen, "Expected '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenType::RightParen, "Expected ')' after condition.")?;
        let body = Box::new(self.statement()?);
        Ok(expr::Stmt::While(condition, body))
    }

    fn block(&mut self) -> Result<Vec<expr::Stmt>, Error> {
        let mut stmts = Vec::new();

        while !self.check(TokenType::RightBrace) && !self.is_at_end() {
            stmts.push(self.declaration()?)
        }

        self.consume(TokenType::RightBrace, "Expected '}' after block.")?;

        Ok(stmts)
    }

    fn expression_statement(&mut self) -> Result<expr::Stmt, Error> {
        let expr = self.expression()?;
        self.consume(TokenType::Semicolon, "Expected ';' after expression.")?;
        Ok(expr::Stmt::Expr(expr))
    }

    fn expression(&mut self) -> Result<expr::Expr, Error> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<expr::Expr, Error> {
        let expr = self.logical_or()?;

        if self.matches(TokenType::Equal) {
            let equals = self.previous().clone();
            let value = Box::new(self.assignment()?);

            return match expr {
                expr::Expr::Variable(_, sym) => {
                    Ok(expr::Expr::Assign(self.fresh_id(), sym, value))
                }
                expr::Expr::Get(object, name) => Ok(expr::Expr::Set(object, name, value)),
                other => {
                    // reported but not fatal: the left-hand expression is
                    // returned unchanged and parsing continues
                    self.errors.push(Error::InvalidAssignmentTarget {
                        line: equals.line,
                        col: equals.col,
                    });
                    Ok(other)
                }
            };
        }

        Ok(expr)
    }

    fn logical_or(&mut self) -> Result<expr::Expr, Error> {
        let mut expr = self.logical_and()?;

        while self.matches(TokenType::Or) {
            let operator_token = self.previous().clone();
            let right = Box::new(self.logical_and()?);
            let logical_op = Parser::op_token_to_logical_op(&operator_token)?;
            expr = expr::Expr::Logical(Box::new(expr), logical_op, right);
        }

        Ok(expr)
    }

    fn logical_and(&mut self) -> Result<expr::Expr, Error> {
        let mut expr = self.equality()?;

        while self.matches(TokenType::And) {
            let operator_token = self.previous().clone();
            let right = Box::new(self.equality()?);
            let logical_op = Parser::op_token_to_logical_op(&operator_token)?;
            expr = expr::Expr::Logical(Box::new(expr), logical_op, right);
        }

        Ok(expr)
    }

    fn equality(&mut self) -> Result<expr::Expr, Error> {
        let mut expr = self.comparison()?;

        while self.match_one_of(vec![TokenType::BangEqual, TokenType::EqualEqual]) {
            let operator_token = self.previous().clone();
            let right = Box::new(self.comparison()?);
            let binop = Parser::op_token_to_binop(&operator_token)?;
            expr = expr::Expr::Binary(Box::new(expr), binop, right);
        }

        Ok(expr)
    }

    fn comparison(&mut self) -> Result<expr::Expr, Error> {
        let mut expr = self.term()?;

        while self.match_one_of(vec![
            TokenType::Greater,
            TokenType::GreaterEqual,
            TokenType::Less,
            TokenType::LessEqual,
        ]) {
            let operator_token = self.previous().clone();
            let right = Box::new(self.term()?);
            let binop = Parser::op_token_to_binop(&operator_token)?;
            expr = expr::Expr::Binary(Box::new(expr), binop, right);
        }

        Ok(expr)
    }

    fn term(&mut self) -> Result<expr::Expr, Error> {
        let mut expr = self.factor()?;

        while self.match_one_of(vec![TokenType::Minus, TokenType::Plus]) {
            let operator_token = self.previous().clone();
            let right = Box::new(self.factor()?);
            let binop = Parser::op_token_to_binop(&operator_token)?;
            expr = expr::Expr::Binary(Box::new(expr), binop, right);
        }

        Ok(expr)
    }

    fn factor(&mut self) -> Result<expr::Expr, Error> {
        let mut expr = self.unary()?;

        while self.match_one_of(vec![TokenType::Slash, TokenType::Star]) {
            let operator_token = self.previous().clone();
            let right = Box::new(self.unary()?);
            let binop = Parser::op_token_to_binop(&operator_token)?;
            expr = expr::Expr::Binary(Box::new(expr), binop, right);
        }

        Ok(expr)
    }

    fn unary(&mut self) -> Result<expr::Expr, Error> {
        if self.match_one_of(vec![TokenType::Bang, TokenType::Minus]) {
            let operator_token = self.previous().clone();
            let right = Box::new(self.unary()?);
            let unary_op = Parser::op_token_to_unary_op(&operator_token)?;
            return Ok(expr::Expr::Unary(unary_op, right));
        }

        self.call()
    }

    fn call(&mut self) -> Result<expr::Expr, Error> {
        let mut expr = self.primary()?;

        loop {
            if self.matches(TokenType::LeftParen) {
                expr = self.finish_call(expr)?;
            } else if self.matches(TokenType::Dot) {
                let name_tok = self
                    .consume(TokenType::Identifier, "Expected property name after '.'.")?
                    .clone();
                expr = expr::Expr::Get(Box::new(expr), Parser::symbol(&name_tok));
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: expr::Expr) -> Result<expr::Expr, Error> {
        let mut arguments = Vec::new();

        if !self.check(TokenType::RightParen) {
            loop {
                if arguments.len() >= 255 {
                    let (line, col) = (self.peek().line, self.peek().col);
                    // reported but not fatal: the call node is still built
                    self.errors.push(Error::TooManyArguments { line, col });
                }
                arguments.push(self.expression()?);
                if !self.matches(TokenType::Comma) {
                    break;
                }
            }
        }

        let token = self.consume(TokenType::RightParen, "Expected ')' after arguments.")?;

        Ok(expr::Expr::Call(
            Box::new(callee),
            expr::SourceLocation {
                line: token.line,
                col: token.col,
            },
            arguments,
        ))
    }

    fn primary(&mut self) -> Result<expr::Expr, Error> {
        if self.matches(TokenType::False) {
            return Ok(expr::Expr::Literal(expr::Literal::False));
        }
        if self.matches(TokenType::True) {
            return Ok(expr::Expr::Literal(expr::Literal::True));
        }
        if self.matches(TokenType::Nil) {
            return Ok(expr::Expr::Literal(expr::Literal::Nil));
        }
        if self.matches(TokenType::Number) {
            match &self.previous().literal {
                Some(scanner::Literal::Number(n)) => {
                    return Ok(expr::Expr::Literal(expr::Literal::Number(*n)))
                }
                other => panic!(
                    "internal error in parser: when parsing number, found literal {:?}",
                    other
                ),
            }
        }
        if self.matches(TokenType::String) {
            match &self.previous().literal {
                Some(scanner::Literal::Str(s)) => {
                    return Ok(expr::Expr::Literal(expr::Literal::Str(s.clone())))
                }
                other => panic!(
                    "internal error in parser: when parsing string, found literal {:?}",
                    other
                ),
            }
        }
        if self.matches(TokenType::Super) {
            let keyword = self.previous().clone();
            self.consume(TokenType::Dot, "Expected '.' after 'super'.")?;
            let method_tok = self
                .consume(TokenType::Identifier, "Expected superclass method name.")?
                .clone();
            return Ok(expr::Expr::Super(
                self.fresh_id(),
                expr::SourceLocation {
                    line: keyword.line,
                    col: keyword.col,
                },
                Parser::symbol(&method_tok),
            ));
        }
        if self.matches(TokenType::This) {
            let keyword = self.previous();
            let loc = expr::SourceLocation {
                line: keyword.line,
                col: keyword.col,
            };
            return Ok(expr::Expr::This(self.fresh_id(), loc));
        }
        if self.matches(TokenType::Identifier) {
            let name_tok = self.previous().clone();
            return Ok(expr::Expr::Variable(
                self.fresh_id(),
                Parser::symbol(&name_tok),
            ));
        }
        if self.matches(TokenType::LeftParen) {
            let expr = Box::new(self.expression()?);
            self.consume(TokenType::RightParen, "Expected ')' after expression.")?;
            return Ok(expr::Expr::Grouping(expr));
        }

        Err(Error::ExpectedExpression {
            token_type: self.peek().ty,
            line: self.peek().line,
            col: self.peek().col,
        })
    }

    // Discard tokens until a statement boundary so one malformed
    // declaration yields roughly one diagnostic instead of a cascade.
    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().ty == TokenType::Semicolon {
                return;
            }

            match self.peek().ty {
                TokenType::Class
                | TokenType::Fun
                | TokenType::Var
                | TokenType::For
                | TokenType::If
                | TokenType::While
                | TokenType::Print
                | TokenType::Return => return,
                _ => {}
            }

            self.advance();
        }
    }

    fn fresh_id(&mut self) -> expr::NodeId {
        let id = expr::NodeId(self.next_id);
        self.next_id += 1;
        id
    }

    fn symbol(tok: &scanner::Token) -> expr::Symbol {
        match &tok.literal {
            Some(scanner::Literal::Identifier(name)) => expr::Symbol {
                name: name.clone(),
                line: tok.line,
                col: tok.col,
            },
            other => panic!(
                "internal error in parser: expected identifier literal, found {:?}",
                other
            ),
        }
    }

    fn op_token_to_unary_op(tok: &scanner::Token) -> Result<expr::UnaryOp, Error> {
        match tok.ty {
            TokenType::Minus => Ok(expr::UnaryOp {
                ty: expr::UnaryOpTy::Minus,
                line: tok.line,
                col: tok.col,
            }),
            TokenType::Bang => Ok(expr::UnaryOp {
                ty: expr::UnaryOpTy::Bang,
                line: tok.line,
                col: tok.col,
            }),
            _ => Err(Error::InvalidTokenInUnaryOp {
                token_type: tok.ty,
                line: tok.line,
                col: tok.col,
            }),
        }
    }

    fn op_token_to_binop(tok: &scanner::Token) -> Result<expr::BinaryOp, Error> {
        let ty = match tok.ty {
            TokenType::EqualEqual => expr::BinaryOpTy::EqualEqual,
            TokenType::BangEqual => expr::BinaryOpTy::NotEqual,
            TokenType::Less => expr::BinaryOpTy::Less,
            TokenType::LessEqual => expr::BinaryOpTy::LessEqual,
            TokenType::Greater => expr::BinaryOpTy::Greater,
            TokenType::GreaterEqual => expr::BinaryOpTy::GreaterEqual,
            TokenType::Plus => expr::BinaryOpTy::Plus,
            TokenType::Minus => expr::BinaryOpTy::Minus,
            TokenType::Star => expr::BinaryOpTy::Star,
            TokenType::Slash => expr::BinaryOpTy::Slash,
            _ => {
                return Err(Error::InvalidTokenInBinaryOp {
                    token_type: tok.ty,
                    line: tok.line,
                    col: tok.col,
                })
            }
        };
        Ok(expr::BinaryOp {
            ty,
            line: tok.line,
            col: tok.col,
        })
    }

    fn op_token_to_logical_op(tok: &scanner::Token) -> Result<expr::LogicalOp, Error> {
        let ty = match tok.ty {
            TokenType::And => expr::LogicalOpTy::And,
            TokenType::Or => expr::LogicalOpTy::Or,
            _ => {
                return Err(Error::InvalidTokenInLogicalOp {
                    token_type: tok.ty,
                    line: tok.line,
                    col: tok.col,
                })
            }
        };
        Ok(expr::LogicalOp {
            ty,
            line: tok.line,
            col: tok.col,
        })
    }

    fn match_one_of(&mut self, types: Vec<TokenType>) -> bool {
        for ty in types.iter() {
            if self.matches(*ty) {
                return true;
            }
        }
        false
    }

    fn matches(&mut self, ty: TokenType) -> bool {
        if self.check(ty) {
            self.advance();
            return true;
        }
        false
    }

    fn consume(&mut self, tok: TokenType, on_err_str: &str) -> Result<&scanner::Token, Error> {
        if self.check(tok) {
            return Ok(self.advance());
        }
        Err(Error::TokenMismatch {
            expected: tok,
            found: self.peek().clone(),
            maybe_on_err_string: Some(on_err_str.into()),
        })
    }

    fn check(&self, ty: TokenType) -> bool {
        if self.is_at_end() {
            return false;
        }

        self.peek().ty == ty
    }

    fn advance(&mut self) -> &scanner::Token {
        if !self.is_at_end() {
            self.current += 1
        }

        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().ty == TokenType::Eof
    }

    fn peek(&self) -> &scanner::Token {
        &self.tokens[self.current]
    }

    fn previous(&self) -> &scanner::Token {
        &self.tokens[self.current - 1]
    }
}

#[cfg(test)]
mod tests {
    use crate::expr::{BinaryOpTy, Expr, Literal, Stmt};
    use crate::parser::*;
    use crate::scanner;

    fn parse_source(source: &str) -> (Vec<Stmt>, Vec<Error>) {
        let tokens = scanner::scan_tokens(source.to_string()).unwrap();
        parse(tokens)
    }

    fn parse_stmt(source: &str) -> Stmt {
        let (stmts, errors) = parse_source(source);
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
        assert_eq!(stmts.len(), 1, "expected one statement");
        stmts.into_iter().next().unwrap()
    }

    #[test]
    fn test_parses_var_declaration() {
        match parse_stmt("var x = 5;") {
            Stmt::VarDecl(name, Some(Expr::Literal(Literal::Number(n)))) => {
                assert_eq!(name.name, "x");
                assert_eq!(n, 5.0);
            }
            stmt => panic!("expected var declaration, got {:?}", stmt),
        }
    }

    #[test]
    fn test_binary_precedence() {
        match parse_stmt("1 + 2 * 3 == 7;") {
            Stmt::Expr(Expr::Binary(left, op, _)) => {
                assert_eq!(op.ty, BinaryOpTy::EqualEqual);
                match *left {
                    Expr::Binary(_, add_op, mul) => {
                        assert_eq!(add_op.ty, BinaryOpTy::Plus);
                        match *mul {
                            Expr::Binary(_, mul_op, _) => assert_eq!(mul_op.ty, BinaryOpTy::Star),
                            expr => panic!("expected product on the right, got {:?}", expr),
                        }
                    }
                    expr => panic!("expected sum on the left, got {:?}", expr),
                }
            }
            stmt => panic!("expected binary expression statement, got {:?}", stmt),
        }
    }

    #[test]
    fn test_assignment_rewrites_variable_to_assign() {
        match parse_stmt("x = x + 1;") {
            Stmt::Expr(Expr::Assign(_, sym, value)) => {
                assert_eq!(sym.name, "x");
                match *value {
                    Expr::Binary(_, op, _) => assert_eq!(op.ty, BinaryOpTy::Plus),
                    expr => panic!("expected binary value, got {:?}", expr),
                }
            }
            stmt => panic!("expected assignment, got {:?}", stmt),
        }
    }

    #[test]
    fn test_property_assignment_rewrites_get_to_set() {
        match parse_stmt("a.b = 3;") {
            Stmt::Expr(Expr::Set(object, name, _)) => {
                match *object {
                    Expr::Variable(_, sym) => assert_eq!(sym.name, "a"),
                    expr => panic!("expected variable object, got {:?}", expr),
                }
                assert_eq!(name.name, "b");
            }
            stmt => panic!("expected property set, got {:?}", stmt),
        }
    }

    #[test]
    fn test_invalid_assignment_target_is_nonfatal() {
        let (stmts, errors) = parse_source("x * y = 5;");
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], Error::InvalidAssignmentTarget { .. }));
        // the left-hand expression survives as the statement
        assert_eq!(stmts.len(), 1);
        match &stmts[0] {
            Stmt::Expr(Expr::Binary(_, op, _)) => assert_eq!(op.ty, BinaryOpTy::Star),
            stmt => panic!("expected binary expression statement, got {:?}", stmt),
        }
    }

    #[test]
    fn test_call_chaining() {
        match parse_stmt("a.b(c).d;") {
            Stmt::Expr(Expr::Get(object, name)) => {
                assert_eq!(name.name, "d");
                match *object {
                    Expr::Call(callee, _, args) => {
                        assert_eq!(args.len(), 1);
                        match *callee {
                            Expr::Get(_, method) => assert_eq!(method.name, "b"),
                            expr => panic!("expected property access callee, got {:?}", expr),
                        }
                    }
                    expr => panic!("expected call, got {:?}", expr),
                }
            }
            stmt => panic!("expected trailing property access, got {:?}", stmt),
        }
    }

    #[test]
    fn test_for_loop_desugars_to_while() {
        let stmt = parse_stmt("for (var i = 0; i < 3; i = i + 1) print i;");
        match stmt {
            Stmt::Block(stmts) => {
                assert_eq!(stmts.len(), 2);
                assert!(matches!(stmts[0], Stmt::VarDecl(_, Some(_))));
                match &stmts[1] {
                    Stmt::While(condition, body) => {
                        assert!(matches!(condition, Expr::Binary(_, op, _) if op.ty == BinaryOpTy::Less));
                        match body.as_ref() {
                            Stmt::Block(body_stmts) => {
                                assert_eq!(body_stmts.len(), 2);
                                assert!(matches!(body_stmts[0], Stmt::Print(_)));
                                assert!(matches!(body_stmts[1], Stmt::Expr(Expr::Assign(_, _, _))));
                            }
                            stmt => panic!("expected block body, got {:?}", stmt),
                        }
                    }
                    stmt => panic!("expected while statement, got {:?}", stmt),
                }
            }
            stmt => panic!("expected desugared block, got {:?}", stmt),
        }
    }

    #[test]
    fn test_for_loop_without_condition_defaults_to_true() {
        let stmt = parse_stmt("for (;;) print 1;");
        match stmt {
            Stmt::While(Expr::Literal(Literal::True), _) => {}
            stmt => panic!("expected while(true), got {:?}", stmt),
        }
    }

    #[test]
    fn test_class_declaration_with_superclass_and_methods() {
        let stmt = parse_stmt("class Cruller < Doughnut { finish() { print 1; } }");
        match stmt {
            Stmt::ClassDecl(decl) => {
                assert_eq!(decl.name.name, "Cruller");
                let (_, superclass) = decl.superclass.expect("expected superclass");
                assert_eq!(superclass.name, "Doughnut");
                assert_eq!(decl.methods.len(), 1);
                assert_eq!(decl.methods[0].name.name, "finish");
            }
            stmt => panic!("expected class declaration, got {:?}", stmt),
        }
    }

    #[test]
    fn test_super_and_this_parse_inside_method_body() {
        let stmt = parse_stmt("class A < B { f() { super.f(); print this; } }");
        match stmt {
            Stmt::ClassDecl(decl) => {
                let body = &decl.methods[0].body;
                assert!(matches!(
                    body[0],
                    Stmt::Expr(Expr::Call(ref callee, _, _)) if matches!(**callee, Expr::Super(_, _, _))
                ));
                assert!(matches!(body[1], Stmt::Print(Expr::This(_, _))));
            }
            stmt => panic!("expected class declaration, got {:?}", stmt),
        }
    }

    #[test]
    fn test_syntax_error_recovers_at_statement_boundary() {
        let (stmts, errors) = parse_source("if (true\nprint 1;\nprint 2;");
        assert_eq!(errors.len(), 1);
        assert!(matches!(
            errors[0],
            Error::TokenMismatch {
                expected: scanner::TokenType::RightParen,
                ..
            }
        ));
        // parsing resumed after the ';' boundary: the last statement survives
        assert_eq!(stmts.len(), 1);
        assert!(matches!(stmts[0], Stmt::Print(_)));
    }

    #[test]
    fn test_one_diagnostic_per_malformed_statement() {
        let (_, errors) = parse_source("var = 1;\nvar = 2;\nprint 3;");
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_255_arguments_parse_cleanly() {
        let args: Vec<String> = (0..255).map(|i| i.to_string()).collect();
        let source = format!("f({});", args.join(", "));
        let (stmts, errors) = parse_source(&source);
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
        match &stmts[0] {
            Stmt::Expr(Expr::Call(_, _, arguments)) => assert_eq!(arguments.len(), 255),
            stmt => panic!("expected call, got {:?}", stmt),
        }
    }

    #[test]
    fn test_256_arguments_yield_one_diagnostic_but_complete_node() {
        let args: Vec<String> = (0..256).map(|i| i.to_string()).collect();
        let source = format!("f({});", args.join(", "));
        let (stmts, errors) = parse_source(&source);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], Error::TooManyArguments { .. }));
        match &stmts[0] {
            Stmt::Expr(Expr::Call(_, _, arguments)) => assert_eq!(arguments.len(), 256),
            stmt => panic!("expected call, got {:?}", stmt),
        }
    }

    #[test]
    fn test_256_parameters_yield_one_diagnostic_but_complete_node() {
        let params: Vec<String> = (0..256).map(|i| format!("p{}", i)).collect();
        let source = format!("fun f({}) {{ }}", params.join(", "));
        let (stmts, errors) = parse_source(&source);
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], Error::MaxParamsExceeded { .. }));
        match &stmts[0] {
            Stmt::FunDecl(decl) => assert_eq!(decl.params.len(), 256),
            stmt => panic!("expected function declaration, got {:?}", stmt),
        }
    }

    #[test]
    fn test_node_ids_are_unique_and_offset() {
        let tokens = scanner::scan_tokens("print a + b;".to_string()).unwrap();
        let (_, next_id, errors) = parse_with_id_offset(tokens, 10);
        assert!(errors.is_empty());
        assert_eq!(next_id, 12); // two variable references
    }
}
