use super::intern::InternedSymbol;
use crate::frontend::{
    SourceFile,
    ast::{
        BinaryOperator, BinaryOperatorKind, Expression, ExpressionKind, FormalDeclaration,
        FunctionDeclaration, GlobalItem, GlobalItemKind, Identifier, NodeId, Program, Statement,
        StatementKind, TypeSpec, TypeSpecKind, UnaryOperator, UnaryOperatorKind,
        VariableDeclaration,
    },
    lexer::{Keyword, Lexer, Span, Token, TokenKind},
};

#[derive(Debug)]
pub struct Parser<'source> {
    lexer: Lexer<'source>,
    next_node_id: u32,
}

impl<'source> Parser<'source> {
    pub fn parse_program(source_file: &'source SourceFile) -> Program<'source> {
        let mut parser = Self {
            lexer: Lexer::new(source_file),
            next_node_id: 0,
        };

        let mut program = Program {
            source_file,
            globals: Vec::new(),
        };

        while !parser.lexer.is_eof() && parser.lexer.peek().is_some() {
            program.globals.push(parser.parse_global_item());
        }

        program
    }

    fn create_node_id(&mut self) -> NodeId {
        let id = NodeId(self.next_node_id);
        self.next_node_id += 1;
        id
    }

    fn report_fatal_error(&self, offending_span: Span, message: &str) -> ! {
        eprintln!(
            "{} ({})",
            message,
            self.lexer.source().format_span_position(offending_span),
        );
        self.lexer.source().highlight_span(offending_span);
        std::process::exit(1);
    }

    fn report_fatal_eof(&self, expecting: &str) -> ! {
        eprintln!(
            "Expected {expecting} but reached end of file ({})",
            self.lexer.source().origin
        );
        std::process::exit(1);
    }

    fn expect_peek(&mut self, expecting: &str) -> Token {
        let Some(token) = self.lexer.peek() else {
            self.report_fatal_eof(expecting)
        };

        token
    }

    fn expect_next(&mut self, expecting: &str) -> Token {
        let Some(token) = self.lexer.next() else {
            self.report_fatal_eof(expecting)
        };

        token
    }

    fn expect_next_to_be(&mut self, kind: TokenKind) -> Token {
        let token = self.expect_next(&format!("{kind:?}"));

        if token.kind != kind {
            self.report_fatal_error(
                token.span,
                &format!(
                    "Expected {:?} but found {:?} ({})",
                    kind,
                    token.kind,
                    self.lexer.source().value_of_span(token.span)
                ),
            )
        }

        token
    }

    fn expect_keyword(&mut self, keyword: Keyword) -> Token {
        self.expect_next_to_be(TokenKind::Keyword(keyword))
    }

    fn next_is(&mut self, kind: TokenKind) -> bool {
        self.lexer.peek().is_some_and(|t| t.kind == kind)
    }

    /// A top level item: a function declaration, a global variable
    /// declaration, or a global statement
    fn parse_global_item(&mut self) -> GlobalItem {
        let peeked = self.expect_peek("global declaration or statement");

        if peeked.kind.is_type_keyword() {
            let ty = self.parse_type_spec();
            let name = self.parse_identifier();

            // A parenthesis after `type name` means a function declaration;
            // anything else must be a variable declaration
            if self.next_is(TokenKind::OpenParen) {
                let function = Box::new(self.parse_function_declaration(ty, name));

                return GlobalItem {
                    id: self.create_node_id(),
                    span: function.span,
                    kind: GlobalItemKind::Function(function),
                };
            }

            let statement = self.parse_variable_declaration_statement(ty, name);

            return GlobalItem {
                id: self.create_node_id(),
                span: statement.span,
                kind: GlobalItemKind::Statement(statement),
            };
        }

        let statement = self.parse_statement();

        GlobalItem {
            id: self.create_node_id(),
            span: statement.span,
            kind: GlobalItemKind::Statement(statement),
        }
    }

    // int ptr
    fn parse_type_spec(&mut self) -> TypeSpec {
        let token = self.expect_next("type");

        let base_kind = match token.kind {
            TokenKind::Keyword(Keyword::Int) => TypeSpecKind::Int,
            TokenKind::Keyword(Keyword::Short) => TypeSpecKind::Short,
            TokenKind::Keyword(Keyword::Bool) => TypeSpecKind::Bool,
            TokenKind::Keyword(Keyword::Void) => TypeSpecKind::Void,
            _ => self.report_fatal_error(
                token.span,
                &format!(
                    "Expected a type but found: {}",
                    self.lexer.source().value_of_span(token.span)
                ),
            ),
        };

        let mut spec = TypeSpec {
            id: self.create_node_id(),
            span: token.span,
            kind: base_kind,
        };

        // Each trailing `ptr` wraps the type written so far
        while self.next_is(TokenKind::Keyword(Keyword::Ptr)) {
            let ptr_token = self.expect_keyword(Keyword::Ptr);

            spec = TypeSpec {
                id: self.create_node_id(),
                span: Span::new(spec.span.start, ptr_token.span.end),
                kind: TypeSpecKind::Pointer(Box::new(spec)),
            };
        }

        spec
    }

    // main
    fn parse_identifier(&mut self) -> Identifier {
        let token = self.expect_next_to_be(TokenKind::Identifier);

        Identifier {
            id: self.create_node_id(),
            span: token.span,
            symbol: InternedSymbol::new(self.lexer.source().value_of_span(token.span)),
        }
    }

    // int f(int a, int b) { ... }  (type and name already consumed)
    fn parse_function_declaration(
        &mut self,
        return_type: TypeSpec,
        name: Identifier,
    ) -> FunctionDeclaration {
        self.expect_next_to_be(TokenKind::OpenParen);

        let mut formals = Vec::new();

        if !self.next_is(TokenKind::CloseParen) {
            formals.push(self.parse_formal_declaration());

            while self.next_is(TokenKind::Comma) {
                self.expect_next_to_be(TokenKind::Comma);
                formals.push(self.parse_formal_declaration());
            }
        }

        self.expect_next_to_be(TokenKind::CloseParen);

        let body = self.parse_braced_statements();
        let end = self.expect_next_to_be(TokenKind::CloseBrace);

        FunctionDeclaration {
            id: self.create_node_id(),
            span: Span::new(return_type.span.start, end.span.end),
            return_type,
            name,
            formals,
            body,
        }
    }

    // int a
    fn parse_formal_declaration(&mut self) -> FormalDeclaration {
        let ty = self.parse_type_spec();
        let name = self.parse_identifier();

        FormalDeclaration {
            id: self.create_node_id(),
            span: Span::new(ty.span.start, name.span.end),
            ty,
            name,
        }
    }

    /// Parses `{ statement*` and leaves the closing brace for the caller
    fn parse_braced_statements(&mut self) -> Vec<Statement> {
        self.expect_next_to_be(TokenKind::OpenBrace);

        let mut statements = Vec::new();

        while !self.next_is(TokenKind::CloseBrace) {
            if self.lexer.peek().is_none() {
                self.report_fatal_eof("statement or closing brace");
            }

            statements.push(self.parse_statement());
        }

        statements
    }

    fn parse_block(&mut self) -> Vec<Statement> {
        let statements = self.parse_braced_statements();
        self.expect_next_to_be(TokenKind::CloseBrace);
        statements
    }

    fn parse_variable_declaration_statement(
        &mut self,
        ty: TypeSpec,
        name: Identifier,
    ) -> Statement {
        let semicolon = self.expect_next_to_be(TokenKind::Semicolon);
        let span = Span::new(ty.span.start, semicolon.span.end);

        let declaration = Box::new(VariableDeclaration {
            id: self.create_node_id(),
            span: Span::new(ty.span.start, name.span.end),
            ty,
            name,
        });

        Statement {
            id: self.create_node_id(),
            span,
            kind: StatementKind::VariableDeclaration(declaration),
        }
    }

    fn parse_statement(&mut self) -> Statement {
        let peeked = self.expect_peek("statement");

        if peeked.kind.is_type_keyword() {
            let ty = self.parse_type_spec();
            let name = self.parse_identifier();
            return self.parse_variable_declaration_statement(ty, name);
        }

        match peeked.kind {
            TokenKind::Keyword(Keyword::Input) => self.parse_input_statement(),
            TokenKind::Keyword(Keyword::Output) => self.parse_output_statement(),
            TokenKind::Keyword(Keyword::If) => self.parse_if_statement(),
            TokenKind::Keyword(Keyword::While) => self.parse_while_statement(),
            TokenKind::Keyword(Keyword::Return) => self.parse_return_statement(),
            TokenKind::Identifier | TokenKind::At => self.parse_expression_statement(),
            _ => self.report_fatal_error(
                peeked.span,
                &format!(
                    "Expected statement but found: {}",
                    self.lexer.source().value_of_span(peeked.span)
                ),
            ),
        }
    }

    // input x;
    fn parse_input_statement(&mut self) -> Statement {
        let keyword = self.expect_keyword(Keyword::Input);
        let destination = self.parse_lvalue();
        let semicolon = self.expect_next_to_be(TokenKind::Semicolon);

        Statement {
            id: self.create_node_id(),
            span: Span::new(keyword.span.start, semicolon.span.end),
            kind: StatementKind::Input(Box::new(destination)),
        }
    }

    // output exp;
    fn parse_output_statement(&mut self) -> Statement {
        let keyword = self.expect_keyword(Keyword::Output);
        let source = self.parse_expression();
        let semicolon = self.expect_next_to_be(TokenKind::Semicolon);

        Statement {
            id: self.create_node_id(),
            span: Span::new(keyword.span.start, semicolon.span.end),
            kind: StatementKind::Output(Box::new(source)),
        }
    }

    // if (exp) { ... } else { ... }
    fn parse_if_statement(&mut self) -> Statement {
        let keyword = self.expect_keyword(Keyword::If);

        self.expect_next_to_be(TokenKind::OpenParen);
        let condition = Box::new(self.parse_expression());
        self.expect_next_to_be(TokenKind::CloseParen);

        let true_body = self.parse_braced_statements();
        let close = self.expect_next_to_be(TokenKind::CloseBrace);

        if !self.next_is(TokenKind::Keyword(Keyword::Else)) {
            return Statement {
                id: self.create_node_id(),
                span: Span::new(keyword.span.start, close.span.end),
                kind: StatementKind::If {
                    condition,
                    body: true_body,
                },
            };
        }

        self.expect_keyword(Keyword::Else);
        let false_body = self.parse_braced_statements();
        let close = self.expect_next_to_be(TokenKind::CloseBrace);

        Statement {
            id: self.create_node_id(),
            span: Span::new(keyword.span.start, close.span.end),
            kind: StatementKind::IfElse {
                condition,
                true_body,
                false_body,
            },
        }
    }

    // while (exp) { ... }
    fn parse_while_statement(&mut self) -> Statement {
        let keyword = self.expect_keyword(Keyword::While);

        self.expect_next_to_be(TokenKind::OpenParen);
        let condition = Box::new(self.parse_expression());
        self.expect_next_to_be(TokenKind::CloseParen);

        let body = self.parse_block();

        // parse_block consumed the closing brace; the span ends with the body
        let end = body
            .last()
            .map(|statement| statement.span.end)
            .unwrap_or(keyword.span.end);

        Statement {
            id: self.create_node_id(),
            span: Span::new(keyword.span.start, end),
            kind: StatementKind::While { condition, body },
        }
    }

    // return;  or  return exp;
    fn parse_return_statement(&mut self) -> Statement {
        let keyword = self.expect_keyword(Keyword::Return);

        let value = (!self.next_is(TokenKind::Semicolon))
            .then(|| Box::new(self.parse_expression()));

        let semicolon = self.expect_next_to_be(TokenKind::Semicolon);

        Statement {
            id: self.create_node_id(),
            span: Span::new(keyword.span.start, semicolon.span.end),
            kind: StatementKind::Return(value),
        }
    }

    /// An assignment, update, or call statement, all of which start with an
    /// lvalue or callee identifier
    fn parse_expression_statement(&mut self) -> Statement {
        // x++; x--; @p++; @p--;
        if self.peeking_update_statement() {
            let target = self.parse_lvalue();
            let target_start = target.span.start;
            let update = self.expect_next("update operator");
            let semicolon = self.expect_next_to_be(TokenKind::Semicolon);

            let kind = if update.kind == TokenKind::PlusPlus {
                StatementKind::PostIncrement(Box::new(target))
            } else {
                StatementKind::PostDecrement(Box::new(target))
            };

            return Statement {
                id: self.create_node_id(),
                span: Span::new(target_start, semicolon.span.end),
                kind,
            };
        }

        let expression = self.parse_expression();
        let semicolon = self.expect_next_to_be(TokenKind::Semicolon);
        let span = Span::new(expression.span.start, semicolon.span.end);

        let kind = match expression.kind {
            ExpressionKind::Assignment { .. } => StatementKind::Assign(Box::new(expression)),
            ExpressionKind::Call { .. } => StatementKind::Call(Box::new(expression)),
            _ => self.report_fatal_error(
                expression.span,
                "Expected an assignment or call statement",
            ),
        };

        Statement {
            id: self.create_node_id(),
            span,
            kind,
        }
    }

    /// Whether the next tokens spell an update statement: an lvalue (`x` or
    /// `@p`) followed by `++` or `--`
    fn peeking_update_statement(&mut self) -> bool {
        let operator = if self.next_is(TokenKind::Identifier) {
            self.lexer.peek_nth(1)
        } else if self.next_is(TokenKind::At) {
            self.lexer.peek_nth(2)
        } else {
            return false;
        };

        operator.is_some_and(|token| {
            token.kind == TokenKind::PlusPlus || token.kind == TokenKind::MinusMinus
        })
    }

    // x  or  @p
    fn parse_lvalue(&mut self) -> Expression {
        let peeked = self.expect_peek("lvalue");

        match peeked.kind {
            TokenKind::At => {
                let at = self.expect_next_to_be(TokenKind::At);
                let target = self.parse_identifier();

                Expression {
                    id: self.create_node_id(),
                    span: Span::new(at.span.start, target.span.end),
                    kind: ExpressionKind::Dereference(target),
                }
            }
            _ => {
                let target = self.parse_identifier();

                Expression {
                    id: self.create_node_id(),
                    span: target.span,
                    kind: ExpressionKind::Identifier(target),
                }
            }
        }
    }

    pub fn parse_expression(&mut self) -> Expression {
        self.parse_assignment()
    }

    // lval = exp  (right associative, so `a = b = c` nests to the right)
    fn parse_assignment(&mut self) -> Expression {
        let lhs = self.parse_logical_or();

        if !self.next_is(TokenKind::Equals) {
            return lhs;
        }

        if !lhs.is_lvalue() {
            self.report_fatal_error(lhs.span, "Left-hand side of assignment is not an lvalue");
        }

        self.expect_next_to_be(TokenKind::Equals);
        let rhs = self.parse_assignment();

        Expression {
            id: self.create_node_id(),
            span: Span::new(lhs.span.start, rhs.span.end),
            kind: ExpressionKind::Assignment {
                destination: Box::new(lhs),
                source: Box::new(rhs),
            },
        }
    }

    fn parse_logical_or(&mut self) -> Expression {
        let mut lhs = self.parse_logical_and();

        while self.next_is(TokenKind::LogicalOr) {
            let token = self.expect_next_to_be(TokenKind::LogicalOr);
            let operator = self.new_binary_operator(token.span, BinaryOperatorKind::LogicalOr);
            let rhs = self.parse_logical_and();
            lhs = self.new_binary_expression(lhs, operator, rhs);
        }

        lhs
    }

    fn parse_logical_and(&mut self) -> Expression {
        let mut lhs = self.parse_comparison();

        while self.next_is(TokenKind::LogicalAnd) {
            let token = self.expect_next_to_be(TokenKind::LogicalAnd);
            let operator = self.new_binary_operator(token.span, BinaryOperatorKind::LogicalAnd);
            let rhs = self.parse_comparison();
            lhs = self.new_binary_expression(lhs, operator, rhs);
        }

        lhs
    }

    fn parse_comparison(&mut self) -> Expression {
        let mut lhs = self.parse_term();

        while self
            .lexer
            .peek()
            .is_some_and(|t| t.kind.is_comparison_operator())
        {
            let token = self.expect_next("comparison operator");

            let kind = match token.kind {
                TokenKind::DoubleEquals => BinaryOperatorKind::Equals,
                TokenKind::NotEquals => BinaryOperatorKind::NotEquals,
                TokenKind::LessThan => BinaryOperatorKind::LessThan,
                TokenKind::LessThanOrEqualTo => BinaryOperatorKind::LessThanOrEqualTo,
                TokenKind::GreaterThan => BinaryOperatorKind::GreaterThan,
                TokenKind::GreaterThanOrEqualTo => BinaryOperatorKind::GreaterThanOrEqualTo,
                _ => unreachable!("is_comparison_operator was checked above"),
            };

            let operator = self.new_binary_operator(token.span, kind);
            let rhs = self.parse_term();
            lhs = self.new_binary_expression(lhs, operator, rhs);
        }

        lhs
    }

    fn parse_term(&mut self) -> Expression {
        let mut lhs = self.parse_factor();

        while self.lexer.peek().is_some_and(|t| t.kind.is_term_operator()) {
            let token = self.expect_next("term operator");

            let kind = match token.kind {
                TokenKind::Plus => BinaryOperatorKind::Add,
                TokenKind::Minus => BinaryOperatorKind::Subtract,
                _ => unreachable!("is_term_operator was checked above"),
            };

            let operator = self.new_binary_operator(token.span, kind);
            let rhs = self.parse_factor();
            lhs = self.new_binary_expression(lhs, operator, rhs);
        }

        lhs
    }

    fn parse_factor(&mut self) -> Expression {
        let mut lhs = self.parse_unary();

        while self
            .lexer
            .peek()
            .is_some_and(|t| t.kind.is_factor_operator())
        {
            let token = self.expect_next("factor operator");

            let kind = match token.kind {
                TokenKind::Asterisk => BinaryOperatorKind::Multiply,
                TokenKind::Divide => BinaryOperatorKind::Divide,
                _ => unreachable!("is_factor_operator was checked above"),
            };

            let operator = self.new_binary_operator(token.span, kind);
            let rhs = self.parse_unary();
            lhs = self.new_binary_expression(lhs, operator, rhs);
        }

        lhs
    }

    fn parse_unary(&mut self) -> Expression {
        let peeked = self.expect_peek("expression");

        let kind = match peeked.kind {
            TokenKind::Minus => UnaryOperatorKind::Negate,
            TokenKind::Bang => UnaryOperatorKind::LogicalNot,
            _ => return self.parse_primary(),
        };

        let token = self.expect_next("unary operator");
        let operand = self.parse_unary();

        let operator = UnaryOperator {
            id: self.create_node_id(),
            span: token.span,
            kind,
        };

        Expression {
            id: self.create_node_id(),
            span: Span::new(token.span.start, operand.span.end),
            kind: ExpressionKind::Unary {
                operator,
                operand: Box::new(operand),
            },
        }
    }

    fn parse_primary(&mut self) -> Expression {
        let peeked = self.expect_peek("expression");

        match peeked.kind {
            TokenKind::IntegerLiteral => {
                let token = self.expect_next_to_be(TokenKind::IntegerLiteral);
                let value = self.parse_literal_value(token.span, None);

                Expression {
                    id: self.create_node_id(),
                    span: token.span,
                    kind: ExpressionKind::IntLiteral(value),
                }
            }
            TokenKind::ShortLiteral => {
                let token = self.expect_next_to_be(TokenKind::ShortLiteral);
                let value = self.parse_literal_value(token.span, Some('s'));

                Expression {
                    id: self.create_node_id(),
                    span: token.span,
                    kind: ExpressionKind::ShortLiteral(value),
                }
            }
            TokenKind::BooleanLiteral => {
                let token = self.expect_next_to_be(TokenKind::BooleanLiteral);

                let kind = if self.lexer.source().value_of_span(token.span) == "true" {
                    ExpressionKind::True
                } else {
                    ExpressionKind::False
                };

                Expression {
                    id: self.create_node_id(),
                    span: token.span,
                    kind,
                }
            }
            TokenKind::StringLiteral => {
                let token = self.expect_next_to_be(TokenKind::StringLiteral);

                // Strip the surrounding quotes but keep escapes as written
                let text = self.lexer.source().value_of_span(token.span);
                let symbol = InternedSymbol::new(&text[1..text.len() - 1]);

                Expression {
                    id: self.create_node_id(),
                    span: token.span,
                    kind: ExpressionKind::StringLiteral(symbol),
                }
            }
            TokenKind::OpenParen => {
                self.expect_next_to_be(TokenKind::OpenParen);
                let inner = self.parse_expression();
                self.expect_next_to_be(TokenKind::CloseParen);
                inner
            }
            TokenKind::Ampersand => {
                let amp = self.expect_next_to_be(TokenKind::Ampersand);
                let target = self.parse_identifier();

                Expression {
                    id: self.create_node_id(),
                    span: Span::new(amp.span.start, target.span.end),
                    kind: ExpressionKind::AddressOf(target),
                }
            }
            TokenKind::At => self.parse_lvalue(),
            TokenKind::Identifier => {
                let name = self.parse_identifier();

                if self.next_is(TokenKind::OpenParen) {
                    return self.parse_call_expression(name);
                }

                Expression {
                    id: self.create_node_id(),
                    span: name.span,
                    kind: ExpressionKind::Identifier(name),
                }
            }
            _ => self.report_fatal_error(
                peeked.span,
                &format!(
                    "Expected expression but found: {}",
                    self.lexer.source().value_of_span(peeked.span)
                ),
            ),
        }
    }

    // f(a, b + 1)
    fn parse_call_expression(&mut self, callee: Identifier) -> Expression {
        self.expect_next_to_be(TokenKind::OpenParen);

        let mut arguments = Vec::new();

        if !self.next_is(TokenKind::CloseParen) {
            arguments.push(self.parse_expression());

            while self.next_is(TokenKind::Comma) {
                self.expect_next_to_be(TokenKind::Comma);
                arguments.push(self.parse_expression());
            }
        }

        let close = self.expect_next_to_be(TokenKind::CloseParen);

        Expression {
            id: self.create_node_id(),
            span: Span::new(callee.span.start, close.span.end),
            kind: ExpressionKind::Call { callee, arguments },
        }
    }

    fn parse_literal_value(&self, span: Span, suffix: Option<char>) -> i64 {
        let mut text = self.lexer.source().value_of_span(span);

        if suffix.is_some() {
            text = &text[..text.len() - 1];
        }

        match text.parse() {
            Ok(value) => value,
            Err(_) => self.report_fatal_error(span, "Numeric literal out of range"),
        }
    }

    fn new_binary_operator(&mut self, span: Span, kind: BinaryOperatorKind) -> BinaryOperator {
        BinaryOperator {
            id: self.create_node_id(),
            span,
            kind,
        }
    }

    fn new_binary_expression(
        &mut self,
        lhs: Expression,
        operator: BinaryOperator,
        rhs: Expression,
    ) -> Expression {
        Expression {
            id: self.create_node_id(),
            span: Span::new(lhs.span.start, rhs.span.end),
            kind: ExpressionKind::Binary {
                lhs: Box::new(lhs),
                operator,
                rhs: Box::new(rhs),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Parser;
    use crate::frontend::{
        SourceFile,
        ast::{ExpressionKind, GlobalItemKind, StatementKind},
    };

    #[test]
    fn parses_globals_functions_and_statements() {
        let source = SourceFile::new_in_memory(
            "int x; int f(int a, int b) { return a + b; } x = f(1, 2);",
        );
        let program = Parser::parse_program(&source);

        assert_eq!(program.globals.len(), 3);
        assert!(matches!(
            program.globals[0].kind,
            GlobalItemKind::Statement(ref s)
                if matches!(s.kind, StatementKind::VariableDeclaration(_))
        ));
        assert!(matches!(
            program.globals[1].kind,
            GlobalItemKind::Function(ref f) if f.formals.len() == 2
        ));
        assert!(matches!(
            program.globals[2].kind,
            GlobalItemKind::Statement(ref s) if matches!(s.kind, StatementKind::Assign(_))
        ));
    }

    #[test]
    fn multiplication_binds_tighter_than_addition() {
        let source = SourceFile::new_in_memory("x = 3 + 4 * 2;");
        let program = Parser::parse_program(&source);

        let GlobalItemKind::Statement(statement) = &program.globals[0].kind else {
            panic!("expected a statement");
        };
        let StatementKind::Assign(assignment) = &statement.kind else {
            panic!("expected an assignment");
        };
        let ExpressionKind::Assignment { source: rhs, .. } = &assignment.kind else {
            panic!("expected an assignment expression");
        };
        let ExpressionKind::Binary { lhs, rhs, .. } = &rhs.kind else {
            panic!("expected addition at the top");
        };

        assert!(matches!(lhs.kind, ExpressionKind::IntLiteral(3)));
        assert!(matches!(rhs.kind, ExpressionKind::Binary { .. }));
    }

    #[test]
    fn chained_assignment_nests_to_the_right() {
        let source = SourceFile::new_in_memory("int a; int b; int c; a = b = c;");
        let program = Parser::parse_program(&source);

        let GlobalItemKind::Statement(statement) = &program.globals[3].kind else {
            panic!("expected a statement");
        };
        let StatementKind::Assign(assignment) = &statement.kind else {
            panic!("expected an assignment");
        };
        let ExpressionKind::Assignment { source, .. } = &assignment.kind else {
            panic!("expected an assignment expression");
        };

        assert!(matches!(source.kind, ExpressionKind::Assignment { .. }));
    }

    #[test]
    fn parses_update_statements_through_a_dereference() {
        let source = SourceFile::new_in_memory("int ptr p; @p++; @p--;");
        let program = Parser::parse_program(&source);

        let GlobalItemKind::Statement(statement) = &program.globals[1].kind else {
            panic!("expected a statement");
        };
        let StatementKind::PostIncrement(target) = &statement.kind else {
            panic!("expected a post-increment");
        };
        assert!(matches!(target.kind, ExpressionKind::Dereference(_)));

        let GlobalItemKind::Statement(statement) = &program.globals[2].kind else {
            panic!("expected a statement");
        };
        assert!(matches!(statement.kind, StatementKind::PostDecrement(_)));
    }

    #[test]
    fn parses_pointer_types_and_pointer_expressions() {
        let source = SourceFile::new_in_memory("int ptr p; int x; p = &x; @p = 7;");
        let program = Parser::parse_program(&source);

        assert_eq!(program.globals.len(), 4);
        let GlobalItemKind::Statement(statement) = &program.globals[3].kind else {
            panic!("expected a statement");
        };
        let StatementKind::Assign(assignment) = &statement.kind else {
            panic!("expected an assignment");
        };
        let ExpressionKind::Assignment { destination, .. } = &assignment.kind else {
            panic!("expected an assignment expression");
        };

        assert!(matches!(destination.kind, ExpressionKind::Dereference(_)));
    }
}
