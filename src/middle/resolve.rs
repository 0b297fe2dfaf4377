use std::collections::BTreeMap;

use crate::{
    errors::{CompileError, InternalError, NameError, NameErrorKind},
    frontend::{
        ast::{
            Expression, ExpressionKind, FunctionDeclaration, GlobalItemKind, Identifier, NodeId,
            Program, Statement, StatementKind, VariableDeclaration,
        },
        intern::InternedSymbol,
        lexer::Span,
    },
    index::{IndexVec, simple_index},
    middle::ty::{FunctionSignature, Type},
};

simple_index! {
    /// Uniquely identifies a declared name for the rest of the pipeline
    pub struct SymbolId;
}

#[derive(Debug)]
pub struct Symbol {
    pub name: InternedSymbol,
    pub kind: SymbolKind,
}

#[derive(Debug)]
pub enum SymbolKind {
    Variable { ty: Type },
    Function { signature: FunctionSignature },
}

impl Symbol {
    pub fn variable_type(&self) -> Option<&Type> {
        match &self.kind {
            SymbolKind::Variable { ty } => Some(ty),
            SymbolKind::Function { .. } => None,
        }
    }

    pub fn signature(&self) -> Option<&FunctionSignature> {
        match &self.kind {
            SymbolKind::Function { signature } => Some(signature),
            SymbolKind::Variable { .. } => None,
        }
    }
}

/// The output of name analysis: every declared symbol, plus a side table
/// binding each identifier occurrence (declaration or use) to its symbol
#[derive(Debug, Default)]
pub struct NameResolution {
    pub symbols: IndexVec<SymbolId, Symbol>,
    uses: BTreeMap<NodeId, SymbolId>,
}

impl NameResolution {
    pub fn symbol_id_for(&self, node: NodeId) -> Option<SymbolId> {
        self.uses.get(&node).copied()
    }

    pub fn symbol_for(&self, node: NodeId) -> Option<&Symbol> {
        self.symbol_id_for(node).and_then(|id| self.symbols.get(id))
    }
}

/// Points at a scope already on the stack, so a name can be declared into an
/// enclosing scope after inner scopes have been pushed
#[derive(Debug, Clone, Copy)]
pub struct ScopeHandle(usize);

/// A stack of lexical scopes, innermost last
#[derive(Debug, Default)]
pub struct ScopeStack {
    scopes: Vec<BTreeMap<InternedSymbol, SymbolId>>,
}

impl ScopeStack {
    pub fn enter_scope(&mut self) -> ScopeHandle {
        self.scopes.push(BTreeMap::new());

        ScopeHandle(self.scopes.len() - 1)
    }

    pub fn leave_scope(&mut self) -> Result<(), InternalError> {
        self.scopes
            .pop()
            .map(|_| ())
            .ok_or(InternalError::EmptyScopeStack)
    }

    /// Declares a name in the innermost scope. Returns false when the name is
    /// already taken in that scope.
    pub fn declare(&mut self, name: InternedSymbol, symbol: SymbolId) -> bool {
        let Some(innermost) = self.scopes.last_mut() else {
            return false;
        };

        if innermost.contains_key(&name) {
            return false;
        }

        innermost.insert(name, symbol);
        true
    }

    /// Declares a name in the scope the handle points at, regardless of what
    /// has been pushed since
    pub fn declare_in(&mut self, handle: ScopeHandle, name: InternedSymbol, symbol: SymbolId) -> bool {
        let Some(scope) = self.scopes.get_mut(handle.0) else {
            return false;
        };

        if scope.contains_key(&name) {
            return false;
        }

        scope.insert(name, symbol);
        true
    }

    pub fn is_declared_in(&self, handle: ScopeHandle, name: InternedSymbol) -> bool {
        self.scopes
            .get(handle.0)
            .is_some_and(|scope| scope.contains_key(&name))
    }

    pub fn current(&self) -> ScopeHandle {
        ScopeHandle(self.scopes.len().saturating_sub(1))
    }

    /// Innermost-to-outermost search
    pub fn lookup(&self, name: InternedSymbol) -> Option<SymbolId> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(&name).copied())
    }
}

#[derive(Debug, Default)]
struct Resolver {
    scopes: ScopeStack,
    resolution: NameResolution,
    errors: Vec<NameError>,
}

/// Binds every identifier in the program to a symbol, reporting all name
/// errors in one batch rather than stopping at the first
pub fn resolve_program(program: &Program) -> Result<NameResolution, CompileError> {
    let mut resolver = Resolver::default();

    resolver.scopes.enter_scope();

    for item in &program.globals {
        match &item.kind {
            GlobalItemKind::Function(function) => resolver.resolve_function(function),
            GlobalItemKind::Statement(statement) => resolver.resolve_statement(statement),
        }
    }

    resolver.scopes.leave_scope()?;

    if resolver.errors.is_empty() {
        Ok(resolver.resolution)
    } else {
        Err(CompileError::Name(resolver.errors))
    }
}

impl Resolver {
    fn report(&mut self, span: Span, kind: NameErrorKind) {
        self.errors.push(NameError { span, kind });
    }

    fn bind(&mut self, node: NodeId, symbol: SymbolId) {
        self.resolution.uses.insert(node, symbol);
    }

    fn declare_variable(&mut self, declaration: &VariableDeclaration) {
        let ty = Type::from_spec(&declaration.ty);

        // A bad type and a clash are independent faults and both get reported
        let mut usable = true;

        if !ty.is_valid_variable_type() {
            self.report(declaration.ty.span, NameErrorKind::BadVarType);
            usable = false;
        }

        let innermost = self.scopes.current();

        if self.scopes.is_declared_in(innermost, declaration.name.symbol) {
            self.report(declaration.name.span, NameErrorKind::MultiDecl);
            usable = false;
        }

        // Unusable declarations leave no symbol behind, so later uses of the
        // name report as undeclared
        if usable {
            let symbol = self.resolution.symbols.push(Symbol {
                name: declaration.name.symbol,
                kind: SymbolKind::Variable { ty },
            });

            self.scopes.declare(declaration.name.symbol, symbol);
            self.bind(declaration.name.id, symbol);
        }
    }

    fn resolve_function(&mut self, function: &FunctionDeclaration) {
        let enclosing = self.scopes.current();

        // The signature is built from the written types up front so the
        // function can be declared before its body, which makes recursive
        // calls resolve
        let return_type = Type::from_spec(&function.return_type);
        let mut formal_types = Vec::with_capacity(function.formals.len());

        for formal in &function.formals {
            let ty = Type::from_spec(&formal.ty);

            if !ty.is_valid_variable_type() {
                self.report(formal.ty.span, NameErrorKind::BadVarType);
            }

            formal_types.push(ty);
        }

        let declarable = if self.scopes.is_declared_in(enclosing, function.name.symbol) {
            self.report(function.name.span, NameErrorKind::MultiDecl);
            false
        } else {
            true
        };

        if declarable {
            let symbol = self.resolution.symbols.push(Symbol {
                name: function.name.symbol,
                kind: SymbolKind::Function {
                    signature: FunctionSignature {
                        formals: formal_types,
                        return_type,
                    },
                },
            });

            self.scopes.declare_in(enclosing, function.name.symbol, symbol);
            self.bind(function.name.id, symbol);
        }

        self.scopes.enter_scope();

        let body_scope = self.scopes.current();

        for formal in &function.formals {
            let ty = Type::from_spec(&formal.ty);

            if self.scopes.is_declared_in(body_scope, formal.name.symbol) {
                self.report(formal.name.span, NameErrorKind::MultiDecl);
            } else if ty.is_valid_variable_type() {
                let symbol = self.resolution.symbols.push(Symbol {
                    name: formal.name.symbol,
                    kind: SymbolKind::Variable { ty },
                });

                self.scopes.declare(formal.name.symbol, symbol);
                self.bind(formal.name.id, symbol);
            }
        }

        for statement in &function.body {
            self.resolve_statement(statement);
        }

        // The push above guarantees a matching pop
        let _ = self.scopes.leave_scope();
    }

    fn resolve_statement(&mut self, statement: &Statement) {
        match &statement.kind {
            StatementKind::VariableDeclaration(declaration) => self.declare_variable(declaration),
            StatementKind::Assign(expression)
            | StatementKind::Call(expression)
            | StatementKind::PostIncrement(expression)
            | StatementKind::PostDecrement(expression)
            | StatementKind::Input(expression)
            | StatementKind::Output(expression) => self.resolve_expression(expression),
            StatementKind::If { condition, body } => {
                self.resolve_expression(condition);
                self.resolve_block(body);
            }
            StatementKind::IfElse {
                condition,
                true_body,
                false_body,
            } => {
                self.resolve_expression(condition);
                self.resolve_block(true_body);
                self.resolve_block(false_body);
            }
            StatementKind::While { condition, body } => {
                self.resolve_expression(condition);
                self.resolve_block(body);
            }
            StatementKind::Return(value) => {
                if let Some(value) = value {
                    self.resolve_expression(value);
                }
            }
        }
    }

    fn resolve_block(&mut self, body: &[Statement]) {
        self.scopes.enter_scope();

        for statement in body {
            self.resolve_statement(statement);
        }

        let _ = self.scopes.leave_scope();
    }

    fn resolve_identifier_use(&mut self, identifier: &Identifier) {
        match self.scopes.lookup(identifier.symbol) {
            Some(symbol) => self.bind(identifier.id, symbol),
            None => self.report(identifier.span, NameErrorKind::UndeclaredId),
        }
    }

    fn resolve_expression(&mut self, expression: &Expression) {
        match &expression.kind {
            ExpressionKind::IntLiteral(_)
            | ExpressionKind::ShortLiteral(_)
            | ExpressionKind::True
            | ExpressionKind::False
            | ExpressionKind::StringLiteral(_) => {}
            ExpressionKind::Identifier(identifier)
            | ExpressionKind::AddressOf(identifier)
            | ExpressionKind::Dereference(identifier) => self.resolve_identifier_use(identifier),
            ExpressionKind::Unary { operand, .. } => self.resolve_expression(operand),
            ExpressionKind::Binary { lhs, rhs, .. } => {
                self.resolve_expression(lhs);
                self.resolve_expression(rhs);
            }
            ExpressionKind::Assignment {
                destination,
                source,
            } => {
                self.resolve_expression(destination);
                self.resolve_expression(source);
            }
            ExpressionKind::Call { callee, arguments } => {
                self.resolve_identifier_use(callee);

                for argument in arguments {
                    self.resolve_expression(argument);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ScopeStack, resolve_program};
    use crate::{
        errors::{CompileError, NameErrorKind},
        frontend::{
            SourceFile,
            ast::{ExpressionKind, GlobalItemKind, Statement, StatementKind},
            intern::InternedSymbol,
            parser::Parser,
        },
        index::Index,
        middle::resolve::SymbolId,
    };

    #[test]
    fn inner_scopes_shadow_outer_ones() {
        let mut scopes = ScopeStack::default();
        let name = InternedSymbol::new("x");

        scopes.enter_scope();
        assert!(scopes.declare(name, SymbolId::new(0)));

        scopes.enter_scope();
        assert!(scopes.declare(name, SymbolId::new(1)));
        assert_eq!(scopes.lookup(name), Some(SymbolId::new(1)));

        scopes.leave_scope().unwrap();
        assert_eq!(scopes.lookup(name), Some(SymbolId::new(0)));
    }

    #[test]
    fn redeclaring_within_one_scope_fails() {
        let mut scopes = ScopeStack::default();
        let name = InternedSymbol::new("dup");

        scopes.enter_scope();
        assert!(scopes.declare(name, SymbolId::new(0)));
        assert!(!scopes.declare(name, SymbolId::new(1)));
    }

    #[test]
    fn leaving_an_empty_stack_is_an_internal_error() {
        let mut scopes = ScopeStack::default();

        assert!(scopes.leave_scope().is_err());
    }

    fn name_error_kinds(source: &str) -> Vec<NameErrorKind> {
        let source = SourceFile::new_in_memory(source);
        let program = Parser::parse_program(&source);

        match resolve_program(&program) {
            Ok(_) => Vec::new(),
            Err(CompileError::Name(errors)) => errors.into_iter().map(|e| e.kind).collect(),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn accepts_shadowing_across_scopes() {
        assert!(name_error_kinds("int x; void f() { int x; x = 1; }").is_empty());
    }

    // The node id of the identifier written to by `x = ...;`
    fn assigned_use_id(statement: &Statement) -> crate::frontend::ast::NodeId {
        let StatementKind::Assign(assignment) = &statement.kind else {
            panic!("expected an assignment statement");
        };
        let ExpressionKind::Assignment { destination, .. } = &assignment.kind else {
            panic!("expected an assignment expression");
        };
        let ExpressionKind::Identifier(identifier) = &destination.kind else {
            panic!("expected an identifier destination");
        };

        identifier.id
    }

    #[test]
    fn uses_before_an_inner_redeclaration_bind_the_outer_symbol() {
        let source = SourceFile::new_in_memory("int x; void f() { x = 1; int x; x = 2; }");
        let program = Parser::parse_program(&source);
        let resolution = resolve_program(&program).unwrap();

        let GlobalItemKind::Statement(statement) = &program.globals[0].kind else {
            panic!("expected the outer declaration");
        };
        let StatementKind::VariableDeclaration(outer_declaration) = &statement.kind else {
            panic!("expected a variable declaration");
        };
        let outer = resolution.symbol_id_for(outer_declaration.name.id).unwrap();

        let GlobalItemKind::Function(f) = &program.globals[1].kind else {
            panic!("expected the function");
        };
        let StatementKind::VariableDeclaration(inner_declaration) = &f.body[1].kind else {
            panic!("expected the inner declaration");
        };
        let inner = resolution.symbol_id_for(inner_declaration.name.id).unwrap();

        assert_ne!(outer, inner);
        assert_eq!(resolution.symbol_id_for(assigned_use_id(&f.body[0])), Some(outer));
        assert_eq!(resolution.symbol_id_for(assigned_use_id(&f.body[2])), Some(inner));
    }

    #[test]
    fn sibling_scopes_take_the_same_name_independently() {
        let source = SourceFile::new_in_memory(
            "void f() { int x; x = 1; } void g() { int x; x = 2; }",
        );
        let program = Parser::parse_program(&source);
        let resolution = resolve_program(&program).expect("sibling declarations should not clash");

        let symbols_of = |item: &crate::frontend::ast::GlobalItem| {
            let GlobalItemKind::Function(function) = &item.kind else {
                panic!("expected a function");
            };
            let StatementKind::VariableDeclaration(declaration) = &function.body[0].kind else {
                panic!("expected the local declaration");
            };

            let declared = resolution.symbol_id_for(declaration.name.id).unwrap();
            let used = resolution
                .symbol_id_for(assigned_use_id(&function.body[1]))
                .unwrap();

            (declared, used)
        };

        let (f_declared, f_used) = symbols_of(&program.globals[0]);
        let (g_declared, g_used) = symbols_of(&program.globals[1]);

        // Each body's use binds its own declaration, and the two locals are
        // distinct symbols despite sharing a name
        assert_eq!(f_declared, f_used);
        assert_eq!(g_declared, g_used);
        assert_ne!(f_declared, g_declared);
    }

    #[test]
    fn rejects_duplicate_declarations_in_one_scope() {
        assert!(matches!(
            name_error_kinds("int x; bool x;")[..],
            [NameErrorKind::MultiDecl]
        ));
    }

    #[test]
    fn rejects_undeclared_uses_but_keeps_going() {
        // Both bad uses are reported, not just the first
        assert!(matches!(
            name_error_kinds("int a; a = b; c = a;")[..],
            [NameErrorKind::UndeclaredId, NameErrorKind::UndeclaredId]
        ));
    }

    #[test]
    fn rejects_void_variable_declarations() {
        assert!(matches!(
            name_error_kinds("void x;")[..],
            [NameErrorKind::BadVarType]
        ));
        assert!(matches!(
            name_error_kinds("void ptr p;")[..],
            [NameErrorKind::BadVarType]
        ));
    }

    #[test]
    fn functions_may_call_themselves() {
        assert!(
            name_error_kinds("int fact(int n) { if (n < 2) { return 1; } return n * fact(n - 1); }")
                .is_empty()
        );
    }

    #[test]
    fn function_names_clash_with_globals() {
        assert!(matches!(
            name_error_kinds("int f; bool f() { return true; }")[..],
            [NameErrorKind::MultiDecl]
        ));
    }
}
