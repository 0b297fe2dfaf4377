use std::collections::BTreeMap;

use crate::{
    errors::{CompileError, InternalError, TypeError, TypeErrorKind},
    frontend::{
        ast::{
            Expression, ExpressionKind, FunctionDeclaration, GlobalItemKind, NodeId, Program,
            Statement, StatementKind, UnaryOperatorKind,
        },
        lexer::Span,
    },
    middle::{
        resolve::{NameResolution, SymbolKind},
        ty::Type,
    },
};

/// The output of type analysis: a type for every expression, plus the set of
/// short subexpressions that widen to int before their parent consumes them
#[derive(Debug, Default)]
pub struct TypeCheckResults {
    expression_types: BTreeMap<NodeId, Type>,
    promotions: BTreeMap<NodeId, Type>,
}

impl TypeCheckResults {
    /// The type the expression has as written
    pub fn type_of(&self, node: NodeId) -> Option<&Type> {
        self.expression_types.get(&node)
    }

    /// The widened type, when this expression is promoted before use
    pub fn promotion_of(&self, node: NodeId) -> Option<&Type> {
        self.promotions.get(&node)
    }
}

#[derive(Debug)]
struct Checker<'a> {
    resolution: &'a NameResolution,
    results: TypeCheckResults,
    errors: Vec<TypeError>,
    /// Return type of the function being checked, or None at global scope
    current_return_type: Option<Type>,
}

/// Assigns a type to every expression in the program, reporting all type
/// errors in one batch. Expects name analysis to have succeeded.
pub fn check_program(
    program: &Program,
    resolution: &NameResolution,
) -> Result<TypeCheckResults, CompileError> {
    let mut checker = Checker {
        resolution,
        results: TypeCheckResults::default(),
        errors: Vec::new(),
        current_return_type: None,
    };

    for item in &program.globals {
        match &item.kind {
            GlobalItemKind::Function(function) => checker.check_function(function)?,
            GlobalItemKind::Statement(statement) => checker.check_statement(statement)?,
        }
    }

    if checker.errors.is_empty() {
        Ok(checker.results)
    } else {
        Err(CompileError::Type(checker.errors))
    }
}

impl Checker<'_> {
    fn report(&mut self, span: Span, kind: TypeErrorKind) {
        self.errors.push(TypeError { span, kind });
    }

    fn record(&mut self, node: NodeId, ty: Type) -> Type {
        self.results.expression_types.insert(node, ty.clone());
        ty
    }

    fn promote_to_int(&mut self, node: NodeId) {
        self.results.promotions.insert(node, Type::Int);
    }

    fn check_function(&mut self, function: &FunctionDeclaration) -> Result<(), InternalError> {
        self.current_return_type = Some(Type::from_spec(&function.return_type));

        for statement in &function.body {
            self.check_statement(statement)?;
        }

        self.current_return_type = None;
        Ok(())
    }

    fn check_statement(&mut self, statement: &Statement) -> Result<(), InternalError> {
        match &statement.kind {
            StatementKind::VariableDeclaration(_) => {}
            StatementKind::Assign(expression) | StatementKind::Call(expression) => {
                self.check_expression(expression)?;
            }
            StatementKind::PostIncrement(target) | StatementKind::PostDecrement(target) => {
                if let Some(ty) = self.check_expression(target)? {
                    if !ty.is_numeric() {
                        self.report(target.span, TypeErrorKind::BadArithmeticOperand);
                    }
                }
            }
            StatementKind::Input(target) => {
                if let Some(ty) = self.check_expression(target)? {
                    if !(ty.is_numeric() || ty == Type::Bool) {
                        self.report(target.span, TypeErrorKind::BadInputTarget);
                    }
                }
            }
            StatementKind::Output(source) => {
                if let Some(ty) = self.check_expression(source)? {
                    if ty.is_void() {
                        self.report(source.span, TypeErrorKind::VoidOutput);
                    }
                }
            }
            StatementKind::If { condition, body } => {
                self.check_condition(condition)?;
                self.check_block(body)?;
            }
            StatementKind::IfElse {
                condition,
                true_body,
                false_body,
            } => {
                self.check_condition(condition)?;
                self.check_block(true_body)?;
                self.check_block(false_body)?;
            }
            StatementKind::While { condition, body } => {
                self.check_condition(condition)?;
                self.check_block(body)?;
            }
            StatementKind::Return(value) => self.check_return(statement.span, value.as_deref())?,
        }

        Ok(())
    }

    fn check_block(&mut self, body: &[Statement]) -> Result<(), InternalError> {
        for statement in body {
            self.check_statement(statement)?;
        }

        Ok(())
    }

    fn check_condition(&mut self, condition: &Expression) -> Result<(), InternalError> {
        if let Some(ty) = self.check_value(condition)? {
            if ty != Type::Bool {
                self.report(condition.span, TypeErrorKind::NonBoolCondition);
            }
        }

        Ok(())
    }

    fn check_return(
        &mut self,
        span: Span,
        value: Option<&Expression>,
    ) -> Result<(), InternalError> {
        let Some(return_type) = self.current_return_type.clone() else {
            self.report(span, TypeErrorKind::ReturnOutsideFunction);

            if let Some(value) = value {
                self.check_expression(value)?;
            }

            return Ok(());
        };

        match value {
            None => {
                if !return_type.is_void() {
                    self.report(span, TypeErrorKind::MissingReturnValue);
                }
            }
            Some(value) => {
                let Some(ty) = self.check_value(value)? else {
                    return Ok(());
                };

                if return_type.is_void() {
                    self.report(value.span, TypeErrorKind::ReturnValueFromVoid);
                } else if ty == Type::Short && return_type == Type::Int {
                    self.promote_to_int(value.id);
                } else if ty != return_type {
                    self.report(value.span, TypeErrorKind::BadReturnValue);
                }
            }
        }

        Ok(())
    }

    /// Checks an expression whose value will be consumed, so a void call here
    /// is an error
    fn check_value(&mut self, expression: &Expression) -> Result<Option<Type>, InternalError> {
        let Some(ty) = self.check_expression(expression)? else {
            return Ok(None);
        };

        if ty.is_void() {
            self.report(expression.span, TypeErrorKind::VoidValueUse);
            return Ok(None);
        }

        Ok(Some(ty))
    }

    /// Returns the expression's type, or None when an error was already
    /// reported somewhere inside it (suppressing cascading errors)
    fn check_expression(&mut self, expression: &Expression) -> Result<Option<Type>, InternalError> {
        let ty = match &expression.kind {
            ExpressionKind::IntLiteral(_) => self.record(expression.id, Type::Int),
            ExpressionKind::ShortLiteral(_) => self.record(expression.id, Type::Short),
            ExpressionKind::True | ExpressionKind::False => self.record(expression.id, Type::Bool),
            ExpressionKind::StringLiteral(_) => self.record(expression.id, Type::Str),
            ExpressionKind::Identifier(identifier) => {
                let symbol = self
                    .resolution
                    .symbol_for(identifier.id)
                    .ok_or(InternalError::MissingSymbol)?;

                match &symbol.kind {
                    SymbolKind::Variable { ty } => self.record(expression.id, ty.clone()),
                    SymbolKind::Function { .. } => {
                        self.report(identifier.span, TypeErrorKind::FunctionAsValue);
                        return Ok(None);
                    }
                }
            }
            ExpressionKind::AddressOf(identifier) => {
                let symbol = self
                    .resolution
                    .symbol_for(identifier.id)
                    .ok_or(InternalError::MissingSymbol)?;

                match &symbol.kind {
                    SymbolKind::Variable { ty } => {
                        let pointer = Type::Pointer(Box::new(ty.clone()));
                        self.record(expression.id, pointer)
                    }
                    SymbolKind::Function { .. } => {
                        self.report(identifier.span, TypeErrorKind::FunctionAsValue);
                        return Ok(None);
                    }
                }
            }
            ExpressionKind::Dereference(identifier) => {
                let symbol = self
                    .resolution
                    .symbol_for(identifier.id)
                    .ok_or(InternalError::MissingSymbol)?;

                match &symbol.kind {
                    SymbolKind::Variable {
                        ty: Type::Pointer(inner),
                    } => {
                        let inner = (**inner).clone();
                        self.record(expression.id, inner)
                    }
                    SymbolKind::Variable { .. } => {
                        self.report(identifier.span, TypeErrorKind::DerefOfNonPointer);
                        return Ok(None);
                    }
                    SymbolKind::Function { .. } => {
                        self.report(identifier.span, TypeErrorKind::FunctionAsValue);
                        return Ok(None);
                    }
                }
            }
            ExpressionKind::Unary { operator, operand } => {
                let Some(ty) = self.check_value(operand)? else {
                    return Ok(None);
                };

                match operator.kind {
                    UnaryOperatorKind::Negate => {
                        if !ty.is_numeric() {
                            self.report(operand.span, TypeErrorKind::BadArithmeticOperand);
                            return Ok(None);
                        }

                        self.record(expression.id, ty)
                    }
                    UnaryOperatorKind::LogicalNot => {
                        if ty != Type::Bool {
                            self.report(operand.span, TypeErrorKind::BadLogicalOperand);
                            return Ok(None);
                        }

                        self.record(expression.id, Type::Bool)
                    }
                }
            }
            ExpressionKind::Binary { lhs, operator, rhs } => {
                let lhs_type = self.check_value(lhs)?;
                let rhs_type = self.check_value(rhs)?;

                let (Some(lhs_type), Some(rhs_type)) = (lhs_type, rhs_type) else {
                    return Ok(None);
                };

                let kind = operator.kind;

                if kind.is_arithmetic() {
                    let Some(unified) =
                        self.unify_numeric(lhs, lhs_type, rhs, rhs_type, TypeErrorKind::BadArithmeticOperand)?
                    else {
                        return Ok(None);
                    };

                    self.record(expression.id, unified)
                } else if kind.is_ordering() {
                    if self
                        .unify_numeric(lhs, lhs_type, rhs, rhs_type, TypeErrorKind::BadRelationalOperand)?
                        .is_none()
                    {
                        return Ok(None);
                    }

                    self.record(expression.id, Type::Bool)
                } else if kind.is_equality() {
                    if !self.unify_equality(lhs, lhs_type, rhs, rhs_type) {
                        return Ok(None);
                    }

                    self.record(expression.id, Type::Bool)
                } else {
                    // Logical && and ||
                    let mut ok = true;

                    if lhs_type != Type::Bool {
                        self.report(lhs.span, TypeErrorKind::BadLogicalOperand);
                        ok = false;
                    }

                    if rhs_type != Type::Bool {
                        self.report(rhs.span, TypeErrorKind::BadLogicalOperand);
                        ok = false;
                    }

                    if !ok {
                        return Ok(None);
                    }

                    self.record(expression.id, Type::Bool)
                }
            }
            ExpressionKind::Assignment {
                destination,
                source,
            } => {
                let destination_type = self.check_expression(destination)?;
                let source_type = self.check_value(source)?;

                let (Some(destination_type), Some(source_type)) = (destination_type, source_type)
                else {
                    return Ok(None);
                };

                if source_type == Type::Short && destination_type == Type::Int {
                    self.promote_to_int(source.id);
                } else if source_type != destination_type {
                    self.report(expression.span, TypeErrorKind::BadAssignment);
                    return Ok(None);
                }

                self.record(expression.id, destination_type)
            }
            ExpressionKind::Call { callee, arguments } => {
                let symbol = self
                    .resolution
                    .symbol_for(callee.id)
                    .ok_or(InternalError::MissingSymbol)?;

                let SymbolKind::Function { signature } = &symbol.kind else {
                    self.report(callee.span, TypeErrorKind::CallOfNonFunction);

                    for argument in arguments {
                        self.check_expression(argument)?;
                    }

                    return Ok(None);
                };

                let signature = signature.clone();

                if arguments.len() != signature.formals.len() {
                    self.report(expression.span, TypeErrorKind::WrongArgCount);
                }

                for (argument, formal) in arguments.iter().zip(signature.formals.iter()) {
                    let Some(ty) = self.check_value(argument)? else {
                        continue;
                    };

                    if ty == Type::Short && *formal == Type::Int {
                        self.promote_to_int(argument.id);
                    } else if ty != *formal {
                        self.report(argument.span, TypeErrorKind::BadArgType);
                    }
                }

                // Extra arguments past the formals still get checked
                for argument in arguments.iter().skip(signature.formals.len()) {
                    self.check_expression(argument)?;
                }

                self.record(expression.id, signature.return_type)
            }
        };

        Ok(Some(ty))
    }

    /// Shorts widen to int when mixed with an int operand. Both shorts stay
    /// short, so narrow arithmetic survives to the IR.
    fn unify_numeric(
        &mut self,
        lhs: &Expression,
        lhs_type: Type,
        rhs: &Expression,
        rhs_type: Type,
        error: TypeErrorKind,
    ) -> Result<Option<Type>, InternalError> {
        let mut ok = true;

        if !lhs_type.is_numeric() {
            self.report(lhs.span, error.clone());
            ok = false;
        }

        if !rhs_type.is_numeric() {
            self.report(rhs.span, error);
            ok = false;
        }

        if !ok {
            return Ok(None);
        }

        let unified = match (lhs_type, rhs_type) {
            (Type::Short, Type::Short) => Type::Short,
            (Type::Int, Type::Int) => Type::Int,
            (Type::Short, Type::Int) => {
                self.promote_to_int(lhs.id);
                Type::Int
            }
            (Type::Int, Type::Short) => {
                self.promote_to_int(rhs.id);
                Type::Int
            }
            _ => unreachable!("both operands were checked to be numeric"),
        };

        Ok(Some(unified))
    }

    fn unify_equality(
        &mut self,
        lhs: &Expression,
        lhs_type: Type,
        rhs: &Expression,
        rhs_type: Type,
    ) -> bool {
        let comparable = |ty: &Type| ty.is_numeric() || *ty == Type::Bool || ty.is_pointer();

        if !comparable(&lhs_type) {
            self.report(lhs.span, TypeErrorKind::BadEqualityOperand);
            return false;
        }

        if !comparable(&rhs_type) {
            self.report(rhs.span, TypeErrorKind::BadEqualityOperand);
            return false;
        }

        match (&lhs_type, &rhs_type) {
            (Type::Short, Type::Int) => {
                self.promote_to_int(lhs.id);
                true
            }
            (Type::Int, Type::Short) => {
                self.promote_to_int(rhs.id);
                true
            }
            _ if lhs_type == rhs_type => true,
            _ => {
                self.report(rhs.span, TypeErrorKind::BadEqualityOperand);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::check_program;
    use crate::{
        errors::{CompileError, TypeErrorKind},
        frontend::{SourceFile, parser::Parser},
        middle::resolve::resolve_program,
    };

    fn type_error_kinds(source: &str) -> Vec<TypeErrorKind> {
        let source = SourceFile::new_in_memory(source);
        let program = Parser::parse_program(&source);
        let resolution = resolve_program(&program).expect("name analysis should succeed");

        match check_program(&program, &resolution) {
            Ok(_) => Vec::new(),
            Err(CompileError::Type(errors)) => errors.into_iter().map(|e| e.kind).collect(),
            Err(other) => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn accepts_a_well_typed_program() {
        assert!(
            type_error_kinds(
                "int f(int a, short b) { return a + b; } int x; x = f(1, 2s) * 3;"
            )
            .is_empty()
        );
    }

    #[test]
    fn shorts_widen_when_mixed_with_ints() {
        let source = SourceFile::new_in_memory("int x; short s; s = 1s; x = s + 2;");
        let program = Parser::parse_program(&source);
        let resolution = resolve_program(&program).unwrap();
        let results = check_program(&program, &resolution).unwrap();

        // Exactly one promotion: the short operand of the addition
        assert_eq!(
            results
                .promotions
                .values()
                .filter(|ty| **ty == crate::middle::ty::Type::Int)
                .count(),
            1
        );
    }

    #[test]
    fn rejects_a_void_call_used_as_a_value() {
        assert!(matches!(
            type_error_kinds("void f() { return; } int x; x = f();")[..],
            [TypeErrorKind::VoidValueUse]
        ));
    }

    #[test]
    fn rejects_non_bool_conditions() {
        assert!(matches!(
            type_error_kinds("int x; x = 0; while (x) { x++; }")[..],
            [TypeErrorKind::NonBoolCondition]
        ));
    }

    #[test]
    fn rejects_mismatched_call_arguments() {
        assert!(matches!(
            type_error_kinds("int f(bool b) { return 1; } int x; x = f(3);")[..],
            [TypeErrorKind::BadArgType]
        ));
        assert!(matches!(
            type_error_kinds("int f(int a) { return a; } int x; x = f();")[..],
            [TypeErrorKind::WrongArgCount]
        ));
    }

    #[test]
    fn rejects_return_mismatches() {
        assert!(matches!(
            type_error_kinds("int f() { return; }")[..],
            [TypeErrorKind::MissingReturnValue]
        ));
        assert!(matches!(
            type_error_kinds("void f() { return 3; }")[..],
            [TypeErrorKind::ReturnValueFromVoid]
        ));
        assert!(matches!(
            type_error_kinds("return 1;")[..],
            [TypeErrorKind::ReturnOutsideFunction]
        ));
    }

    #[test]
    fn rejects_bad_pointer_use() {
        assert!(matches!(
            type_error_kinds("int x; x = 3; @x = 1;")[..],
            [TypeErrorKind::DerefOfNonPointer]
        ));
        assert!(
            type_error_kinds("int x; int ptr p; p = &x; @p = 7;").is_empty()
        );
    }

    #[test]
    fn rejects_logical_operators_on_numbers() {
        assert!(matches!(
            type_error_kinds("bool b; b = 1 && true;")[..],
            [TypeErrorKind::BadLogicalOperand]
        ));
    }
}
