use colored::Colorize;
use thiserror::Error;

use crate::frontend::{SourceFile, lexer::Span};

/// Everything that can stop the pipeline after parsing. User-facing errors
/// carry the whole batch collected by their pass; internal errors indicate a
/// bug in the compiler itself rather than in the input program.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error("name analysis failed with {} error(s)", .0.len())]
    Name(Vec<NameError>),
    #[error("type analysis failed with {} error(s)", .0.len())]
    Type(Vec<TypeError>),
    #[error("internal compiler error: {0}")]
    Internal(#[from] InternalError),
}

#[derive(Debug, Error)]
#[error("{kind}")]
pub struct NameError {
    pub span: Span,
    pub kind: NameErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NameErrorKind {
    #[error("Multiply declared identifier")]
    MultiDecl,
    #[error("Undeclared identifier")]
    UndeclaredId,
    #[error("Invalid type in declaration")]
    BadVarType,
}

#[derive(Debug, Error)]
#[error("{kind}")]
pub struct TypeError {
    pub span: Span,
    pub kind: TypeErrorKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TypeErrorKind {
    #[error("Arithmetic operator applied to invalid operand")]
    BadArithmeticOperand,
    #[error("Logical operator applied to non-bool operand")]
    BadLogicalOperand,
    #[error("Relational operator applied to non-numeric operand")]
    BadRelationalOperand,
    #[error("Invalid equality operand")]
    BadEqualityOperand,
    #[error("Invalid assignment operand")]
    BadAssignment,
    #[error("Attempt to call a non-function")]
    CallOfNonFunction,
    #[error("Function call with wrong number of args")]
    WrongArgCount,
    #[error("Type of actual does not match type of formal")]
    BadArgType,
    #[error("Attempt to use the value of a void function call")]
    VoidValueUse,
    #[error("Attempt to use a function as a variable")]
    FunctionAsValue,
    #[error("Attempt to dereference a non-pointer")]
    DerefOfNonPointer,
    #[error("Attempt to read a non-variable")]
    BadInputTarget,
    #[error("Attempt to output a void value")]
    VoidOutput,
    #[error("Non-bool expression used as a condition")]
    NonBoolCondition,
    #[error("Missing return value")]
    MissingReturnValue,
    #[error("Return with a value in void function")]
    ReturnValueFromVoid,
    #[error("Bad return value")]
    BadReturnValue,
    #[error("Return statement outside of a function")]
    ReturnOutsideFunction,
}

/// A bug in the compiler, never a fault of the input program. These carry
/// enough context to find the offending pass.
#[derive(Debug, Error)]
pub enum InternalError {
    #[error("identifier use was not bound to a symbol during name analysis")]
    MissingSymbol,
    #[error("expression was not assigned a type during type analysis")]
    MissingType,
    #[error("void function call reached lowering in value position")]
    VoidValueCall,
    #[error("attempted to leave a scope when the scope stack was empty")]
    EmptyScopeStack,
    #[error("AST shape violated a parser invariant during lowering")]
    MalformedAst,
}

pub fn report_name_errors(source: &SourceFile, errors: &[NameError]) {
    for error in errors {
        eprintln!(
            "{} {} ({})",
            "error:".red().bold(),
            error.kind,
            source.format_span_position(error.span)
        );
        source.highlight_span(error.span);
    }
}

pub fn report_type_errors(source: &SourceFile, errors: &[TypeError]) {
    for error in errors {
        eprintln!(
            "{} {} ({})",
            "error:".red().bold(),
            error.kind,
            source.format_span_position(error.span)
        );
        source.highlight_span(error.span);
    }
}

pub fn report_compile_error(source: &SourceFile, error: &CompileError) {
    match error {
        CompileError::Name(errors) => report_name_errors(source, errors),
        CompileError::Type(errors) => report_type_errors(source, errors),
        CompileError::Internal(internal) => {
            eprintln!("{} {internal}", "internal compiler error:".red().bold());
        }
    }
}
