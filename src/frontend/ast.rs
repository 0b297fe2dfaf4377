use crate::frontend::lexer::Span;

use super::{SourceFile, intern::InternedSymbol};

#[derive(Debug)]
pub struct Program<'source> {
    pub source_file: &'source SourceFile,
    /// Top level items in source order: function declarations, global
    /// variable declarations, and global statements
    pub globals: Vec<GlobalItem>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct NodeId(pub u32);

#[derive(Debug)]
pub struct GlobalItem {
    pub id: NodeId,
    pub span: Span,
    pub kind: GlobalItemKind,
}

/// Function declarations may only appear at the top level, and formal
/// parameter declarations only inside a function declaration. Nothing in
/// [`StatementKind`] can nest either, so the "function declaration at local
/// scope" and "formal at global scope" cases of the original class hierarchy
/// are unrepresentable here.
#[derive(Debug)]
pub enum GlobalItemKind {
    Function(Box<FunctionDeclaration>),
    Statement(Statement),
}

#[derive(Debug)]
pub struct FunctionDeclaration {
    pub id: NodeId,
    pub span: Span,
    pub return_type: TypeSpec,
    pub name: Identifier,
    pub formals: Vec<FormalDeclaration>,
    pub body: Vec<Statement>,
}

#[derive(Debug)]
pub struct FormalDeclaration {
    pub id: NodeId,
    pub span: Span,
    pub ty: TypeSpec,
    pub name: Identifier,
}

#[derive(Debug)]
pub struct VariableDeclaration {
    pub id: NodeId,
    pub span: Span,
    pub ty: TypeSpec,
    pub name: Identifier,
}

/// A written-out type, e.g. `int` or `short ptr`
#[derive(Debug)]
pub struct TypeSpec {
    pub id: NodeId,
    pub span: Span,
    pub kind: TypeSpecKind,
}

#[derive(Debug)]
pub enum TypeSpecKind {
    Int,
    Short,
    Bool,
    Void,
    Pointer(Box<TypeSpec>),
}

#[derive(Debug)]
pub struct Identifier {
    pub id: NodeId,
    pub span: Span,
    pub symbol: InternedSymbol,
}

#[derive(Debug)]
pub struct Statement {
    pub id: NodeId,
    pub span: Span,
    pub kind: StatementKind,
}

#[derive(Debug)]
pub enum StatementKind {
    VariableDeclaration(Box<VariableDeclaration>),
    /// An assignment expression used as a statement
    Assign(Box<Expression>),
    /// `x++;` (the expression is the target lvalue)
    PostIncrement(Box<Expression>),
    /// `x--;`
    PostDecrement(Box<Expression>),
    /// `input lval;`
    Input(Box<Expression>),
    /// `output exp;`
    Output(Box<Expression>),
    If {
        condition: Box<Expression>,
        body: Vec<Statement>,
    },
    IfElse {
        condition: Box<Expression>,
        true_body: Vec<Statement>,
        false_body: Vec<Statement>,
    },
    While {
        condition: Box<Expression>,
        body: Vec<Statement>,
    },
    /// A call expression used as a statement (its value is discarded)
    Call(Box<Expression>),
    Return(Option<Box<Expression>>),
}

#[derive(Debug)]
pub struct Expression {
    pub id: NodeId,
    pub span: Span,
    pub kind: ExpressionKind,
}

#[derive(Debug)]
pub enum ExpressionKind {
    IntLiteral(i64),
    ShortLiteral(i64),
    True,
    False,
    StringLiteral(InternedSymbol),
    Identifier(Identifier),
    /// `&id` — the address of a variable
    AddressOf(Identifier),
    /// `@id` — the value behind a pointer variable
    Dereference(Identifier),
    Unary {
        operator: UnaryOperator,
        operand: Box<Expression>,
    },
    Binary {
        lhs: Box<Expression>,
        operator: BinaryOperator,
        rhs: Box<Expression>,
    },
    Assignment {
        destination: Box<Expression>,
        source: Box<Expression>,
    },
    Call {
        callee: Identifier,
        arguments: Vec<Expression>,
    },
}

impl Expression {
    /// Whether this expression is a storage location an assignment, `input`,
    /// or update statement may write to
    pub fn is_lvalue(&self) -> bool {
        matches!(
            self.kind,
            ExpressionKind::Identifier(_) | ExpressionKind::Dereference(_)
        )
    }
}

#[derive(Debug)]
pub struct UnaryOperator {
    pub id: NodeId,
    pub span: Span,
    pub kind: UnaryOperatorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperatorKind {
    Negate,     // -
    LogicalNot, // !
}

#[derive(Debug)]
pub struct BinaryOperator {
    pub id: NodeId,
    pub span: Span,
    pub kind: BinaryOperatorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperatorKind {
    Add,                  // +
    Subtract,             // -
    Multiply,             // *
    Divide,               // /
    LogicalAnd,           // &&
    LogicalOr,            // ||
    Equals,               // ==
    NotEquals,            // !=
    LessThan,             // <
    LessThanOrEqualTo,    // <=
    GreaterThan,          // >
    GreaterThanOrEqualTo, // >=
}

impl BinaryOperatorKind {
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            Self::Add | Self::Subtract | Self::Multiply | Self::Divide
        )
    }

    pub fn is_logical(&self) -> bool {
        matches!(self, Self::LogicalAnd | Self::LogicalOr)
    }

    pub fn is_equality(&self) -> bool {
        matches!(self, Self::Equals | Self::NotEquals)
    }

    pub fn is_ordering(&self) -> bool {
        matches!(
            self,
            Self::LessThan
                | Self::LessThanOrEqualTo
                | Self::GreaterThan
                | Self::GreaterThanOrEqualTo
        )
    }
}
