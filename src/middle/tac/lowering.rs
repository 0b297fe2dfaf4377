use crate::{
    errors::{CompileError, InternalError},
    frontend::{
        ast::{
            self, BinaryOperatorKind, Expression, ExpressionKind, FunctionDeclaration,
            GlobalItemKind, NodeId, Statement, StatementKind, UnaryOperatorKind,
        },
        intern::InternedSymbol,
    },
    middle::{
        resolve::NameResolution,
        tac::{BinaryOp, GlobalVar, Opd, Procedure, Program, QuadKind, StringPool, UnaryOp, Width},
        ty::Type,
        type_check::TypeCheckResults,
    },
};

/// The name of the synthetic procedure holding top level statements. It runs
/// before main. The `$` is not legal in an identifier, so no user function
/// can collide with it.
pub const GLOBAL_PROCEDURE: &str = "$global";

struct LoweringContext<'a> {
    resolution: &'a NameResolution,
    types: &'a TypeCheckResults,
    strings: StringPool,
}

/// Flattens the checked program into three address code. Expects name and
/// type analysis to have succeeded; anything unresolved here is a bug in an
/// earlier pass.
pub fn lower_program(
    program: &ast::Program,
    resolution: &NameResolution,
    types: &TypeCheckResults,
) -> Result<Program, CompileError> {
    let mut ctx = LoweringContext {
        resolution,
        types,
        strings: StringPool::default(),
    };

    let mut globals = Vec::new();
    let mut procedures = Vec::new();
    let mut global_procedure = Procedure::new(InternedSymbol::new(GLOBAL_PROCEDURE));
    let mut has_global_statements = false;

    for item in &program.globals {
        match &item.kind {
            GlobalItemKind::Function(function) => {
                procedures.push(ctx.lower_function(function)?);
            }
            GlobalItemKind::Statement(statement) => {
                if let StatementKind::VariableDeclaration(declaration) = &statement.kind {
                    let Opd::Sym { id, name, width } = ctx.symbol_opd(declaration.name.id)? else {
                        return Err(InternalError::MissingSymbol.into());
                    };

                    globals.push(GlobalVar { id, name, width });
                } else {
                    ctx.lower_statement(&mut global_procedure, statement)?;
                    has_global_statements = true;
                }
            }
        }
    }

    let mut all_procedures = Vec::new();

    if has_global_statements {
        let leave = global_procedure.leave_label;
        global_procedure.push_labeled(leave, QuadKind::Nop);
        all_procedures.push(global_procedure);
    }

    all_procedures.extend(procedures);

    Ok(Program {
        globals,
        procedures: all_procedures,
        strings: ctx.strings,
    })
}

impl LoweringContext<'_> {
    fn symbol_opd(&self, node: NodeId) -> Result<Opd, InternalError> {
        let id = self
            .resolution
            .symbol_id_for(node)
            .ok_or(InternalError::MissingSymbol)?;
        let symbol = self
            .resolution
            .symbols
            .get(id)
            .ok_or(InternalError::MissingSymbol)?;
        let ty = symbol
            .variable_type()
            .ok_or(InternalError::MissingSymbol)?;

        Ok(Opd::Sym {
            id,
            name: symbol.name,
            width: Width::of_type(ty),
        })
    }

    fn type_of(&self, node: NodeId) -> Result<&Type, InternalError> {
        self.types.type_of(node).ok_or(InternalError::MissingType)
    }

    fn lower_function(&mut self, function: &FunctionDeclaration) -> Result<Procedure, InternalError> {
        let mut procedure = Procedure::new(function.name.symbol);

        for (index, formal) in function.formals.iter().enumerate() {
            let opd = self.symbol_opd(formal.name.id)?;

            let Opd::Sym { id, .. } = opd else {
                return Err(InternalError::MissingSymbol);
            };

            procedure.gather_formal(id);
            procedure.push(QuadKind::GetArg {
                index: index + 1,
                dst: opd,
            });
        }

        for statement in &function.body {
            self.lower_statement(&mut procedure, statement)?;
        }

        // Returns converge on the nop carrying the leave label
        let leave = procedure.leave_label;
        procedure.push_labeled(leave, QuadKind::Nop);

        Ok(procedure)
    }

    fn lower_statement(
        &mut self,
        procedure: &mut Procedure,
        statement: &Statement,
    ) -> Result<(), InternalError> {
        match &statement.kind {
            StatementKind::VariableDeclaration(declaration) => {
                let Opd::Sym { id, .. } = self.symbol_opd(declaration.name.id)? else {
                    return Err(InternalError::MissingSymbol);
                };

                procedure.gather_local(id);
            }
            StatementKind::Assign(expression) => {
                self.flatten_expression(procedure, expression)?;
            }
            StatementKind::Call(expression) => {
                let ExpressionKind::Call { callee, arguments } = &expression.kind else {
                    return Err(InternalError::MalformedAst);
                };

                // The return value, if any, is discarded, so no getret
                self.flatten_call(procedure, callee, arguments)?;
            }
            StatementKind::PostIncrement(target) => {
                self.lower_update(procedure, target, BinaryOp::Add)?;
            }
            StatementKind::PostDecrement(target) => {
                self.lower_update(procedure, target, BinaryOp::Subtract)?;
            }
            StatementKind::Input(target) => {
                let ty = self.type_of(target.id)?.clone();
                let dst = self.flatten_lvalue(procedure, target)?;

                procedure.push(QuadKind::Receive { dst, ty });
            }
            StatementKind::Output(source) => {
                let ty = self.type_of(source.id)?.clone();
                let src = self.flatten_operand(procedure, source)?;

                procedure.push(QuadKind::Report { src, ty });
            }
            StatementKind::If { condition, body } => {
                let condition = self.flatten_operand(procedure, condition)?;
                let after = procedure.make_label();

                procedure.push(QuadKind::Ifz {
                    condition,
                    target: after,
                });

                for statement in body {
                    self.lower_statement(procedure, statement)?;
                }

                procedure.push_labeled(after, QuadKind::Nop);
            }
            StatementKind::IfElse {
                condition,
                true_body,
                false_body,
            } => {
                let condition = self.flatten_operand(procedure, condition)?;
                let else_target = procedure.make_label();
                let end = procedure.make_label();

                procedure.push(QuadKind::Ifz {
                    condition,
                    target: else_target,
                });

                for statement in true_body {
                    self.lower_statement(procedure, statement)?;
                }

                procedure.push(QuadKind::Goto { target: end });
                procedure.push_labeled(else_target, QuadKind::Nop);

                for statement in false_body {
                    self.lower_statement(procedure, statement)?;
                }

                procedure.push_labeled(end, QuadKind::Nop);
            }
            StatementKind::While { condition, body } => {
                let start = procedure.make_label();
                let end = procedure.make_label();

                procedure.push_labeled(start, QuadKind::Nop);

                let condition = self.flatten_operand(procedure, condition)?;

                procedure.push(QuadKind::Ifz {
                    condition,
                    target: end,
                });

                for statement in body {
                    self.lower_statement(procedure, statement)?;
                }

                procedure.push(QuadKind::Goto { target: start });
                procedure.push_labeled(end, QuadKind::Nop);
            }
            StatementKind::Return(value) => {
                if let Some(value) = value {
                    let src = self.flatten_operand(procedure, value)?;
                    procedure.push(QuadKind::SetRet { src });
                }

                procedure.push(QuadKind::Goto {
                    target: procedure.leave_label,
                });
            }
        }

        Ok(())
    }

    // x++ and x-- both read and write the variable in place
    fn lower_update(
        &mut self,
        procedure: &mut Procedure,
        target: &Expression,
        op: BinaryOp,
    ) -> Result<(), InternalError> {
        let dst = self.flatten_lvalue(procedure, target)?;

        procedure.push(QuadKind::Binary {
            dst,
            op,
            lhs: dst,
            rhs: Opd::Lit {
                value: 1,
                width: dst.width(),
            },
        });

        Ok(())
    }

    /// A storage location a quad can write to: a variable directly, or an
    /// address temporary loaded with the pointer a dereference goes through
    fn flatten_lvalue(
        &mut self,
        procedure: &mut Procedure,
        expression: &Expression,
    ) -> Result<Opd, InternalError> {
        match &expression.kind {
            ExpressionKind::Identifier(identifier) => self.symbol_opd(identifier.id),
            ExpressionKind::Dereference(identifier) => {
                let pointee_width = Width::of_type(self.type_of(expression.id)?);
                let pointer = self.symbol_opd(identifier.id)?;
                let dst = procedure.make_addr_tmp(pointee_width);

                procedure.push(QuadKind::Deref { dst, src: pointer });

                Ok(dst)
            }
            _ => Err(InternalError::MalformedAst),
        }
    }

    /// Flattens an expression and, when type analysis marked it for widening,
    /// materializes the promotion as a copy into a fresh word-sized temporary
    fn flatten_operand(
        &mut self,
        procedure: &mut Procedure,
        expression: &Expression,
    ) -> Result<Opd, InternalError> {
        let opd = self.flatten_expression(procedure, expression)?;

        if let Some(promoted) = self.types.promotion_of(expression.id) {
            let wide = procedure.make_tmp(Width::of_type(promoted));
            procedure.push(QuadKind::Assign {
                dst: wide,
                src: opd,
            });

            return Ok(wide);
        }

        Ok(opd)
    }

    /// Produces an operand holding the expression's value, emitting quads for
    /// everything that has to happen first. Operands are flattened before the
    /// result temporary is allocated, so inner expressions claim lower
    /// temporary numbers than their parents.
    fn flatten_expression(
        &mut self,
        procedure: &mut Procedure,
        expression: &Expression,
    ) -> Result<Opd, InternalError> {
        match &expression.kind {
            ExpressionKind::IntLiteral(value) => Ok(Opd::Lit {
                value: *value,
                width: Width::Word,
            }),
            // Narrow literals wrap to a signed byte here, so an out-of-range
            // literal means the same value whether it is stored or used
            // directly
            ExpressionKind::ShortLiteral(value) => Ok(Opd::Lit {
                value: *value as i8 as i64,
                width: Width::Byte,
            }),
            ExpressionKind::True => Ok(Opd::Lit {
                value: 1,
                width: Width::Word,
            }),
            ExpressionKind::False => Ok(Opd::Lit {
                value: 0,
                width: Width::Word,
            }),
            ExpressionKind::StringLiteral(value) => Ok(Opd::Str {
                id: self.strings.intern(*value),
            }),
            ExpressionKind::Identifier(identifier) => self.symbol_opd(identifier.id),
            ExpressionKind::AddressOf(identifier) => {
                let src = self.symbol_opd(identifier.id)?;
                let dst = procedure.make_tmp(Width::Word);

                procedure.push(QuadKind::AddrOf { dst, src });

                Ok(dst)
            }
            ExpressionKind::Dereference(_) => self.flatten_lvalue(procedure, expression),
            ExpressionKind::Unary { operator, operand } => {
                let src = self.flatten_operand(procedure, operand)?;
                let dst = procedure.make_tmp(Width::of_type(self.type_of(expression.id)?));

                let op = match operator.kind {
                    UnaryOperatorKind::Negate => UnaryOp::Negate,
                    UnaryOperatorKind::LogicalNot => UnaryOp::Not,
                };

                procedure.push(QuadKind::Unary { dst, op, src });

                Ok(dst)
            }
            ExpressionKind::Binary { lhs, operator, rhs } => {
                let lhs = self.flatten_operand(procedure, lhs)?;
                let rhs = self.flatten_operand(procedure, rhs)?;
                let dst = procedure.make_tmp(Width::of_type(self.type_of(expression.id)?));

                procedure.push(QuadKind::Binary {
                    dst,
                    op: binary_op(operator.kind),
                    lhs,
                    rhs,
                });

                Ok(dst)
            }
            ExpressionKind::Assignment {
                destination,
                source,
            } => {
                // The source is flattened before the destination
                let src = self.flatten_operand(procedure, source)?;
                let dst = self.flatten_lvalue(procedure, destination)?;

                procedure.push(QuadKind::Assign { dst, src });

                Ok(dst)
            }
            ExpressionKind::Call { callee, arguments } => {
                let return_type = self.type_of(expression.id)?.clone();

                if return_type.is_void() {
                    return Err(InternalError::VoidValueCall);
                }

                self.flatten_call(procedure, callee, arguments)?;

                let dst = procedure.make_tmp(Width::of_type(&return_type));
                procedure.push(QuadKind::GetRet { dst });

                Ok(dst)
            }
        }
    }

    // Every argument is flattened before the first setarg
    fn flatten_call(
        &mut self,
        procedure: &mut Procedure,
        callee: &ast::Identifier,
        arguments: &[Expression],
    ) -> Result<(), InternalError> {
        let mut flattened = Vec::with_capacity(arguments.len());

        for argument in arguments {
            flattened.push(self.flatten_operand(procedure, argument)?);
        }

        for (index, src) in flattened.into_iter().enumerate() {
            procedure.push(QuadKind::SetArg {
                index: index + 1,
                src,
            });
        }

        procedure.push(QuadKind::Call {
            callee: callee.symbol,
        });

        Ok(())
    }
}

fn binary_op(kind: BinaryOperatorKind) -> BinaryOp {
    match kind {
        BinaryOperatorKind::Add => BinaryOp::Add,
        BinaryOperatorKind::Subtract => BinaryOp::Subtract,
        BinaryOperatorKind::Multiply => BinaryOp::Multiply,
        BinaryOperatorKind::Divide => BinaryOp::Divide,
        BinaryOperatorKind::LogicalAnd => BinaryOp::And,
        BinaryOperatorKind::LogicalOr => BinaryOp::Or,
        BinaryOperatorKind::Equals => BinaryOp::Eq,
        BinaryOperatorKind::NotEquals => BinaryOp::Neq,
        BinaryOperatorKind::LessThan => BinaryOp::Lt,
        BinaryOperatorKind::LessThanOrEqualTo => BinaryOp::Lte,
        BinaryOperatorKind::GreaterThan => BinaryOp::Gt,
        BinaryOperatorKind::GreaterThanOrEqualTo => BinaryOp::Gte,
    }
}
