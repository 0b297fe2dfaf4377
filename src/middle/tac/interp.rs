use std::collections::VecDeque;

use hashbrown::HashMap;
use thiserror::Error;

use crate::{
    index::Index,
    middle::{
        resolve::SymbolId,
        tac::{BinaryOp, LabelId, Opd, Procedure, Program, QuadKind, UnaryOp, Width},
        ty::Type,
    },
};

/// Faults that can only surface while executing a program, not while
/// compiling it
#[derive(Debug, Error)]
pub enum ExecError {
    #[error("call to unknown procedure `{0}`")]
    UnknownProcedure(String),
    #[error("jump to a label no quad carries")]
    UnknownLabel,
    #[error("ran out of input")]
    OutOfInput,
    #[error("input was not a valid {0}: `{1}`")]
    BadInput(Type, String),
    #[error("division by zero")]
    DivisionByZero,
    #[error("string operand used as a numeric value")]
    StringValue,
    #[error("argument {0} was never passed")]
    MissingArgument(usize),
    #[error("temporary used before it was written")]
    UnsetTemporary,
    #[error("address temporary used before it was loaded")]
    UnsetAddress,
    #[error("return value read but never set")]
    NoReturnValue,
    #[error("pointer does not refer to any variable")]
    BadPointer,
}

/// Per-invocation state: argument and return channels plus the registers and
/// storage cells belonging to one activation
#[derive(Debug, Default)]
struct Frame {
    cells: HashMap<SymbolId, usize>,
    tmps: HashMap<usize, i64>,
    /// Address registers hold the memory index a deref resolved to
    addrs: HashMap<usize, usize>,
    pending_args: HashMap<usize, i64>,
    last_return: Option<i64>,
    return_value: Option<i64>,
}

/// A direct executor for lowered programs. Variables live in one flat memory
/// so address-of yields a real index a pointer can travel through.
#[derive(Debug)]
pub struct Machine<'p> {
    program: &'p Program,
    memory: Vec<i64>,
    globals: HashMap<SymbolId, usize>,
    input: VecDeque<String>,
    output: Vec<String>,
}

impl<'p> Machine<'p> {
    pub fn new(program: &'p Program, input: impl IntoIterator<Item = String>) -> Self {
        Self {
            program,
            memory: Vec::new(),
            globals: HashMap::new(),
            input: input.into_iter().collect(),
            output: Vec::new(),
        }
    }

    /// Runs top level statements first, then main if the program has one
    pub fn run(mut self) -> Result<Vec<String>, ExecError> {
        for global in &self.program.globals {
            let cell = self.allocate_cell();
            self.globals.insert(global.id, cell);
        }

        if let Some(procedure) = self.program.procedure(super::lowering::GLOBAL_PROCEDURE) {
            self.run_procedure(procedure, Vec::new())?;
        }

        if let Some(main) = self.program.procedure("main") {
            self.run_procedure(main, Vec::new())?;
        }

        Ok(self.output)
    }

    fn allocate_cell(&mut self) -> usize {
        self.memory.push(0);
        self.memory.len() - 1
    }

    fn run_procedure(
        &mut self,
        procedure: &'p Procedure,
        args: Vec<i64>,
    ) -> Result<Option<i64>, ExecError> {
        let mut frame = Frame::default();

        // Fresh cells per activation, so recursion gets its own storage
        for symbol in procedure.formals.iter().chain(procedure.locals.iter()) {
            let cell = self.allocate_cell();
            frame.cells.insert(*symbol, cell);
        }

        let labels: HashMap<LabelId, usize> = procedure
            .quads
            .iter()
            .enumerate()
            .filter_map(|(index, quad)| quad.label.map(|label| (label, index)))
            .collect();

        let mut pc = 0;

        while let Some(quad) = procedure.quads.get(pc) {
            pc += 1;

            match &quad.kind {
                QuadKind::Assign { dst, src } => {
                    let value = self.read(&frame, src)?;
                    self.write(&mut frame, dst, value)?;
                }
                QuadKind::Unary { dst, op, src } => {
                    let value = self.read(&frame, src)?;

                    let result = match op {
                        UnaryOp::Negate => value.wrapping_neg(),
                        UnaryOp::Not => (value == 0) as i64,
                    };

                    self.write(&mut frame, dst, truncate(result, src.width()))?;
                }
                QuadKind::Binary { dst, op, lhs, rhs } => {
                    let left = self.read(&frame, lhs)?;
                    let right = self.read(&frame, rhs)?;
                    let result = apply_binary(*op, left, right)?;

                    self.write(&mut frame, dst, truncate(result, dst.width()))?;
                }
                QuadKind::Ifz { condition, target } => {
                    if self.read(&frame, condition)? == 0 {
                        pc = *labels.get(target).ok_or(ExecError::UnknownLabel)?;
                    }
                }
                QuadKind::Goto { target } => {
                    pc = *labels.get(target).ok_or(ExecError::UnknownLabel)?;
                }
                QuadKind::Nop => {}
                QuadKind::GetArg { index, dst } => {
                    let value = *args
                        .get(index - 1)
                        .ok_or(ExecError::MissingArgument(*index))?;
                    self.write(&mut frame, dst, value)?;
                }
                QuadKind::SetArg { index, src } => {
                    let value = self.read(&frame, src)?;
                    frame.pending_args.insert(*index, value);
                }
                QuadKind::SetRet { src } => {
                    frame.return_value = Some(self.read(&frame, src)?);
                }
                QuadKind::GetRet { dst } => {
                    let value = frame.last_return.ok_or(ExecError::NoReturnValue)?;
                    self.write(&mut frame, dst, value)?;
                }
                QuadKind::Call { callee } => {
                    let target = self
                        .program
                        .procedure(callee.value())
                        .ok_or_else(|| ExecError::UnknownProcedure(callee.value().to_owned()))?;

                    let mut call_args = Vec::with_capacity(target.formals.len());

                    for index in 1..=target.formals.len() {
                        call_args.push(
                            *frame
                                .pending_args
                                .get(&index)
                                .ok_or(ExecError::MissingArgument(index))?,
                        );
                    }

                    frame.pending_args.clear();
                    frame.last_return = self.run_procedure(target, call_args)?;
                }
                QuadKind::Receive { dst, ty } => {
                    let line = self.input.pop_front().ok_or(ExecError::OutOfInput)?;
                    let value = parse_input(ty, line.trim())?;

                    self.write(&mut frame, dst, truncate(value, dst.width()))?;
                }
                QuadKind::Report { src, ty } => {
                    let text = match (src, ty) {
                        (Opd::Str { id }, _) => self
                            .program
                            .strings
                            .get(*id)
                            .ok_or(ExecError::StringValue)?
                            .value()
                            .to_owned(),
                        (_, Type::Bool) => {
                            if self.read(&frame, src)? == 0 {
                                "false".to_owned()
                            } else {
                                "true".to_owned()
                            }
                        }
                        _ => self.read(&frame, src)?.to_string(),
                    };

                    self.output.push(text);
                }
                QuadKind::AddrOf { dst, src } => {
                    let Opd::Sym { id, .. } = src else {
                        return Err(ExecError::BadPointer);
                    };

                    let cell = self.cell_of(&frame, *id)?;
                    self.write(&mut frame, dst, cell as i64)?;
                }
                QuadKind::Deref { dst, src } => {
                    let pointer = self.read(&frame, src)?;

                    if pointer < 0 || pointer as usize >= self.memory.len() {
                        return Err(ExecError::BadPointer);
                    }

                    let Opd::Addr { id, .. } = dst else {
                        return Err(ExecError::BadPointer);
                    };

                    frame.addrs.insert(id.index(), pointer as usize);
                }
            }
        }

        Ok(frame.return_value)
    }

    fn cell_of(&self, frame: &Frame, symbol: SymbolId) -> Result<usize, ExecError> {
        frame
            .cells
            .get(&symbol)
            .or_else(|| self.globals.get(&symbol))
            .copied()
            .ok_or(ExecError::BadPointer)
    }

    fn read(&self, frame: &Frame, opd: &Opd) -> Result<i64, ExecError> {
        match opd {
            Opd::Sym { id, .. } => Ok(self.memory[self.cell_of(frame, *id)?]),
            Opd::Lit { value, .. } => Ok(*value),
            Opd::Str { .. } => Err(ExecError::StringValue),
            Opd::Tmp { id, .. } => frame
                .tmps
                .get(&id.index())
                .copied()
                .ok_or(ExecError::UnsetTemporary),
            Opd::Addr { id, .. } => {
                let cell = *frame.addrs.get(&id.index()).ok_or(ExecError::UnsetAddress)?;
                Ok(self.memory[cell])
            }
        }
    }

    fn write(&mut self, frame: &mut Frame, opd: &Opd, value: i64) -> Result<(), ExecError> {
        match opd {
            Opd::Sym { id, width, .. } => {
                let cell = self.cell_of(frame, *id)?;
                self.memory[cell] = truncate(value, *width);
                Ok(())
            }
            Opd::Tmp { id, .. } => {
                frame.tmps.insert(id.index(), value);
                Ok(())
            }
            Opd::Addr { id, width } => {
                let cell = *frame.addrs.get(&id.index()).ok_or(ExecError::UnsetAddress)?;
                self.memory[cell] = truncate(value, *width);
                Ok(())
            }
            Opd::Lit { .. } | Opd::Str { .. } => Err(ExecError::BadPointer),
        }
    }
}

/// Narrow values wrap like a signed byte; everything else keeps all 64 bits
fn truncate(value: i64, width: Width) -> i64 {
    match width {
        Width::Byte => value as i8 as i64,
        Width::Word => value,
    }
}

fn apply_binary(op: BinaryOp, lhs: i64, rhs: i64) -> Result<i64, ExecError> {
    let result = match op {
        BinaryOp::Add => lhs.wrapping_add(rhs),
        BinaryOp::Subtract => lhs.wrapping_sub(rhs),
        BinaryOp::Multiply => lhs.wrapping_mul(rhs),
        BinaryOp::Divide => {
            if rhs == 0 {
                return Err(ExecError::DivisionByZero);
            }

            lhs.wrapping_div(rhs)
        }
        BinaryOp::And => (lhs != 0 && rhs != 0) as i64,
        BinaryOp::Or => (lhs != 0 || rhs != 0) as i64,
        BinaryOp::Eq => (lhs == rhs) as i64,
        BinaryOp::Neq => (lhs != rhs) as i64,
        BinaryOp::Lt => (lhs < rhs) as i64,
        BinaryOp::Gt => (lhs > rhs) as i64,
        BinaryOp::Lte => (lhs <= rhs) as i64,
        BinaryOp::Gte => (lhs >= rhs) as i64,
    };

    Ok(result)
}

fn parse_input(ty: &Type, text: &str) -> Result<i64, ExecError> {
    match ty {
        Type::Bool => match text {
            "true" => Ok(1),
            "false" => Ok(0),
            _ => Err(ExecError::BadInput(ty.clone(), text.to_owned())),
        },
        _ => text
            .parse()
            .map_err(|_| ExecError::BadInput(ty.clone(), text.to_owned())),
    }
}
