use core::fmt::{self, Display};

use colored::Colorize;

use crate::{
    index::Index,
    middle::tac::{LabelId, Opd, Procedure, Program, Quad, QuadKind},
};

impl Display for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "lbl_{}", self.index())
    }
}

impl Display for Opd {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Opd::Sym { name, .. } => {
                write!(f, "[{}]", name.value().green())
            }
            Opd::Lit { value, .. } => write!(f, "{}", value.to_string().magenta()),
            Opd::Str { id } => write!(f, "str_{}", id.index()),
            Opd::Tmp { id, .. } => write!(f, "[{}]", format!("tmp{}", id.index()).blue()),
            Opd::Addr { id, .. } => write!(f, "[{}]", format!("addr{}", id.index()).blue()),
        }
    }
}

impl Display for Quad {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Jump targets sit in a gutter to the left of the quad itself. The
        // padding is applied before coloring so the escape codes do not count
        // against the column width.
        match self.label {
            Some(label) => {
                let gutter = format!("{:>8}", format!("{label}:"));
                write!(f, "{} ", gutter.yellow())?;
            }
            None => write!(f, "{:>8} ", "")?,
        }

        match &self.kind {
            QuadKind::Assign { dst, src } => write!(f, "{dst} := {src}"),
            QuadKind::Unary { dst, op, src } => {
                write!(f, "{dst} := {} {src}", op.opcode(src.width()).cyan())
            }
            QuadKind::Binary { dst, op, lhs, rhs } => {
                write!(f, "{dst} := {lhs} {} {rhs}", op.opcode(lhs.width()).cyan())
            }
            QuadKind::Ifz { condition, target } => {
                write!(
                    f,
                    "{} {condition} {} {}",
                    "ifz".cyan(),
                    "goto".cyan(),
                    target.to_string().yellow()
                )
            }
            QuadKind::Goto { target } => {
                write!(f, "{} {}", "goto".cyan(), target.to_string().yellow())
            }
            QuadKind::Nop => write!(f, "{}", "nop".cyan()),
            QuadKind::GetArg { index, dst } => {
                write!(f, "{} {index} {dst}", "getarg".cyan())
            }
            QuadKind::SetArg { index, src } => {
                write!(f, "{} {index} {src}", "setarg".cyan())
            }
            QuadKind::SetRet { src } => write!(f, "{} {src}", "setret".cyan()),
            QuadKind::GetRet { dst } => write!(f, "{dst} := {}", "getret".cyan()),
            QuadKind::Call { callee } => {
                write!(f, "{} {}", "call".cyan(), callee.value().green())
            }
            QuadKind::Receive { dst, ty } => {
                write!(f, "{} {ty} {dst}", "receive".cyan())
            }
            QuadKind::Report { src, ty } => {
                write!(f, "{} {ty} {src}", "report".cyan())
            }
            QuadKind::AddrOf { dst, src } => {
                write!(f, "{dst} := {} {src}", "addr".cyan())
            }
            QuadKind::Deref { dst, src } => {
                write!(f, "{dst} := {} {src}", "deref".cyan())
            }
        }
    }
}

impl Display for Procedure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} {} {}",
            "[BEGIN".white(),
            self.name.value().green().bold(),
            "PROCEDURE]".white()
        )?;

        for quad in &self.quads {
            writeln!(f, "{quad}")?;
        }

        write!(
            f,
            "{} {} {}",
            "[END".white(),
            self.name.value().green().bold(),
            "PROCEDURE]".white()
        )
    }
}

impl Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", "[BEGIN GLOBALS]".white())?;

        for global in &self.globals {
            writeln!(
                f,
                "{} ({} bytes)",
                global.name.value().green(),
                global.width.bytes()
            )?;
        }

        for (id, text) in self.strings.iter() {
            writeln!(f, "str_{} {:?}", id.index(), text.value())?;
        }

        writeln!(f, "{}", "[END GLOBALS]".white())?;

        for procedure in &self.procedures {
            writeln!(f, "{procedure}")?;
        }

        Ok(())
    }
}
