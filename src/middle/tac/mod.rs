use hashbrown::HashMap;

use crate::{
    frontend::intern::InternedSymbol,
    index::{Index, IndexVec, simple_index},
    middle::{resolve::SymbolId, ty::Type},
};

pub mod interp;
pub mod lowering;
pub mod pretty_print;

/// Storage width of an operand. Shorts are a single byte; everything else,
/// booleans included, occupies a full word.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Width {
    Byte,
    Word,
}

impl Width {
    pub fn bytes(self) -> usize {
        match self {
            Self::Byte => 1,
            Self::Word => 8,
        }
    }

    pub fn bits(self) -> usize {
        self.bytes() * 8
    }

    pub fn of_type(ty: &Type) -> Self {
        match ty {
            Type::Short => Self::Byte,
            _ => Self::Word,
        }
    }
}

simple_index! {
    /// A temporary holding an intermediate value within one procedure
    pub struct TmpId;
}

simple_index! {
    /// A temporary holding a value read through a pointer
    pub struct AddrId;
}

simple_index! {
    pub struct LabelId;
}

simple_index! {
    /// An entry in the program's string pool
    pub struct StringId;
}

/// Any value a quad can read or write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Opd {
    /// A named program variable
    Sym {
        id: SymbolId,
        name: InternedSymbol,
        width: Width,
    },
    Lit {
        value: i64,
        width: Width,
    },
    /// A pooled string literal
    Str {
        id: StringId,
    },
    Tmp {
        id: TmpId,
        width: Width,
    },
    /// Reads and writes through this operand go through the pointer value it
    /// holds rather than the slot itself
    Addr {
        id: AddrId,
        width: Width,
    },
}

impl Opd {
    pub fn width(&self) -> Width {
        match self {
            Self::Sym { width, .. }
            | Self::Lit { width, .. }
            | Self::Tmp { width, .. }
            | Self::Addr { width, .. } => *width,
            Self::Str { .. } => Width::Word,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quad {
    /// Jump target labels attach to the quad they precede
    pub label: Option<LabelId>,
    pub kind: QuadKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuadKind {
    Assign {
        dst: Opd,
        src: Opd,
    },
    Unary {
        dst: Opd,
        op: UnaryOp,
        src: Opd,
    },
    Binary {
        dst: Opd,
        op: BinaryOp,
        lhs: Opd,
        rhs: Opd,
    },
    /// Falls through when the condition is nonzero
    Ifz {
        condition: Opd,
        target: LabelId,
    },
    Goto {
        target: LabelId,
    },
    /// Carries a label or marks a procedure's leave point
    Nop,
    /// Binds the nth (1-based) argument to a formal on procedure entry
    GetArg {
        index: usize,
        dst: Opd,
    },
    /// Passes the nth (1-based) argument before a call
    SetArg {
        index: usize,
        src: Opd,
    },
    SetRet {
        src: Opd,
    },
    GetRet {
        dst: Opd,
    },
    Call {
        callee: InternedSymbol,
    },
    /// Reads a value from the input channel
    Receive {
        dst: Opd,
        ty: Type,
    },
    /// Writes a value to the output channel
    Report {
        src: Opd,
        ty: Type,
    },
    /// dst := the address of the variable src names
    AddrOf {
        dst: Opd,
        src: Opd,
    },
    /// dst := the value behind the pointer held in src
    Deref {
        dst: Opd,
        src: Opd,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Negate,
    Not,
}

impl UnaryOp {
    pub fn opcode(self, width: Width) -> String {
        let name = match self {
            Self::Negate => "NEG",
            Self::Not => "NOT",
        };

        format!("{name}{}", width.bits())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    And,
    Or,
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
}

impl BinaryOp {
    pub fn opcode(self, width: Width) -> String {
        let name = match self {
            Self::Add => "ADD",
            Self::Subtract => "SUB",
            Self::Multiply => "MULT",
            Self::Divide => "DIV",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Eq => "EQ",
            Self::Neq => "NEQ",
            Self::Lt => "LT",
            Self::Gt => "GT",
            Self::Lte => "LTE",
            Self::Gte => "GTE",
        };

        format!("{name}{}", width.bits())
    }
}

/// One lowered procedure. Temporaries and labels are numbered independently
/// per procedure, starting from zero.
#[derive(Debug)]
pub struct Procedure {
    pub name: InternedSymbol,
    pub formals: Vec<SymbolId>,
    pub locals: Vec<SymbolId>,
    pub quads: Vec<Quad>,
    /// Every return statement jumps here; the label sits on the trailing nop
    pub leave_label: LabelId,
    next_tmp: usize,
    next_addr: usize,
    next_label: usize,
}

impl Procedure {
    pub fn new(name: InternedSymbol) -> Self {
        let mut procedure = Self {
            name,
            formals: Vec::new(),
            locals: Vec::new(),
            quads: Vec::new(),
            leave_label: LabelId::new(0),
            next_tmp: 0,
            next_addr: 0,
            next_label: 0,
        };

        procedure.leave_label = procedure.make_label();
        procedure
    }

    pub fn make_tmp(&mut self, width: Width) -> Opd {
        let id = TmpId::new(self.next_tmp);
        self.next_tmp += 1;

        Opd::Tmp { id, width }
    }

    pub fn make_addr_tmp(&mut self, width: Width) -> Opd {
        let id = AddrId::new(self.next_addr);
        self.next_addr += 1;

        Opd::Addr { id, width }
    }

    pub fn make_label(&mut self) -> LabelId {
        let id = LabelId::new(self.next_label);
        self.next_label += 1;

        id
    }

    pub fn push(&mut self, kind: QuadKind) {
        self.quads.push(Quad { label: None, kind });
    }

    pub fn push_labeled(&mut self, label: LabelId, kind: QuadKind) {
        self.quads.push(Quad {
            label: Some(label),
            kind,
        });
    }

    pub fn gather_formal(&mut self, symbol: SymbolId) {
        self.formals.push(symbol);
    }

    pub fn gather_local(&mut self, symbol: SymbolId) {
        self.locals.push(symbol);
    }
}

/// String literals deduplicated across the whole program
#[derive(Debug, Default)]
pub struct StringPool {
    strings: IndexVec<StringId, InternedSymbol>,
    indices: HashMap<InternedSymbol, StringId>,
}

impl StringPool {
    pub fn intern(&mut self, value: InternedSymbol) -> StringId {
        if let Some(id) = self.indices.get(&value) {
            return *id;
        }

        let id = self.strings.push(value);
        self.indices.insert(value, id);

        id
    }

    pub fn get(&self, id: StringId) -> Option<InternedSymbol> {
        self.strings.get(id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (StringId, InternedSymbol)> + '_ {
        self.strings.enumerate().map(|(id, s)| (id, *s))
    }

    pub fn is_empty(&self) -> bool {
        self.strings.is_empty()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GlobalVar {
    pub id: SymbolId,
    pub name: InternedSymbol,
    pub width: Width,
}

/// A whole lowered program
#[derive(Debug)]
pub struct Program {
    pub globals: Vec<GlobalVar>,
    pub procedures: Vec<Procedure>,
    pub strings: StringPool,
}

impl Program {
    pub fn procedure(&self, name: &str) -> Option<&Procedure> {
        self.procedures
            .iter()
            .find(|procedure| procedure.name.value() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::{Procedure, StringPool, Width};
    use crate::frontend::intern::InternedSymbol;

    #[test]
    fn string_pool_deduplicates() {
        let mut pool = StringPool::default();
        let hello = InternedSymbol::new("hello");
        let world = InternedSymbol::new("world");

        let first = pool.intern(hello);
        let second = pool.intern(world);

        assert_ne!(first, second);
        assert_eq!(pool.intern(hello), first);
        assert_eq!(pool.get(first), Some(hello));
    }

    #[test]
    fn temporaries_and_labels_count_per_procedure() {
        let mut a = Procedure::new(InternedSymbol::new("a"));
        let mut b = Procedure::new(InternedSymbol::new("b"));

        let t0 = a.make_tmp(Width::Word);
        let _ = a.make_tmp(Width::Word);
        let t0_again = b.make_tmp(Width::Word);

        assert_eq!(t0, t0_again);

        // The leave label claims lbl_0 in every procedure
        assert_eq!(a.leave_label, b.leave_label);
        assert_ne!(a.make_label(), a.leave_label);
    }
}
