/// Abstract SMT term representation, solver-agnostic.
///
/// Arithmetic and comparisons are over fixed-width signed bit-vectors; a
/// term's width is fixed at construction and backends reject mismatches.
#[derive(Debug, Clone, PartialEq)]
pub enum SmtTerm {
    /// Variable reference by name.
    Var(String),
    /// Bit-vector literal of an explicit width.
    BvLit { value: i64, width: u32 },
    /// Boolean literal.
    BoolLit(bool),

    // Bit-vector arithmetic
    BvAdd(Box<SmtTerm>, Box<SmtTerm>),
    BvSub(Box<SmtTerm>, Box<SmtTerm>),
    BvMul(Box<SmtTerm>, Box<SmtTerm>),
    BvSDiv(Box<SmtTerm>, Box<SmtTerm>),
    BvSRem(Box<SmtTerm>, Box<SmtTerm>),
    BvNeg(Box<SmtTerm>),

    // Comparison (signed for the ordered forms)
    Eq(Box<SmtTerm>, Box<SmtTerm>),
    BvSlt(Box<SmtTerm>, Box<SmtTerm>),
    BvSle(Box<SmtTerm>, Box<SmtTerm>),
    BvSgt(Box<SmtTerm>, Box<SmtTerm>),
    BvSge(Box<SmtTerm>, Box<SmtTerm>),

    // Boolean logic
    And(Vec<SmtTerm>),
    Or(Vec<SmtTerm>),
    Not(Box<SmtTerm>),

    // If-then-else
    Ite(Box<SmtTerm>, Box<SmtTerm>, Box<SmtTerm>),

    /// Application of an uninterpreted function.
    App { func: String, args: Vec<SmtTerm> },
}

#[allow(clippy::should_implement_trait)]
impl SmtTerm {
    pub fn var(name: impl Into<String>) -> Self {
        SmtTerm::Var(name.into())
    }

    pub fn bv(value: i64, width: u32) -> Self {
        SmtTerm::BvLit { value, width }
    }

    pub fn bool(b: bool) -> Self {
        SmtTerm::BoolLit(b)
    }

    pub fn add(self, other: SmtTerm) -> Self {
        SmtTerm::BvAdd(Box::new(self), Box::new(other))
    }

    pub fn sub(self, other: SmtTerm) -> Self {
        SmtTerm::BvSub(Box::new(self), Box::new(other))
    }

    pub fn mul(self, other: SmtTerm) -> Self {
        SmtTerm::BvMul(Box::new(self), Box::new(other))
    }

    pub fn sdiv(self, other: SmtTerm) -> Self {
        SmtTerm::BvSDiv(Box::new(self), Box::new(other))
    }

    pub fn srem(self, other: SmtTerm) -> Self {
        SmtTerm::BvSRem(Box::new(self), Box::new(other))
    }

    pub fn neg(self) -> Self {
        SmtTerm::BvNeg(Box::new(self))
    }

    pub fn eq(self, other: SmtTerm) -> Self {
        SmtTerm::Eq(Box::new(self), Box::new(other))
    }

    pub fn slt(self, other: SmtTerm) -> Self {
        SmtTerm::BvSlt(Box::new(self), Box::new(other))
    }

    pub fn sle(self, other: SmtTerm) -> Self {
        SmtTerm::BvSle(Box::new(self), Box::new(other))
    }

    pub fn sgt(self, other: SmtTerm) -> Self {
        SmtTerm::BvSgt(Box::new(self), Box::new(other))
    }

    pub fn sge(self, other: SmtTerm) -> Self {
        SmtTerm::BvSge(Box::new(self), Box::new(other))
    }

    pub fn and(terms: Vec<SmtTerm>) -> Self {
        SmtTerm::And(terms)
    }

    pub fn or(terms: Vec<SmtTerm>) -> Self {
        SmtTerm::Or(terms)
    }

    pub fn not(self) -> Self {
        SmtTerm::Not(Box::new(self))
    }

    pub fn ite(self, then: SmtTerm, els: SmtTerm) -> Self {
        SmtTerm::Ite(Box::new(self), Box::new(then), Box::new(els))
    }

    pub fn app(func: impl Into<String>, args: Vec<SmtTerm>) -> Self {
        SmtTerm::App {
            func: func.into(),
            args,
        }
    }
}
