use serde::{Deserialize, Serialize};

/// Identity of a node in the externally supplied program model.
///
/// Real nodes carry a nonzero id assigned by the collaborator that built the
/// tree. Nodes synthesized by the pipeline (abstract-value conditions, mutant
/// replacements) use id 0 and an empty span.
pub type NodeId = u32;

/// Byte range of a node in the original source text.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    /// Synthetic nodes carry an empty span; they cannot be spliced back into
    /// source text.
    pub fn is_synthetic(&self) -> bool {
        self.start == 0 && self.end == 0
    }
}

/// Resolved static type of an expression, supplied by the program model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Type {
    Boolean,
    Integer(IntWidth),
    Char,
    Float(FloatWidth),
    Str,
    Reference(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FloatWidth {
    W32,
    W64,
}

impl Type {
    /// Bit width for the fixed-width SMT encoding. Char is a 16-bit code unit.
    pub fn bit_width(&self) -> Option<u32> {
        match self {
            Type::Integer(IntWidth::W8) => Some(8),
            Type::Integer(IntWidth::W16) | Type::Char => Some(16),
            Type::Integer(IntWidth::W32) => Some(32),
            Type::Integer(IntWidth::W64) => Some(64),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(self, Type::Integer(_) | Type::Char | Type::Float(_))
    }
}

impl std::fmt::Display for Type {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Type::Boolean => write!(f, "boolean"),
            Type::Integer(IntWidth::W8) => write!(f, "byte"),
            Type::Integer(IntWidth::W16) => write!(f, "short"),
            Type::Integer(IntWidth::W32) => write!(f, "int"),
            Type::Integer(IntWidth::W64) => write!(f, "long"),
            Type::Char => write!(f, "char"),
            Type::Float(FloatWidth::W32) => write!(f, "float"),
            Type::Float(FloatWidth::W64) => write!(f, "double"),
            Type::Str => write!(f, "String"),
            Type::Reference(name) => write!(f, "{name}"),
        }
    }
}

/// Literal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Lit {
    Int(i64),
    Long(i64),
    Char(char),
    Bool(bool),
    Str(String),
    Float(f64),
    Null,
}

impl std::fmt::Display for Lit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Lit::Int(n) => write!(f, "{n}"),
            Lit::Long(n) => write!(f, "{n}L"),
            Lit::Char(c) => match c {
                '\'' => write!(f, "'\\''"),
                '\\' => write!(f, "'\\\\'"),
                c => write!(f, "'{c}'"),
            },
            Lit::Bool(b) => write!(f, "{b}"),
            Lit::Str(s) => {
                write!(f, "\"")?;
                for c in s.chars() {
                    match c {
                        '"' => write!(f, "\\\"")?,
                        '\\' => write!(f, "\\\\")?,
                        c => write!(f, "{c}")?,
                    }
                }
                write!(f, "\"")
            }
            Lit::Float(x) => {
                let s = format!("{x}");
                if s.contains('.') || s.contains('e') || s.contains("inf") || s.contains("NaN") {
                    write!(f, "{s}")
                } else {
                    write!(f, "{s}.0")
                }
            }
            Lit::Null => write!(f, "null"),
        }
    }
}

/// Binary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    And,
    Or,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinOp {
    pub fn is_relational(self) -> bool {
        matches!(
            self,
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge
        )
    }

    /// Ordered comparisons induce a trichotomy; equality comparisons do not.
    pub fn is_ordered(self) -> bool {
        matches!(self, BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge)
    }

    pub fn is_equality(self) -> bool {
        matches!(self, BinOp::Eq | BinOp::Ne)
    }

    /// Logical negation of a relational operator.
    pub fn negated(self) -> Option<BinOp> {
        match self {
            BinOp::Eq => Some(BinOp::Ne),
            BinOp::Ne => Some(BinOp::Eq),
            BinOp::Lt => Some(BinOp::Ge),
            BinOp::Ge => Some(BinOp::Lt),
            BinOp::Gt => Some(BinOp::Le),
            BinOp::Le => Some(BinOp::Gt),
            _ => None,
        }
    }

    /// The operator that holds when a relational operator's operands are
    /// swapped: `a < b` iff `b > a`.
    pub fn reversed(self) -> Option<BinOp> {
        match self {
            BinOp::Eq => Some(BinOp::Eq),
            BinOp::Ne => Some(BinOp::Ne),
            BinOp::Lt => Some(BinOp::Gt),
            BinOp::Gt => Some(BinOp::Lt),
            BinOp::Le => Some(BinOp::Ge),
            BinOp::Ge => Some(BinOp::Le),
            _ => None,
        }
    }
}

impl std::fmt::Display for BinOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::And => "&&",
            BinOp::Or => "||",
            BinOp::Eq => "==",
            BinOp::Ne => "!=",
            BinOp::Lt => "<",
            BinOp::Le => "<=",
            BinOp::Gt => ">",
            BinOp::Ge => ">=",
        };
        write!(f, "{s}")
    }
}

/// Unary operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnOp {
    Not,
    Neg,
}

impl std::fmt::Display for UnOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnOp::Not => write!(f, "!"),
            UnOp::Neg => write!(f, "-"),
        }
    }
}

/// An expression node.
///
/// Equality is structural over `kind` only; ids and spans identify positions
/// in the original source and do not participate in value comparisons. The
/// dedup passes in the condition algebra rely on this.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Expr {
    #[serde(default)]
    pub id: NodeId,
    #[serde(default)]
    pub span: Span,
    pub kind: ExprKind,
}

impl PartialEq for Expr {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ExprKind {
    Lit(Lit),
    Var(String),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Unary {
        op: UnOp,
        operand: Box<Expr>,
    },
    Call {
        receiver: Option<Box<Expr>>,
        name: String,
        args: Vec<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then: Box<Expr>,
        els: Box<Expr>,
    },
    Assign {
        target: String,
        value: Box<Expr>,
    },
    Paren(Box<Expr>),
}

impl Expr {
    pub fn new(id: NodeId, span: Span, kind: ExprKind) -> Self {
        Self { id, span, kind }
    }

    /// A node synthesized by the pipeline, with no source position.
    pub fn synthetic(kind: ExprKind) -> Self {
        Self {
            id: 0,
            span: Span::default(),
            kind,
        }
    }

    pub fn var(name: impl Into<String>) -> Self {
        Expr::synthetic(ExprKind::Var(name.into()))
    }

    pub fn int(n: i64) -> Self {
        Expr::synthetic(ExprKind::Lit(Lit::Int(n)))
    }

    pub fn long(n: i64) -> Self {
        Expr::synthetic(ExprKind::Lit(Lit::Long(n)))
    }

    pub fn chr(c: char) -> Self {
        Expr::synthetic(ExprKind::Lit(Lit::Char(c)))
    }

    pub fn bool_lit(b: bool) -> Self {
        Expr::synthetic(ExprKind::Lit(Lit::Bool(b)))
    }

    pub fn str_lit(s: impl Into<String>) -> Self {
        Expr::synthetic(ExprKind::Lit(Lit::Str(s.into())))
    }

    pub fn float(x: f64) -> Self {
        Expr::synthetic(ExprKind::Lit(Lit::Float(x)))
    }

    pub fn null() -> Self {
        Expr::synthetic(ExprKind::Lit(Lit::Null))
    }

    pub fn bin(op: BinOp, lhs: Expr, rhs: Expr) -> Self {
        Expr::synthetic(ExprKind::Binary {
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    pub fn not(operand: Expr) -> Self {
        Expr::synthetic(ExprKind::Unary {
            op: UnOp::Not,
            operand: Box::new(operand),
        })
    }

    pub fn call(receiver: Option<Expr>, name: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::synthetic(ExprKind::Call {
            receiver: receiver.map(Box::new),
            name: name.into(),
            args,
        })
    }

    pub fn conditional(cond: Expr, then: Expr, els: Expr) -> Self {
        Expr::synthetic(ExprKind::Conditional {
            cond: Box::new(cond),
            then: Box::new(then),
            els: Box::new(els),
        })
    }

    pub fn paren(inner: Expr) -> Self {
        match inner.kind {
            ExprKind::Paren(_) => inner,
            _ => Expr::synthetic(ExprKind::Paren(Box::new(inner))),
        }
    }

    pub fn is_lit_true(&self) -> bool {
        matches!(self.kind, ExprKind::Lit(Lit::Bool(true)))
    }

    pub fn is_lit_false(&self) -> bool {
        matches!(self.kind, ExprKind::Lit(Lit::Bool(false)))
    }

    pub fn is_null_lit(&self) -> bool {
        matches!(self.kind, ExprKind::Lit(Lit::Null))
    }

    /// Whether this is an (in)equality against a null literal. The path
    /// collector skips these checks entirely.
    pub fn is_null_check(&self) -> bool {
        match &self.kind {
            ExprKind::Binary { op, lhs, rhs } if op.is_equality() => {
                lhs.is_null_lit() || rhs.is_null_lit()
            }
            ExprKind::Paren(inner) => inner.is_null_check(),
            _ => false,
        }
    }

    /// Logical negation, pushed through relational operators and De Morgan.
    pub fn negated(&self) -> Expr {
        match &self.kind {
            ExprKind::Lit(Lit::Bool(b)) => Expr::bool_lit(!b),
            ExprKind::Binary { op, lhs, rhs } => {
                if let Some(neg) = op.negated() {
                    return Expr::bin(neg, (**lhs).clone(), (**rhs).clone());
                }
                match op {
                    BinOp::And => Expr::bin(BinOp::Or, lhs.negated(), rhs.negated()),
                    BinOp::Or => Expr::bin(BinOp::And, lhs.negated(), rhs.negated()),
                    _ => Expr::not(self.clone()),
                }
            }
            ExprKind::Unary {
                op: UnOp::Not,
                operand,
            } => (**operand).clone(),
            ExprKind::Paren(inner) => inner.negated(),
            _ => Expr::not(self.clone()),
        }
    }

    fn precedence(&self) -> u8 {
        match &self.kind {
            ExprKind::Assign { .. } => 1,
            ExprKind::Conditional { .. } => 2,
            ExprKind::Binary { op, .. } => match op {
                BinOp::Or => 3,
                BinOp::And => 4,
                BinOp::Eq | BinOp::Ne => 5,
                BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => 6,
                BinOp::Add | BinOp::Sub => 7,
                BinOp::Mul | BinOp::Div | BinOp::Rem => 8,
            },
            ExprKind::Unary { .. } => 9,
            ExprKind::Lit(_) | ExprKind::Var(_) | ExprKind::Call { .. } | ExprKind::Paren(_) => 10,
        }
    }

    fn fmt_child(
        &self,
        child: &Expr,
        needs_parens: bool,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        if needs_parens {
            write!(f, "({child})")
        } else {
            write!(f, "{child}")
        }
    }
}

impl std::fmt::Display for Expr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let prec = self.precedence();
        match &self.kind {
            ExprKind::Lit(lit) => write!(f, "{lit}"),
            ExprKind::Var(name) => write!(f, "{name}"),
            ExprKind::Binary { op, lhs, rhs } => {
                self.fmt_child(lhs, lhs.precedence() < prec, f)?;
                write!(f, " {op} ")?;
                self.fmt_child(rhs, rhs.precedence() <= prec, f)
            }
            ExprKind::Unary { op, operand } => {
                write!(f, "{op}")?;
                self.fmt_child(operand, operand.precedence() < prec, f)
            }
            ExprKind::Call {
                receiver,
                name,
                args,
            } => {
                if let Some(recv) = receiver {
                    self.fmt_child(recv, recv.precedence() < 10, f)?;
                    write!(f, ".")?;
                }
                write!(f, "{name}(")?;
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{arg}")?;
                }
                write!(f, ")")
            }
            ExprKind::Conditional { cond, then, els } => {
                self.fmt_child(cond, cond.precedence() <= prec, f)?;
                write!(f, " ? {then} : {els}")
            }
            ExprKind::Assign { target, value } => write!(f, "{target} = {value}"),
            ExprKind::Paren(inner) => write!(f, "({inner})"),
        }
    }
}

/// A statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Stmt {
    Expr(Expr),
    If {
        cond: Expr,
        then_branch: Block,
        #[serde(default)]
        else_branch: Option<Block>,
    },
    Return {
        #[serde(default)]
        id: NodeId,
        #[serde(default)]
        span: Span,
        #[serde(default)]
        expr: Option<Expr>,
    },
    Block(Block),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub stmts: Vec<Stmt>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: Type,
}

/// A method of the program model. Loops and exception handling are rejected
/// upstream; bodies contain only blocks, conditionals, expression statements,
/// and returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    pub params: Vec<Param>,
    pub return_type: Type,
    pub body: Block,
}

/// All methods of one source file's program model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Program {
    pub methods: Vec<Method>,
}
