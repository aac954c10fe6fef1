/// SMT sorts used by the condition encoding.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SmtSort {
    Bool,
    /// Fixed-width two's-complement bit-vector.
    BitVec(u32),
    /// The uninterpreted sort of string values.
    Str,
    /// One uninterpreted sort per reference type name.
    Ref(String),
}

impl std::fmt::Display for SmtSort {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SmtSort::Bool => write!(f, "Bool"),
            SmtSort::BitVec(width) => write!(f, "(_ BitVec {width})"),
            SmtSort::Str => write!(f, "Str"),
            SmtSort::Ref(name) => write!(f, "{name}"),
        }
    }
}
