use std::cell::RefCell;
use std::collections::HashMap;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::ast::{BinOp, Expr, ExprKind, FloatWidth, IntWidth, Lit, Method, NodeId, Program, Type, UnOp};
use crate::errors::ResolveError;

/// Resolved signature of a callable method.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSig {
    pub return_type: Type,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub params: Vec<Type>,
}

/// Type and method resolution capability, injected per run.
///
/// The core never embeds a parser or symbol solver; everything it needs to
/// know about static types arrives through this seam.
pub trait TypeResolver {
    fn type_of(&self, expr: &Expr) -> Result<Type, ResolveError>;

    fn method_sig(&self, call: &Expr) -> Result<MethodSig, ResolveError>;
}

/// On-disk program model: the parsed, type-annotated methods of one source
/// file plus the signatures of every method its expressions call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgramFile {
    pub program: Program,
    #[serde(default)]
    pub signatures: IndexMap<String, MethodSig>,
}

/// Map-backed resolver: variable types plus a method signature table.
///
/// Resolution is assumed expensive in the real collaborator, so results are
/// cached per node id. Synthetic nodes (id 0) share an id and are recomputed
/// each time; they are cheap by construction.
#[derive(Debug, Default)]
pub struct MapResolver {
    vars: IndexMap<String, Type>,
    methods: IndexMap<String, MethodSig>,
    cache: RefCell<HashMap<NodeId, Type>>,
}

impl MapResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_var(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.vars.insert(name.into(), ty);
        self
    }

    pub fn with_method(mut self, name: impl Into<String>, sig: MethodSig) -> Self {
        self.methods.insert(name.into(), sig);
        self
    }

    /// Scope a resolver to one method of a program file: its parameters plus
    /// the file-level signature table.
    pub fn for_method(file: &ProgramFile, method: &Method) -> Self {
        let mut resolver = Self::new();
        for param in &method.params {
            resolver.vars.insert(param.name.clone(), param.ty.clone());
        }
        resolver.methods = file.signatures.clone();
        resolver
    }

    fn lit_type(lit: &Lit) -> Result<Type, ResolveError> {
        match lit {
            Lit::Int(_) => Ok(Type::Integer(IntWidth::W32)),
            Lit::Long(_) => Ok(Type::Integer(IntWidth::W64)),
            Lit::Char(_) => Ok(Type::Char),
            Lit::Bool(_) => Ok(Type::Boolean),
            Lit::Str(_) => Ok(Type::Str),
            Lit::Float(_) => Ok(Type::Float(FloatWidth::W64)),
            Lit::Null => Err(ResolveError::Untypable),
        }
    }

    /// Binary numeric promotion: the wider operand wins, floats dominate,
    /// char promotes to a 16-bit integer.
    fn promote(lhs: Type, rhs: Type) -> Type {
        fn rank(ty: &Type) -> u8 {
            match ty {
                Type::Integer(IntWidth::W8) => 1,
                Type::Char | Type::Integer(IntWidth::W16) => 2,
                Type::Integer(IntWidth::W32) => 3,
                Type::Integer(IntWidth::W64) => 4,
                Type::Float(FloatWidth::W32) => 5,
                Type::Float(FloatWidth::W64) => 6,
                _ => 0,
            }
        }
        let winner = if rank(&rhs) > rank(&lhs) { rhs } else { lhs };
        match winner {
            Type::Char => Type::Integer(IntWidth::W16),
            other => other,
        }
    }

    fn compute(&self, expr: &Expr) -> Result<Type, ResolveError> {
        match &expr.kind {
            ExprKind::Lit(lit) => Self::lit_type(lit),
            ExprKind::Var(name) => self
                .vars
                .get(name)
                .cloned()
                .ok_or_else(|| ResolveError::UnknownVariable(name.clone())),
            ExprKind::Binary { op, lhs, rhs } => match op {
                BinOp::And | BinOp::Or => Ok(Type::Boolean),
                op if op.is_relational() => Ok(Type::Boolean),
                _ => {
                    let l = self.type_of(lhs)?;
                    let r = self.type_of(rhs)?;
                    Ok(Self::promote(l, r))
                }
            },
            ExprKind::Unary { op, operand } => match op {
                UnOp::Not => Ok(Type::Boolean),
                UnOp::Neg => self.type_of(operand),
            },
            ExprKind::Call { .. } => Ok(self.method_sig(expr)?.return_type),
            ExprKind::Conditional { then, .. } => self.type_of(then),
            ExprKind::Assign { value, .. } => self.type_of(value),
            ExprKind::Paren(inner) => self.type_of(inner),
        }
    }
}

impl TypeResolver for MapResolver {
    fn type_of(&self, expr: &Expr) -> Result<Type, ResolveError> {
        if expr.id != 0 {
            if let Some(ty) = self.cache.borrow().get(&expr.id) {
                return Ok(ty.clone());
            }
        }
        let ty = self.compute(expr)?;
        if expr.id != 0 {
            self.cache.borrow_mut().insert(expr.id, ty.clone());
        }
        Ok(ty)
    }

    fn method_sig(&self, call: &Expr) -> Result<MethodSig, ResolveError> {
        let ExprKind::Call { name, .. } = &call.kind else {
            return Err(ResolveError::NotACall);
        };
        self.methods
            .get(name)
            .cloned()
            .ok_or_else(|| ResolveError::UnknownMethod(name.clone()))
    }
}
