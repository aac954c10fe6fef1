use thiserror::Error;

use msav_ast::ast::{BinOp, Expr, ExprKind, Lit, Type};
use msav_ast::errors::ResolveError;
use msav_ast::resolve::TypeResolver;

#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("cannot build a relation from non-relational operator '{0}'")]
    InvalidOperator(BinOp),

    #[error("cannot classify non-boolean expression '{0}' as a predicate")]
    NotBoolean(String),

    #[error("method '{0}' does not return boolean")]
    NonBooleanMethod(String),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Shape of one relation operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OperandShape {
    Name,
    Literal,
    Other,
}

fn shape_of(expr: &Expr) -> OperandShape {
    match &expr.kind {
        ExprKind::Var(_) => OperandShape::Name,
        ExprKind::Lit(_) => OperandShape::Literal,
        ExprKind::Paren(inner) => shape_of(inner),
        _ => OperandShape::Other,
    }
}

/// Operand-shape pair of a relation, after normalization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
    NameLiteral,
    NameName,
    ExprName,
    ExprLiteral,
    LiteralLiteral,
    ExprExpr,
}

/// A classified relational comparison.
///
/// Symmetric cases are normalized so the name/simpler operand is on the left
/// (the operator is reversed when operands are swapped): `1 <= x` becomes
/// `x >= 1` with kind `NameLiteral`.
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    pub kind: RelationKind,
    pub op: BinOp,
    pub lhs: Expr,
    pub rhs: Expr,
}

impl Relation {
    pub fn from_binary(op: BinOp, lhs: &Expr, rhs: &Expr) -> Result<Self, ClassifyError> {
        if !op.is_relational() {
            return Err(ClassifyError::InvalidOperator(op));
        }
        // After the relational check this cannot fail.
        let reversed = op.reversed().ok_or(ClassifyError::InvalidOperator(op))?;
        let (kind, op, lhs, rhs) = match (shape_of(lhs), shape_of(rhs)) {
            (OperandShape::Name, OperandShape::Literal) => (RelationKind::NameLiteral, op, lhs, rhs),
            (OperandShape::Literal, OperandShape::Name) => {
                (RelationKind::NameLiteral, reversed, rhs, lhs)
            }
            (OperandShape::Name, OperandShape::Name) => (RelationKind::NameName, op, lhs, rhs),
            (OperandShape::Other, OperandShape::Name) => (RelationKind::ExprName, op, lhs, rhs),
            (OperandShape::Name, OperandShape::Other) => (RelationKind::ExprName, reversed, rhs, lhs),
            (OperandShape::Other, OperandShape::Literal) => {
                (RelationKind::ExprLiteral, op, lhs, rhs)
            }
            (OperandShape::Literal, OperandShape::Other) => {
                (RelationKind::ExprLiteral, reversed, rhs, lhs)
            }
            (OperandShape::Literal, OperandShape::Literal) => {
                (RelationKind::LiteralLiteral, op, lhs, rhs)
            }
            (OperandShape::Other, OperandShape::Other) => (RelationKind::ExprExpr, op, lhs, rhs),
        };
        Ok(Relation {
            kind,
            op,
            lhs: lhs.clone(),
            rhs: rhs.clone(),
        })
    }

    /// True for `<`, `<=`, `>`, `>=`; false for `==`, `!=`.
    pub fn ordered(&self) -> bool {
        self.op.is_ordered()
    }

    /// The name on the left, for `NameLiteral`/`NameName` relations.
    pub fn lhs_name(&self) -> Option<&str> {
        match &self.lhs.kind {
            ExprKind::Var(name) => Some(name),
            ExprKind::Paren(inner) => match &inner.kind {
                ExprKind::Var(name) => Some(name),
                _ => None,
            },
            _ => None,
        }
    }

    /// The literal on the right, for `NameLiteral`/`ExprLiteral` relations.
    pub fn rhs_literal(&self) -> Option<&Lit> {
        match &self.rhs.kind {
            ExprKind::Lit(lit) => Some(lit),
            ExprKind::Paren(inner) => match &inner.kind {
                ExprKind::Lit(lit) => Some(lit),
                _ => None,
            },
            _ => None,
        }
    }

    pub fn as_expr(&self) -> Expr {
        Expr::bin(self.op, self.lhs.clone(), self.rhs.clone())
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {} {}", self.lhs, self.op, self.rhs)
    }
}

/// A boolean-returning call used as a predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct MethodCallPredicate {
    call: Expr,
}

impl MethodCallPredicate {
    pub fn new(call: Expr, resolver: &dyn TypeResolver) -> Result<Self, ClassifyError> {
        let ExprKind::Call { name, .. } = &call.kind else {
            return Err(ClassifyError::NotBoolean(call.to_string()));
        };
        let sig = resolver.method_sig(&call)?;
        if sig.return_type != Type::Boolean {
            return Err(ClassifyError::NonBooleanMethod(name.clone()));
        }
        Ok(Self { call })
    }

    /// The receiver expression. An absent receiver means the implicit
    /// current object; the store treats such predicates as unscoped.
    pub fn receiver(&self) -> Option<&Expr> {
        match &self.call.kind {
            ExprKind::Call { receiver, .. } => receiver.as_deref(),
            _ => None,
        }
    }

    pub fn as_expr(&self) -> &Expr {
        &self.call
    }
}

impl std::fmt::Display for MethodCallPredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.call)
    }
}

/// A boolean-typed variable reference used as a predicate.
#[derive(Debug, Clone, PartialEq)]
pub struct NamePredicate {
    pub name: String,
}

impl NamePredicate {
    pub fn as_expr(&self) -> Expr {
        Expr::var(self.name.clone())
    }
}

/// Classification of a boolean sub-expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    Relation(Relation),
    MethodCall(MethodCallPredicate),
    Name(NamePredicate),
}

/// Classify a single boolean expression into its predicate shape.
pub fn classify(expr: &Expr, resolver: &dyn TypeResolver) -> Result<Predicate, ClassifyError> {
    match &expr.kind {
        ExprKind::Binary { op, lhs, rhs } if op.is_relational() => {
            Ok(Predicate::Relation(Relation::from_binary(*op, lhs, rhs)?))
        }
        ExprKind::Call { .. } => Ok(Predicate::MethodCall(MethodCallPredicate::new(
            expr.clone(),
            resolver,
        )?)),
        ExprKind::Var(name) => {
            if resolver.type_of(expr)? == Type::Boolean {
                Ok(Predicate::Name(NamePredicate { name: name.clone() }))
            } else {
                Err(ClassifyError::NotBoolean(expr.to_string()))
            }
        }
        ExprKind::Paren(inner) => classify(inner, resolver),
        _ => Err(ClassifyError::NotBoolean(expr.to_string())),
    }
}

/// Collect every predicate reachable in a subtree without descending through
/// an already-classified predicate: once a relation or boolean call is
/// classified, its operands are not searched further.
pub fn collect_predicates(
    expr: &Expr,
    resolver: &dyn TypeResolver,
) -> Result<Vec<Predicate>, ClassifyError> {
    let mut out = Vec::new();
    walk(expr, resolver, &mut out)?;
    Ok(out)
}

fn walk(
    expr: &Expr,
    resolver: &dyn TypeResolver,
    out: &mut Vec<Predicate>,
) -> Result<(), ClassifyError> {
    match &expr.kind {
        ExprKind::Binary { op, lhs, rhs } if op.is_relational() => {
            out.push(Predicate::Relation(Relation::from_binary(*op, lhs, rhs)?));
        }
        ExprKind::Binary { lhs, rhs, .. } => {
            walk(lhs, resolver, out)?;
            walk(rhs, resolver, out)?;
        }
        ExprKind::Unary { operand, .. } => walk(operand, resolver, out)?,
        ExprKind::Call { .. } => {
            if resolver.type_of(expr)? == Type::Boolean {
                out.push(Predicate::MethodCall(MethodCallPredicate::new(
                    expr.clone(),
                    resolver,
                )?));
            } else if let ExprKind::Call { receiver, args, .. } = &expr.kind {
                if let Some(recv) = receiver {
                    walk(recv, resolver, out)?;
                }
                for arg in args {
                    walk(arg, resolver, out)?;
                }
            }
        }
        ExprKind::Var(name) => {
            if resolver.type_of(expr)? == Type::Boolean {
                out.push(Predicate::Name(NamePredicate { name: name.clone() }));
            }
        }
        ExprKind::Conditional { cond, then, els } => {
            walk(cond, resolver, out)?;
            walk(then, resolver, out)?;
            walk(els, resolver, out)?;
        }
        ExprKind::Assign { value, .. } => walk(value, resolver, out)?,
        ExprKind::Paren(inner) => walk(inner, resolver, out)?,
        ExprKind::Lit(_) => {}
    }
    Ok(())
}
