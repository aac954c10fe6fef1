use indexmap::IndexMap;
use thiserror::Error;

use msav_ast::ast::{BinOp, Block, Expr, ExprKind, Method, NodeId, Span, Stmt, Type, UnOp};
use msav_ast::errors::ResolveError;
use msav_ast::resolve::TypeResolver;

use crate::mcs::{Mcs, McsMode};

#[derive(Debug, Error)]
pub enum CollectError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Identity of one method exit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExitKey {
    /// A `return` statement, keyed by its node id.
    Return(NodeId),
    /// Falling off the end of a void method body.
    ImplicitEnd,
}

/// The path condition accumulated at one exit.
#[derive(Debug, Clone, PartialEq)]
pub struct ExitPoint {
    pub mcs: Mcs,
    pub returned: Option<Expr>,
    pub span: Span,
}

/// Per-exit path conditions of one method, in source order.
#[derive(Debug, Default)]
pub struct CollectedMethod {
    exits: IndexMap<ExitKey, ExitPoint>,
}

impl CollectedMethod {
    pub fn exits(&self) -> impl Iterator<Item = (&ExitKey, &ExitPoint)> {
        self.exits.iter()
    }

    pub fn get(&self, key: &ExitKey) -> Option<&ExitPoint> {
        self.exits.get(key)
    }

    pub fn len(&self) -> usize {
        self.exits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exits.is_empty()
    }
}

/// Walks a method body and builds, for every exit, the algebraic condition
/// describing which value alternatives of the traversed boolean expressions
/// reach it.
///
/// Statements refine the incoming condition sequentially; an `if` joins the
/// refined branch conditions back together; a `return` captures the current
/// condition and makes everything after it unreachable. Short-circuit
/// operators contribute one alternative per evaluation path, comparisons one
/// per outcome (two for equality, three for an ordered comparison).
pub struct Collector<'a> {
    resolver: &'a dyn TypeResolver,
    mode: McsMode,
}

impl<'a> Collector<'a> {
    pub fn new(resolver: &'a dyn TypeResolver, mode: McsMode) -> Self {
        Self { resolver, mode }
    }

    pub fn collect(&self, method: &Method) -> Result<CollectedMethod, CollectError> {
        let mut exits = IndexMap::new();
        let after = self.visit_block(&method.body, Mcs::True, &mut exits)?;
        if after != Mcs::False {
            exits.insert(
                ExitKey::ImplicitEnd,
                ExitPoint {
                    mcs: after,
                    returned: None,
                    span: Span::default(),
                },
            );
        }
        Ok(CollectedMethod { exits })
    }

    fn visit_block(
        &self,
        block: &Block,
        mut cur: Mcs,
        exits: &mut IndexMap<ExitKey, ExitPoint>,
    ) -> Result<Mcs, CollectError> {
        for stmt in &block.stmts {
            cur = self.visit_stmt(stmt, cur, exits)?;
        }
        Ok(cur)
    }

    fn visit_stmt(
        &self,
        stmt: &Stmt,
        cur: Mcs,
        exits: &mut IndexMap<ExitKey, ExitPoint>,
    ) -> Result<Mcs, CollectError> {
        match stmt {
            Stmt::Expr(e) => self.expr_mcs(e, cur),
            Stmt::If {
                cond,
                then_branch,
                else_branch,
            } => {
                let after_cond = self.expr_mcs(cond, cur)?;
                let (then_in, else_in) = if cond.is_null_check() {
                    (after_cond.clone(), after_cond)
                } else {
                    (
                        after_cond
                            .clone()
                            .refine(self.preds(vec![cond.clone()]), self.mode),
                        after_cond.refine(self.preds(vec![cond.negated()]), self.mode),
                    )
                };
                let then_out = self.visit_block(then_branch, then_in, exits)?;
                let else_out = match else_branch {
                    Some(block) => self.visit_block(block, else_in, exits)?,
                    None => else_in,
                };
                Ok(Mcs::join(vec![then_out, else_out], self.mode))
            }
            Stmt::Return { id, span, expr } => {
                let refined = match expr {
                    Some(e) => self.expr_mcs(e, cur)?,
                    None => cur,
                };
                exits.insert(
                    ExitKey::Return(*id),
                    ExitPoint {
                        mcs: refined,
                        returned: expr.clone(),
                        span: *span,
                    },
                );
                Ok(Mcs::False)
            }
            Stmt::Block(block) => self.visit_block(block, cur, exits),
        }
    }

    /// Refine `incoming` by the value alternatives of `expr`, in evaluation
    /// order.
    fn expr_mcs(&self, expr: &Expr, incoming: Mcs) -> Result<Mcs, CollectError> {
        match &expr.kind {
            ExprKind::Binary {
                op: BinOp::And,
                lhs,
                rhs,
            } => {
                let left = self.expr_mcs(lhs, incoming)?;
                // Short-circuit: either the left operand is false, or it is
                // true and the right operand is evaluated.
                let short = left
                    .clone()
                    .refine(self.preds(vec![lhs.negated()]), self.mode);
                let taken = left.refine(self.preds(vec![(**lhs).clone()]), self.mode);
                let full = self.expr_mcs(rhs, taken)?;
                Ok(Mcs::join(vec![short, full], self.mode))
            }
            ExprKind::Binary {
                op: BinOp::Or,
                lhs,
                rhs,
            } => {
                let left = self.expr_mcs(lhs, incoming)?;
                let short = left
                    .clone()
                    .refine(self.preds(vec![(**lhs).clone()]), self.mode);
                let taken = left.refine(self.preds(vec![lhs.negated()]), self.mode);
                let full = self.expr_mcs(rhs, taken)?;
                Ok(Mcs::join(vec![short, full], self.mode))
            }
            ExprKind::Binary { op, lhs, rhs } if op.is_equality() => {
                let after = self.expr_mcs(lhs, incoming)?;
                let after = self.expr_mcs(rhs, after)?;
                if expr.is_null_check() {
                    return Ok(after);
                }
                Ok(after.refine(
                    self.preds(vec![expr.clone(), expr.negated()]),
                    self.mode,
                ))
            }
            ExprKind::Binary { op, lhs, rhs } if op.is_ordered() => {
                let after = self.expr_mcs(lhs, incoming)?;
                let after = self.expr_mcs(rhs, after)?;
                // An ordered comparison distinguishes three outcomes.
                let a = (**lhs).clone();
                let b = (**rhs).clone();
                Ok(after.refine(
                    self.preds(vec![
                        Expr::bin(BinOp::Lt, a.clone(), b.clone()),
                        Expr::bin(BinOp::Eq, a.clone(), b.clone()),
                        Expr::bin(BinOp::Gt, a, b),
                    ]),
                    self.mode,
                ))
            }
            ExprKind::Binary { lhs, rhs, .. } => {
                let after = self.expr_mcs(lhs, incoming)?;
                self.expr_mcs(rhs, after)
            }
            ExprKind::Unary { op, operand } => {
                let after = self.expr_mcs(operand, incoming)?;
                match op {
                    UnOp::Not => Ok(after.refine(
                        self.preds(vec![expr.clone(), expr.negated()]),
                        self.mode,
                    )),
                    UnOp::Neg => Ok(after),
                }
            }
            ExprKind::Var(_) => {
                if self.resolver.type_of(expr)? == Type::Boolean {
                    Ok(incoming.refine(
                        self.preds(vec![expr.clone(), expr.negated()]),
                        self.mode,
                    ))
                } else {
                    Ok(incoming)
                }
            }
            ExprKind::Call { receiver, args, .. } => {
                let mut after = incoming;
                if let Some(recv) = receiver {
                    after = self.expr_mcs(recv, after)?;
                }
                for arg in args {
                    after = self.expr_mcs(arg, after)?;
                }
                if self.resolver.type_of(expr)? == Type::Boolean {
                    after = after.refine(
                        self.preds(vec![expr.clone(), expr.negated()]),
                        self.mode,
                    );
                }
                Ok(after)
            }
            ExprKind::Conditional { cond, then, els } => {
                let after_cond = self.expr_mcs(cond, incoming)?;
                let (then_in, else_in) = if cond.is_null_check() {
                    (after_cond.clone(), after_cond)
                } else {
                    (
                        after_cond
                            .clone()
                            .refine(self.preds(vec![(**cond).clone()]), self.mode),
                        after_cond.refine(self.preds(vec![cond.negated()]), self.mode),
                    )
                };
                let then_out = self.expr_mcs(then, then_in)?;
                let else_out = self.expr_mcs(els, else_in)?;
                Ok(Mcs::join(vec![then_out, else_out], self.mode))
            }
            ExprKind::Assign { value, .. } => self.expr_mcs(value, incoming),
            ExprKind::Paren(inner) => self.expr_mcs(inner, incoming),
            ExprKind::Lit(_) => Ok(incoming),
        }
    }

    fn preds(&self, preds: Vec<Expr>) -> Mcs {
        Mcs::predicates(preds, self.mode)
    }
}
