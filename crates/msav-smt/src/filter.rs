use thiserror::Error;
use tracing::{debug, warn};

use msav_analysis::simplify::simplify_conjunction;
use msav_ast::ast::Expr;
use msav_ast::resolve::TypeResolver;

use crate::encoder::{EncodeError, Encoder};
use crate::solver::{SatResult, SmtSolver};

#[derive(Debug, Error)]
pub enum FilterError<E: std::error::Error> {
    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error("solver error: {0}")]
    Solver(E),
}

/// Keep the satisfiable conditions, in their simplified form.
///
/// Each condition is simplified syntactically first; a condition that
/// collapses to `false` is dropped and one that collapses to `true` is kept,
/// both without consulting the solver. The rest are probed one at a time
/// inside a push/pop scope. Declarations and string axioms are asserted at
/// the solver's base level so they persist across probes. A solver answer of
/// `Unknown` drops the condition with a warning; a mutant guarded by a
/// condition nobody can prove satisfiable is not worth generating.
pub fn filter_conditions<S: SmtSolver>(
    conditions: &[Expr],
    resolver: &dyn TypeResolver,
    solver: &mut S,
) -> Result<Vec<Expr>, FilterError<S::Error>> {
    let mut encoder = Encoder::new(resolver);
    let mut kept = Vec::new();
    for condition in conditions {
        let simplified = simplify_conjunction(condition);
        if simplified.is_lit_false() {
            debug!(condition = %condition, "condition simplifies to false; dropped");
            continue;
        }
        if simplified.is_lit_true() {
            kept.push(simplified);
            continue;
        }

        let term = encoder.encode_condition(&simplified)?;
        let decls = encoder.take_declarations();
        for (name, sort) in &decls.vars {
            solver.declare_var(name, sort).map_err(FilterError::Solver)?;
        }
        for (name, domain, range) in &decls.funs {
            solver
                .declare_fun(name, domain, range)
                .map_err(FilterError::Solver)?;
        }
        for axiom in &decls.axioms {
            solver.assert(axiom).map_err(FilterError::Solver)?;
        }

        solver.push().map_err(FilterError::Solver)?;
        solver.assert(&term).map_err(FilterError::Solver)?;
        let result = solver.check_sat().map_err(FilterError::Solver)?;
        solver.pop().map_err(FilterError::Solver)?;

        match result {
            SatResult::Sat => kept.push(simplified),
            SatResult::Unsat => {
                debug!(condition = %simplified, "condition is unsatisfiable; dropped");
            }
            SatResult::Unknown(reason) => {
                warn!(condition = %simplified, reason, "solver could not decide; condition dropped");
            }
        }
    }
    Ok(kept)
}

#[cfg(test)]
mod tests {
    use super::*;
    use msav_ast::ast::{BinOp, IntWidth, Type};
    use msav_ast::resolve::MapResolver;

    use crate::solver::MockSolver;

    fn resolver() -> MapResolver {
        MapResolver::new().with_var("x", Type::Integer(IntWidth::W32))
    }

    fn rel(op: BinOp, n: i64) -> Expr {
        Expr::bin(op, Expr::var("x"), Expr::int(n))
    }

    fn conj(a: Expr, b: Expr) -> Expr {
        Expr::bin(BinOp::And, a, b)
    }

    #[test]
    fn satisfiable_conditions_are_kept_in_order() {
        let r = resolver();
        let mut solver = MockSolver::sat();
        let conds = vec![rel(BinOp::Lt, 5), rel(BinOp::Ge, 5)];
        let kept = filter_conditions(&conds, &r, &mut solver).unwrap();
        assert_eq!(kept, conds);
        assert_eq!(solver.check_sat_calls, 2);
        assert_eq!(solver.depth, 0);
    }

    #[test]
    fn unsat_conditions_are_dropped() {
        let r = resolver();
        let mut solver = MockSolver::scripted(vec![
            SatResult::Sat,
            SatResult::Unsat,
            SatResult::Sat,
        ]);
        let conds = vec![rel(BinOp::Lt, 1), rel(BinOp::Gt, 2), rel(BinOp::Eq, 3)];
        let kept = filter_conditions(&conds, &r, &mut solver).unwrap();
        assert_eq!(kept, vec![rel(BinOp::Lt, 1), rel(BinOp::Eq, 3)]);
    }

    #[test]
    fn unknown_results_drop_the_condition() {
        let r = resolver();
        let mut solver =
            MockSolver::scripted(vec![SatResult::Unknown("timeout".to_string())]);
        let kept = filter_conditions(&[rel(BinOp::Lt, 5)], &r, &mut solver).unwrap();
        assert!(kept.is_empty());
    }

    #[test]
    fn literal_false_is_dropped_without_a_solver_call() {
        let r = resolver();
        let mut solver = MockSolver::sat();
        let conds = vec![conj(rel(BinOp::Lt, 5), Expr::bool_lit(false))];
        let kept = filter_conditions(&conds, &r, &mut solver).unwrap();
        assert!(kept.is_empty());
        assert_eq!(solver.check_sat_calls, 0);
    }

    #[test]
    fn literal_true_is_kept_without_a_solver_call() {
        let r = resolver();
        let mut solver = MockSolver::sat();
        let kept = filter_conditions(&[Expr::bool_lit(true)], &r, &mut solver).unwrap();
        assert_eq!(kept, vec![Expr::bool_lit(true)]);
        assert_eq!(solver.check_sat_calls, 0);
    }

    #[test]
    fn conditions_are_simplified_before_the_probe() {
        let r = resolver();
        let mut solver = MockSolver::sat();
        // x < 5 && x <= 5 collapses to x < 5
        let conds = vec![conj(rel(BinOp::Lt, 5), rel(BinOp::Le, 5))];
        let kept = filter_conditions(&conds, &r, &mut solver).unwrap();
        assert_eq!(kept, vec![rel(BinOp::Lt, 5)]);
    }

    #[test]
    fn declarations_happen_once_outside_the_probe_scope() {
        let r = resolver();
        let mut solver = MockSolver::sat();
        let conds = vec![rel(BinOp::Lt, 5), rel(BinOp::Gt, 0)];
        filter_conditions(&conds, &r, &mut solver).unwrap();
        assert_eq!(solver.declared_vars.len(), 1);
        assert_eq!(solver.declared_vars[0].0, "x");
    }
}
