use msav_ast::ast::{BinOp, Expr, ExprKind, Lit};

use crate::product;

/// Flatten nested `&&` into a conjunct list, looking through parentheses
/// that directly wrap another conjunction.
pub fn flatten_conjuncts(expr: &Expr, out: &mut Vec<Expr>) {
    match &expr.kind {
        ExprKind::Binary {
            op: BinOp::And,
            lhs,
            rhs,
        } => {
            flatten_conjuncts(lhs, out);
            flatten_conjuncts(rhs, out);
        }
        ExprKind::Paren(inner)
            if matches!(
                inner.kind,
                ExprKind::Binary {
                    op: BinOp::And,
                    ..
                }
            ) =>
        {
            flatten_conjuncts(inner, out);
        }
        _ => out.push(expr.clone()),
    }
}

fn rel_parts(expr: &Expr) -> Option<(BinOp, &Expr, &Expr)> {
    match &expr.kind {
        ExprKind::Binary { op, lhs, rhs } if op.is_relational() => Some((*op, lhs, rhs)),
        ExprKind::Paren(inner) => rel_parts(inner),
        _ => None,
    }
}

/// `a` entails `b` for relations over the same operand pair.
fn rel_op_entails(a: BinOp, b: BinOp) -> bool {
    if a == b {
        return true;
    }
    matches!(
        (a, b),
        (BinOp::Eq, BinOp::Le)
            | (BinOp::Eq, BinOp::Ge)
            | (BinOp::Gt, BinOp::Ge)
            | (BinOp::Gt, BinOp::Ne)
            | (BinOp::Lt, BinOp::Le)
            | (BinOp::Lt, BinOp::Ne)
    )
}

fn int_literal(expr: &Expr) -> Option<i64> {
    match &expr.kind {
        ExprKind::Lit(Lit::Int(n)) | ExprKind::Lit(Lit::Long(n)) => Some(*n),
        ExprKind::Lit(Lit::Char(c)) => Some(*c as i64),
        ExprKind::Paren(inner) => int_literal(inner),
        _ => None,
    }
}

/// The inclusive integer interval `op n` describes, as optional bounds.
/// `None` for `!=` (not an interval) and for strict bounds at the i64 edge.
fn bounds(op: BinOp, n: i64) -> Option<(Option<i64>, Option<i64>)> {
    match op {
        BinOp::Lt => Some((None, Some(n.checked_sub(1)?))),
        BinOp::Le => Some((None, Some(n))),
        BinOp::Gt => Some((Some(n.checked_add(1)?), None)),
        BinOp::Ge => Some((Some(n), None)),
        BinOp::Eq => Some((Some(n), Some(n))),
        _ => None,
    }
}

/// `x <a_op> a_n` entails `x <b_op> b_n` over the integers: the interval the
/// left relation describes is contained in the right one's.
fn int_rel_entails(a_op: BinOp, a_n: i64, b_op: BinOp, b_n: i64) -> bool {
    if a_op == BinOp::Ne {
        return b_op == BinOp::Ne && a_n == b_n;
    }
    let Some((a_lo, a_hi)) = bounds(a_op, a_n) else {
        return false;
    };
    if b_op == BinOp::Ne {
        // The excluded point must lie outside the interval.
        return a_lo.map_or(false, |lo| b_n < lo) || a_hi.map_or(false, |hi| b_n > hi);
    }
    let Some((b_lo, b_hi)) = bounds(b_op, b_n) else {
        return false;
    };
    let lo_ok = match (b_lo, a_lo) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(b), Some(a)) => b <= a,
    };
    let hi_ok = match (b_hi, a_hi) {
        (None, _) => true,
        (Some(_), None) => false,
        (Some(b), Some(a)) => a <= b,
    };
    lo_ok && hi_ok
}

/// Syntactic entailment: whenever `a` holds, `b` holds.
///
/// Covers the literal lattice ends (`false` entails everything, everything
/// entails `true`), identical expressions, relations over the same operand
/// pair (including the swapped-operand form compared through the reversed
/// operator), and relations on one operand against two integer literals,
/// decided by interval containment.
pub fn entails(a: &Expr, b: &Expr) -> bool {
    if a.is_lit_false() || b.is_lit_true() {
        return true;
    }
    if a == b {
        return true;
    }
    if let (Some((a_op, a_lhs, a_rhs)), Some((b_op, b_lhs, b_rhs))) = (rel_parts(a), rel_parts(b)) {
        if a_lhs == b_lhs && a_rhs == b_rhs && rel_op_entails(a_op, b_op) {
            return true;
        }
        if a_lhs == b_rhs && a_rhs == b_lhs {
            if let Some(reversed) = a_op.reversed() {
                if rel_op_entails(reversed, b_op) {
                    return true;
                }
            }
        }
        if a_lhs == b_lhs {
            if let (Some(a_n), Some(b_n)) = (int_literal(a_rhs), int_literal(b_rhs)) {
                return int_rel_entails(a_op, a_n, b_op, b_n);
            }
        }
    }
    false
}

/// Remove conjuncts entailed by other conjuncts, without changing the
/// conjunction's truth value. A `false` conjunct collapses the whole
/// condition to `false`; an empty result is `true`.
pub fn simplify_conjunction(expr: &Expr) -> Expr {
    let mut conjuncts = Vec::new();
    flatten_conjuncts(expr, &mut conjuncts);
    if conjuncts.iter().any(Expr::is_lit_false) {
        return Expr::bool_lit(false);
    }
    let n = conjuncts.len();
    let mut keep = vec![true; n];
    for i in 0..n {
        if !keep[i] {
            continue;
        }
        for j in 0..n {
            if i == j || !keep[j] {
                continue;
            }
            // Drop the weaker conjunct; on mutual entailment keep the last,
            // which is the abstract-state cell when a path conjunct and a
            // cell restate the same fact.
            if entails(&conjuncts[i], &conjuncts[j])
                && !(entails(&conjuncts[j], &conjuncts[i]) && j > i)
            {
                keep[j] = false;
            }
        }
    }
    conjuncts
        .into_iter()
        .zip(keep)
        .filter_map(|(c, k)| k.then_some(c))
        .reduce(product::and)
        .unwrap_or_else(|| Expr::bool_lit(true))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rel(var: &str, op: BinOp, n: i64) -> Expr {
        Expr::bin(op, Expr::var(var), Expr::int(n))
    }

    fn conj(parts: &[Expr]) -> Expr {
        parts
            .iter()
            .cloned()
            .reduce(|a, b| Expr::bin(BinOp::And, a, b))
            .unwrap()
    }

    // ---------------------------------------------------------------
    // Entailment table
    // ---------------------------------------------------------------

    #[test]
    fn strict_comparison_entails_its_weak_and_disequal_forms() {
        let lt = rel("a", BinOp::Lt, 5);
        assert!(entails(&lt, &rel("a", BinOp::Le, 5)));
        assert!(entails(&lt, &rel("a", BinOp::Ne, 5)));
        assert!(!entails(&rel("a", BinOp::Le, 5), &lt));
    }

    #[test]
    fn equality_entails_both_weak_orders() {
        let eq = rel("a", BinOp::Eq, 1);
        assert!(entails(&eq, &rel("a", BinOp::Ge, 1)));
        assert!(entails(&eq, &rel("a", BinOp::Le, 1)));
        assert!(!entails(&eq, &rel("a", BinOp::Ne, 1)));
    }

    #[test]
    fn lattice_ends() {
        let any = rel("a", BinOp::Eq, 1);
        assert!(entails(&Expr::bool_lit(false), &any));
        assert!(entails(&any, &Expr::bool_lit(true)));
        assert!(!entails(&Expr::bool_lit(true), &any));
    }

    #[test]
    fn swapped_operands_compare_through_reversed_operator() {
        // x < 5 entails 5 >= x.
        let a = Expr::bin(BinOp::Lt, Expr::var("x"), Expr::int(5));
        let b = Expr::bin(BinOp::Ge, Expr::int(5), Expr::var("x"));
        assert!(entails(&a, &b));
        // x < 5 and 5 > x are mutually entailing.
        let c = Expr::bin(BinOp::Gt, Expr::int(5), Expr::var("x"));
        assert!(entails(&a, &c));
        assert!(entails(&c, &a));
    }

    #[test]
    fn unrelated_operands_do_not_entail() {
        assert!(!entails(&rel("a", BinOp::Lt, 5), &rel("b", BinOp::Le, 5)));
        assert!(!entails(&rel("a", BinOp::Lt, 5), &rel("b", BinOp::Lt, 5)));
    }

    #[test]
    fn integer_intervals_entail_across_literals() {
        // (−∞, 4] is contained in (−∞, 6].
        assert!(entails(&rel("a", BinOp::Lt, 5), &rel("a", BinOp::Le, 6)));
        assert!(!entails(&rel("a", BinOp::Le, 6), &rel("a", BinOp::Lt, 5)));
        // x < 32 and x <= 31 describe the same interval.
        assert!(entails(&rel("a", BinOp::Lt, 32), &rel("a", BinOp::Le, 31)));
        assert!(entails(&rel("a", BinOp::Le, 31), &rel("a", BinOp::Lt, 32)));
        // A point entails any interval around it, and disequality outside it.
        assert!(entails(&rel("a", BinOp::Eq, 3), &rel("a", BinOp::Gt, 0)));
        assert!(entails(&rel("a", BinOp::Eq, 3), &rel("a", BinOp::Ne, 7)));
        assert!(!entails(&rel("a", BinOp::Eq, 3), &rel("a", BinOp::Ne, 3)));
        // Disequality describes no interval.
        assert!(!entails(&rel("a", BinOp::Ne, 3), &rel("a", BinOp::Le, 9)));
    }

    #[test]
    fn edge_literals_do_not_wrap() {
        assert!(!entails(
            &rel("a", BinOp::Lt, i64::MIN),
            &rel("a", BinOp::Le, 0),
        ));
        assert!(!entails(
            &rel("a", BinOp::Gt, i64::MAX),
            &rel("a", BinOp::Ge, 0),
        ));
    }

    // ---------------------------------------------------------------
    // Conjunction simplification
    // ---------------------------------------------------------------

    #[test]
    fn stronger_conjunct_subsumes_weaker() {
        let e = conj(&[rel("a", BinOp::Lt, 5), rel("a", BinOp::Le, 5)]);
        assert_eq!(simplify_conjunction(&e).to_string(), "a < 5");
    }

    #[test]
    fn false_collapses_the_conjunction() {
        let e = conj(&[rel("a", BinOp::Lt, 5), Expr::bool_lit(false)]);
        assert_eq!(simplify_conjunction(&e).to_string(), "false");
    }

    #[test]
    fn true_conjuncts_are_dropped() {
        let e = conj(&[Expr::bool_lit(true), rel("a", BinOp::Lt, 5)]);
        assert_eq!(simplify_conjunction(&e).to_string(), "a < 5");
    }

    #[test]
    fn duplicate_conjuncts_keep_one_copy() {
        let e = conj(&[rel("a", BinOp::Eq, 1), rel("a", BinOp::Eq, 1)]);
        assert_eq!(simplify_conjunction(&e).to_string(), "a == 1");
    }

    #[test]
    fn path_conjunct_collapses_into_the_equivalent_later_cell() {
        // A branch condition restated by an interval cell leaves the cell.
        let e = conj(&[rel("x", BinOp::Lt, 32), rel("x", BinOp::Le, 31)]);
        assert_eq!(simplify_conjunction(&e).to_string(), "x <= 31");

        let e = conj(&[
            rel("x", BinOp::Gt, 32),
            rel("x", BinOp::Lt, 127),
            rel("x", BinOp::Ge, 33),
            rel("x", BinOp::Le, 126),
        ]);
        assert_eq!(simplify_conjunction(&e).to_string(), "x >= 33 && x <= 126");
    }

    #[test]
    fn independent_conjuncts_are_kept() {
        let e = conj(&[rel("a", BinOp::Ge, 1), rel("b", BinOp::Le, 2)]);
        assert_eq!(simplify_conjunction(&e).to_string(), "a >= 1 && b <= 2");
    }

    #[test]
    fn flattening_sees_through_parenthesized_conjunctions() {
        let inner = Expr::paren(conj(&[rel("a", BinOp::Eq, 1), rel("a", BinOp::Le, 1)]));
        let e = Expr::bin(BinOp::And, inner, rel("b", BinOp::Ne, 0));
        assert_eq!(simplify_conjunction(&e).to_string(), "a == 1 && b != 0");
    }

    #[test]
    fn non_conjunction_passes_through() {
        let e = rel("a", BinOp::Gt, 3);
        assert_eq!(simplify_conjunction(&e), e);
    }
}
