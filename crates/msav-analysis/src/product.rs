use msav_ast::ast::{BinOp, Expr, ExprKind};

/// Conjoin two conditions. A literal `true` operand is the conjunction
/// identity and is dropped. Operands that bind looser than `&&` (disjunction,
/// ternary, assignment) are wrapped in explicit parentheses first so the
/// printed guard text groups the way the algebra does.
pub fn and(lhs: Expr, rhs: Expr) -> Expr {
    if lhs.is_lit_true() {
        return rhs;
    }
    if rhs.is_lit_true() {
        return lhs;
    }
    Expr::bin(BinOp::And, enclose_if_loose(lhs), enclose_if_loose(rhs))
}

fn enclose_if_loose(expr: Expr) -> Expr {
    match &expr.kind {
        ExprKind::Binary { op: BinOp::Or, .. }
        | ExprKind::Conditional { .. }
        | ExprKind::Assign { .. } => Expr::paren(expr),
        _ => expr,
    }
}

/// Cartesian product of per-variable condition lists.
///
/// Every combination is enumerated with a fixed-radix counter (one digit per
/// list, radix = that list's length) and conjoined left to right. The result
/// has exactly the product of the list cardinalities; this is the dominant
/// combinatorial cost of the whole pipeline and is deliberately not capped.
pub fn product(lists: &[Vec<Expr>]) -> Vec<Expr> {
    if lists.is_empty() || lists.iter().any(Vec::is_empty) {
        return Vec::new();
    }
    let total = lists.iter().map(Vec::len).product();
    let mut indices = vec![0usize; lists.len()];
    let mut out = Vec::with_capacity(total);
    loop {
        let mut acc = lists[0][indices[0]].clone();
        for (list, &idx) in lists.iter().zip(&indices).skip(1) {
            acc = and(acc, list[idx].clone());
        }
        out.push(acc);

        let mut pos = lists.len() - 1;
        loop {
            indices[pos] += 1;
            if indices[pos] < lists[pos].len() {
                break;
            }
            indices[pos] = 0;
            if pos == 0 {
                return out;
            }
            pos -= 1;
        }
    }
}
