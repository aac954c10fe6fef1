use msav_ast::ast::Expr;

use crate::product;

/// Construction mode for the condition algebra.
///
/// `Plain` preserves the exact shape the collector builds. `Optimize` applies
/// the boolean identity laws at construction time (absorb true/false, flatten
/// nested joins, set-semantics dedup), trading structure for smaller expanded
/// condition lists. A mode value is threaded through construction instead of
/// a global flag so concurrent collections stay independent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum McsMode {
    #[default]
    Plain,
    Optimize,
}

/// Algebraic mutation-condition value.
///
/// Built bottom-up while traversing a method body and only expanded to a
/// concrete condition list at the satisfiability boundary, so exponentially
/// many paths stay compact until then. Equality is structural; the dedup
/// passes never compare node identities.
#[derive(Debug, Clone, PartialEq)]
pub enum Mcs {
    True,
    False,
    /// Disjunction, used at control-flow merges.
    Join(Vec<Mcs>),
    /// Conjunction, used for sequencing; expands to a cross product.
    Refine(Box<Mcs>, Box<Mcs>),
    /// A leaf set of concrete alternative conditions.
    Predicates(Vec<Expr>),
}

fn push_unique(items: &mut Vec<Mcs>, item: Mcs) {
    if !items.contains(&item) {
        items.push(item);
    }
}

impl Mcs {
    /// Disjunction of alternatives. An empty join is `False` in both modes:
    /// a merge of zero paths is unreachable.
    pub fn join(children: Vec<Mcs>, mode: McsMode) -> Mcs {
        if children.is_empty() {
            return Mcs::False;
        }
        match mode {
            McsMode::Plain => Mcs::Join(children),
            McsMode::Optimize => {
                let mut flat = Vec::new();
                for child in children {
                    match child {
                        Mcs::True => return Mcs::True,
                        Mcs::False => {}
                        Mcs::Join(inner) => {
                            for c in inner {
                                push_unique(&mut flat, c);
                            }
                        }
                        other => push_unique(&mut flat, other),
                    }
                }
                match flat.len() {
                    0 => Mcs::False,
                    1 => flat.remove(0),
                    _ => Mcs::Join(flat),
                }
            }
        }
    }

    /// Conjunction with another condition value.
    pub fn refine(self, other: Mcs, mode: McsMode) -> Mcs {
        match mode {
            McsMode::Plain => Mcs::Refine(Box::new(self), Box::new(other)),
            McsMode::Optimize => match (self, other) {
                (Mcs::True, x) | (x, Mcs::True) => x,
                (Mcs::False, _) | (_, Mcs::False) => Mcs::False,
                (a, b) if a == b => a,
                (a, b) => Mcs::Refine(Box::new(a), Box::new(b)),
            },
        }
    }

    pub fn predicates(preds: Vec<Expr>, mode: McsMode) -> Mcs {
        match mode {
            McsMode::Plain => Mcs::Predicates(preds),
            McsMode::Optimize => {
                let mut unique: Vec<Expr> = Vec::with_capacity(preds.len());
                for p in preds {
                    if !unique.contains(&p) {
                        unique.push(p);
                    }
                }
                Mcs::Predicates(unique)
            }
        }
    }

    /// Rebuild the value through the optimizing constructors, applying the
    /// identity laws and dedup everywhere.
    pub fn optimize(&self) -> Mcs {
        match self {
            Mcs::Join(children) => Mcs::join(
                children.iter().map(Mcs::optimize).collect(),
                McsMode::Optimize,
            ),
            Mcs::Refine(a, b) => a.optimize().refine(b.optimize(), McsMode::Optimize),
            Mcs::Predicates(preds) => Mcs::predicates(preds.clone(), McsMode::Optimize),
            other => other.clone(),
        }
    }

    /// Expand to the explicit disjunctive-normal-form condition list:
    /// joins concatenate, refinements cross-product.
    pub fn to_conditions(&self) -> Vec<Expr> {
        match self {
            Mcs::True => vec![Expr::bool_lit(true)],
            Mcs::False => vec![Expr::bool_lit(false)],
            Mcs::Join(children) => children.iter().flat_map(Mcs::to_conditions).collect(),
            Mcs::Refine(a, b) => {
                let left = a.to_conditions();
                let right = b.to_conditions();
                let mut out = Vec::with_capacity(left.len() * right.len());
                for l in &left {
                    for r in &right {
                        out.push(product::and(l.clone(), r.clone()));
                    }
                }
                out
            }
            Mcs::Predicates(preds) => preds.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msav_ast::ast::BinOp;

    fn rel(var: &str, op: BinOp, n: i64) -> Expr {
        Expr::bin(op, Expr::var(var), Expr::int(n))
    }

    fn strings(conds: &[Expr]) -> Vec<String> {
        conds.iter().map(|c| c.to_string()).collect()
    }

    // ---------------------------------------------------------------
    // Expansion
    // ---------------------------------------------------------------

    #[test]
    fn leaves_expand_to_themselves() {
        assert_eq!(strings(&Mcs::True.to_conditions()), vec!["true"]);
        assert_eq!(strings(&Mcs::False.to_conditions()), vec!["false"]);
        let preds = Mcs::Predicates(vec![rel("x", BinOp::Eq, 1), rel("x", BinOp::Ne, 1)]);
        assert_eq!(strings(&preds.to_conditions()), vec!["x == 1", "x != 1"]);
    }

    #[test]
    fn join_concatenates_child_expansions() {
        let j = Mcs::join(
            vec![
                Mcs::Predicates(vec![rel("x", BinOp::Eq, 1)]),
                Mcs::Predicates(vec![rel("y", BinOp::Eq, 2)]),
            ],
            McsMode::Plain,
        );
        assert_eq!(strings(&j.to_conditions()), vec!["x == 1", "y == 2"]);
    }

    #[test]
    fn refine_cross_products_child_expansions() {
        let a = Mcs::Predicates(vec![rel("x", BinOp::Eq, 1), rel("x", BinOp::Ne, 1)]);
        let b = Mcs::Predicates(vec![rel("y", BinOp::Lt, 0), rel("y", BinOp::Ge, 0)]);
        let r = a.refine(b, McsMode::Plain);
        assert_eq!(
            strings(&r.to_conditions()),
            vec![
                "x == 1 && y < 0",
                "x == 1 && y >= 0",
                "x != 1 && y < 0",
                "x != 1 && y >= 0",
            ]
        );
    }

    #[test]
    fn empty_join_is_false_in_both_modes() {
        assert_eq!(Mcs::join(vec![], McsMode::Plain), Mcs::False);
        assert_eq!(Mcs::join(vec![], McsMode::Optimize), Mcs::False);
    }

    // ---------------------------------------------------------------
    // Optimize-mode identity laws
    // ---------------------------------------------------------------

    #[test]
    fn plain_mode_preserves_structure() {
        let r = Mcs::True.refine(Mcs::Predicates(vec![rel("x", BinOp::Eq, 1)]), McsMode::Plain);
        assert!(matches!(r, Mcs::Refine(_, _)));
    }

    #[test]
    fn refine_absorbs_true_and_false() {
        let preds = Mcs::Predicates(vec![rel("x", BinOp::Eq, 1)]);
        assert_eq!(
            Mcs::True.refine(preds.clone(), McsMode::Optimize),
            preds.clone()
        );
        assert_eq!(
            preds.clone().refine(Mcs::True, McsMode::Optimize),
            preds.clone()
        );
        assert_eq!(
            Mcs::False.refine(preds.clone(), McsMode::Optimize),
            Mcs::False
        );
        assert_eq!(
            preds.clone().refine(preds, McsMode::Optimize),
            Mcs::Predicates(vec![rel("x", BinOp::Eq, 1)])
        );
    }

    #[test]
    fn join_flattens_dedups_and_absorbs() {
        let a = Mcs::Predicates(vec![rel("x", BinOp::Eq, 1)]);
        let b = Mcs::Predicates(vec![rel("y", BinOp::Eq, 2)]);
        let nested = Mcs::Join(vec![a.clone(), b.clone()]);
        let j = Mcs::join(
            vec![nested, a.clone(), Mcs::False],
            McsMode::Optimize,
        );
        assert_eq!(j, Mcs::Join(vec![a.clone(), b]));

        assert_eq!(
            Mcs::join(vec![a.clone(), Mcs::True], McsMode::Optimize),
            Mcs::True
        );
        assert_eq!(Mcs::join(vec![Mcs::False, a.clone()], McsMode::Optimize), a);
    }

    #[test]
    fn predicates_dedup_uses_value_equality() {
        let p = Mcs::predicates(
            vec![rel("x", BinOp::Eq, 1), rel("x", BinOp::Eq, 1)],
            McsMode::Optimize,
        );
        assert_eq!(p, Mcs::Predicates(vec![rel("x", BinOp::Eq, 1)]));
    }

    #[test]
    fn optimize_pass_rewrites_recursively() {
        let preds = Mcs::Predicates(vec![rel("x", BinOp::Eq, 1)]);
        let messy = Mcs::Refine(
            Box::new(Mcs::True),
            Box::new(Mcs::Join(vec![
                Mcs::False,
                Mcs::Join(vec![preds.clone(), preds.clone()]),
            ])),
        );
        assert_eq!(messy.optimize(), preds);
    }
}
