use std::fmt;

use indexmap::IndexMap;
use thiserror::Error;
use tracing::warn;

use msav_ast::ast::{Expr, ExprKind, IntWidth, Lit, Type};
use msav_ast::errors::ResolveError;
use msav_ast::resolve::TypeResolver;

use crate::intervals::PuncturedIntervals;
use crate::predicates::{MethodCallPredicate, NamePredicate, Predicate, Relation, RelationKind};
use crate::product;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("variable '{name}' is used with conflicting abstract domains")]
    TypeMismatch { name: String },

    #[error("unsupported relation shape {kind:?} in '{relation}'")]
    UnsupportedRelation {
        kind: RelationKind,
        relation: String,
    },

    #[error("unsupported comparison '{0}' for the variable's type")]
    UnsupportedComparison(String),

    #[error("boolean literal comparisons are not implemented: '{0}'")]
    BooleanLiteral(String),

    #[error("predicate receiver '{0}' is not a string or reference variable")]
    UnsupportedReceiver(String),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Integer-like variable tracked as a punctured-interval partition. The
/// declared type picks the literal flavor used when rendering conditions.
#[derive(Debug, Clone, PartialEq)]
pub struct IntState {
    ty: Type,
    intervals: PuncturedIntervals,
}

impl IntState {
    fn literal(&self, value: i64) -> Expr {
        match self.ty {
            Type::Char => Expr::chr(char::from_u32(value as u32).unwrap_or('\u{0}')),
            Type::Integer(IntWidth::W64) => Expr::long(value),
            _ => Expr::int(value),
        }
    }
}

/// String variable tracked by the set of literals it is compared against,
/// plus any other boolean predicates over it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StrState {
    values: Vec<String>,
    preds: Vec<MethodCallPredicate>,
}

impl StrState {
    fn add_value(&mut self, value: &str) {
        if !self.values.iter().any(|v| v == value) {
            self.values.push(value.to_string());
        }
    }
}

/// Opaque reference variable tracked by its boolean method predicates.
#[derive(Debug, Clone, PartialEq)]
pub struct ObjectState {
    ty: String,
    preds: Vec<MethodCallPredicate>,
}

/// Abstract state of one local variable.
#[derive(Debug, Clone, PartialEq)]
pub enum StoreState {
    Int(IntState),
    Bool,
    Str(StrState),
    Object(ObjectState),
}

fn equals_call(name: &str, value: &str) -> Expr {
    Expr::call(Some(Expr::var(name)), "equals", vec![Expr::str_lit(value)])
}

fn pred_pair(pred: &MethodCallPredicate) -> Vec<Expr> {
    let call = pred.as_expr().clone();
    let negated = call.negated();
    vec![call, negated]
}

impl StoreState {
    /// Mutually exclusive conditions for this variable, the within-variable
    /// product when it tracks more than one aspect (compared literals and
    /// method predicates intersect rather than appending).
    fn conditions(&self, name: &str) -> Vec<Expr> {
        match self {
            StoreState::Int(state) => state.intervals.conditions(name, |v| state.literal(v)),
            StoreState::Bool => {
                let var = Expr::var(name);
                vec![var.clone(), var.negated()]
            }
            StoreState::Str(state) => {
                let mut lists = Vec::new();
                if !state.values.is_empty() {
                    let mut partition: Vec<Expr> = state
                        .values
                        .iter()
                        .map(|v| equals_call(name, v))
                        .collect();
                    // The leftover cell: equal to none of the compared literals.
                    let none = state
                        .values
                        .iter()
                        .map(|v| equals_call(name, v).negated())
                        .reduce(product::and);
                    if let Some(none) = none {
                        partition.push(none);
                    }
                    lists.push(partition);
                }
                for pred in &state.preds {
                    lists.push(pred_pair(pred));
                }
                product::product(&lists)
            }
            StoreState::Object(state) => {
                let lists: Vec<Vec<Expr>> = state.preds.iter().map(pred_pair).collect();
                product::product(&lists)
            }
        }
    }
}

/// Per-variable abstract states of one method exit, in first-use order.
///
/// Built by folding the predicates collected from the returned expression;
/// the Cartesian product of the per-variable conditions enumerates every
/// abstract state the exit distinguishes.
#[derive(Debug, Default)]
pub struct Store {
    locals: IndexMap<String, StoreState>,
    unscoped: Vec<MethodCallPredicate>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_predicates(
        preds: &[Predicate],
        resolver: &dyn TypeResolver,
    ) -> Result<Self, StoreError> {
        let mut store = Store::new();
        for pred in preds {
            store.add_predicate(pred, resolver)?;
        }
        Ok(store)
    }

    pub fn add_predicate(
        &mut self,
        pred: &Predicate,
        resolver: &dyn TypeResolver,
    ) -> Result<(), StoreError> {
        match pred {
            Predicate::Relation(rel) => self.add_relation(rel, resolver),
            Predicate::MethodCall(call) => self.add_method_predicate(call, resolver),
            Predicate::Name(name) => self.add_name_predicate(name, resolver),
        }
    }

    fn add_relation(
        &mut self,
        rel: &Relation,
        resolver: &dyn TypeResolver,
    ) -> Result<(), StoreError> {
        match rel.kind {
            RelationKind::LiteralLiteral => Ok(()),
            RelationKind::NameLiteral => {
                let (Some(name), Some(lit)) = (rel.lhs_name(), rel.rhs_literal()) else {
                    return Err(StoreError::UnsupportedRelation {
                        kind: rel.kind,
                        relation: rel.to_string(),
                    });
                };
                // Null comparisons distinguish reachability, not values.
                if matches!(lit, Lit::Null) {
                    return Ok(());
                }
                let ty = resolver.type_of(&rel.lhs)?;
                match ty {
                    Type::Integer(_) | Type::Char => {
                        let value = numeric_value(lit)
                            .ok_or_else(|| StoreError::UnsupportedComparison(rel.to_string()))?;
                        let state = self.int_state_mut(name, ty)?;
                        if rel.ordered() {
                            state.intervals.split_at(value);
                        } else {
                            state.intervals.puncture(value);
                        }
                        Ok(())
                    }
                    Type::Str => {
                        let Lit::Str(value) = lit else {
                            return Err(StoreError::UnsupportedComparison(rel.to_string()));
                        };
                        if rel.ordered() {
                            return Err(StoreError::UnsupportedComparison(rel.to_string()));
                        }
                        let value = value.clone();
                        self.str_state_mut(name)?.add_value(&value);
                        Ok(())
                    }
                    // Relations against boolean literals are not modeled.
                    Type::Boolean => Err(StoreError::BooleanLiteral(rel.to_string())),
                    Type::Float(_) | Type::Reference(_) => {
                        Err(StoreError::UnsupportedComparison(rel.to_string()))
                    }
                }
            }
            kind => Err(StoreError::UnsupportedRelation {
                kind,
                relation: rel.to_string(),
            }),
        }
    }

    fn add_method_predicate(
        &mut self,
        pred: &MethodCallPredicate,
        resolver: &dyn TypeResolver,
    ) -> Result<(), StoreError> {
        let Some(receiver) = pred.receiver() else {
            warn!(predicate = %pred, "predicate has no receiver; excluded from the store product");
            self.unscoped.push(pred.clone());
            return Ok(());
        };
        let Some(name) = var_name(receiver) else {
            warn!(predicate = %pred, "predicate receiver is not a variable; excluded from the store product");
            self.unscoped.push(pred.clone());
            return Ok(());
        };
        let name = name.to_string();
        match resolver.type_of(receiver)? {
            Type::Str => {
                let state = self.str_state_mut(&name)?;
                // equals against a literal refines the compared-literal set;
                // anything else stays a two-valued predicate.
                if let Some(value) = equals_literal(pred) {
                    let value = value.to_string();
                    state.add_value(&value);
                } else if !state.preds.contains(pred) {
                    state.preds.push(pred.clone());
                }
                Ok(())
            }
            Type::Reference(ty) => {
                let state = self.object_state_mut(&name, ty)?;
                if !state.preds.contains(pred) {
                    state.preds.push(pred.clone());
                }
                Ok(())
            }
            _ => Err(StoreError::UnsupportedReceiver(pred.to_string())),
        }
    }

    fn add_name_predicate(
        &mut self,
        pred: &NamePredicate,
        resolver: &dyn TypeResolver,
    ) -> Result<(), StoreError> {
        if resolver.type_of(&pred.as_expr())? != Type::Boolean {
            return Err(StoreError::TypeMismatch {
                name: pred.name.clone(),
            });
        }
        self.ensure_bool(&pred.name)
    }

    fn int_state_mut(&mut self, name: &str, ty: Type) -> Result<&mut IntState, StoreError> {
        let entry = self
            .locals
            .entry(name.to_string())
            .or_insert_with(|| {
                StoreState::Int(IntState {
                    ty,
                    intervals: PuncturedIntervals::new(),
                })
            });
        match entry {
            StoreState::Int(state) => Ok(state),
            _ => Err(StoreError::TypeMismatch {
                name: name.to_string(),
            }),
        }
    }

    fn str_state_mut(&mut self, name: &str) -> Result<&mut StrState, StoreError> {
        let entry = self
            .locals
            .entry(name.to_string())
            .or_insert_with(|| StoreState::Str(StrState::default()));
        match entry {
            StoreState::Str(state) => Ok(state),
            _ => Err(StoreError::TypeMismatch {
                name: name.to_string(),
            }),
        }
    }

    fn object_state_mut(&mut self, name: &str, ty: String) -> Result<&mut ObjectState, StoreError> {
        let entry = self
            .locals
            .entry(name.to_string())
            .or_insert_with(|| {
                StoreState::Object(ObjectState {
                    ty,
                    preds: Vec::new(),
                })
            });
        match entry {
            StoreState::Object(state) => Ok(state),
            _ => Err(StoreError::TypeMismatch {
                name: name.to_string(),
            }),
        }
    }

    fn ensure_bool(&mut self, name: &str) -> Result<(), StoreError> {
        let entry = self
            .locals
            .entry(name.to_string())
            .or_insert(StoreState::Bool);
        match entry {
            StoreState::Bool => Ok(()),
            _ => Err(StoreError::TypeMismatch {
                name: name.to_string(),
            }),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.locals.is_empty()
    }

    pub fn variables(&self) -> impl Iterator<Item = &str> {
        self.locals.keys().map(String::as_str)
    }

    /// Predicates with no variable receiver. They are reported but do not
    /// take part in the product.
    pub fn unscoped(&self) -> &[MethodCallPredicate] {
        &self.unscoped
    }

    /// One condition list per tracked variable, in first-use order.
    pub fn condition_lists(&self) -> Vec<Vec<Expr>> {
        self.locals
            .iter()
            .map(|(name, state)| state.conditions(name))
            .filter(|list| !list.is_empty())
            .collect()
    }

    /// The Cartesian product of every variable's conditions: one condition
    /// per abstract state the store distinguishes. Empty for an empty store.
    pub fn product_conditions(&self) -> Vec<Expr> {
        let lists = self.condition_lists();
        if lists.is_empty() {
            return Vec::new();
        }
        product::product(&lists)
    }

    /// Number of abstract states the store distinguishes (1 for an empty
    /// store: the whole concrete space is a single cell).
    pub fn num_abstract_values(&self) -> usize {
        self.condition_lists().iter().map(Vec::len).product()
    }
}

impl fmt::Display for Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, state) in &self.locals {
            let rendered: Vec<String> = state
                .conditions(name)
                .iter()
                .map(Expr::to_string)
                .collect();
            writeln!(f, "{name}: {}", rendered.join(" | "))?;
        }
        Ok(())
    }
}

fn numeric_value(lit: &Lit) -> Option<i64> {
    match lit {
        Lit::Int(v) => Some(*v),
        Lit::Long(v) => Some(*v),
        Lit::Char(c) => Some(*c as i64),
        _ => None,
    }
}

fn var_name(expr: &Expr) -> Option<&str> {
    match &expr.kind {
        ExprKind::Var(name) => Some(name),
        ExprKind::Paren(inner) => var_name(inner),
        _ => None,
    }
}

fn equals_literal(pred: &MethodCallPredicate) -> Option<&str> {
    let ExprKind::Call { name, args, .. } = &pred.as_expr().kind else {
        return None;
    };
    if name != "equals" || args.len() != 1 {
        return None;
    }
    match &args[0].kind {
        ExprKind::Lit(Lit::Str(value)) => Some(value),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msav_ast::ast::BinOp;
    use msav_ast::resolve::{MapResolver, MethodSig};

    fn int() -> Type {
        Type::Integer(IntWidth::W32)
    }

    fn bool_sig() -> MethodSig {
        MethodSig {
            return_type: Type::Boolean,
            is_static: false,
            params: vec![],
        }
    }

    fn resolver() -> MapResolver {
        MapResolver::new()
            .with_var("x", int())
            .with_var("y", int())
            .with_var("n", Type::Integer(IntWidth::W64))
            .with_var("c", Type::Char)
            .with_var("flag", Type::Boolean)
            .with_var("s", Type::Str)
            .with_var("t", Type::Str)
            .with_var("o", Type::Reference("List".to_string()))
            .with_method("equals", bool_sig())
            .with_method("startsWith", bool_sig())
            .with_method("isEmpty", bool_sig())
    }

    fn relation(var: &str, op: BinOp, rhs: Expr) -> Predicate {
        Predicate::Relation(
            Relation::from_binary(op, &Expr::var(var), &rhs).unwrap(),
        )
    }

    fn strings(conds: &[Expr]) -> Vec<String> {
        conds.iter().map(Expr::to_string).collect()
    }

    // ---------------------------------------------------------------
    // Integer domains
    // ---------------------------------------------------------------

    #[test]
    fn disjunction_of_equality_and_order_yields_four_states() {
        let r = resolver();
        let preds = vec![
            relation("x", BinOp::Eq, Expr::int(1)),
            relation("x", BinOp::Gt, Expr::int(5)),
        ];
        let store = Store::from_predicates(&preds, &r).unwrap();
        assert_eq!(store.num_abstract_values(), 4);
        assert_eq!(
            strings(&store.product_conditions()),
            vec!["x <= 4 && x != 1", "x == 1", "x == 5", "x >= 6"]
        );
    }

    #[test]
    fn two_variables_multiply_their_states() {
        let r = resolver();
        let preds = vec![
            relation("x", BinOp::Eq, Expr::int(1)),
            relation("y", BinOp::Ne, Expr::int(1)),
        ];
        let store = Store::from_predicates(&preds, &r).unwrap();
        assert_eq!(store.num_abstract_values(), 4);
        assert_eq!(
            strings(&store.product_conditions()),
            vec![
                "x != 1 && y != 1",
                "x != 1 && y == 1",
                "x == 1 && y != 1",
                "x == 1 && y == 1",
            ]
        );
    }

    #[test]
    fn two_punctures_per_variable_give_nine_states() {
        let r = resolver();
        let preds = vec![
            relation("x", BinOp::Eq, Expr::int(1)),
            relation("x", BinOp::Eq, Expr::int(2)),
            relation("y", BinOp::Eq, Expr::int(3)),
            relation("y", BinOp::Eq, Expr::int(4)),
        ];
        let store = Store::from_predicates(&preds, &r).unwrap();
        assert_eq!(store.num_abstract_values(), 9);
        assert_eq!(store.product_conditions().len(), 9);
    }

    #[test]
    fn ordered_bounds_split_into_a_trichotomy() {
        let r = resolver();
        let preds = vec![
            relation("x", BinOp::Ge, Expr::int(32)),
            relation("x", BinOp::Lt, Expr::int(127)),
        ];
        let store = Store::from_predicates(&preds, &r).unwrap();
        assert_eq!(
            strings(&store.product_conditions()),
            vec![
                "x <= 31",
                "x == 32",
                "x >= 33 && x <= 126",
                "x == 127",
                "x >= 128"
            ]
        );
    }

    #[test]
    fn long_and_char_variables_render_their_literal_flavor() {
        let r = resolver();
        let preds = vec![
            relation("n", BinOp::Eq, Expr::long(7)),
            relation("c", BinOp::Ge, Expr::chr('a')),
        ];
        let store = Store::from_predicates(&preds, &r).unwrap();
        assert_eq!(
            strings(&store.product_conditions()),
            vec![
                "n != 7L && c <= '`'",
                "n != 7L && c == 'a'",
                "n != 7L && c >= 'b'",
                "n == 7L && c <= '`'",
                "n == 7L && c == 'a'",
                "n == 7L && c >= 'b'",
            ]
        );
    }

    // ---------------------------------------------------------------
    // String, boolean, and object domains
    // ---------------------------------------------------------------

    #[test]
    fn string_predicates_cross_with_compared_literals() {
        let r = resolver();
        let equals = MethodCallPredicate::new(
            Expr::call(Some(Expr::var("s")), "equals", vec![Expr::str_lit("foo")]),
            &r,
        )
        .unwrap();
        let starts = MethodCallPredicate::new(
            Expr::call(
                Some(Expr::var("t")),
                "startsWith",
                vec![Expr::str_lit("bar")],
            ),
            &r,
        )
        .unwrap();
        let preds = vec![Predicate::MethodCall(equals), Predicate::MethodCall(starts)];
        let store = Store::from_predicates(&preds, &r).unwrap();
        assert_eq!(
            strings(&store.product_conditions()),
            vec![
                "s.equals(\"foo\") && t.startsWith(\"bar\")",
                "s.equals(\"foo\") && !t.startsWith(\"bar\")",
                "!s.equals(\"foo\") && t.startsWith(\"bar\")",
                "!s.equals(\"foo\") && !t.startsWith(\"bar\")",
            ]
        );
    }

    #[test]
    fn two_compared_literals_partition_into_three_cells() {
        let r = resolver();
        let preds = vec![
            relation("s", BinOp::Eq, Expr::str_lit("a")),
            relation("s", BinOp::Eq, Expr::str_lit("b")),
        ];
        let store = Store::from_predicates(&preds, &r).unwrap();
        assert_eq!(
            strings(&store.product_conditions()),
            vec![
                "s.equals(\"a\")",
                "s.equals(\"b\")",
                "!s.equals(\"a\") && !s.equals(\"b\")",
            ]
        );
    }

    #[test]
    fn boolean_variable_is_two_valued() {
        let r = resolver();
        let preds = vec![Predicate::Name(NamePredicate {
            name: "flag".to_string(),
        })];
        let store = Store::from_predicates(&preds, &r).unwrap();
        assert_eq!(strings(&store.product_conditions()), vec!["flag", "!flag"]);
    }

    #[test]
    fn object_predicates_intersect_and_dedup() {
        let r = resolver();
        let is_empty = MethodCallPredicate::new(
            Expr::call(Some(Expr::var("o")), "isEmpty", vec![]),
            &r,
        )
        .unwrap();
        let preds = vec![
            Predicate::MethodCall(is_empty.clone()),
            Predicate::MethodCall(is_empty),
        ];
        let store = Store::from_predicates(&preds, &r).unwrap();
        assert_eq!(
            strings(&store.product_conditions()),
            vec!["o.isEmpty()", "!o.isEmpty()"]
        );
    }

    #[test]
    fn receiverless_predicate_is_recorded_but_excluded() {
        let r = resolver();
        let pred = MethodCallPredicate::new(Expr::call(None, "isEmpty", vec![]), &r).unwrap();
        let store = Store::from_predicates(&[Predicate::MethodCall(pred)], &r).unwrap();
        assert_eq!(store.unscoped().len(), 1);
        assert!(store.product_conditions().is_empty());
        assert!(store.is_empty());
    }

    // ---------------------------------------------------------------
    // Rejected shapes
    // ---------------------------------------------------------------

    #[test]
    fn name_to_name_comparison_is_unsupported() {
        let r = resolver();
        let err = Store::from_predicates(&[relation("x", BinOp::Lt, Expr::var("y"))], &r)
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::UnsupportedRelation {
                kind: RelationKind::NameName,
                ..
            }
        ));
    }

    #[test]
    fn ordered_string_comparison_is_unsupported() {
        let r = resolver();
        let err = Store::from_predicates(&[relation("s", BinOp::Lt, Expr::str_lit("a"))], &r)
            .unwrap_err();
        assert!(matches!(err, StoreError::UnsupportedComparison(_)));
    }

    #[test]
    fn boolean_literal_relation_is_not_implemented() {
        let r = resolver();
        let err =
            Store::from_predicates(&[relation("flag", BinOp::Eq, Expr::bool_lit(true))], &r)
                .unwrap_err();
        assert!(matches!(err, StoreError::BooleanLiteral(_)));
    }

    #[test]
    fn conflicting_domains_for_one_name_are_rejected() {
        let r = resolver();
        let preds = vec![
            relation("x", BinOp::Eq, Expr::int(1)),
            Predicate::Name(NamePredicate {
                name: "x".to_string(),
            }),
        ];
        let err = Store::from_predicates(&preds, &r).unwrap_err();
        assert!(matches!(err, StoreError::TypeMismatch { .. }));
    }

    #[test]
    fn null_comparison_does_not_refine_the_store() {
        let r = resolver();
        let store =
            Store::from_predicates(&[relation("o", BinOp::Eq, Expr::null())], &r).unwrap();
        assert!(store.is_empty());
        assert_eq!(store.num_abstract_values(), 1);
    }

    #[test]
    fn empty_store_has_one_abstract_value_and_no_conditions() {
        let store = Store::new();
        assert_eq!(store.num_abstract_values(), 1);
        assert!(store.product_conditions().is_empty());
    }

    #[test]
    fn display_lists_one_line_per_variable() {
        let r = resolver();
        let preds = vec![
            relation("x", BinOp::Eq, Expr::int(1)),
            Predicate::Name(NamePredicate {
                name: "flag".to_string(),
            }),
        ];
        let store = Store::from_predicates(&preds, &r).unwrap();
        assert_eq!(
            store.to_string(),
            "x: x != 1 | x == 1\nflag: flag | !flag\n"
        );
    }
}
