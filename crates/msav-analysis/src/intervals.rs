use msav_ast::ast::{BinOp, Expr};

/// Interval endpoint over the integer line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Bound {
    NegInf,
    Finite(i64),
    PosInf,
}

/// A contiguous integer range with finitely many excluded interior points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Interval {
    pub lower: Bound,
    pub upper: Bound,
    punctures: Vec<i64>,
}

impl Interval {
    fn full() -> Self {
        Self {
            lower: Bound::NegInf,
            upper: Bound::PosInf,
            punctures: Vec::new(),
        }
    }

    pub fn is_singleton(&self) -> bool {
        matches!((self.lower, self.upper), (Bound::Finite(a), Bound::Finite(b)) if a == b)
    }

    pub fn contains(&self, point: i64) -> bool {
        self.lower <= Bound::Finite(point) && Bound::Finite(point) <= self.upper
    }

    pub fn punctures(&self) -> &[i64] {
        &self.punctures
    }

    fn puncture(&mut self, point: i64) {
        if let Err(idx) = self.punctures.binary_search(&point) {
            self.punctures.insert(idx, point);
        }
    }

    /// Whether any point of the interval remains after removing punctures.
    fn has_unpunctured_point(&self) -> bool {
        match (self.lower, self.upper) {
            (Bound::Finite(lb), Bound::Finite(ub)) => {
                let size = (ub as i128) - (lb as i128) + 1;
                size > self.punctures.len() as i128
            }
            _ => true,
        }
    }

    /// Number of abstract-value cells this interval contributes.
    fn cell_count(&self) -> usize {
        if self.is_singleton() {
            1
        } else {
            self.punctures.len() + usize::from(self.has_unpunctured_point())
        }
    }

    /// Mutually exclusive, jointly exhaustive conditions over this interval:
    /// one range-with-exclusions condition covering the unpunctured part (if
    /// any remains), then one equality per puncture. Singletons collapse to a
    /// single equality.
    fn conditions<F>(&self, var: &str, lit: &F) -> Vec<Expr>
    where
        F: Fn(i64) -> Expr,
    {
        if let (Bound::Finite(lb), true) = (self.lower, self.is_singleton()) {
            return vec![Expr::bin(BinOp::Eq, Expr::var(var), lit(lb))];
        }
        let mut out = Vec::with_capacity(self.cell_count());
        if self.has_unpunctured_point() {
            let mut conjuncts = Vec::new();
            if let Bound::Finite(lb) = self.lower {
                conjuncts.push(Expr::bin(BinOp::Ge, Expr::var(var), lit(lb)));
            }
            if let Bound::Finite(ub) = self.upper {
                conjuncts.push(Expr::bin(BinOp::Le, Expr::var(var), lit(ub)));
            }
            for &p in &self.punctures {
                conjuncts.push(Expr::bin(BinOp::Ne, Expr::var(var), lit(p)));
            }
            let range = conjuncts
                .into_iter()
                .reduce(|acc, next| Expr::bin(BinOp::And, acc, next))
                .unwrap_or_else(|| Expr::bool_lit(true));
            out.push(range);
        }
        for &p in &self.punctures {
            out.push(Expr::bin(BinOp::Eq, Expr::var(var), lit(p)));
        }
        out
    }
}

/// An ordered partition of the whole integer line into punctured intervals:
/// pairwise disjoint, gapless, starting as a single (-inf, +inf) interval.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PuncturedIntervals {
    intervals: Vec<Interval>,
}

impl Default for PuncturedIntervals {
    fn default() -> Self {
        Self::new()
    }
}

impl PuncturedIntervals {
    pub fn new() -> Self {
        Self {
            intervals: vec![Interval::full()],
        }
    }

    pub fn intervals(&self) -> &[Interval] {
        &self.intervals
    }

    fn containing_index(&self, point: i64) -> usize {
        // The intervals cover the whole line, so a containing interval
        // always exists.
        self.intervals
            .iter()
            .position(|iv| iv.contains(point))
            .unwrap_or(0)
    }

    /// Exclude one point as a distinguishable abstract value, without
    /// splitting its neighborhood. Idempotent; a no-op on singletons.
    pub fn puncture(&mut self, point: i64) {
        let idx = self.containing_index(point);
        if self.intervals[idx].is_singleton() {
            return;
        }
        self.intervals[idx].puncture(point);
    }

    /// Make `point` its own singleton cell, dividing the containing interval
    /// into at most three pieces. Idempotent.
    pub fn split_at(&mut self, point: i64) {
        let idx = self.containing_index(point);
        if self.intervals[idx].is_singleton() {
            return;
        }
        let old = self.intervals.remove(idx);
        let mut parts = Vec::with_capacity(3);
        if old.lower < Bound::Finite(point) {
            if let Some(below) = point.checked_sub(1) {
                parts.push(Interval {
                    lower: old.lower,
                    upper: Bound::Finite(below),
                    punctures: old.punctures.iter().copied().filter(|&p| p < point).collect(),
                });
            }
        }
        parts.push(Interval {
            lower: Bound::Finite(point),
            upper: Bound::Finite(point),
            punctures: Vec::new(),
        });
        if Bound::Finite(point) < old.upper {
            if let Some(above) = point.checked_add(1) {
                parts.push(Interval {
                    lower: Bound::Finite(above),
                    upper: old.upper,
                    punctures: old.punctures.iter().copied().filter(|&p| p > point).collect(),
                });
            }
        }
        self.intervals.splice(idx..idx, parts);
    }

    /// Total number of abstract-value cells across the partition.
    pub fn num_abstract_values(&self) -> usize {
        self.intervals.iter().map(Interval::cell_count).sum()
    }

    /// The partition's conditions over `var`, in interval order. `lit` builds
    /// the literal node for the variable's type (int, long, or char).
    pub fn conditions<F>(&self, var: &str, lit: F) -> Vec<Expr>
    where
        F: Fn(i64) -> Expr,
    {
        self.intervals
            .iter()
            .flat_map(|iv| iv.conditions(var, &lit))
            .collect()
    }
}
