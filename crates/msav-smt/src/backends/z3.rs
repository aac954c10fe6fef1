use std::collections::HashMap;

use thiserror::Error;
use z3::SatResult as Z3SatResult;

use crate::solver::{SatResult, SmtSolver};
use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

#[derive(Debug, Error)]
pub enum Z3Error {
    #[error("Z3 error: {0}")]
    Internal(String),
    #[error("Unknown variable: {0}")]
    UnknownVariable(String),
    #[error("Unknown function: {0}")]
    UnknownFunction(String),
    #[error("Sort mismatch for {0}")]
    SortMismatch(String),
}

enum Z3Var {
    Bv(z3::ast::BV),
    Bool(z3::ast::Bool),
    Other(z3::ast::Dynamic),
}

pub struct Z3Solver {
    solver: z3::Solver,
    vars: HashMap<String, Z3Var>,
    funs: HashMap<String, z3::FuncDecl>,
    sorts: HashMap<SmtSort, z3::Sort>,
    _params: Option<z3::Params>,
}

impl Z3Solver {
    pub fn new() -> Self {
        let solver = z3::Solver::new();
        Self {
            solver,
            vars: HashMap::new(),
            funs: HashMap::new(),
            sorts: HashMap::new(),
            _params: None,
        }
    }

    pub fn with_timeout_secs(timeout_secs: u64) -> Self {
        if timeout_secs == 0 {
            return Self::new();
        }
        let solver = z3::Solver::new();
        let mut params = z3::Params::new();
        let timeout_ms = timeout_secs.saturating_mul(1000);
        params.set_u32("timeout", timeout_ms as u32);
        params.set_u32("solver2_timeout", timeout_ms as u32);
        solver.set_params(&params);
        Self {
            solver,
            vars: HashMap::new(),
            funs: HashMap::new(),
            sorts: HashMap::new(),
            _params: Some(params),
        }
    }

    pub fn with_default_config() -> Self {
        Self::new()
    }

    fn z3_sort(&mut self, sort: &SmtSort) -> z3::Sort {
        if let Some(existing) = self.sorts.get(sort) {
            return existing.clone();
        }
        let created = match sort {
            SmtSort::Bool => z3::Sort::bool(),
            SmtSort::BitVec(width) => z3::Sort::bitvector(*width),
            SmtSort::Str => z3::Sort::uninterpreted("Str".into()),
            SmtSort::Ref(name) => z3::Sort::uninterpreted(name.clone().into()),
        };
        self.sorts.insert(sort.clone(), created.clone());
        created
    }

    fn translate_term(&self, term: &SmtTerm) -> Result<Z3Term, Z3Error> {
        match term {
            SmtTerm::Var(name) => match self.vars.get(name) {
                Some(Z3Var::Bv(v)) => Ok(Z3Term::Bv(v.clone())),
                Some(Z3Var::Bool(v)) => Ok(Z3Term::Bool(v.clone())),
                Some(Z3Var::Other(v)) => Ok(Z3Term::Other(v.clone())),
                None => Err(Z3Error::UnknownVariable(name.clone())),
            },
            SmtTerm::BvLit { value, width } => {
                Ok(Z3Term::Bv(z3::ast::BV::from_i64(*value, *width)))
            }
            SmtTerm::BoolLit(b) => Ok(Z3Term::Bool(z3::ast::Bool::from_bool(*b))),
            SmtTerm::BvAdd(lhs, rhs) => {
                let l = self.translate_term(lhs)?.into_bv()?;
                let r = self.translate_term(rhs)?.into_bv()?;
                Ok(Z3Term::Bv(&l + &r))
            }
            SmtTerm::BvSub(lhs, rhs) => {
                let l = self.translate_term(lhs)?.into_bv()?;
                let r = self.translate_term(rhs)?.into_bv()?;
                Ok(Z3Term::Bv(&l - &r))
            }
            SmtTerm::BvMul(lhs, rhs) => {
                let l = self.translate_term(lhs)?.into_bv()?;
                let r = self.translate_term(rhs)?.into_bv()?;
                Ok(Z3Term::Bv(&l * &r))
            }
            SmtTerm::BvSDiv(lhs, rhs) => {
                let l = self.translate_term(lhs)?.into_bv()?;
                let r = self.translate_term(rhs)?.into_bv()?;
                Ok(Z3Term::Bv(l.bvsdiv(&r)))
            }
            SmtTerm::BvSRem(lhs, rhs) => {
                let l = self.translate_term(lhs)?.into_bv()?;
                let r = self.translate_term(rhs)?.into_bv()?;
                Ok(Z3Term::Bv(l.bvsrem(&r)))
            }
            SmtTerm::BvNeg(inner) => {
                let v = self.translate_term(inner)?.into_bv()?;
                Ok(Z3Term::Bv(v.bvneg()))
            }
            SmtTerm::Eq(lhs, rhs) => {
                let l = self.translate_term(lhs)?;
                let r = self.translate_term(rhs)?;
                match (l, r) {
                    (Z3Term::Bv(lb), Z3Term::Bv(rb)) => Ok(Z3Term::Bool(lb.eq(&rb))),
                    (Z3Term::Bool(lb), Z3Term::Bool(rb)) => Ok(Z3Term::Bool(lb.eq(&rb))),
                    (Z3Term::Other(lo), Z3Term::Other(ro)) => Ok(Z3Term::Bool(lo.eq(&ro))),
                    _ => Err(Z3Error::Internal("Sort mismatch in Eq".into())),
                }
            }
            SmtTerm::BvSlt(lhs, rhs) => {
                let l = self.translate_term(lhs)?.into_bv()?;
                let r = self.translate_term(rhs)?.into_bv()?;
                Ok(Z3Term::Bool(l.bvslt(&r)))
            }
            SmtTerm::BvSle(lhs, rhs) => {
                let l = self.translate_term(lhs)?.into_bv()?;
                let r = self.translate_term(rhs)?.into_bv()?;
                Ok(Z3Term::Bool(l.bvsle(&r)))
            }
            SmtTerm::BvSgt(lhs, rhs) => {
                let l = self.translate_term(lhs)?.into_bv()?;
                let r = self.translate_term(rhs)?.into_bv()?;
                Ok(Z3Term::Bool(l.bvsgt(&r)))
            }
            SmtTerm::BvSge(lhs, rhs) => {
                let l = self.translate_term(lhs)?.into_bv()?;
                let r = self.translate_term(rhs)?.into_bv()?;
                Ok(Z3Term::Bool(l.bvsge(&r)))
            }
            SmtTerm::And(terms) => {
                let bools: Result<Vec<_>, _> = terms
                    .iter()
                    .map(|t| self.translate_term(t).and_then(|z| z.into_bool()))
                    .collect();
                let bools = bools?;
                let refs: Vec<&z3::ast::Bool> = bools.iter().collect();
                Ok(Z3Term::Bool(z3::ast::Bool::and(&refs)))
            }
            SmtTerm::Or(terms) => {
                let bools: Result<Vec<_>, _> = terms
                    .iter()
                    .map(|t| self.translate_term(t).and_then(|z| z.into_bool()))
                    .collect();
                let bools = bools?;
                let refs: Vec<&z3::ast::Bool> = bools.iter().collect();
                Ok(Z3Term::Bool(z3::ast::Bool::or(&refs)))
            }
            SmtTerm::Not(inner) => {
                let b = self.translate_term(inner)?.into_bool()?;
                Ok(Z3Term::Bool(b.not()))
            }
            SmtTerm::Ite(cond, then, els) => {
                let c = self.translate_term(cond)?.into_bool()?;
                let t = self.translate_term(then)?;
                let e = self.translate_term(els)?;
                match (t, e) {
                    (Z3Term::Bv(tb), Z3Term::Bv(eb)) => Ok(Z3Term::Bv(c.ite(&tb, &eb))),
                    (Z3Term::Bool(tb), Z3Term::Bool(eb)) => Ok(Z3Term::Bool(c.ite(&tb, &eb))),
                    (Z3Term::Other(to), Z3Term::Other(eo)) => Ok(Z3Term::Other(c.ite(&to, &eo))),
                    _ => Err(Z3Error::Internal("Sort mismatch in ITE".into())),
                }
            }
            SmtTerm::App { func, args } => {
                let Some(decl) = self.funs.get(func) else {
                    return Err(Z3Error::UnknownFunction(func.clone()));
                };
                let translated: Result<Vec<z3::ast::Dynamic>, Z3Error> =
                    args.iter().map(|a| {
                        self.translate_term(a).map(Z3Term::into_dynamic)
                    }).collect();
                let translated = translated?;
                let refs: Vec<&dyn z3::ast::Ast> =
                    translated.iter().map(|d| d as &dyn z3::ast::Ast).collect();
                let applied = decl.apply(&refs);
                if let Some(b) = applied.as_bool() {
                    Ok(Z3Term::Bool(b))
                } else if let Some(bv) = applied.as_bv() {
                    Ok(Z3Term::Bv(bv))
                } else {
                    Ok(Z3Term::Other(applied))
                }
            }
        }
    }
}

enum Z3Term {
    Bv(z3::ast::BV),
    Bool(z3::ast::Bool),
    Other(z3::ast::Dynamic),
}

impl Z3Term {
    fn into_bv(self) -> Result<z3::ast::BV, Z3Error> {
        match self {
            Z3Term::Bv(v) => Ok(v),
            _ => Err(Z3Error::Internal("Expected BitVec term".into())),
        }
    }

    fn into_bool(self) -> Result<z3::ast::Bool, Z3Error> {
        match self {
            Z3Term::Bool(b) => Ok(b),
            _ => Err(Z3Error::Internal("Expected Bool term".into())),
        }
    }

    fn into_dynamic(self) -> z3::ast::Dynamic {
        match self {
            Z3Term::Bv(v) => z3::ast::Dynamic::from(v),
            Z3Term::Bool(b) => z3::ast::Dynamic::from(b),
            Z3Term::Other(d) => d,
        }
    }
}

impl Default for Z3Solver {
    fn default() -> Self {
        Self::new()
    }
}

impl SmtSolver for Z3Solver {
    type Error = Z3Error;

    fn declare_var(&mut self, name: &str, sort: &SmtSort) -> Result<(), Z3Error> {
        let var = match sort {
            SmtSort::Bool => Z3Var::Bool(z3::ast::Bool::new_const(name)),
            SmtSort::BitVec(width) => Z3Var::Bv(z3::ast::BV::new_const(name, *width)),
            SmtSort::Str | SmtSort::Ref(_) => {
                let z3_sort = self.z3_sort(sort);
                Z3Var::Other(z3::ast::Dynamic::new_const(name, &z3_sort))
            }
        };
        self.vars.insert(name.to_string(), var);
        Ok(())
    }

    fn declare_fun(
        &mut self,
        name: &str,
        domain: &[SmtSort],
        range: &SmtSort,
    ) -> Result<(), Z3Error> {
        let domain_sorts: Vec<z3::Sort> = domain.iter().map(|s| self.z3_sort(s)).collect();
        let domain_refs: Vec<&z3::Sort> = domain_sorts.iter().collect();
        let range_sort = self.z3_sort(range);
        let decl = z3::FuncDecl::new(name, &domain_refs, &range_sort);
        self.funs.insert(name.to_string(), decl);
        Ok(())
    }

    fn assert(&mut self, term: &SmtTerm) -> Result<(), Z3Error> {
        let z3_term = self.translate_term(term)?.into_bool()?;
        self.solver.assert(&z3_term);
        Ok(())
    }

    fn push(&mut self) -> Result<(), Z3Error> {
        self.solver.push();
        Ok(())
    }

    fn pop(&mut self) -> Result<(), Z3Error> {
        self.solver.pop(1);
        Ok(())
    }

    fn check_sat(&mut self) -> Result<SatResult, Z3Error> {
        match self.solver.check() {
            Z3SatResult::Sat => Ok(SatResult::Sat),
            Z3SatResult::Unsat => Ok(SatResult::Unsat),
            Z3SatResult::Unknown => Ok(SatResult::Unknown("Z3 returned unknown".into())),
        }
    }

    fn reset(&mut self) -> Result<(), Z3Error> {
        self.solver.reset();
        // Z3 may drop per-solver parameters on reset; reapply timeout if configured.
        if let Some(params) = &self._params {
            self.solver.set_params(params);
        }
        self.vars.clear();
        self.funs.clear();
        self.sorts.clear();
        Ok(())
    }
}
