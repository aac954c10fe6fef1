use indexmap::IndexMap;
use thiserror::Error;

use msav_ast::ast::{BinOp, Expr, ExprKind, IntWidth, Lit, Type, UnOp};
use msav_ast::errors::ResolveError;
use msav_ast::resolve::TypeResolver;

use crate::sorts::SmtSort;
use crate::terms::SmtTerm;

#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("cannot encode '{0}'")]
    NotImplemented(String),

    #[error("expected a boolean condition, got '{0}'")]
    NonBoolean(String),

    #[error("operand sorts do not agree in '{0}'")]
    SortMismatch(String),

    #[error(transparent)]
    Resolve(#[from] ResolveError),
}

/// Declarations and axioms produced since the last drain. The filter asserts
/// them at the solver's base level so they outlive per-condition scopes.
#[derive(Debug, Default)]
pub struct Declarations {
    pub vars: Vec<(String, SmtSort)>,
    pub funs: Vec<(String, Vec<SmtSort>, SmtSort)>,
    pub axioms: Vec<SmtTerm>,
}

impl Declarations {
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty() && self.funs.is_empty() && self.axioms.is_empty()
    }
}

const STR_LENGTH: &str = "str_length";
const STR_CHAR_AT: &str = "str_char_at";

/// Encodes conditions into solver-agnostic terms.
///
/// Integers and chars become signed bit-vectors of their declared width;
/// numeric literals take the width of the non-literal side they are compared
/// with. Strings and reference types become uninterpreted sorts, string
/// literals become interned constants pinned down by length and character
/// axioms, null becomes one distinguished constant per reference sort, and
/// method calls become uninterpreted function applications. Floats are not
/// encoded.
pub struct Encoder<'a> {
    resolver: &'a dyn TypeResolver,
    vars: IndexMap<String, SmtSort>,
    funs: IndexMap<String, (Vec<SmtSort>, SmtSort)>,
    string_literals: IndexMap<String, String>,
    null_consts: IndexMap<SmtSort, String>,
    pending: Declarations,
}

impl<'a> Encoder<'a> {
    pub fn new(resolver: &'a dyn TypeResolver) -> Self {
        Self {
            resolver,
            vars: IndexMap::new(),
            funs: IndexMap::new(),
            string_literals: IndexMap::new(),
            null_consts: IndexMap::new(),
            pending: Declarations::default(),
        }
    }

    /// Encode one boolean condition.
    pub fn encode_condition(&mut self, expr: &Expr) -> Result<SmtTerm, EncodeError> {
        let (term, sort) = self.encode_term(expr)?;
        if sort != SmtSort::Bool {
            return Err(EncodeError::NonBoolean(expr.to_string()));
        }
        Ok(term)
    }

    /// Drain the declarations accumulated since the previous drain.
    pub fn take_declarations(&mut self) -> Declarations {
        std::mem::take(&mut self.pending)
    }

    fn encode_term(&mut self, expr: &Expr) -> Result<(SmtTerm, SmtSort), EncodeError> {
        match &expr.kind {
            ExprKind::Lit(lit) => self.encode_literal(expr, lit, None),
            ExprKind::Var(name) => {
                let sort = self.sort_of(&self.resolver.type_of(expr)?, expr)?;
                self.declare_var(name, &sort);
                Ok((SmtTerm::var(name.clone()), sort))
            }
            ExprKind::Binary { op, lhs, rhs } => self.encode_binary(expr, *op, lhs, rhs),
            ExprKind::Unary { op, operand } => match op {
                UnOp::Not => {
                    let (term, sort) = self.encode_term(operand)?;
                    if sort != SmtSort::Bool {
                        return Err(EncodeError::SortMismatch(expr.to_string()));
                    }
                    Ok((term.not(), SmtSort::Bool))
                }
                UnOp::Neg => {
                    let (term, sort) = self.encode_term(operand)?;
                    let SmtSort::BitVec(_) = sort else {
                        return Err(EncodeError::SortMismatch(expr.to_string()));
                    };
                    Ok((term.neg(), sort))
                }
            },
            ExprKind::Call { .. } => self.encode_call(expr),
            ExprKind::Conditional { cond, then, els } => {
                let (c, c_sort) = self.encode_term(cond)?;
                if c_sort != SmtSort::Bool {
                    return Err(EncodeError::SortMismatch(expr.to_string()));
                }
                let (t, t_sort) = self.encode_term(then)?;
                let (e, e_sort) = self.encode_term(els)?;
                if t_sort != e_sort {
                    return Err(EncodeError::SortMismatch(expr.to_string()));
                }
                Ok((c.ite(t, e), t_sort))
            }
            ExprKind::Paren(inner) => self.encode_term(inner),
            ExprKind::Assign { .. } => Err(EncodeError::NotImplemented(expr.to_string())),
        }
    }

    fn encode_binary(
        &mut self,
        expr: &Expr,
        op: BinOp,
        lhs: &Expr,
        rhs: &Expr,
    ) -> Result<(SmtTerm, SmtSort), EncodeError> {
        match op {
            BinOp::And | BinOp::Or => {
                let (l, l_sort) = self.encode_term(lhs)?;
                let (r, r_sort) = self.encode_term(rhs)?;
                if l_sort != SmtSort::Bool || r_sort != SmtSort::Bool {
                    return Err(EncodeError::SortMismatch(expr.to_string()));
                }
                let term = match op {
                    BinOp::And => SmtTerm::and(vec![l, r]),
                    _ => SmtTerm::or(vec![l, r]),
                };
                Ok((term, SmtSort::Bool))
            }
            BinOp::Eq | BinOp::Ne => {
                let term = self.encode_equality(expr, lhs, rhs)?;
                let term = if op == BinOp::Ne { term.not() } else { term };
                Ok((term, SmtSort::Bool))
            }
            BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                let (l, r, sort) = self.encode_operands(expr, lhs, rhs)?;
                let SmtSort::BitVec(_) = sort else {
                    return Err(EncodeError::SortMismatch(expr.to_string()));
                };
                let term = match op {
                    BinOp::Lt => l.slt(r),
                    BinOp::Le => l.sle(r),
                    BinOp::Gt => l.sgt(r),
                    _ => l.sge(r),
                };
                Ok((term, SmtSort::Bool))
            }
            BinOp::Add | BinOp::Sub | BinOp::Mul | BinOp::Div | BinOp::Rem => {
                let (l, r, sort) = self.encode_operands(expr, lhs, rhs)?;
                let SmtSort::BitVec(_) = sort else {
                    return Err(EncodeError::SortMismatch(expr.to_string()));
                };
                let term = match op {
                    BinOp::Add => l.add(r),
                    BinOp::Sub => l.sub(r),
                    BinOp::Mul => l.mul(r),
                    BinOp::Div => l.sdiv(r),
                    _ => l.srem(r),
                };
                Ok((term, sort))
            }
        }
    }

    fn encode_equality(
        &mut self,
        expr: &Expr,
        lhs: &Expr,
        rhs: &Expr,
    ) -> Result<SmtTerm, EncodeError> {
        match (lhs.is_null_lit(), rhs.is_null_lit()) {
            (true, true) => Ok(SmtTerm::bool(true)),
            (true, false) | (false, true) => {
                let other = if lhs.is_null_lit() { rhs } else { lhs };
                let (term, sort) = self.encode_term(other)?;
                match sort {
                    SmtSort::Str | SmtSort::Ref(_) => {
                        let null = self.null_const(&sort);
                        Ok(term.eq(null))
                    }
                    _ => Err(EncodeError::SortMismatch(expr.to_string())),
                }
            }
            (false, false) => {
                let (l, r, _) = self.encode_operands(expr, lhs, rhs)?;
                Ok(l.eq(r))
            }
        }
    }

    /// Encode a comparison's operands with a common sort. A bare numeric
    /// literal adopts the width of the other side.
    fn encode_operands(
        &mut self,
        expr: &Expr,
        lhs: &Expr,
        rhs: &Expr,
    ) -> Result<(SmtTerm, SmtTerm, SmtSort), EncodeError> {
        match (numeric_literal(lhs), numeric_literal(rhs)) {
            (Some(_), None) => {
                let (r, sort) = self.encode_term(rhs)?;
                let (l, _) = self.encode_coerced_literal(lhs, &sort, expr)?;
                Ok((l, r, sort))
            }
            (None, Some(_)) => {
                let (l, sort) = self.encode_term(lhs)?;
                let (r, _) = self.encode_coerced_literal(rhs, &sort, expr)?;
                Ok((l, r, sort))
            }
            _ => {
                let (l, l_sort) = self.encode_term(lhs)?;
                let (r, r_sort) = self.encode_term(rhs)?;
                if l_sort != r_sort {
                    return Err(EncodeError::SortMismatch(expr.to_string()));
                }
                Ok((l, r, l_sort))
            }
        }
    }

    fn encode_coerced_literal(
        &mut self,
        lit_expr: &Expr,
        target: &SmtSort,
        context: &Expr,
    ) -> Result<(SmtTerm, SmtSort), EncodeError> {
        let Some(value) = numeric_literal(lit_expr) else {
            return Err(EncodeError::SortMismatch(context.to_string()));
        };
        let SmtSort::BitVec(width) = target else {
            return Err(EncodeError::SortMismatch(context.to_string()));
        };
        Ok((SmtTerm::bv(value, *width), target.clone()))
    }

    fn encode_literal(
        &mut self,
        expr: &Expr,
        lit: &Lit,
        width_hint: Option<u32>,
    ) -> Result<(SmtTerm, SmtSort), EncodeError> {
        match lit {
            Lit::Int(v) => {
                let width = width_hint.unwrap_or(32);
                Ok((SmtTerm::bv(*v, width), SmtSort::BitVec(width)))
            }
            Lit::Long(v) => {
                let width = width_hint.unwrap_or(64);
                Ok((SmtTerm::bv(*v, width), SmtSort::BitVec(width)))
            }
            Lit::Char(c) => {
                let width = width_hint.unwrap_or(16);
                Ok((SmtTerm::bv(*c as i64, width), SmtSort::BitVec(width)))
            }
            Lit::Bool(b) => Ok((SmtTerm::bool(*b), SmtSort::Bool)),
            Lit::Str(value) => {
                let name = self.intern_string(value);
                Ok((SmtTerm::var(name), SmtSort::Str))
            }
            Lit::Float(_) | Lit::Null => Err(EncodeError::NotImplemented(expr.to_string())),
        }
    }

    fn encode_call(&mut self, expr: &Expr) -> Result<(SmtTerm, SmtSort), EncodeError> {
        let ExprKind::Call {
            receiver,
            name,
            args,
        } = &expr.kind
        else {
            return Err(EncodeError::NotImplemented(expr.to_string()));
        };
        let sig = self.resolver.method_sig(expr)?;
        let range = self.sort_of(&sig.return_type, expr)?;

        let mut encoded_args = Vec::with_capacity(args.len() + 1);
        let mut domain = Vec::with_capacity(args.len() + 1);
        if let Some(recv) = receiver {
            let (term, sort) = self.encode_term(recv)?;
            encoded_args.push(term);
            domain.push(sort);
        }
        for (idx, arg) in args.iter().enumerate() {
            // Literal arguments take the declared parameter width when the
            // signature provides one.
            let hint = sig
                .params
                .get(idx)
                .and_then(bit_width)
                .filter(|_| numeric_literal(arg).is_some());
            let (term, sort) = match (&arg.kind, hint) {
                (ExprKind::Lit(lit), Some(width)) => self.encode_literal(arg, lit, Some(width))?,
                _ => self.encode_term(arg)?,
            };
            encoded_args.push(term);
            domain.push(sort);
        }

        let func = name.clone();
        match self.funs.get(&func) {
            Some((existing_domain, existing_range)) => {
                if existing_domain != &domain || existing_range != &range {
                    return Err(EncodeError::SortMismatch(expr.to_string()));
                }
            }
            None => self.declare_fun(&func, domain, range.clone()),
        }
        Ok((SmtTerm::app(func, encoded_args), range))
    }

    fn sort_of(&self, ty: &Type, expr: &Expr) -> Result<SmtSort, EncodeError> {
        match ty {
            Type::Boolean => Ok(SmtSort::Bool),
            Type::Integer(_) | Type::Char => {
                // bit_width is defined for every non-float numeric type.
                bit_width(ty)
                    .map(SmtSort::BitVec)
                    .ok_or_else(|| EncodeError::NotImplemented(expr.to_string()))
            }
            Type::Str => Ok(SmtSort::Str),
            Type::Reference(name) => Ok(SmtSort::Ref(name.clone())),
            Type::Float(_) => Err(EncodeError::NotImplemented(expr.to_string())),
        }
    }

    fn declare_var(&mut self, name: &str, sort: &SmtSort) {
        if !self.vars.contains_key(name) {
            self.vars.insert(name.to_string(), sort.clone());
            self.pending.vars.push((name.to_string(), sort.clone()));
        }
    }

    fn declare_fun(&mut self, name: &str, domain: Vec<SmtSort>, range: SmtSort) {
        if !self.funs.contains_key(name) {
            self.funs
                .insert(name.to_string(), (domain.clone(), range.clone()));
            self.pending.funs.push((name.to_string(), domain, range));
        }
    }

    fn null_const(&mut self, sort: &SmtSort) -> SmtTerm {
        if let Some(name) = self.null_consts.get(sort) {
            return SmtTerm::var(name.clone());
        }
        let name = match sort {
            SmtSort::Ref(ty) => format!("null_{ty}"),
            _ => "null_String".to_string(),
        };
        self.null_consts.insert(sort.clone(), name.clone());
        self.declare_var(&name, sort);
        SmtTerm::var(name)
    }

    /// Intern a string literal as a fresh constant, pinned down by length
    /// and per-index character axioms so distinct literals stay distinct.
    fn intern_string(&mut self, value: &str) -> String {
        if let Some(name) = self.string_literals.get(value) {
            return name.clone();
        }
        if self.string_literals.is_empty() {
            self.declare_fun(
                STR_LENGTH,
                vec![SmtSort::Str],
                SmtSort::BitVec(32),
            );
            self.declare_fun(
                STR_CHAR_AT,
                vec![SmtSort::Str, SmtSort::BitVec(32)],
                SmtSort::BitVec(16),
            );
        }
        let name = format!("strlit{}", self.string_literals.len());
        self.string_literals
            .insert(value.to_string(), name.clone());
        self.declare_var(&name, &SmtSort::Str);

        let chars: Vec<char> = value.chars().collect();
        self.pending.axioms.push(
            SmtTerm::app(STR_LENGTH, vec![SmtTerm::var(name.clone())])
                .eq(SmtTerm::bv(chars.len() as i64, 32)),
        );
        for (idx, c) in chars.iter().enumerate() {
            self.pending.axioms.push(
                SmtTerm::app(
                    STR_CHAR_AT,
                    vec![SmtTerm::var(name.clone()), SmtTerm::bv(idx as i64, 32)],
                )
                .eq(SmtTerm::bv(*c as i64, 16)),
            );
        }
        name
    }
}

fn numeric_literal(expr: &Expr) -> Option<i64> {
    match &expr.kind {
        ExprKind::Lit(Lit::Int(v)) => Some(*v),
        ExprKind::Lit(Lit::Long(v)) => Some(*v),
        ExprKind::Lit(Lit::Char(c)) => Some(*c as i64),
        ExprKind::Paren(inner) => numeric_literal(inner),
        _ => None,
    }
}

fn bit_width(ty: &Type) -> Option<u32> {
    match ty {
        Type::Integer(IntWidth::W8) => Some(8),
        Type::Integer(IntWidth::W16) | Type::Char => Some(16),
        Type::Integer(IntWidth::W32) => Some(32),
        Type::Integer(IntWidth::W64) => Some(64),
        _ => None,
    }
}
