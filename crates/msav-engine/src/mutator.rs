use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use msav_analysis::collector::{Collector, ExitKey};
use msav_analysis::mcs::{Mcs, McsMode};
use msav_analysis::predicates::collect_predicates;
use msav_analysis::store::Store;
use msav_ast::ast::{BinOp, Expr, IntWidth, Method, Type};
use msav_ast::resolve::{MapResolver, ProgramFile, TypeResolver};
use msav_smt::filter::filter_conditions;
use msav_smt::solver::SmtSolver;

use crate::errors::MutateError;
use crate::mutant::Mutant;
use crate::source::Source;

/// Drives the full pipeline over the methods of one program model.
///
/// Mutant ids run across the whole file, starting at 1. The first method
/// that cannot be processed aborts the file; callers with several files
/// isolate the failure there.
pub struct Mutator<'a, S: SmtSolver> {
    solver: &'a mut S,
    mode: McsMode,
    next_mid: u32,
}

impl<'a, S: SmtSolver> Mutator<'a, S> {
    pub fn new(solver: &'a mut S) -> Self {
        Self {
            solver,
            mode: McsMode::Plain,
            next_mid: 1,
        }
    }

    pub fn with_mode(mut self, mode: McsMode) -> Self {
        self.mode = mode;
        self
    }

    /// Mutate every method of the model, in declaration order.
    pub fn mutate(
        &mut self,
        source: &Source,
        model: &ProgramFile,
    ) -> Result<Vec<Mutant>, MutateError> {
        let mut mutants = Vec::new();
        for method in &model.program.methods {
            let found = self.mutate_method(source, model, method)?;
            debug!(method = %method.name, count = found.len(), "method mutated");
            mutants.extend(found);
        }
        Ok(mutants)
    }

    /// Mutate one method: one guarded mutant per satisfiable abstract-state
    /// condition at each value-returning exit.
    pub fn mutate_method(
        &mut self,
        source: &Source,
        model: &ProgramFile,
        method: &Method,
    ) -> Result<Vec<Mutant>, MutateError> {
        let resolver = MapResolver::for_method(model, method);
        let collected = Collector::new(&resolver, self.mode).collect(method)?;
        let mut mutants = Vec::new();

        for (key, exit) in collected.exits() {
            if !matches!(key, ExitKey::Return(_)) {
                continue;
            }
            let Some(target) = &exit.returned else {
                continue;
            };
            if target.span.is_synthetic() {
                return Err(MutateError::DetachedTarget {
                    method: method.name.clone(),
                });
            }

            // Partition the returned expression's variables into abstract
            // states and refine the path condition with every cell.
            let predicates = collect_predicates(target, &resolver)?;
            let store = Store::from_predicates(&predicates, &resolver)?;
            let cells = store.product_conditions();
            let mcs = if cells.is_empty() {
                exit.mcs.clone()
            } else {
                exit.mcs
                    .clone()
                    .refine(Mcs::predicates(cells, self.mode), self.mode)
            };

            let conditions = mcs.to_conditions();
            let surviving = filter_conditions(&conditions, &resolver, self.solver)?;
            if surviving.is_empty() {
                continue;
            }

            let ty = resolver.type_of(target)?;
            let infected =
                infecting_expression(target, &ty).ok_or_else(|| MutateError::UnhandledType {
                    ty: ty.clone(),
                    method: method.name.clone(),
                })?;

            for condition in surviving {
                let replacement = Expr::paren(Expr::conditional(
                    Expr::paren(condition.clone()),
                    infected.clone(),
                    Expr::paren(target.clone()),
                ));
                mutants.push(Mutant {
                    mid: self.next_mid,
                    filename: source.filename().to_string(),
                    span: target.span,
                    original: target.clone(),
                    replacement,
                    condition,
                });
                self.next_mid += 1;
            }
        }
        Ok(mutants)
    }
}

/// The type-directed infection of a returned value. `None` for strings and
/// reference types, which have no meaningful generic infection.
fn infecting_expression(target: &Expr, ty: &Type) -> Option<Expr> {
    let target = target.clone();
    match ty {
        Type::Boolean => Some(Expr::not(Expr::paren(target))),
        Type::Char => Some(Expr::bin(BinOp::Add, target, Expr::chr('a'))),
        Type::Integer(IntWidth::W64) => Some(Expr::bin(BinOp::Add, target, Expr::long(97))),
        Type::Integer(_) => Some(Expr::bin(BinOp::Add, target, Expr::int(97))),
        Type::Float(_) => Some(Expr::bin(BinOp::Add, target, Expr::float(11.0))),
        Type::Str | Type::Reference(_) => None,
    }
}

/// Mutate one in-memory source file against its program model.
pub fn mutate<S: SmtSolver>(
    source: &Source,
    model: &ProgramFile,
    solver: &mut S,
    mode: McsMode,
) -> Result<Vec<Mutant>, MutateError> {
    Mutator::new(solver).with_mode(mode).mutate(source, model)
}

/// Read a source file and its sidecar program model, then mutate it.
///
/// The model lives next to the source as `<file>.model.json`.
pub fn mutate_file<S: SmtSolver>(
    path: &Path,
    solver: &mut S,
    mode: McsMode,
) -> Result<(Source, Vec<Mutant>), MutateError> {
    let contents = fs::read_to_string(path).map_err(|source| MutateError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let model_path = sidecar_model_path(path);
    let model_text = fs::read_to_string(&model_path).map_err(|source| MutateError::Io {
        path: model_path.clone(),
        source,
    })?;
    let model: ProgramFile =
        serde_json::from_str(&model_text).map_err(|source| MutateError::Model {
            path: model_path,
            source,
        })?;

    let filename = path
        .file_name()
        .and_then(|name| name.to_str())
        .map(str::to_string)
        .unwrap_or_else(|| path.display().to_string());
    let source = Source::new(filename, contents);
    let mutants = mutate(&source, &model, solver, mode)?;
    Ok((source, mutants))
}

fn sidecar_model_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".model.json");
    PathBuf::from(name)
}
