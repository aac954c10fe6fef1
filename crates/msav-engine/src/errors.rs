use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use msav_analysis::collector::CollectError;
use msav_analysis::predicates::ClassifyError;
use msav_analysis::store::StoreError;
use msav_ast::ast::Type;
use msav_ast::errors::ResolveError;
use msav_smt::encoder::EncodeError;
use msav_smt::filter::FilterError;

/// Failures while mutating one file.
///
/// All of these abort the file being processed; callers driving several files
/// catch them per file and move on.
#[derive(Debug, Error, Diagnostic)]
pub enum MutateError {
    #[error("cannot infect a value of type {ty} returned from '{method}'")]
    #[diagnostic(
        code(msav::mutate::unhandled_type),
        help("only boolean, char, integral, and floating-point returns can be infected")
    )]
    UnhandledType { ty: Type, method: String },

    #[error("returned expression in '{method}' has no source position")]
    #[diagnostic(code(msav::mutate::detached_target))]
    DetachedTarget { method: String },

    #[error("failed to read {path}")]
    #[diagnostic(code(msav::mutate::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse program model {path}")]
    #[diagnostic(code(msav::mutate::model))]
    Model {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    #[diagnostic(code(msav::mutate::collect))]
    Collect(#[from] CollectError),

    #[error(transparent)]
    #[diagnostic(code(msav::mutate::classify))]
    Classify(#[from] ClassifyError),

    #[error(transparent)]
    #[diagnostic(code(msav::mutate::store))]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(code(msav::mutate::encode))]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    #[diagnostic(code(msav::mutate::resolve))]
    Resolve(#[from] ResolveError),

    #[error("solver error: {0}")]
    #[diagnostic(code(msav::mutate::solver))]
    Solver(String),
}

// Flattened by hand: the solver error type is generic over the backend, and
// the engine only needs its message.
impl<E: std::error::Error> From<FilterError<E>> for MutateError {
    fn from(err: FilterError<E>) -> Self {
        match err {
            FilterError::Encode(e) => MutateError::Encode(e),
            FilterError::Solver(e) => MutateError::Solver(e.to_string()),
        }
    }
}
