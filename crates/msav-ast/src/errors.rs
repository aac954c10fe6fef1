use thiserror::Error;

/// Failures from the externally supplied type/method resolution capability.
///
/// The pipeline treats these as fatal for the method being processed; the
/// engine isolates them at file granularity.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("unknown variable '{0}'")]
    UnknownVariable(String),

    #[error("unknown method '{0}'")]
    UnknownMethod(String),

    #[error("expected a call expression")]
    NotACall,

    /// Null literals and assignments have no intrinsic type; their type comes
    /// from the surrounding context, which the caller must supply.
    #[error("expression has no intrinsic type")]
    Untypable,
}
