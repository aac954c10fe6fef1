//! Program-model tree for the weak-mutation pipeline.
//!
//! The engine does not parse source text. An external collaborator supplies a
//! type-annotated expression/statement tree plus method signatures; this crate
//! defines that tree, the resolved-type vocabulary, precedence-aware printing
//! back to source form, and the resolver capability the analysis layers
//! depend on.

pub mod ast;
pub mod errors;
pub mod resolve;
