//! Weak-mutation engine.
//!
//! Ties the analysis layers together: for every value-returning exit of every
//! method, collect the path conditions, partition the returned expression's
//! variables into abstract states, keep the satisfiable conditions, and emit
//! one guarded mutant per survivor. A mutant replaces the returned expression
//! `e` with `((c) ? infected : (e))`, so the mutant misbehaves exactly when
//! the abstract state `c` is reached.

pub mod errors;
pub mod mutant;
pub mod mutator;
pub mod source;

pub use errors::MutateError;
pub use mutant::Mutant;
pub use mutator::{mutate, mutate_file, Mutator};
pub use source::Source;
