//! Satisfiability filtering for abstract-state conditions.
//!
//! Conditions are encoded over fixed-width signed bit-vectors (matching the
//! source language's integer semantics), strings and opaque objects become
//! uninterpreted sorts, and method calls become uninterpreted functions. A
//! pluggable [`solver::SmtSolver`] backend decides each condition with a
//! push/assert/check/pop probe; unsatisfiable conditions are discarded before
//! any mutant is generated from them.

pub mod backends;
pub mod encoder;
pub mod filter;
pub mod solver;
pub mod sorts;
pub mod terms;
