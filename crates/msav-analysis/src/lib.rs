//! Mutation-condition analysis: predicate classification, per-variable
//! abstract domains, and the algebraic path-condition collector.
//!
//! The layers here are purely syntactic/algebraic; satisfiability checking
//! lives in `msav-smt`.

pub mod collector;
pub mod intervals;
pub mod mcs;
pub mod predicates;
pub mod product;
pub mod simplify;
pub mod store;
