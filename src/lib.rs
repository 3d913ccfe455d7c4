//! Simplification engine for Boolean circuits in the BENCH and AIG bases.
//!
//! A circuit is parsed into an immutable gate DAG, pushed through a pipeline
//! of rewriting passes (redundancy removal, duplicate merging, constant
//! folding, double-negation collapse) and finally through a three-input
//! subcircuit minimizer that looks small sub-DAGs up in a database of
//! optimal realizations.

pub mod assignment;
pub mod circuit;
pub mod dfs;
pub mod encoder;
pub mod gate;
pub mod op;
pub mod runner;
pub mod simplify;
