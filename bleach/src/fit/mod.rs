//! Nonlinear least-squares curve fitting.

mod linear_solver;
mod lm_optimizer;

pub use lm_optimizer::{optimize, LMConfig, LMModel, LMResult, Termination};
