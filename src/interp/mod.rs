//! Interpreter for the register IR
//!
//! Executes checked functions for compile-time evaluation and for `lpgc run`.

pub mod eval;
pub mod value;

pub use eval::{Counters, Flow, InterpretError, Interpreter, Limits, RunSequenceResult};
pub use value::{FunctionPointerValue, Value};
