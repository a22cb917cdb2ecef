//! lpg: type checker, compile-time interpreter and IR optimizer
//!
//! A small expression language with integer range types, enumerations with
//! payloads, structures, interfaces, generics and closures.
//!
//! # Architecture
//!
//! ```text
//! Source → Lexer → Parser → Sequence → Checker ⇄ Interpreter → CheckedProgram → Optimizer
//! ```
//!
//! The checker lowers the syntax tree into a register IR and folds every
//! expression it can by running already checked code in the interpreter.
//! Generic instantiation and module imports happen at compile time the
//! same way.
//!
//! # Example
//!
//! ```text
//! let std = import std
//! let f = (a: int(0, 10)) a + 1
//! let result = f(2)
//! assert(integer_equals(result, 3))
//! ```

pub mod ast;
pub mod check;
pub mod common;
pub mod config;
pub mod diagnostics;
pub mod interp;
pub mod ir;
pub mod lexer;
pub mod modules;
pub mod optimize;
pub mod parser;
pub mod program;
pub mod stdlib;
pub mod types;

pub use check::check;
pub use config::CheckConfig;
pub use diagnostics::{CompileError, Reporter, SourceFile};
pub use modules::ModuleLoader;
pub use program::CheckedProgram;
pub use types::Type;
