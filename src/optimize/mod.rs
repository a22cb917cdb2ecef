//! IR cleanup after checking
//!
//! Two passes run on a finished [`CheckedProgram`]:
//! 1. [`remove_dead_code`] drops unused registers and the side-effect free
//!    instructions writing them
//! 2. [`remove_unused_functions`] drops functions that cannot be reached
//!    from the entry function and renumbers the rest

mod dead_code;
mod unused_functions;

pub use dead_code::remove_dead_code;
pub use unused_functions::remove_unused_functions;

use crate::program::CheckedProgram;

/// Runs every pass in order
pub fn optimize(program: &mut CheckedProgram) {
    let _span = tracing::debug_span!("optimize").entered();
    remove_dead_code(program);
    remove_unused_functions(program);
    tracing::debug!(functions = program.functions.len(), "optimized program");
}
