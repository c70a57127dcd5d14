//! Context assembly for the prompt.

pub mod assembler;

pub use assembler::{AssemblyInput, ContextAssembler, ContextBundle};
