// ABOUTME: ProposeKit CLI library
// ABOUTME: Builds the engine from settings and loads JSON input files for the binary

pub mod context;
pub mod input;

pub use context::AppContext;

#[cfg(test)]
mod tests;
