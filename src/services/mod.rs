//! Process-level services used by the binary

pub mod tracing_setup;
