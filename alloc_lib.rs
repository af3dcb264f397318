extern crate self as yield_alloc_engine;

pub mod allocation;
pub mod batch;
pub mod descent;
pub mod model;

#[cfg(test)]
#[path = "tests.rs"]
mod tests;
