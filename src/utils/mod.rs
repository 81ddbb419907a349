#[macro_use]
pub mod math;
pub mod samplers;
