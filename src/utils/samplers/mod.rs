pub mod random_generator;

pub use random_generator::RandomGenerator;
