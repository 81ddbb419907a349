//! Streaming particle filter for indoor localization from proximity beacons
//! and pedestrian dead reckoning.
#![cfg_attr(not(test), no_std)]
extern crate alloc;

pub mod error;
pub mod logger;
pub mod motion_models;
pub mod particle_filter;
pub mod sensors;
pub mod state;

#[macro_use]
pub mod utils;

pub use error::FilterError;
pub use particle_filter::StreamParticleFilter;
