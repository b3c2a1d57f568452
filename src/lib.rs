//! Horizon alignment engine.
//!
//! For a landmark and a vantage point, works out where along the ground an
//! observer has to stand to see the Sun, Moon or a star sit exactly on the
//! landmark, minute by minute, and when each body rises and sets.

pub mod almanac;
pub mod cli;
pub mod engine;
pub mod ephemeris;
pub mod geo;
pub mod geodesic;
pub mod inverter;
pub mod output;
pub mod profile;
pub mod riseset;
pub mod sampler;
pub mod segment;
pub mod time;
