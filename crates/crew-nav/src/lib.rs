//! `crew-nav` — navigation graph, pathfinder, and path smoother.
//!
//! # Pipeline
//!
//! 1. [`NavGraphBuilder::from_map`] samples nav nodes (labeled-zone centroids
//!    plus a corridor grid) and links every pair with unobstructed line of
//!    sight into a dense **visibility graph**.
//! 2. [`find_path`] runs A* over the static graph, inserting temporary start
//!    and end nodes connected to every static node they can see.
//! 3. [`smooth_path`] resamples the waypoint chain to chords of at most 20
//!    units for the steering controller.
//!
//! The graph is built once at load and never mutated; per-query state lives
//! on the stack of `find_path`.

pub mod astar;
pub mod graph;
pub mod smooth;

mod error;


pub use astar::find_path;
pub use error::NavError;
pub use graph::{NavGraph, NavGraphBuilder};
pub use smooth::{smooth_path, MAX_CHORD};
