//! Test module for little-router
//!
//! Unit tests for the value types and property-based tests (proptest) for
//! path resolution, plus async tests driving the scheduler and router over
//! an in-memory history.


#[cfg(test)]
pub mod error_tests;

#[cfg(test)]
pub mod location_tests;

#[cfg(test)]
pub mod href_tests;

#[cfg(test)]
pub mod navigation_tests;



#[cfg(test)]
pub mod router_tests;
