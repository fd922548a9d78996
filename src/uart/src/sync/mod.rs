//! Synchronization primitives for the receive path.
//!
//! The interrupt handler and the reading task meet in two places: the
//! ring buffer cursors (see [`crate::fifo`]) and the wake-up semaphore
//! defined here.
//!
//! # Primitives
//!
//! - [`Semaphore`]: counting semaphore with a bounded, tick-based wait

mod semaphore;

pub use semaphore::{Semaphore, WAIT_FOREVER};
