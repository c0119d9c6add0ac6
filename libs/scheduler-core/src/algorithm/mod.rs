//! Scheduling algorithm implementation.
//!
//! FSRS is the only algorithm: scheduling state inherited from earlier
//! systems is never read back into the kernel.

pub mod fsrs;
pub mod fuzz;

pub use fsrs::Fsrs;
