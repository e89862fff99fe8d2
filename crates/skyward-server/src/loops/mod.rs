//! Background loops for continuous processing.

pub mod control_loop;
