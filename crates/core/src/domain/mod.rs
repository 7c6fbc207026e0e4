pub mod appointment;
pub mod criterion;
pub mod deletion;
