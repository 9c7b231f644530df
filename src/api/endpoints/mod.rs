//! API endpoint handlers, one module per resource.

pub mod appointments;
pub mod dashboard;
pub mod health;
pub mod patients;
pub mod prediction;
pub mod users;
