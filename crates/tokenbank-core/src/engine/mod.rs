//! Plumbing shared by the controller and the deposit handlers.

pub mod contracts;
pub mod event_bus;
