//! Route handlers organized by resource

pub mod feedback;
pub mod flags;
pub mod health;
pub mod visits;
