//! API handlers
//!
//! Author: hephaex@gmail.com

pub mod contact;
pub mod health;
pub mod query;
