#[path = "school.rs"]
mod school_impl;
mod spells;

pub use school_impl::{school, school_name};
pub use spells::*;
