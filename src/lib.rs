//! fieldmodel - field default, optionality and alias resolution for validated data models

pub mod cli;
pub mod model;
pub mod observability;
