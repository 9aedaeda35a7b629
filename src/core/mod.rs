//! View model and its input cells

pub mod builder;
pub mod config;
pub mod constants;
pub mod view_model;
pub mod viewport;
pub mod zoom;
