//! Small shared utilities used across the zapgate crates.

pub mod text;
