//! Core relay building blocks.

pub mod upstream;
