#![allow(dead_code)]

mod utilities;

pub use utilities::*;
