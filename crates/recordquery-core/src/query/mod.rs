pub mod aggregate;
pub mod filter;
pub mod pipeline;
pub mod sort;
