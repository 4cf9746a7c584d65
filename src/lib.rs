pub mod compile;
pub mod datastructures;
pub mod infra;
