pub mod probe;
pub mod sign;
pub mod types;
