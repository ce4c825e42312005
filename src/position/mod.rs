pub mod arrow;
pub mod resolver;
