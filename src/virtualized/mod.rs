pub mod flattened_tree;
pub mod tree;
