pub mod dom_model;
pub mod selector;
pub mod snapshot;
