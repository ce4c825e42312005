pub mod annotation;
pub mod chart;
pub mod context;
pub mod dom_annotation;
pub mod frame;
pub mod highlighted_text;
pub mod multimedia;
