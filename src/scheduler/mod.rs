pub mod arrow_layer;
pub mod events;
pub mod update_scheduler;
