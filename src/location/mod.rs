pub mod location_model;
