pub mod assertions;
pub mod cancel;
pub mod context;
pub mod interactive;
pub mod loader;
pub mod runner;
pub mod spec_model;
