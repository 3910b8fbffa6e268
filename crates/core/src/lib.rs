pub mod broadcast;
pub mod classify;
pub mod config;
pub mod context;
pub mod io;
pub mod persona;
pub mod relay;
pub mod runtime;
pub mod types;
