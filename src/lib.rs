pub mod app;
pub mod audio;
pub mod config;
pub mod display;
pub mod error;
pub mod input;
pub mod library;
pub mod model;
pub mod playlist;
pub mod session;
pub mod transport;
pub mod ui;
pub mod worker;
