pub mod api;
pub mod config;
pub mod controller;
pub mod data_models;
pub mod error;
pub mod gate;
pub mod session;
pub mod storage;
pub mod synthesizer;
