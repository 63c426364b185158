pub mod cli;
pub mod codec;
pub mod config;
pub mod editor;
pub mod error;
pub mod logging;
pub mod settings;
pub mod storage;
