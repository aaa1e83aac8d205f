pub mod cli;
pub mod commands;
pub mod demo;
pub mod sample;
pub mod source;
