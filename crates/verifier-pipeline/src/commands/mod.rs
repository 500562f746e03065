pub mod cli;
pub mod command;
