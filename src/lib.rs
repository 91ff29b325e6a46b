pub mod assembler;
pub mod cli;
pub mod client;
pub mod history;
pub mod models;
pub mod server;
pub mod session;
