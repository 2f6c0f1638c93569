pub mod common;
pub mod config;
pub mod detox;
pub mod energy;
pub mod playlist;
pub mod session;
pub mod slots;
pub mod triage;
pub mod validate;
