pub mod config;
pub mod leccap;

pub use config::Config;
pub use leccap::{LeccapClient, LeccapError, Outcome, Summary};
