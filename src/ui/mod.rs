// src/ui/mod.rs
pub mod collector;
pub mod prompt;
mod report;

pub use prompt::Prompter;
pub use report::{render_report, IssuanceReport};
