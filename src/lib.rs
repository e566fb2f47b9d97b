pub mod error_handling;
pub mod grammar;
pub mod history;
pub mod parser;
pub mod render;
pub mod rewriter;
