pub mod cli;
pub mod emansion;
pub mod links;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod reconcile;
pub mod sheets;
