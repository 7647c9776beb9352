pub mod auth;
pub mod cli;
pub mod config;
pub(crate) mod constants;
pub mod error;
pub mod handlers;
pub(crate) mod logging;
pub mod response;
pub mod rewriter;
pub mod server;
pub mod signer;

#[cfg(test)]
mod tests;
