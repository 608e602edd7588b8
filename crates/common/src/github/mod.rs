mod client;
pub mod models;

pub use client::{GithubClient, RemoteError, DEFAULT_API_BASE};
