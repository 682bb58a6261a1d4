//! Star-neighbour service for GitHub repositories
//!
//! Given a repository, finds every repository that shares at least one
//! stargazer with it, together with the shared stargazers per neighbour.

pub mod config;
pub mod server;
pub mod stars;
