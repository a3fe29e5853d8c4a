//! Notes backend: accounts, documents, todos and markup-to-PDF compilation.

pub mod application;
pub mod config;
pub mod domain;
pub mod infra;
