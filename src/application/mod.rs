//! Application services layer.

pub mod accounts;
pub mod compile;
pub mod documents;
pub mod error;
pub mod repos;
pub mod storage;
pub mod todos;
