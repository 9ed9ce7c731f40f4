pub mod api;
pub mod config;
pub mod conversion;
pub mod error;
pub mod humanize;
pub mod models;
pub mod pool;
pub mod processor;
pub mod repository;
pub mod storage;
