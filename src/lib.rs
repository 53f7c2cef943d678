// src/lib.rs

//! Patronage: supporter cache for membership platforms

pub mod error;
pub mod models;
pub mod pipeline;
pub mod services;
pub mod storage;
pub mod utils;
