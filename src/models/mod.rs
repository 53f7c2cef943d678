// src/models/mod.rs

//! Domain models for the supporter cache.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod item;
mod supporter;

// Re-export all public types
pub use config::{
    Config, DigestAlgorithm, HttpConfig, LoggingConfig, Platform, SourceConfig, TierConfig,
    ENV_ACCESS_TOKEN, ENV_CAMPAIGN_ID, ENV_CLIENT_ID, ENV_WEBHOOK_SECRET,
};
pub use item::{ItemKind, Linkage, Page, PageLinks, RawItem, Relationship, ResourceRef, WebhookPayload};
pub use supporter::{Contribution, RewardDefinition, Supporter, SupporterView};
