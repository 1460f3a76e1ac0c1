//! Drivewatch Core - Domain model and business rules
//!
//! This crate contains the hexagonal architecture core with:
//! - Domain entities (ItemRecord, ChangeEvent, Subscription, DriveCursor)
//! - Port definitions (traits for adapters)
//! - The credential gate that enables/disables all downstream processing
//! - Typed configuration with validation

pub mod config;
pub mod domain;
pub mod gate;
pub mod ports;
