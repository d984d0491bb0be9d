//! Shared types used across the lottery core and its environment

pub mod types;
