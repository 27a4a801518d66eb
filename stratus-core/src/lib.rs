//! Stratus Core
//!
//! Core library for managing cloud resources as values: desired state is
//! diffed against current state into a plan of effects, which an
//! interpreter applies through a provider.

pub mod differ;
pub mod effect;
pub mod interpreter;
pub mod plan;
pub mod provider;
pub mod resource;
pub mod schema;
pub mod waiter;
