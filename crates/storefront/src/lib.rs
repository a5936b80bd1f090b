//! Larek Storefront library.
//!
//! A single-page storefront: product catalog, basket and a two-step
//! checkout against the Larek commerce API. Models, views and the API client
//! talk only through the [`events::EventBus`]; the [`presenter::Storefront`]
//! wires them together.
//!
//! # Modules
//!
//! - [`events`] - Typed publish/subscribe bus
//! - [`models`] - Catalog, cart and checkout draft state
//! - [`api`] - Commerce API trait and its HTTP client
//! - [`views`] - askama-rendered fragments and user intents
//! - [`presenter`] - Event wiring and order submission
//! - [`host`] - Line-oriented driver used by the binary

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod error;
pub mod events;
pub mod host;
pub mod models;
pub mod presenter;
pub mod views;

pub use presenter::{Screen, Storefront, SubmitOutcome};
