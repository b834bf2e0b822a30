//! Distributed room coordinator for a multiplayer drawing-and-guessing game.
//!
//! Several coordinator nodes share room state through a [`domain::SharedStore`]
//! and talk to each other over a [`domain::MessageBus`]. The right to draw in a
//! room is granted by a Ricart–Agrawala mutual-exclusion protocol so concurrent
//! requests on different nodes never produce two drawers.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;

pub mod config;
