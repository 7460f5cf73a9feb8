//! Scheduling, export and history for an interactive template editor.
//!
//! An [`engine::Engine`] sits between a drawing [`surface::Surface`] and the host application.
//! It decides when the surface renders, when layer facts and image exports are published, and
//! when the scene is checkpointed for undo. [`pipeline::apply_template`] personalizes a stored
//! template on top of that.

pub mod clock;
pub mod color;
pub mod config;
pub mod engine;
pub mod frame;
pub mod history;
pub mod host;
pub mod interaction;
pub mod layers;
pub mod pipeline;
pub mod registry;
pub mod scene;
pub mod selection;
pub mod snapshot;
pub mod surface;
