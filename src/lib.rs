//! mediashell - one control surface for heterogeneous media backends.
//!
//! A [`player::Player`] owns playback state, forwards uniform commands
//! (play, pause, seek, volume, fullscreen) to a backend
//! [`providers::Provider`] and keeps its control bar in sync. The
//! [`shell::Shell`] builds players on document elements and wires keyboard,
//! mouse and fullscreen listeners. The document itself is the headless model
//! in [`dom`].
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use mediashell::{
//!     config::Config,
//!     dom::{Document, Element},
//!     providers::ProviderRegistry,
//!     shell::{Shell, ShellOptions},
//! };
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let document = Document::new();
//! document
//!     .body()
//!     .append_child(&Element::new("video").with_attribute("id", "clip"));
//!
//! let shell = Shell::new(
//!     &document,
//!     "#clip",
//!     ShellOptions::default(),
//!     &ProviderRegistry::with_defaults(),
//!     &Config::default(),
//! )?;
//! shell.player().wait_until_ready().await;
//! shell.player().play()?;
//! # Ok(())
//! # }
//! ```

#![cfg_attr(test, allow(clippy::unwrap_used))]

/// Shared utilities and the reactive property type.
pub mod common;

/// Configuration schema definitions and validation.
pub mod config;

/// Headless document model.
pub mod dom;

/// Configuration error types and result aliases.
pub mod error;

/// Player core, options, events and control bar.
pub mod player;

/// Backend adapters.
pub mod providers;

/// Host shell wiring players into a document.
pub mod shell;

/// Logging setup.
pub mod tracing_config;

pub use error::{MediaShellError, Result};
