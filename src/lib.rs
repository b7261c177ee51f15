//! Parley is a full-screen terminal chat client.
//!
//! The crate is organized around a single-writer dispatch core:
//! - [`bus`] owns the ingestion queue, the handler registry, and the
//!   single-threaded dispatch loop that is the only code allowed to mutate
//!   [`core::context::AppContext`].
//! - [`producers`] turn terminal input, chat-service notifications, and timer
//!   ticks into [`core::event::Event`]s and push them into the bus.
//! - [`handlers`] hold the default behavior bound to each event kind.
//! - [`service`] defines the narrow boundary to the chat service together with
//!   the loopback and replay transports.
//! - [`ui`] renders the view model after handlers request a redraw and owns
//!   the terminal lifecycle.
//!
//! The binary (`src/main.rs`) routes through [`cli::main`], which loads the
//! configuration, connects the service, and runs the bus.

pub mod bus;
pub mod cli;
pub mod core;
pub mod handlers;
pub mod logging;
pub mod producers;
pub mod service;
pub mod ui;
