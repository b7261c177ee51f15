//! Terminal presentation.
//!
//! - [`renderer`]: the [`Renderer`](renderer::Renderer) seam the bus draws through.
//! - [`layout`]: frame composition from an [`AppContext`](crate::core::context::AppContext).
//! - [`lifecycle`]: raw mode and alternate screen setup/teardown.

pub mod layout;
pub mod lifecycle;
pub mod renderer;
