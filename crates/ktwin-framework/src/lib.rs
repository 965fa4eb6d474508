//! # KTWIN Framework
//!
//! Dispatch of twin events and commands to domain handlers.
//!
//! ## Components
//!
//! - **Handlers**: [`EventHandler`] and [`CommandHandler`], implemented by
//!   async functions and closures
//! - **Event dispatch**: [`dispatch_event`] filters on the twin interface
//! - **Command dispatch**: [`handle_command`] filters on interface and
//!   command name and routes through the twin graph; [`publish_command`]
//!   addresses a related twin
//! - **Graph cache**: [`GraphCache`] loads the graph once and reloads on
//!   request
//! - **Context**: [`ServiceContext`] bundles the codec, the graph and the
//!   gateways
//! - **Routes**: [`Dispatcher`] runs an envelope through every registered
//!   route
//!
//! ## Example
//!
//! ```rust,ignore
//! use ktwin_framework::prelude::*;
//!
//! let dispatcher = Dispatcher::new()
//!     .on_event("ngsi-ld-city-offstreetparkingspot", on_spot)
//!     .on_command("ngsi-ld-city-offstreetparking", "updateVehicleCount", on_update);
//!
//! let handled = dispatcher.dispatch(&ctx, &envelope).await?;
//! ```

pub mod command;
pub mod context;
pub mod dispatcher;
pub mod event;
pub mod graph_cache;
pub mod handler;

pub use command::{handle_command, publish_command, publish_event, route_target};
pub use context::ServiceContext;
pub use dispatcher::Dispatcher;
pub use event::dispatch_event;
pub use graph_cache::GraphCache;
pub use handler::{BoxedCommandHandler, BoxedEventHandler, CommandHandler, EventHandler};

/// Prelude for common imports.
pub mod prelude {
    pub use super::command::{handle_command, publish_command};
    pub use super::context::ServiceContext;
    pub use super::dispatcher::Dispatcher;
    pub use super::event::dispatch_event;
    pub use super::handler::{CommandHandler, EventHandler};
    pub use ktwin_core::prelude::*;
}
