//! # KTWIN
//!
//! Shared core of the KTWIN smart-city digital twin services.
//!
//! ## Overview
//!
//! A twin service receives CloudEvents for twin instances (parking spots,
//! air quality stations, streetlights, ...), runs domain handlers on them and
//! reacts by storing twin state or sending commands to related twins.
//!
//! ```text
//! ┌─────────────┐     ┌────────────┐     ┌──────────────────────────┐
//! │ TwinRuntime │────▶│ Dispatcher │────▶│ event handler            │──▶ broker
//! │ (HTTP in)   │     │  (routes)  │────▶│ command handler (target) │──▶ event store
//! └─────────────┘     └────────────┘     └──────────────────────────┘
//!                           │
//!                           ▼
//!                      twin graph (relationships)
//! ```
//!
//! - **Envelope**: a decoded event with its kind, interface and instance id
//! - **Twin graph**: twin instances and their named relationships
//! - **Handlers**: async functions run for matching events or commands
//! - **Collaborators**: graph service, event store and broker, over HTTP or
//!   in memory
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ktwin::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::new().load()?;
//!     let runtime = TwinRuntime::from_config(config, |ctx| {
//!         let ctx = ctx.clone();
//!         Dispatcher::new().on_event("ngsi-ld-city-parkingspot", move |event: Envelope| {
//!             let ctx = ctx.clone();
//!             async move {
//!                 ctx.publish_command("updateVehicleCount", &payload, "refOffStreetParking", event.instance_id())
//!                     .await
//!             }
//!         })
//!     })?;
//!     runtime.run().await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - `toml-config` *(default)*: TOML configuration files
//! - `yaml-config`: YAML configuration files
//! - `json-log`: JSON log output

pub use ktwin_core as core;
pub use ktwin_framework as framework;
pub use ktwin_runtime as runtime;
pub use ktwin_transport as transport;

/// Prelude module for convenient imports.
///
/// ```rust,ignore
/// use ktwin::prelude::*;
/// ```
pub mod prelude {
    // Runtime - main entry point
    pub use ktwin_runtime::{
        ConfigLoader, KtwinConfig, Mode, RuntimeError, RuntimeResult, TwinRuntime,
    };

    // Framework - routes and handler context
    pub use ktwin_framework::prelude::*;
    pub use ktwin_framework::{GraphCache, publish_event, route_target};

    // Core - envelopes, graph and errors
    pub use ktwin_core::{
        EventType, TwinGraphNode, resolve_by_name, resolve_by_target_interface,
    };

    // Logging macros
    pub use ktwin_runtime::prelude::*;
}
