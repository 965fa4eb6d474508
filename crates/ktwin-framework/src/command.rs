//! Command routing and publication.
//!
//! A command travels as `ktwin.command.<interface>.<command>` with the
//! addressed instance as its source. A service accepts it when all of the
//! following hold:
//!
//! 1. the envelope is a command,
//! 2. its interface equals the expected interface,
//! 3. its command name equals the expected one, ignoring ASCII case,
//! 4. the relationship found by [`resolve_by_target_interface`] points at the
//!    envelope's instance.

use serde::Serialize;
use tracing::{debug, info};

use ktwin_core::{
    Broker, Envelope, EnvelopeCodec, EnvelopeKind, KtwinError, KtwinResult, TwinGraph,
    TwinInstanceRef, resolve_by_name, resolve_by_target_interface,
};

use crate::handler::CommandHandler;

/// Returns `true` if the envelope is the expected command.
///
/// This checks kind, interface and command name only; the graph is not
/// consulted.
pub fn accepts(envelope: &Envelope, expected_interface: &str, expected_command: &str) -> bool {
    envelope.interface() == expected_interface
        && envelope
            .command_name()
            .is_some_and(|name| name.eq_ignore_ascii_case(expected_command))
}

/// Finds the relationship a command is routed through.
///
/// Fails with [`KtwinError::NotACommand`] for other kinds and with
/// [`KtwinError::NoRouteFound`] if no relationship in the graph points at the
/// command's interface.
pub fn route_target<'g>(envelope: &Envelope, graph: &'g TwinGraph) -> KtwinResult<&'g TwinInstanceRef> {
    envelope.require_command()?;

    resolve_by_target_interface(envelope.interface(), graph).ok_or_else(|| {
        KtwinError::NoRouteFound {
            instance: envelope.instance_id().to_string(),
            interface: envelope.interface().to_string(),
        }
    })
}

/// Runs `handler` if the envelope is a command this service should execute.
///
/// Returns `Ok(false)` without touching the graph when the kind, interface
/// or command name does not match, and `Ok(false)` when the command is routed
/// to another instance.
pub async fn handle_command<H>(
    envelope: &Envelope,
    expected_interface: &str,
    expected_command: &str,
    graph: &TwinGraph,
    handler: &H,
) -> KtwinResult<bool>
where
    H: CommandHandler + ?Sized,
{
    if !accepts(envelope, expected_interface, expected_command) {
        return Ok(false);
    }

    let target = route_target(envelope, graph)?;
    if target.instance_id != envelope.instance_id() {
        debug!(
            instance = %envelope.instance_id(),
            routed_to = %target.instance_id,
            "Command routed to another instance"
        );
        return Ok(false);
    }

    handler.call(envelope.clone(), target.clone()).await?;
    Ok(true)
}

/// Sends a command to the twin related to `source_instance` by
/// `relationship_name`.
///
/// The command name is lower-cased on the wire and the message source is the
/// target instance. Nothing is published when the relationship is missing.
pub async fn publish_command<T: Serialize>(
    codec: &EnvelopeCodec,
    broker: &dyn Broker,
    command_name: &str,
    payload: &T,
    relationship_name: &str,
    source_instance: &str,
    graph: &TwinGraph,
) -> KtwinResult<()> {
    let target = resolve_by_name(source_instance, relationship_name, graph).ok_or_else(|| {
        KtwinError::RelationshipNotFound {
            relationship: relationship_name.to_string(),
            instance: source_instance.to_string(),
        }
    })?;

    let kind = EnvelopeKind::command(command_name.to_lowercase());
    let msg = codec.encode(&target.interface_name, &target.instance_id, kind, payload)?;

    info!(
        event_type = %msg.event_type,
        from = %source_instance,
        to = %target.instance_id,
        "Publishing command"
    );
    broker.publish(msg).await
}

/// Publishes an observation or derived event for a twin.
pub async fn publish_event<T: Serialize>(
    codec: &EnvelopeCodec,
    broker: &dyn Broker,
    interface_name: &str,
    instance_id: &str,
    kind: EnvelopeKind,
    payload: &T,
) -> KtwinResult<()> {
    let msg = codec.encode(interface_name, instance_id, kind, payload)?;
    debug!(event_type = %msg.event_type, source = %instance_id, "Publishing event");
    broker.publish(msg).await
}
