//! Interface-filtered event dispatch.

use tracing::trace;

use ktwin_core::{Envelope, KtwinResult};

use crate::handler::EventHandler;

/// Runs `handler` if the envelope belongs to `expected_interface`.
///
/// Returns `Ok(true)` when the handler ran and `Ok(false)` when the envelope
/// was skipped. Calls can be chained for several interfaces; at most the
/// matching one runs. Handler errors are returned unchanged.
pub async fn dispatch_event<H>(
    envelope: &Envelope,
    expected_interface: &str,
    handler: &H,
) -> KtwinResult<bool>
where
    H: EventHandler + ?Sized,
{
    if envelope.interface() != expected_interface {
        trace!(
            interface = %envelope.interface(),
            expected = %expected_interface,
            "Skipping event for another interface"
        );
        return Ok(false);
    }

    handler.call(envelope.clone()).await?;
    Ok(true)
}
