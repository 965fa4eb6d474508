//! Parking handlers.
//!
//! ```text
//! parking spot ──(occupied/free)──► updateVehicleCount ──► off-street parking
//!   observation      via refOffStreetParking      command      occupancy stored
//! ```

use tracing::{info, warn};

use ktwin::core::{Envelope, EnvelopeKind, KtwinResult, TwinInstanceRef};
use ktwin::framework::{Dispatcher, ServiceContext};
use ktwin::runtime::KtwinConfig;

use crate::model::{
    OFF_STREET_SPOT_INTERFACE, OffStreetParking, PARKING_INTERFACE, PARKING_RELATIONSHIP,
    PARKING_SPOT_INTERFACE, ParkingSpot, SpotStatus, UPDATE_VEHICLE_COUNT,
    UpdateVehicleCountCommand,
};

/// Defaults of this service, below files and environment variables.
pub fn defaults() -> KtwinConfig {
    let mut config = KtwinConfig::default();
    config.service.name = "parking-service".to_string();
    config.service.seed_instances = vec![
        PARKING_INTERFACE.to_string(),
        PARKING_SPOT_INTERFACE.to_string(),
    ];
    config
}

/// Routes of this service.
pub fn routes(ctx: &ServiceContext) -> Dispatcher {
    let on_update = {
        let ctx = ctx.clone();
        move |command: Envelope, target: TwinInstanceRef| {
            update_vehicle_count(ctx.clone(), command, target)
        }
    };
    let on_spot = {
        let ctx = ctx.clone();
        move |event: Envelope| parking_spot_changed(ctx.clone(), event)
    };

    Dispatcher::new()
        .on_command(PARKING_INTERFACE, UPDATE_VEHICLE_COUNT, on_update)
        .on_event(PARKING_SPOT_INTERFACE, on_spot.clone())
        .on_event(OFF_STREET_SPOT_INTERFACE, on_spot)
}

/// Applies an `updateVehicleCount` command to the parking it targets.
pub async fn update_vehicle_count(
    ctx: ServiceContext,
    command: Envelope,
    target: TwinInstanceRef,
) -> KtwinResult<()> {
    let counts: UpdateVehicleCountCommand = command.decode_payload()?;
    if counts.is_empty() {
        info!(
            instance = %target.instance_id,
            "Vehicle entrance and exit count are 0, no need to update the twin"
        );
        return Ok(());
    }

    let Some(mut latest) = ctx
        .latest(command.interface(), command.instance_id())
        .await?
    else {
        let mut parking = OffStreetParking::default();
        if counts.vehicle_entrance_count != 0 {
            parking.vehicle_entered();
        } else {
            parking.vehicle_left();
        }

        let state = ctx.codec().build(
            command.interface(),
            command.instance_id(),
            EnvelopeKind::Observation,
            &parking,
        )?;
        return ctx.persist(&state).await;
    };

    let mut parking: OffStreetParking = latest.decode_payload()?;
    if counts.vehicle_entrance_count != 0 {
        parking.vehicle_entered();
    }
    if counts.vehicle_exit_count != 0 {
        parking.vehicle_left();
    }

    info!(
        instance = %command.instance_id(),
        occupied = parking.occupied_spot_number,
        total = parking.total_spot_number,
        "Parking occupancy updated"
    );
    latest.set_payload(&parking)?;
    ctx.persist(&latest).await
}

/// Tells the parking of a spot that a vehicle entered or left.
pub async fn parking_spot_changed(ctx: ServiceContext, event: Envelope) -> KtwinResult<()> {
    let spot: ParkingSpot = event.decode_payload()?;

    let counts = match spot.status {
        Some(SpotStatus::Occupied) => UpdateVehicleCountCommand::entrance(),
        Some(SpotStatus::Free) => UpdateVehicleCountCommand::exit(),
        Some(status) => {
            info!(instance = %event.instance_id(), ?status, "Parking spot status is not recognized");
            return Ok(());
        }
        None => {
            warn!(instance = %event.instance_id(), "Parking spot status is empty");
            return Ok(());
        }
    };

    ctx.publish_command(
        UPDATE_VEHICLE_COUNT,
        &counts,
        PARKING_RELATIONSHIP,
        event.instance_id(),
    )
    .await
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::{Value, json};

    use ktwin::core::{EnvelopeCodec, GraphLoader, KtwinError, TwinGraph, TwinGraphNode};
    use ktwin::framework::GraphCache;
    use ktwin::transport::{LoopbackBroker, MemoryEventStore, StaticGraphSource};

    use super::*;

    const SPOT: &str = "ngsi-ld-city-offstreetparkingspot-nb001-p00007";
    const PARKING: &str = "ngsi-ld-city-offstreetparking-nb001-ofp0005";

    struct Fixture {
        ctx: ServiceContext,
        store: Arc<MemoryEventStore>,
        broker: Arc<LoopbackBroker>,
    }

    fn fixture() -> Fixture {
        let graph = TwinGraph::new()
            .with_node(
                TwinGraphNode::new(SPOT, OFF_STREET_SPOT_INTERFACE).with_relationship(
                    TwinInstanceRef::new(PARKING_RELATIONSHIP, PARKING_INTERFACE, PARKING),
                ),
            )
            .with_node(TwinGraphNode::new(PARKING, PARKING_INTERFACE));

        let store = Arc::new(MemoryEventStore::new());
        let broker = Arc::new(LoopbackBroker::new());
        let ctx = ServiceContext::new(
            EnvelopeCodec::default(),
            GraphCache::new(GraphLoader::new(
                Arc::new(StaticGraphSource::new(graph)),
                [PARKING_INTERFACE],
            )),
            store.clone(),
            broker.clone(),
        );

        Fixture { ctx, store, broker }
    }

    fn command(ctx: &ServiceContext, payload: Value) -> Envelope {
        ctx.codec()
            .build(
                PARKING_INTERFACE,
                PARKING,
                EnvelopeKind::command("updatevehiclecount"),
                &payload,
            )
            .unwrap()
    }

    async fn stored_parking(ctx: &ServiceContext) -> OffStreetParking {
        ctx.latest(PARKING_INTERFACE, PARKING)
            .await
            .unwrap()
            .unwrap()
            .decode_payload()
            .unwrap()
    }

    #[tokio::test]
    async fn test_zero_counts_do_not_store() {
        let f = fixture();
        let routes = routes(&f.ctx);

        let handled = routes
            .dispatch(&f.ctx, &command(&f.ctx, json!({"vehicleEntranceCount": 0})))
            .await
            .unwrap();

        assert_eq!(handled, 1);
        assert!(f.store.is_empty());
    }

    #[tokio::test]
    async fn test_first_entrance_starts_from_empty_parking() {
        let f = fixture();
        let routes = routes(&f.ctx);

        routes
            .dispatch(&f.ctx, &command(&f.ctx, json!({"vehicleEntranceCount": 1})))
            .await
            .unwrap();

        let parking = stored_parking(&f.ctx).await;
        assert_eq!(parking.total_spot_number, 50);
        assert_eq!(parking.occupied_spot_number, 1);
        assert_eq!(parking.available_spot_number, 49);
    }

    #[tokio::test]
    async fn test_exit_updates_latest_state() {
        let f = fixture();
        let previous = f
            .ctx
            .codec()
            .build(
                PARKING_INTERFACE,
                PARKING,
                EnvelopeKind::Observation,
                &json!({"totalSpotNumber": 20, "occupiedSpotNumber": 10, "name": "Central"}),
            )
            .unwrap();
        f.ctx.persist(&previous).await.unwrap();

        routes(&f.ctx)
            .dispatch(&f.ctx, &command(&f.ctx, json!({"vehicleExitCount": 1})))
            .await
            .unwrap();

        let parking = stored_parking(&f.ctx).await;
        assert_eq!(parking.occupied_spot_number, 9);
        assert_eq!(parking.total_spot_number, 20);
        assert_eq!(parking.occupancy, 0.45);
        assert_eq!(parking.attributes["name"], "Central");
    }

    #[tokio::test]
    async fn test_occupied_spot_sends_entrance_to_parking() {
        let f = fixture();
        let event = f
            .ctx
            .codec()
            .build(
                OFF_STREET_SPOT_INTERFACE,
                SPOT,
                EnvelopeKind::Observation,
                &json!({"status": "occupied", "category": "offStreet"}),
            )
            .unwrap();

        assert_eq!(routes(&f.ctx).dispatch(&f.ctx, &event).await.unwrap(), 1);

        let published = f.broker.published();
        assert_eq!(published.len(), 1);
        assert_eq!(
            published[0].event_type,
            "ktwin.command.ngsi-ld-city-offstreetparking.updatevehiclecount"
        );
        assert_eq!(published[0].source, PARKING);
        let data: Value = serde_json::from_slice(&published[0].data).unwrap();
        assert_eq!(data, json!({"vehicleEntranceCount": 1}));
    }

    #[tokio::test]
    async fn test_spot_without_status_is_ignored() {
        let f = fixture();
        let event = f
            .ctx
            .codec()
            .build(OFF_STREET_SPOT_INTERFACE, SPOT, EnvelopeKind::Observation, &json!({}))
            .unwrap();

        parking_spot_changed(f.ctx.clone(), event).await.unwrap();
        assert!(f.broker.published().is_empty());
    }

    #[tokio::test]
    async fn test_spot_without_parking_fails() {
        let f = fixture();
        let event = f
            .ctx
            .codec()
            .build(
                PARKING_SPOT_INTERFACE,
                "ngsi-ld-city-parkingspot-unlinked",
                EnvelopeKind::Observation,
                &json!({"status": "free"}),
            )
            .unwrap();

        let err = parking_spot_changed(f.ctx.clone(), event).await.unwrap_err();
        assert!(matches!(err, KtwinError::RelationshipNotFound { .. }));
    }

    #[test]
    fn test_defaults_and_routes() {
        let config = defaults();
        assert_eq!(config.service.name, "parking-service");
        assert_eq!(config.service.seed_instances.len(), 2);
        assert_eq!(routes(&fixture().ctx).len(), 3);
    }
}
