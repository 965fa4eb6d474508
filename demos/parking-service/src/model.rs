//! Payloads of the parking twins.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const PARKING_INTERFACE: &str = "ngsi-ld-city-offstreetparking";
pub const PARKING_SPOT_INTERFACE: &str = "ngsi-ld-city-parkingspot";
pub const OFF_STREET_SPOT_INTERFACE: &str = "ngsi-ld-city-offstreetparkingspot";

/// Relationship from a spot to its parking.
pub const PARKING_RELATIONSHIP: &str = "refOffStreetParking";

pub const UPDATE_VEHICLE_COUNT: &str = "updateVehicleCount";

/// Capacity assumed for a parking with no recorded capacity.
pub const DEFAULT_TOTAL_SPOTS: i64 = 50;

// ============================================================================
// Commands
// ============================================================================

/// Payload of the `updateVehicleCount` command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVehicleCountCommand {
    #[serde(default, skip_serializing_if = "is_zero")]
    pub vehicle_entrance_count: i64,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub vehicle_exit_count: i64,
}

impl UpdateVehicleCountCommand {
    /// One vehicle entered.
    pub fn entrance() -> Self {
        Self {
            vehicle_entrance_count: 1,
            ..Default::default()
        }
    }

    /// One vehicle left.
    pub fn exit() -> Self {
        Self {
            vehicle_exit_count: 1,
            ..Default::default()
        }
    }

    /// Returns `true` if neither count is set.
    pub fn is_empty(&self) -> bool {
        self.vehicle_entrance_count == 0 && self.vehicle_exit_count == 0
    }
}

fn is_zero(n: &i64) -> bool {
    *n == 0
}

// ============================================================================
// Off-Street Parking
// ============================================================================

/// State of an off-street parking.
///
/// Attributes the service does not compute are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OffStreetParking {
    #[serde(default = "default_total_spots")]
    pub total_spot_number: i64,
    #[serde(default)]
    pub occupied_spot_number: i64,
    #[serde(default)]
    pub available_spot_number: i64,
    #[serde(default)]
    pub occupancy: f64,
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl Default for OffStreetParking {
    fn default() -> Self {
        let mut parking = Self {
            total_spot_number: DEFAULT_TOTAL_SPOTS,
            occupied_spot_number: 0,
            available_spot_number: 0,
            occupancy: 0.0,
            attributes: Map::new(),
        };
        parking.refresh();
        parking
    }
}

impl OffStreetParking {
    /// Records a vehicle entering; saturates at capacity.
    pub fn vehicle_entered(&mut self) {
        self.occupied_spot_number = (self.occupied_spot_number + 1).min(self.total_spot_number);
        self.refresh();
    }

    /// Records a vehicle leaving; saturates at zero.
    pub fn vehicle_left(&mut self) {
        self.occupied_spot_number = (self.occupied_spot_number - 1).max(0);
        self.refresh();
    }

    fn refresh(&mut self) {
        self.available_spot_number = (self.total_spot_number - self.occupied_spot_number).max(0);
        self.occupancy = if self.total_spot_number > 0 {
            self.occupied_spot_number as f64 / self.total_spot_number as f64
        } else {
            0.0
        };
    }
}

fn default_total_spots() -> i64 {
    DEFAULT_TOTAL_SPOTS
}

// ============================================================================
// Parking Spot
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SpotStatus {
    Occupied,
    Free,
    Closed,
    #[serde(other)]
    Unknown,
}

/// Observation sent by a parking spot sensor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParkingSpot {
    #[serde(default)]
    pub status: Option<SpotStatus>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub date_observed: Option<Value>,
}
