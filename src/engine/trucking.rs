//! Trucking derivation - truck count, truck-hours and cost for hauled material

use serde::{Deserialize, Serialize};

use crate::core::reference::Conversions;
use crate::entities::activity::{Activity, TruckingParams};

/// Hauling outcome for one activity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TruckingResult {
    /// Tons hauled
    pub haul_tons: f64,
    /// Tons one truck delivers per hour
    pub tons_per_truck_hour: f64,
    pub trucks: u32,
    pub truck_hours: f64,
    pub cost: f64,
    /// Tonnage came from an explicit override rather than the work quantity
    pub overridden: bool,
}

/// Tonnage hauled for `activity`, ignoring any override
pub fn base_haul_tons(activity: &Activity, params: &TruckingParams, conversions: &Conversions) -> f64 {
    match params.tons_per_unit {
        Some(per_unit) => activity.gross_quantity() * per_unit.max(0.0),
        None => conversions.tons(activity).unwrap_or(0.0),
    }
}

/// Size the truck fleet so `haul_tons` move within the activity's working
/// hours. Trucks and truck-hours round up.
pub fn derive_trucking(
    params: &TruckingParams,
    haul_tons: f64,
    duration_days: f64,
    shift_hours: f64,
    hourly_rate: f64,
) -> TruckingResult {
    let working_hours = duration_days * shift_hours;
    let tons_per_truck_hour = if params.cycle_minutes > 0.0 {
        params.truck_capacity_tons.max(0.0) * params.efficiency.clamp(0.0, 1.0) * 60.0
            / params.cycle_minutes
    } else {
        0.0
    };

    if haul_tons <= 0.0 || working_hours <= 0.0 || tons_per_truck_hour <= 0.0 {
        return TruckingResult {
            haul_tons: haul_tons.max(0.0),
            tons_per_truck_hour,
            ..TruckingResult::default()
        };
    }

    let trucks = (haul_tons / (working_hours * tons_per_truck_hour)).ceil().max(1.0);
    let truck_hours = (trucks * working_hours).ceil();

    TruckingResult {
        haul_tons,
        tons_per_truck_hour,
        trucks: trucks as u32,
        truck_hours,
        cost: truck_hours * hourly_rate.max(0.0),
        overridden: false,
    }
}

/// Trucking for an activity from its work quantity
pub fn trucking_for(
    activity: &Activity,
    conversions: &Conversions,
    shift_hours: f64,
    hourly_rate: f64,
) -> Option<TruckingResult> {
    let params = activity.trucking.as_ref()?;
    let tons = base_haul_tons(activity, params, conversions);
    Some(derive_trucking(
        params,
        tons,
        activity.duration_days(),
        shift_hours,
        hourly_rate,
    ))
}

/// Trucking for an activity whose hauled tonnage is overridden
pub fn overridden_trucking_for(
    activity: &Activity,
    shift_hours: f64,
    hourly_rate: f64,
) -> Option<TruckingResult> {
    let params = activity.trucking.as_ref()?;
    let tons = params.quantity_override_tons?;
    let mut result = derive_trucking(params, tons, activity.duration_days(), shift_hours, hourly_rate);
    result.overridden = true;
    Some(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::activity::{ActivityType, Crew, Quantity, Unit};

    fn params() -> TruckingParams {
        TruckingParams {
            cycle_minutes: 60.0,
            truck_capacity_tons: 20.0,
            efficiency: 1.0,
            tons_per_unit: None,
            quantity_override_tons: None,
        }
    }

    #[test]
    fn test_fleet_is_sized_to_duration() {
        // 20 t/h per truck, 16 working hours -> 320 t per truck; 1000 t needs 4 trucks
        let r = derive_trucking(&params(), 1000.0, 2.0, 8.0, 100.0);
        assert_eq!(r.tons_per_truck_hour, 20.0);
        assert_eq!(r.trucks, 4);
        assert_eq!(r.truck_hours, 64.0);
        assert_eq!(r.cost, 6400.0);
    }

    #[test]
    fn test_efficiency_reduces_throughput() {
        let mut p = params();
        p.efficiency = 0.5;
        let r = derive_trucking(&p, 1000.0, 2.0, 8.0, 100.0);
        assert_eq!(r.tons_per_truck_hour, 10.0);
        assert_eq!(r.trucks, 7);
    }

    #[test]
    fn test_zero_inputs_are_guarded() {
        assert_eq!(derive_trucking(&params(), 0.0, 2.0, 8.0, 100.0).cost, 0.0);
        assert_eq!(derive_trucking(&params(), 500.0, 0.0, 8.0, 100.0).cost, 0.0);
        let mut p = params();
        p.cycle_minutes = 0.0;
        let r = derive_trucking(&p, 500.0, 2.0, 8.0, 100.0);
        assert_eq!(r.trucks, 0);
        assert_eq!(r.cost, 0.0);
    }

    #[test]
    fn test_trucking_for_uses_conversions_and_override() {
        let mut a = Activity::new(
            "mill",
            ActivityType::Milling,
            Quantity::new(5000.0, Unit::Sy),
            5000.0,
            Crew {
                name: String::new(),
                headcount: 4,
                hourly_rate: 55.0,
            },
        );
        a.thickness_inches = Some(2.0);
        let mut p = params();
        p.quantity_override_tons = Some(300.0);
        a.trucking = Some(p);

        let conv = Conversions::default();
        let base = trucking_for(&a, &conv, 8.0, 100.0).unwrap();
        // 5000 SY x 2 in x 0.0555
        assert!((base.haul_tons - 555.0).abs() < 1e-9);
        assert!(!base.overridden);

        let over = overridden_trucking_for(&a, 8.0, 100.0).unwrap();
        assert_eq!(over.haul_tons, 300.0);
        assert!(over.overridden);
        assert!(over.cost <= base.cost);
    }
}
