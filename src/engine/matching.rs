use crate::error::AppError;
use crate::geo::{find_nearest, Ranked};
use crate::models::booking::BookingDraft;
use crate::models::fleet::{Ambulance, Hospital};
use crate::models::location::{GeoPoint, Location};
use crate::models::user::User;

pub const SOS_ESTIMATED_ARRIVAL: &str = "5-10 minutes";
pub const SOS_DEFAULT_PATIENT_AGE: u32 = 30;
pub const SOS_DEFAULT_CONDITION: &str = "Emergency";
pub const SOS_DEFAULT_PICKUP_ADDRESS: &str = "Current Location";

#[derive(Debug, Clone)]
pub struct SosMatch {
    pub ambulance: Ranked<Ambulance>,
    pub hospital: Ranked<Hospital>,
}

/// Nearest available ambulance and hospital among the `limit` closest of each.
pub fn match_sos(
    origin: &GeoPoint,
    ambulances: &[Ambulance],
    hospitals: &[Hospital],
    limit: usize,
) -> Result<SosMatch, AppError> {
    let ambulance = find_nearest(origin, ambulances, limit)
        .into_iter()
        .find(|ranked| ranked.item.available)
        .ok_or(AppError::NoAvailableResources("ambulances"))?;

    let hospital = find_nearest(origin, hospitals, limit)
        .into_iter()
        .find(|ranked| ranked.item.available)
        .ok_or(AppError::NoAvailableResources("hospitals"))?;

    Ok(SosMatch {
        ambulance,
        hospital,
    })
}

pub struct SosRequest {
    pub pickup: GeoPoint,
    pub address: Option<String>,
    pub patient_age: Option<u32>,
    pub patient_condition: Option<String>,
}

/// Emergency booking for `user`, pre-filled with the matched ambulance crew.
pub fn sos_draft(user: &User, request: SosRequest, matched: &SosMatch) -> BookingDraft {
    let ambulance = &matched.ambulance.item;
    let hospital = &matched.hospital.item;

    BookingDraft {
        user_id: user.id,
        ambulance_id: ambulance.id.clone(),
        hospital_id: hospital.id.clone(),
        pickup_location: Location {
            lat: request.pickup.lat,
            lng: request.pickup.lng,
            address: request
                .address
                .filter(|a| !a.trim().is_empty())
                .unwrap_or_else(|| SOS_DEFAULT_PICKUP_ADDRESS.to_string()),
        },
        hospital_location: Location {
            lat: hospital.location.lat,
            lng: hospital.location.lng,
            address: hospital.address.clone(),
        },
        ambulance_type: ambulance.kind,
        patient_name: user.name.clone(),
        patient_age: request.patient_age.unwrap_or(SOS_DEFAULT_PATIENT_AGE),
        patient_condition: request
            .patient_condition
            .unwrap_or_else(|| SOS_DEFAULT_CONDITION.to_string()),
        is_emergency: true,
        driver_name: Some(ambulance.driver_name.clone()),
        driver_phone: Some(ambulance.driver_phone.clone()),
        vehicle_number: Some(ambulance.vehicle_number.clone()),
        estimated_arrival: Some(SOS_ESTIMATED_ARRIVAL.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use uuid::Uuid;

    use super::{match_sos, sos_draft, SosRequest, SOS_ESTIMATED_ARRIVAL};
    use crate::error::AppError;
    use crate::fleet::fixtures::{ambulance, hospital};
    use crate::models::location::GeoPoint;
    use crate::models::user::{User, UserRole};

    fn origin() -> GeoPoint {
        GeoPoint::new(37.7749, -122.4194)
    }

    fn patient() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Quinn".to_string(),
            email: "quinn@example.com".to_string(),
            phone: "+1-555-0111".to_string(),
            role: UserRole::Patient,
            blood_group: Some("O+".to_string()),
            emergency_contacts: vec![],
            vehicle_number: None,
            license_number: None,
        }
    }

    #[test]
    fn skips_unavailable_units_nearer_to_the_patient() {
        let ambulances = vec![
            ambulance("busy", GeoPoint::new(37.7750, -122.4194), false),
            ambulance("free", GeoPoint::new(37.7800, -122.4194), true),
        ];
        let hospitals = vec![
            hospital("closed", GeoPoint::new(37.7760, -122.4194), false),
            hospital("open", GeoPoint::new(37.7900, -122.4194), true),
        ];

        let matched = match_sos(&origin(), &ambulances, &hospitals, 5).unwrap();

        assert_eq!(matched.ambulance.item.id, "free");
        assert_eq!(matched.hospital.item.id, "open");
    }

    #[test]
    fn nothing_available_within_limit_is_an_error() {
        let ambulances = vec![
            ambulance("busy", GeoPoint::new(37.7750, -122.4194), false),
            ambulance("distant", GeoPoint::new(38.9, -122.4194), true),
        ];
        let hospitals = vec![hospital("open", GeoPoint::new(37.79, -122.4194), true)];

        let err = match_sos(&origin(), &ambulances, &hospitals, 1).unwrap_err();
        assert!(matches!(err, AppError::NoAvailableResources("ambulances")));

        let err = match_sos(&origin(), &ambulances, &[], 5).unwrap_err();
        assert!(matches!(err, AppError::NoAvailableResources("hospitals")));
    }

    #[test]
    fn sos_draft_is_an_emergency_with_crew_snapshot() {
        let matched = match_sos(
            &origin(),
            &[ambulance("a1", GeoPoint::new(37.776, -122.4194), true)],
            &[hospital("h1", GeoPoint::new(37.79, -122.42), true)],
            5,
        )
        .unwrap();
        let user = patient();

        let draft = sos_draft(
            &user,
            SosRequest {
                pickup: origin(),
                address: None,
                patient_age: None,
                patient_condition: None,
            },
            &matched,
        );

        assert!(draft.validate().is_ok());
        assert!(draft.is_emergency);
        assert_eq!(draft.user_id, user.id);
        assert_eq!(draft.patient_name, "Quinn");
        assert_eq!(draft.ambulance_id, "a1");
        assert_eq!(draft.vehicle_number.as_deref(), Some("VEH-a1"));
        assert_eq!(draft.hospital_location.address, "h1 Health Way");
        assert_eq!(draft.pickup_location.address, "Current Location");
        assert_eq!(draft.estimated_arrival.as_deref(), Some(SOS_ESTIMATED_ARRIVAL));
    }
}
