use uuid::Uuid;

use crate::error::AppError;
use crate::models::booking::{Booking, BookingStatus, DriverSnapshot};
use crate::models::user::{User, UserRole};

#[derive(Debug, Clone, PartialEq)]
pub enum BookingEvent {
    Accept(DriverSnapshot),
    Reject,
    StartJourney,
    MarkArrived,
    StartTransport,
    Complete,
    Cancel,
}

impl BookingEvent {
    pub fn verb(&self) -> &'static str {
        match self {
            BookingEvent::Accept(_) => "accept",
            BookingEvent::Reject => "reject",
            BookingEvent::StartJourney => "start the journey for",
            BookingEvent::MarkArrived => "mark arrival for",
            BookingEvent::StartTransport => "start transport for",
            BookingEvent::Complete => "complete",
            BookingEvent::Cancel => "cancel",
        }
    }
}

/// Who fires an event. Resolved from the caller's user profile.
#[derive(Debug, Clone, PartialEq)]
pub enum Actor {
    Patient { user_id: Uuid },
    Driver(DriverSnapshot),
}

impl Actor {
    pub fn from_user(user: &User) -> Self {
        match user.role {
            UserRole::Patient => Actor::Patient { user_id: user.id },
            UserRole::Driver => Actor::Driver(DriverSnapshot {
                driver_id: user.id,
                name: user.name.clone(),
                phone: user.phone.clone(),
                vehicle_number: user.vehicle_number.clone(),
            }),
        }
    }

    pub fn id(&self) -> Uuid {
        match self {
            Actor::Patient { user_id } => *user_id,
            Actor::Driver(driver) => driver.driver_id,
        }
    }
}

fn invalid(from: BookingStatus, event: &BookingEvent) -> AppError {
    AppError::InvalidTransition {
        from,
        event: event.verb().to_string(),
    }
}

/// Pure transition table. Knows nothing about actors or driver binding.
pub fn next_status(current: BookingStatus, event: &BookingEvent) -> Result<BookingStatus, AppError> {
    use BookingStatus::*;

    if current.is_terminal() {
        return Err(invalid(current, event));
    }

    match (current, event) {
        (Pending, BookingEvent::Accept(_)) => Ok(Accepted),
        (Pending, BookingEvent::Reject) => Ok(Cancelled),
        (Accepted, BookingEvent::StartJourney) => Ok(OnTheWay),
        (OnTheWay, BookingEvent::MarkArrived) => Ok(Arrived),
        (Arrived, BookingEvent::StartTransport) => Ok(InTransit),
        (InTransit, BookingEvent::Complete) => Ok(Completed),
        (_, BookingEvent::Cancel) => Ok(Cancelled),
        _ => Err(invalid(current, event)),
    }
}

/// Returns the booking after `event`, leaving the input untouched.
pub fn apply(booking: &Booking, event: BookingEvent) -> Result<Booking, AppError> {
    if booking.status.is_terminal() {
        return Err(invalid(booking.status, &event));
    }
    if matches!(event, BookingEvent::Accept(_)) && booking.driver_id.is_some() {
        return Err(AppError::AlreadyAssigned(booking.id));
    }

    let mut updated = booking.clone();
    updated.status = next_status(booking.status, &event)?;

    if let BookingEvent::Accept(driver) = event {
        updated.driver_id = Some(driver.driver_id);
        updated.driver_name = Some(driver.name);
        updated.driver_phone = Some(driver.phone);
        updated.vehicle_number = driver.vehicle_number;
    }

    Ok(updated)
}

/// Patients may only cancel their own bookings. Drivers accept or reject any
/// pending booking and drive every other event on bookings bound to them.
pub fn authorize(actor: &Actor, booking: &Booking, event: &BookingEvent) -> Result<(), AppError> {
    match actor {
        Actor::Patient { user_id } => match event {
            BookingEvent::Cancel if booking.user_id == *user_id => Ok(()),
            BookingEvent::Cancel => Err(AppError::Forbidden(format!(
                "booking {} belongs to another patient",
                booking.id
            ))),
            _ => Err(AppError::Forbidden(
                "patients may only cancel their own bookings".to_string(),
            )),
        },
        Actor::Driver(driver) => match event {
            BookingEvent::Accept(snapshot) if snapshot.driver_id != driver.driver_id => Err(
                AppError::Forbidden("drivers accept bookings only for themselves".to_string()),
            ),
            BookingEvent::Accept(_) | BookingEvent::Reject => Ok(()),
            _ if booking.driver_id == Some(driver.driver_id) => Ok(()),
            _ => Err(AppError::Forbidden(format!(
                "booking {} is not assigned to this driver",
                booking.id
            ))),
        },
    }
}

/// Maps a requested target status onto the event that reaches it.
pub fn event_for_target(
    actor: &Actor,
    current: BookingStatus,
    target: BookingStatus,
) -> Result<BookingEvent, AppError> {
    let event = match target {
        BookingStatus::Pending => {
            return Err(AppError::Validation(
                "a booking cannot be moved back to pending".to_string(),
            ));
        }
        BookingStatus::Accepted => match actor {
            Actor::Driver(driver) => BookingEvent::Accept(driver.clone()),
            Actor::Patient { .. } => {
                return Err(AppError::Forbidden(
                    "only drivers can accept bookings".to_string(),
                ));
            }
        },
        BookingStatus::OnTheWay => BookingEvent::StartJourney,
        BookingStatus::Arrived => BookingEvent::MarkArrived,
        BookingStatus::InTransit => BookingEvent::StartTransport,
        BookingStatus::Completed => BookingEvent::Complete,
        BookingStatus::Cancelled => match actor {
            Actor::Driver(_) if current == BookingStatus::Pending => BookingEvent::Reject,
            _ => BookingEvent::Cancel,
        },
    };

    Ok(event)
}
