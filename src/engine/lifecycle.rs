use crate::models::parcel::DeliveryStatus;

/// How a transition is requested. Only assignment may leave `pending`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionSource {
    Assignment,
    StatusUpdate,
}

pub fn allowed_transitions(from: DeliveryStatus) -> &'static [DeliveryStatus] {
    match from {
        DeliveryStatus::Pending => &[DeliveryStatus::RiderAssigned],
        DeliveryStatus::RiderAssigned => &[DeliveryStatus::InTransit],
        DeliveryStatus::InTransit => &[
            DeliveryStatus::Delivered,
            DeliveryStatus::ServiceCenterDelivered,
        ],
        DeliveryStatus::Delivered | DeliveryStatus::ServiceCenterDelivered => &[],
    }
}

pub fn can_transition(from: DeliveryStatus, to: DeliveryStatus, source: TransitionSource) -> bool {
    if from == to {
        return false;
    }

    let entering_assignment = to == DeliveryStatus::RiderAssigned;
    if entering_assignment != (source == TransitionSource::Assignment) {
        return false;
    }

    allowed_transitions(from).contains(&to)
}

pub fn check_transition(
    from: DeliveryStatus,
    to: DeliveryStatus,
    source: TransitionSource,
) -> Result<(), String> {
    if can_transition(from, to, source) {
        return Ok(());
    }

    if to == DeliveryStatus::RiderAssigned && source == TransitionSource::StatusUpdate {
        return Err("riders are assigned through /assign-rider".to_string());
    }

    Err(format!(
        "invalid delivery transition: {} -> {}",
        from.as_str(),
        to.as_str()
    ))
}

pub fn is_terminal(status: DeliveryStatus) -> bool {
    allowed_transitions(status).is_empty()
}
