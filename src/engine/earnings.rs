use crate::models::parcel::Parcel;
use crate::models::stats::ParcelStats;

const SAME_REGION_RATE: f64 = 0.90;
const CROSS_REGION_RATE: f64 = 0.30;

/// Rider payout for one delivered parcel.
pub fn delivery_earning(parcel: &Parcel) -> f64 {
    let rate = if parcel.same_region() {
        SAME_REGION_RATE
    } else {
        CROSS_REGION_RATE
    };
    parcel.total_cost * rate
}

pub fn compute_stats<'a>(parcels: impl IntoIterator<Item = &'a Parcel>) -> ParcelStats {
    let mut stats = ParcelStats::default();

    for parcel in parcels {
        stats.total += 1;

        if !parcel.delivery_status.is_delivered() {
            continue;
        }

        stats.delivered += 1;
        let earning = delivery_earning(parcel);
        stats.earnings += earning;
        if parcel.is_cashed_out {
            stats.cashed_out += earning;
        }
    }

    stats.pending = stats.total - stats.delivered;
    stats.earnings = round_money(stats.earnings);
    stats.cashed_out = round_money(stats.cashed_out);
    stats
}

fn round_money(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::{compute_stats, delivery_earning};
    use crate::models::parcel::{DeliveryStatus, Parcel, PaymentStatus};

    fn parcel(sender_region: &str, receiver_region: &str, cost: f64, status: DeliveryStatus) -> Parcel {
        Parcel {
            id: Uuid::new_v4(),
            tracking_id: "PCL-TEST".to_string(),
            title: "Books".to_string(),
            parcel_type: "document".to_string(),
            weight: None,
            sender_email: "ann@example.com".to_string(),
            sender_name: "Ann".to_string(),
            sender_contact: "0100".to_string(),
            sender_region: sender_region.to_string(),
            sender_address: None,
            receiver_name: "Bob".to_string(),
            receiver_contact: "0200".to_string(),
            receiver_region: receiver_region.to_string(),
            receiver_address: None,
            total_cost: cost,
            delivery_status: status,
            payment_status: PaymentStatus::Paid,
            assigned_rider: None,
            is_cashed_out: false,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            paid_at: None,
            assigned_at: None,
            picked_at: None,
            delivered_at: None,
            cashed_out_at: None,
        }
    }

    #[test]
    fn same_region_pays_ninety_percent() {
        let p = parcel("A", "A", 100.0, DeliveryStatus::Delivered);
        assert!((delivery_earning(&p) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn cross_region_pays_thirty_percent() {
        let p = parcel("A", "B", 100.0, DeliveryStatus::Delivered);
        assert!((delivery_earning(&p) - 30.0).abs() < 1e-9);
    }

    #[test]
    fn region_match_ignores_case_and_padding() {
        let p = parcel("Dhaka", " dhaka ", 100.0, DeliveryStatus::Delivered);
        assert!((delivery_earning(&p) - 90.0).abs() < 1e-9);
    }

    #[test]
    fn empty_input_is_all_zero() {
        let stats = compute_stats(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.delivered, 0);
        assert_eq!(stats.pending, 0);
        assert_eq!(stats.earnings, 0.0);
        assert_eq!(stats.cashed_out, 0.0);
    }

    #[test]
    fn only_delivered_parcels_earn_and_cash_out_is_a_subset() {
        let mut cashed = parcel("A", "A", 100.0, DeliveryStatus::Delivered);
        cashed.is_cashed_out = true;
        let parcels = vec![
            cashed,
            parcel("A", "B", 100.0, DeliveryStatus::ServiceCenterDelivered),
            parcel("A", "A", 500.0, DeliveryStatus::InTransit),
            parcel("A", "A", 50.0, DeliveryStatus::Pending),
        ];

        let stats = compute_stats(&parcels);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.delivered, 2);
        assert_eq!(stats.pending, 2);
        assert_eq!(stats.earnings, 120.0);
        assert_eq!(stats.cashed_out, 90.0);
    }

    #[test]
    fn earnings_are_rounded_to_cents() {
        let parcels = vec![parcel("A", "B", 33.33, DeliveryStatus::Delivered)];
        let stats = compute_stats(&parcels);
        assert_eq!(stats.earnings, 10.0);
    }
}
