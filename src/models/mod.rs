pub mod parcel;
pub mod payment;
pub mod rider;
pub mod stats;
pub mod tracking;
pub mod user;
