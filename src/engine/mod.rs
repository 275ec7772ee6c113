pub mod dispatch;
pub mod earnings;
pub mod lifecycle;
pub mod payments;
pub mod riders;
pub mod saga;
