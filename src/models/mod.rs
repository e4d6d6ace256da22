//! Data models for the rental engine

pub mod availability;
pub mod capacity;
pub mod commission;
pub mod enums;
pub mod pricing;
pub mod rejection;
pub mod reservation;
pub mod stay;
pub mod unit;

// Re-export commonly used types
pub use availability::{AvailabilityDecision, AvailabilityKey, UnavailabilityBlock};
pub use capacity::CapacityModel;
pub use commission::{AmountSplit, BookingQuote, CommissionConfig};
pub use enums::{Currency, Lang, PaymentState, ReservationStatus};
pub use pricing::{PriceQuote, PricingStrategy, PromotionRule, SpecialPriceRule};
pub use rejection::RejectionRecord;
pub use reservation::{HostSignoff, Reservation};
pub use stay::{overlaps, StayRange};
pub use unit::RentableUnit;
