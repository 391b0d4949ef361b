//! Core types: wall-clock time, availability model, slot computation, tracing

pub mod model;
pub mod slots;
pub mod time;
pub mod tracing;

pub use model::{
    Appointment, AppointmentRequest, AppointmentStatus, AppointmentUpdate, AvailabilitySlot,
    BookedInterval, IntegrationMode, UnknownIntegrationMode, WeeklyAvailabilityWindow,
    WindowInput,
};
pub use slots::{compute_slots, slot_is_blocked};
pub use time::{
    DateRange, TimeInterval, TimeParseError, day_of_week, parse_date, parse_wall_datetime,
    parse_wall_time,
};
pub use tracing::{TracingConfig, TracingError, TracingOutputFormat, init_tracing};
