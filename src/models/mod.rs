pub mod slot;
pub mod venue;

pub use slot::Slot;
pub use venue::{Sport, Venue};
