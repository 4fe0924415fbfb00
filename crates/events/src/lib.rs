//! `tims-events`: client signals and the bus that carries them.
//!
//! The request pipeline and the navigator classify what happened; UI layers
//! subscribe here to decide how to present it.

pub mod bus;
pub mod local_bus;
pub mod signal;

pub use bus::{EventBus, Subscription};
pub use local_bus::{BusError, LocalBus};
pub use signal::{AuthEvent, ClearReason, ClientSignal, FailureKind};

/// Bus type shared by the client crates.
pub type SignalBus = LocalBus<ClientSignal>;
