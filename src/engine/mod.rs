pub mod controller;
pub mod flight;
pub mod lifecycle;
pub mod poller;
pub mod presence;
pub mod timer;

pub use controller::{SessionController, SessionDeps, SessionSnapshot};
pub use poller::PollOutcome;
pub use presence::PresenceOutcome;
