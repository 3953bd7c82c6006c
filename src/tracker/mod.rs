mod bitmap;
mod presence;

pub use presence::PresenceTracker;
