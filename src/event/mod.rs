// Change-notification infrastructure shared by both engines

// Public API - what other modules can use
pub use bus::EventBus;
pub use events::ChangeEvent;

// Internal modules
mod bus;
mod events;
