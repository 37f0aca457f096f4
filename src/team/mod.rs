// Public API
pub use directory::{InMemoryTeamDirectory, TeamDirectory};

// Internal modules
mod directory;
