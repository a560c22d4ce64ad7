pub mod commands;
pub mod controller;
pub mod filters;
pub mod state;

pub use commands::{ChoiceOption, Command, Inbound, Reply};
pub use controller::IntakeController;
pub use state::SessionStore;
