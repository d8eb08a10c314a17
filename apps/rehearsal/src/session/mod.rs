// Interview session: tagged state machine, background tasks, and the controller
// that ties them to question generation and evaluation.

pub mod controller;
pub mod state;
pub mod tasks;

pub use controller::{Collaborators, SessionController, SessionUpdate};
pub use state::{transition, SessionEvent};
pub use tasks::{SilentPlayer, SpeechPlayer};
