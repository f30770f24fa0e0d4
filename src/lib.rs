//! Client-side engine for the Daily Set puzzle.
//!
//! Everything a frontend needs to run a day's puzzle lives here: the
//! set-validation rules, the board with selection and removal, the
//! session lifecycle against the HTTP backend, disk persistence of
//! in-progress and completed days, and a reconnecting realtime client
//! for push updates.

pub mod game;
pub mod models;
pub mod net;
pub mod store;
pub mod utils;

pub use game::board::{BoardState, RemovalPolicy};
pub use game::session::{GameSession, Phase, StartedSession, SubmitOutcome};
pub use game::validator::{has_valid_sets, is_valid_set};
pub use models::card::Card;
pub use models::envelope::{Envelope, EventKind, GameEvent};
pub use models::settings::Settings;
pub use net::gateway::{Gateway, HttpGateway};
pub use net::realtime::{RealtimeClient, RealtimeOptions};
pub use store::session_store::SessionStore;
pub use utils::errors::GatewayError;
