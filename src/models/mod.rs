pub mod card;
pub mod envelope;
pub mod requests;
pub mod responses;
pub mod settings;
pub mod snapshot;
