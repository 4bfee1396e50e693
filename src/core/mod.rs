pub mod errors;
pub mod http;
pub mod models;
pub mod tasks;

pub use errors::FlashdeckError;
pub use models::{ Card, CardField, CardId, Deck };
