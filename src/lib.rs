pub mod api;
pub mod core;
pub mod persistence;
pub mod proposal;
pub mod session;
pub mod settings;

pub use api::ApiClient;
pub use crate::core::{ Card, CardField, CardId, Deck, FlashdeckError };
pub use session::{ EditSession, LoadState, SaveStatus };
pub use settings::{ AcceptPolicy, ClientSettings };
