//! Greeting cards: types, validation, rendering, storage and dispatch

pub mod renderer;
pub mod sender;
pub mod store;
pub mod types;
pub mod validator;

pub use renderer::{render, render_preview, RenderedCard};
pub use sender::{CardSender, EmailRequest, SendReceipt};
pub use store::{CardStore, MemoryCardStore, SqliteCardStore};
pub use types::{Card, CardFilter, CardInput, CardPage, CardType, CardUpdate, Pagination};
