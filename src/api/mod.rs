pub mod chat;
pub mod client;

pub use chat::{ChatApi, ChatCreated, CREATE_CHAT_KEY, FETCH_CHATS_KEY};
pub use client::{ApiClient, ApiError, DEFAULT_BASE_URL};
