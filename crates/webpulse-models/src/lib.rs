pub mod chat;
pub mod config;
pub mod feed;
pub mod note;
pub mod quote;
pub mod search;
pub mod sentiment;

pub use chat::{ChatReply, ChatRequest, Tool};
pub use config::{
    AuthConfig, BridgeConfig, FeedSourceConfig, FeedsConfig, LlmConfig, NotesConfig, PriceConfig,
    SearchConfig, SentimentConfig, ServerConfig, UpstreamConfig,
};
pub use feed::{Alert, FeedEntry, FeedItem, NewsDigest};
pub use note::NoteRecord;
pub use quote::{InvalidPrice, PriceError, PriceOutcome, PriceSource, Quote};
pub use search::{SearchHit, SearchOutcome};
pub use sentiment::{IndexOutcome, IndexReading};
