pub mod client;
pub mod completion;
pub mod error;
pub mod fear_greed;
pub mod feeds;
pub mod notes;
pub mod price;
pub mod search;

pub use client::UpstreamClient;
pub use completion::{text_completer, OpenAiCompleter, TextCompleter};
pub use error::UpstreamError;
pub use fear_greed::{FearGreedIndex, SentimentIndex};
pub use feeds::{feed_sources, FeedSource, HttpFeedSource};
pub use notes::{NoteStore, SqliteNoteStore};
pub use price::{
    price_tiers, BinanceProvider, CoingeckoProvider, CoinpaprikaProvider, PriceProvider,
};
pub use search::{search_provider, BraveSearch, SearchProvider, SerperSearch};
