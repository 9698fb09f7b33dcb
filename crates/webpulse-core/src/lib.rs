pub mod aggregator;
pub mod dedupe;
pub mod error;
pub mod resolver;
pub mod router;
pub mod sentiment;
pub mod services;

pub mod test_support;

pub use aggregator::FeedAggregator;
pub use dedupe::dedupe;
pub use error::RouteError;
pub use resolver::{normalize_symbol, PriceResolver};
pub use router::{parse_command, CommandKind, CommandRouter};
pub use sentiment::SentimentScorer;
pub use services::BridgeServices;
