pub mod models;
pub mod summary;

pub use models::{Account, Identity, Mapper, MapperCount, Platform, RankedMapper};
pub use summary::{SubscribeSummary, UnsubscribeSummary};
