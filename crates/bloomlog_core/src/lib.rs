pub mod consts;
pub mod errors;
pub mod bitmap;
pub mod hash;
pub mod meta;
pub mod persist;
pub mod config;
pub mod applog;
pub mod filter;

pub use applog::AppendLog;
pub use bitmap::Bitmap;
pub use config::FilterConfig;
pub use errors::{BloomError, Result};
pub use filter::BloomFilter;
pub use meta::Meta;
