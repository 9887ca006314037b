// Releases module: version model, release cache and the upstream listing

pub mod cache;
pub mod fetch;
pub mod version;

pub use fetch::ReleaseFetcher;
pub use version::GoVersion;
