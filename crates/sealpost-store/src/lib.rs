//! sealpost-store: in-memory blob store shared by listener connections

pub mod store;

pub use store::{BlobStore, SizeDelta};
