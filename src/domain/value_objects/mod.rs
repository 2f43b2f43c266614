pub mod category;
pub mod source_filename;
pub mod tenant;

pub use category::Category;
pub use source_filename::{MonotonicMillis, SourceFilename, StorageKey, record_key_for};
pub use tenant::{Tenant, TenantError};
