//! Descriptor Module
//!
//! Persists database and relation descriptors as tuples of an internal
//! table inside the ordered KV space.
//!
//! ## Key Layout
//! ```text
//! descriptors: (tenant, INTERNAL_DB, DESCRIPTOR_TABLE, PRIMARY_INDEX, parentID, ID)
//!              value = (parentID, ID, name, body)
//! async GC:    (tenant, INTERNAL_DB, ASYNC_GC_TABLE, PRIMARY_INDEX, epoch)
//!              value = (epoch, dbID, tableID, body)
//! ```
//!
//! Databases live under the sentinel parent `DATABASE_PARENT_ID`; relations
//! live under the ID of their database.
//!
//! ## Concurrency
//! The handler adds no locking of its own. Two concurrent store-by-name
//! calls for a name with no entry yet can both pass the lookup and both
//! write; the last write wins.

mod handler;
mod types;

use crate::error::Result;

pub use handler::DescriptorHandlerImpl;
pub use types::{
    internal_async_gc_table_desc, internal_descriptor_table_desc, AsyncGcEntry, AttributeDesc,
    DatabaseDesc, IndexDesc, RelationDesc,
};

// =============================================================================
// Constants
// =============================================================================

pub const INTERNAL_DATABASE_ID: u64 = 0;
pub const INTERNAL_DESCRIPTOR_TABLE_ID: u64 = 1;
pub const INTERNAL_ASYNC_GC_TABLE_ID: u64 = 2;
pub const PRIMARY_INDEX_ID: u64 = 1;

/// Parent ID under which database descriptors are stored
pub const DATABASE_PARENT_ID: u64 = u64::MAX;

/// Field positions in a descriptor value
pub const DESC_PARENT_ID_ATTR: usize = 0;
pub const DESC_ID_ATTR: usize = 1;
pub const DESC_NAME_ATTR: usize = 2;
pub const DESC_BODY_ATTR: usize = 3;

/// Field positions in an async-GC value
pub const ASYNC_GC_EPOCH_ATTR: usize = 0;
pub const ASYNC_GC_DB_ID_ATTR: usize = 1;
pub const ASYNC_GC_TABLE_ID_ATTR: usize = 2;
pub const ASYNC_GC_BODY_ATTR: usize = 3;

// =============================================================================
// Handler Trait
// =============================================================================

pub trait DescriptorHandler: Send + Sync {
    /// First relation under `parent_id` whose stored name equals `name`
    fn load_relation_desc_by_name(&self, parent_id: u64, name: &str) -> Result<RelationDesc>;

    fn load_relation_desc_by_id(&self, parent_id: u64, table_id: u64) -> Result<RelationDesc>;

    /// Insert, or overwrite an entry with the same name and ID. An entry
    /// with the same name and another ID is rejected with
    /// `DescriptorMismatch`.
    fn store_relation_desc_by_name(
        &self,
        parent_id: u64,
        name: &str,
        desc: &RelationDesc,
    ) -> Result<()>;

    /// Unconditional upsert
    fn store_relation_desc_by_id(
        &self,
        parent_id: u64,
        table_id: u64,
        desc: &RelationDesc,
    ) -> Result<()>;

    fn delete_relation_desc_by_id(&self, parent_id: u64, table_id: u64) -> Result<()>;

    fn load_database_desc_by_name(&self, name: &str) -> Result<DatabaseDesc>;

    fn load_database_desc_by_id(&self, db_id: u64) -> Result<DatabaseDesc>;

    fn store_database_desc_by_name(&self, name: &str, desc: &DatabaseDesc) -> Result<()>;

    fn store_database_desc_by_id(&self, db_id: u64, desc: &DatabaseDesc) -> Result<()>;

    fn delete_database_desc_by_id(&self, db_id: u64) -> Result<()>;

    /// Stage `desc` for deferred reclamation at `epoch`
    fn store_relation_desc_into_async_gc(
        &self,
        epoch: u64,
        db_id: u64,
        desc: &RelationDesc,
    ) -> Result<()>;

    fn list_relation_desc_from_async_gc(&self, epoch: u64) -> Result<Vec<AsyncGcEntry>>;
}
