//! Descriptor types
//!
//! Bodies stored in the last field of a catalog value. Missing fields
//! deserialize to their defaults so older bodies stay readable.

use serde::{Deserialize, Serialize};

use crate::codec::ValueType;

use super::{
    ASYNC_GC_BODY_ATTR, ASYNC_GC_DB_ID_ATTR, ASYNC_GC_EPOCH_ATTR, ASYNC_GC_TABLE_ID_ATTR,
    DESC_BODY_ATTR, DESC_ID_ATTR, DESC_NAME_ATTR, DESC_PARENT_ID_ATTR, INTERNAL_ASYNC_GC_TABLE_ID,
    INTERNAL_DESCRIPTOR_TABLE_ID, PRIMARY_INDEX_ID,
};

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseDesc {
    pub id: u32,
    pub name: String,
    pub update_time: i64,
    pub create_epoch: u64,
    pub is_deleted: bool,
    pub drop_epoch: u64,
}

impl DatabaseDesc {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RelationDesc {
    pub id: u32,
    pub name: String,
    pub update_time: i64,
    pub create_sql: String,
    pub attributes: Vec<AttributeDesc>,
    pub primary_index: IndexDesc,
    pub indexes: Vec<IndexDesc>,
    pub comment: String,
    pub create_epoch: u64,
    pub is_deleted: bool,
    pub drop_epoch: u64,
}

impl RelationDesc {
    pub fn new(id: u32, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&AttributeDesc> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributeDesc {
    pub id: u32,
    pub name: String,
    pub ttype: ValueType,
    #[serde(default)]
    pub is_nullable: bool,
    #[serde(default)]
    pub is_hidden: bool,
    #[serde(default)]
    pub comment: String,
}

impl AttributeDesc {
    pub fn new(id: u32, name: impl Into<String>, ttype: ValueType) -> Self {
        Self {
            id,
            name: name.into(),
            ttype,
            is_nullable: false,
            is_hidden: false,
            comment: String::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexDesc {
    pub id: u32,
    pub name: String,
    pub is_unique: bool,
    /// IDs of the indexed attributes, in key order
    pub attribute_ids: Vec<u32>,
}

/// One relation staged for deferred reclamation
#[derive(Debug, Clone, PartialEq)]
pub struct AsyncGcEntry {
    pub epoch: u64,
    pub db_id: u64,
    pub table_id: u64,
    pub desc: RelationDesc,
}

/// Schema of the internal table that stores every descriptor:
///
/// ```text
/// Attribute        PrimaryKey
/// ---------------------------
/// parentID         Y
/// ID               Y
/// Name             N
/// DescriptorBytes  N
/// ```
pub fn internal_descriptor_table_desc() -> RelationDesc {
    let mut attributes = vec![AttributeDesc::new(0, "", ValueType::Null); 4];
    attributes[DESC_PARENT_ID_ATTR] =
        AttributeDesc::new(DESC_PARENT_ID_ATTR as u32, "parentID", ValueType::Uint64);
    attributes[DESC_ID_ATTR] = AttributeDesc::new(DESC_ID_ATTR as u32, "ID", ValueType::Uint64);
    attributes[DESC_NAME_ATTR] =
        AttributeDesc::new(DESC_NAME_ATTR as u32, "Name", ValueType::String);
    attributes[DESC_BODY_ATTR] =
        AttributeDesc::new(DESC_BODY_ATTR as u32, "DescriptorBytes", ValueType::Bytes);
    RelationDesc {
        id: INTERNAL_DESCRIPTOR_TABLE_ID as u32,
        name: "descriptor".to_string(),
        attributes,
        primary_index: IndexDesc {
            id: PRIMARY_INDEX_ID as u32,
            name: "primary".to_string(),
            is_unique: true,
            attribute_ids: vec![DESC_PARENT_ID_ATTR as u32, DESC_ID_ATTR as u32],
        },
        ..Default::default()
    }
}

/// Schema of the internal table staging relations for async GC, keyed by
/// epoch
pub fn internal_async_gc_table_desc() -> RelationDesc {
    let mut attributes = vec![AttributeDesc::new(0, "", ValueType::Null); 4];
    attributes[ASYNC_GC_EPOCH_ATTR] =
        AttributeDesc::new(ASYNC_GC_EPOCH_ATTR as u32, "epoch", ValueType::Uint64);
    attributes[ASYNC_GC_DB_ID_ATTR] =
        AttributeDesc::new(ASYNC_GC_DB_ID_ATTR as u32, "dbID", ValueType::Uint64);
    attributes[ASYNC_GC_TABLE_ID_ATTR] =
        AttributeDesc::new(ASYNC_GC_TABLE_ID_ATTR as u32, "tableID", ValueType::Uint64);
    attributes[ASYNC_GC_BODY_ATTR] =
        AttributeDesc::new(ASYNC_GC_BODY_ATTR as u32, "DescriptorBytes", ValueType::Bytes);
    RelationDesc {
        id: INTERNAL_ASYNC_GC_TABLE_ID as u32,
        name: "asyncgc".to_string(),
        attributes,
        primary_index: IndexDesc {
            id: PRIMARY_INDEX_ID as u32,
            name: "primary".to_string(),
            is_unique: true,
            attribute_ids: vec![ASYNC_GC_EPOCH_ATTR as u32],
        },
        ..Default::default()
    }
}
