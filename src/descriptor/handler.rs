//! Descriptor handler over a tuple codec and a KV handler

use std::sync::Arc;

use bytes::BytesMut;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::codec::{
    decode_fields, encode_fields, successor_of_key, DecodedItem, DefaultValueSerializer,
    FieldValue, TupleCodecHandler, TupleValue, ValueSerializer, ValueType,
};
use crate::config::{BodyFormat, Config};
use crate::error::{Result, StrataError};
use crate::kv::KvHandler;

use super::{
    AsyncGcEntry, DatabaseDesc, DescriptorHandler, RelationDesc, ASYNC_GC_BODY_ATTR,
    ASYNC_GC_DB_ID_ATTR, ASYNC_GC_EPOCH_ATTR, ASYNC_GC_TABLE_ID_ATTR, DATABASE_PARENT_ID,
    DESC_BODY_ATTR, DESC_NAME_ATTR, INTERNAL_ASYNC_GC_TABLE_ID,
    INTERNAL_DATABASE_ID, INTERNAL_DESCRIPTOR_TABLE_ID, PRIMARY_INDEX_ID,
};

/// Fields in every descriptor or async-GC value
const VALUE_FIELD_COUNT: usize = 4;

pub struct DescriptorHandlerImpl {
    codec: Arc<TupleCodecHandler>,
    kv: Arc<dyn KvHandler>,
    serializer: Arc<dyn ValueSerializer>,
    kv_limit: u64,
    body_format: BodyFormat,
}

impl DescriptorHandlerImpl {
    pub fn new(
        codec: Arc<TupleCodecHandler>,
        kv: Arc<dyn KvHandler>,
        serializer: Arc<dyn ValueSerializer>,
        kv_limit: u64,
        body_format: BodyFormat,
    ) -> Self {
        Self {
            codec,
            kv,
            serializer,
            kv_limit: kv_limit.max(1),
            body_format,
        }
    }

    /// Handler using the tenant, page size and body format of `config`
    pub fn from_config(config: &Config, kv: Arc<dyn KvHandler>) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(
            Arc::new(TupleCodecHandler::new(config.tenant_id)),
            kv,
            Arc::new(DefaultValueSerializer::new()),
            config.kv_scan_limit,
            config.body_format,
        ))
    }

    // =========================================================================
    // Keys
    // =========================================================================

    /// (tenant, db, table, index, extra)
    pub fn make_prefix_with_one_extra_id(
        &self,
        db_id: u64,
        table_id: u64,
        index_id: u64,
        extra_id: u64,
    ) -> Vec<u8> {
        let tke = self.codec.get_encoder();
        let mut buf = BytesMut::with_capacity(45);
        tke.encode_index_prefix(&mut buf, db_id, table_id, index_id);
        tke.ordered_encoder().encode_uint64(&mut buf, extra_id);
        buf.to_vec()
    }

    /// Key of the descriptor `id` under `parent_id`
    fn descriptor_key(&self, parent_id: u64, id: u64) -> Vec<u8> {
        let mut key = self.make_prefix_with_one_extra_id(
            INTERNAL_DATABASE_ID,
            INTERNAL_DESCRIPTOR_TABLE_ID,
            PRIMARY_INDEX_ID,
            parent_id,
        );
        let mut buf = BytesMut::with_capacity(9);
        self.codec
            .get_encoder()
            .ordered_encoder()
            .encode_uint64(&mut buf, id);
        key.extend_from_slice(&buf);
        key
    }

    fn async_gc_key(&self, epoch: u64) -> Vec<u8> {
        self.make_prefix_with_one_extra_id(
            INTERNAL_DATABASE_ID,
            INTERNAL_ASYNC_GC_TABLE_ID,
            PRIMARY_INDEX_ID,
            epoch,
        )
    }

    // =========================================================================
    // Values
    // =========================================================================

    /// Value (parentID, ID, name, body)
    pub fn encode_fields_into_value(
        &self,
        parent_id: u64,
        id: u64,
        name: &str,
        body: &[u8],
    ) -> Result<TupleValue> {
        encode_fields(
            self.serializer.as_ref(),
            &[
                FieldValue::Uint64(parent_id),
                FieldValue::Uint64(id),
                FieldValue::String(name.to_string()),
                FieldValue::Bytes(body.to_vec()),
            ],
        )
    }

    /// Decode the four fields of a descriptor or async-GC value
    pub fn decode_value(&self, data: &[u8]) -> Result<Vec<DecodedItem>> {
        decode_fields(self.serializer.as_ref(), data, VALUE_FIELD_COUNT)
    }

    fn marshal<T: Serialize>(&self, desc: &T) -> Result<Vec<u8>> {
        let body = match self.body_format {
            BodyFormat::Json => serde_json::to_vec(desc).map_err(|e| e.to_string()),
            BodyFormat::Bincode => bincode::serialize(desc).map_err(|e| e.to_string()),
        };
        body.map_err(StrataError::Serialization)
    }

    fn unmarshal<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T> {
        let desc: std::result::Result<T, String> = match self.body_format {
            BodyFormat::Json => serde_json::from_slice(data).map_err(|e| e.to_string()),
            BodyFormat::Bincode => bincode::deserialize(data).map_err(|e| e.to_string()),
        };
        desc.map_err(StrataError::DecodeDescriptor)
    }

    /// Body bytes of a decoded descriptor value, type-checked
    fn take_body(mut items: Vec<DecodedItem>, attr: usize) -> Result<Vec<u8>> {
        check_type(&items[attr], ValueType::Bytes)?;
        let item = items.swap_remove(attr);
        item.value.into_bytes().ok_or(StrataError::DescriptorNotFound)
    }

    // =========================================================================
    // Scans
    // =========================================================================

    /// Page through every value whose key starts with `prefix`, handing
    /// each to `visit` until it returns `true`
    fn scan<F>(&self, prefix: Vec<u8>, mut visit: F) -> Result<()>
    where
        F: FnMut(&[u8]) -> Result<bool>,
    {
        let prefix_len = prefix.len();
        let mut start = prefix;
        loop {
            let (keys, values) = self.kv.get_with_prefix(&start, prefix_len, self.kv_limit)?;
            let Some(last) = keys.last() else {
                return Ok(());
            };
            for value in &values {
                if visit(value)? {
                    return Ok(());
                }
            }
            start = successor_of_key(last);
        }
    }

    /// Decode every descriptor value under `parent_id` and pass it to
    /// `callback`. Returns the first body the callback yields, or
    /// `DescriptorNotFound` once the scan is exhausted.
    pub fn get_values_with_prefix<F>(&self, parent_id: u64, mut callback: F) -> Result<Vec<u8>>
    where
        F: FnMut(&[DecodedItem]) -> Result<Option<Vec<u8>>>,
    {
        let prefix = self.make_prefix_with_one_extra_id(
            INTERNAL_DATABASE_ID,
            INTERNAL_DESCRIPTOR_TABLE_ID,
            PRIMARY_INDEX_ID,
            parent_id,
        );
        let mut found = None;
        self.scan(prefix, |value| {
            let items = self.decode_value(value)?;
            found = callback(&items)?;
            Ok(found.is_some())
        })?;
        found.ok_or(StrataError::DescriptorNotFound)
    }

    fn get_value_by_name(&self, parent_id: u64, name: &str) -> Result<Vec<u8>> {
        self.get_values_with_prefix(parent_id, |items| {
            check_type(&items[DESC_NAME_ATTR], ValueType::String)?;
            check_type(&items[DESC_BODY_ATTR], ValueType::Bytes)?;
            if items[DESC_NAME_ATTR].value.as_str() != Some(name) {
                return Ok(None);
            }
            Ok(items[DESC_BODY_ATTR].value.as_bytes().map(<[u8]>::to_vec))
        })
    }

    fn list_bodies(&self, parent_id: u64) -> Result<Vec<Vec<u8>>> {
        let mut bodies = Vec::new();
        let result = self.get_values_with_prefix(parent_id, |items| {
            check_type(&items[DESC_BODY_ATTR], ValueType::Bytes)?;
            if let Some(body) = items[DESC_BODY_ATTR].value.as_bytes() {
                bodies.push(body.to_vec());
            }
            Ok(None)
        });
        match result {
            Ok(_) | Err(StrataError::DescriptorNotFound) => Ok(bodies),
            Err(err) => Err(err),
        }
    }

    /// Every relation stored under `parent_id`, in ID order
    pub fn list_relation_descs(&self, parent_id: u64) -> Result<Vec<RelationDesc>> {
        self.list_bodies(parent_id)?
            .iter()
            .map(|body| self.unmarshal(body))
            .collect()
    }

    /// Every database, in ID order
    pub fn list_database_descs(&self) -> Result<Vec<DatabaseDesc>> {
        self.list_bodies(DATABASE_PARENT_ID)?
            .iter()
            .map(|body| self.unmarshal(body))
            .collect()
    }

    fn load_body_by_id(&self, parent_id: u64, id: u64) -> Result<Vec<u8>> {
        let value = self.kv.get(&self.descriptor_key(parent_id, id))?;
        let items = self.decode_value(&value)?;
        Self::take_body(items, DESC_BODY_ATTR)
    }

    fn check_identity(
        stored_name: &str,
        stored_id: u32,
        name: &str,
        new_name: &str,
        new_id: u32,
    ) -> Result<()> {
        if stored_name != name || stored_id != new_id || stored_name != new_name {
            tracing::warn!(
                name,
                stored_id,
                new_id,
                "descriptor saved under this name is not the wanted one"
            );
            return Err(StrataError::DescriptorMismatch);
        }
        Ok(())
    }
}

fn check_type(item: &DecodedItem, expected: ValueType) -> Result<()> {
    if !item.is_value_type(expected) {
        tracing::warn!(
            expected = ?expected,
            actual = ?item.value_type(),
            "descriptor field type mismatch"
        );
        return Err(StrataError::TypeMismatch {
            expected,
            actual: item.value_type(),
        });
    }
    Ok(())
}

impl DescriptorHandler for DescriptorHandlerImpl {
    // =========================================================================
    // Relations
    // =========================================================================

    fn load_relation_desc_by_name(&self, parent_id: u64, name: &str) -> Result<RelationDesc> {
        let body = self.get_value_by_name(parent_id, name)?;
        self.unmarshal(&body)
    }

    fn load_relation_desc_by_id(&self, parent_id: u64, table_id: u64) -> Result<RelationDesc> {
        let body = self.load_body_by_id(parent_id, table_id)?;
        self.unmarshal(&body)
    }

    fn store_relation_desc_by_name(
        &self,
        parent_id: u64,
        name: &str,
        desc: &RelationDesc,
    ) -> Result<()> {
        match self.load_relation_desc_by_name(parent_id, name) {
            Ok(stored) => {
                Self::check_identity(&stored.name, stored.id, name, &desc.name, desc.id)?;
                self.store_relation_desc_by_id(parent_id, desc.id as u64, desc)
            }
            Err(err) if err.is_not_found() => {
                self.store_relation_desc_by_id(parent_id, desc.id as u64, desc)
            }
            Err(err) => Err(err),
        }
    }

    fn store_relation_desc_by_id(
        &self,
        parent_id: u64,
        table_id: u64,
        desc: &RelationDesc,
    ) -> Result<()> {
        let key = self.descriptor_key(parent_id, table_id);
        let body = self.marshal(desc)?;
        let value = self.encode_fields_into_value(parent_id, desc.id as u64, &desc.name, &body)?;
        self.kv.set(key, value)?;
        tracing::debug!(parent_id, table_id, name = %desc.name, "relation descriptor stored");
        Ok(())
    }

    fn delete_relation_desc_by_id(&self, parent_id: u64, table_id: u64) -> Result<()> {
        self.kv.delete(&self.descriptor_key(parent_id, table_id))
    }

    // =========================================================================
    // Databases
    // =========================================================================

    fn load_database_desc_by_name(&self, name: &str) -> Result<DatabaseDesc> {
        let body = self.get_value_by_name(DATABASE_PARENT_ID, name)?;
        self.unmarshal(&body)
    }

    fn load_database_desc_by_id(&self, db_id: u64) -> Result<DatabaseDesc> {
        let body = self.load_body_by_id(DATABASE_PARENT_ID, db_id)?;
        self.unmarshal(&body)
    }

    fn store_database_desc_by_name(&self, name: &str, desc: &DatabaseDesc) -> Result<()> {
        match self.load_database_desc_by_name(name) {
            Ok(stored) => {
                Self::check_identity(&stored.name, stored.id, name, &desc.name, desc.id)?;
                self.store_database_desc_by_id(desc.id as u64, desc)
            }
            Err(err) if err.is_not_found() => self.store_database_desc_by_id(desc.id as u64, desc),
            Err(err) => Err(err),
        }
    }

    fn store_database_desc_by_id(&self, db_id: u64, desc: &DatabaseDesc) -> Result<()> {
        let key = self.descriptor_key(DATABASE_PARENT_ID, db_id);
        let body = self.marshal(desc)?;
        let value =
            self.encode_fields_into_value(DATABASE_PARENT_ID, desc.id as u64, &desc.name, &body)?;
        self.kv.set(key, value)?;
        tracing::debug!(db_id, name = %desc.name, "database descriptor stored");
        Ok(())
    }

    fn delete_database_desc_by_id(&self, db_id: u64) -> Result<()> {
        self.kv.delete(&self.descriptor_key(DATABASE_PARENT_ID, db_id))
    }

    // =========================================================================
    // Async GC
    // =========================================================================

    fn store_relation_desc_into_async_gc(
        &self,
        epoch: u64,
        db_id: u64,
        desc: &RelationDesc,
    ) -> Result<()> {
        let body = self.marshal(desc)?;
        let value = encode_fields(
            self.serializer.as_ref(),
            &[
                FieldValue::Uint64(epoch),
                FieldValue::Uint64(db_id),
                FieldValue::Uint64(desc.id as u64),
                FieldValue::Bytes(body),
            ],
        )?;
        self.kv.set(self.async_gc_key(epoch), value)?;
        tracing::debug!(epoch, db_id, table_id = desc.id, "relation staged for async gc");
        Ok(())
    }

    fn list_relation_desc_from_async_gc(&self, epoch: u64) -> Result<Vec<AsyncGcEntry>> {
        let mut entries = Vec::new();
        self.scan(self.async_gc_key(epoch), |value| {
            let items = self.decode_value(value)?;
            let field = |attr: usize| -> Result<u64> {
                check_type(&items[attr], ValueType::Uint64)?;
                items[attr].value.as_u64().ok_or(StrataError::DescriptorNotFound)
            };
            let epoch = field(ASYNC_GC_EPOCH_ATTR)?;
            let db_id = field(ASYNC_GC_DB_ID_ATTR)?;
            let table_id = field(ASYNC_GC_TABLE_ID_ATTR)?;
            let body = Self::take_body(items, ASYNC_GC_BODY_ATTR)?;
            entries.push(AsyncGcEntry {
                epoch,
                db_id,
                table_id,
                desc: self.unmarshal(&body)?,
            });
            Ok(false)
        })?;
        Ok(entries)
    }
}
