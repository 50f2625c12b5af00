//! In-memory replica object store.
//!
//! Settable contents and failure injection make it the test double for the
//! remote endpoints; the runtime's S3 adapter implements the same port
//! against real object stores.

use async_trait::async_trait;
use parking_lot::RwLock;
use pv_types::{EndpointName, PartKey};
use std::collections::HashMap;

use crate::ports::outbound::{ObjectStoreError, PartMetadata, ReplicaObjectStore};

#[derive(Default)]
struct Inner {
    objects: HashMap<(EndpointName, String), PartMetadata>,
    fail_next: Option<String>,
}

/// In-memory [`ReplicaObjectStore`] keyed by endpoint and object key.
#[derive(Default)]
pub struct InMemoryObjectStore {
    inner: RwLock<Inner>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place an object on an endpoint with the given stored metadata.
    pub fn set_object(&self, endpoint: &EndpointName, key: &PartKey, metadata: PartMetadata) {
        self.inner
            .write()
            .objects
            .insert((endpoint.clone(), key.to_string()), metadata);
    }

    /// Remove an object, simulating loss on the endpoint.
    pub fn remove_object(&self, endpoint: &EndpointName, key: &PartKey) {
        self.inner
            .write()
            .objects
            .remove(&(endpoint.clone(), key.to_string()));
    }

    /// Make the next store call fail with a transport error.
    pub fn fail_next_call(&self, message: impl Into<String>) {
        self.inner.write().fail_next = Some(message.into());
    }

    fn take_failure(&self, endpoint: &EndpointName) -> Result<(), ObjectStoreError> {
        if let Some(message) = self.inner.write().fail_next.take() {
            return Err(ObjectStoreError {
                endpoint: endpoint.to_string(),
                message,
            });
        }
        Ok(())
    }
}

#[async_trait]
impl ReplicaObjectStore for InMemoryObjectStore {
    async fn exists(
        &self,
        endpoint: &EndpointName,
        key: &PartKey,
    ) -> Result<bool, ObjectStoreError> {
        self.take_failure(endpoint)?;
        Ok(self
            .inner
            .read()
            .objects
            .contains_key(&(endpoint.clone(), key.to_string())))
    }

    async fn metadata(
        &self,
        endpoint: &EndpointName,
        key: &PartKey,
    ) -> Result<Option<PartMetadata>, ObjectStoreError> {
        self.take_failure(endpoint)?;
        Ok(self
            .inner
            .read()
            .objects
            .get(&(endpoint.clone(), key.to_string()))
            .cloned())
    }

    async fn put(
        &self,
        endpoint: &EndpointName,
        key: &PartKey,
        _bytes: Vec<u8>,
        metadata: PartMetadata,
    ) -> Result<(), ObjectStoreError> {
        self.take_failure(endpoint)?;
        self.set_object(endpoint, key, metadata);
        Ok(())
    }
}
