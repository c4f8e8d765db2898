//! Analysis session cache

use crate::error::ResolveError;
use crate::host::HostType;
use crate::metadata::TypeMetadata;
use dashmap::DashMap;
use kmeta_decode::{decode_with, ClassDeclaration, DecoderConfig, Header};
use std::sync::Arc;

/// Decoded metadata of every host type touched during one analysis pass
///
/// Each type is decoded at most once. Failed decodes are not cached and are
/// reported again on the next query.
pub struct MetadataSession<H: HostType> {
    config: DecoderConfig,
    types: DashMap<H::Id, Arc<TypeMetadata<H>>>,
}

impl<H: HostType + Clone> MetadataSession<H> {
    /// Create a session with the default decoder configuration
    pub fn new() -> Self {
        Self::with_config(DecoderConfig::default())
    }

    /// Create a session with a custom decoder configuration
    pub fn with_config(config: DecoderConfig) -> Self {
        Self {
            config,
            types: DashMap::new(),
        }
    }

    /// Decoder configuration in use
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Whether `host` carries a metadata container
    pub fn has_metadata(&self, host: &H) -> bool {
        host.metadata().is_some()
    }

    /// Metadata of `host`, decoded on first use
    pub fn metadata_of(&self, host: &H) -> Result<Arc<TypeMetadata<H>>, ResolveError> {
        let id = host.id();
        if let Some(existing) = self.types.get(&id) {
            return Ok(Arc::clone(&existing));
        }

        let source = host.metadata().ok_or_else(|| ResolveError::MissingMetadata {
            type_name: host.name(),
        })?;
        let header = Header::read(source)?;
        let class = decode_with(&header, &self.config)?;
        let metadata = Arc::new(TypeMetadata::new(host.clone(), class));

        Ok(Arc::clone(&self.types.entry(id).or_insert(metadata)))
    }

    /// Decoded class of `host`
    pub fn class_declaration_of(&self, host: &H) -> Result<Arc<ClassDeclaration>, ResolveError> {
        Ok(self.metadata_of(host)?.shared_class_declaration())
    }

    /// Number of decoded types
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Whether no type has been decoded yet
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl<H: HostType + Clone> Default for MetadataSession<H> {
    fn default() -> Self {
        Self::new()
    }
}
