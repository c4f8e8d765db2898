//! Per-type metadata and field correlation
//!
//! [`TypeMetadata`] pairs a host type with its decoded [`ClassDeclaration`]
//! and resolves host fields to the properties they back. Resolved getters and
//! annotation carriers are cached per field with insert-if-absent semantics,
//! so every caller observes the first stored answer.

use crate::error::ResolveError;
use crate::host::HostType;
use crate::signature_index::SignatureIndex;
use dashmap::DashMap;
use kmeta_decode::{ClassDeclaration, Flag, FunctionDeclaration, PropertyDeclaration};
use once_cell::sync::OnceCell;
use std::sync::Arc;

/// Name suffix of fields holding a property delegate
pub const DELEGATED_PROPERTY_SUFFIX: &str = "$delegate";

/// Outcome of looking up a signature the metadata promised
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedMember<M> {
    /// The host declares the member
    Found(M),
    /// The metadata names the member but the host does not declare it,
    /// e.g. because it lives in another compilation unit
    Missing,
}

impl<M> ResolvedMember<M> {
    /// Whether the member is missing
    pub fn is_missing(&self) -> bool {
        matches!(self, ResolvedMember::Missing)
    }

    /// The member, if found
    pub fn found(&self) -> Option<&M> {
        match self {
            ResolvedMember::Found(member) => Some(member),
            ResolvedMember::Missing => None,
        }
    }

    /// Unwrap a found member
    ///
    /// # Panics
    ///
    /// Panics on [`ResolvedMember::Missing`]. Check [`is_missing`] first.
    ///
    /// [`is_missing`]: ResolvedMember::is_missing
    pub fn unwrap_found(self) -> M {
        match self {
            ResolvedMember::Found(member) => member,
            ResolvedMember::Missing => panic!("called `unwrap_found` on a missing member"),
        }
    }
}

/// A host type and its decoded metadata
pub struct TypeMetadata<H: HostType> {
    host: H,
    class: Arc<ClassDeclaration>,
    signature_index: OnceCell<SignatureIndex<H::Method>>,
    annotation_carriers: DashMap<H::Field, Option<ResolvedMember<H::Method>>>,
    getters: DashMap<H::Field, Option<H::Method>>,
    default_params: OnceCell<bool>,
}

impl<H: HostType> TypeMetadata<H> {
    /// Pair a host type with its decoded class
    pub fn new(host: H, class: ClassDeclaration) -> Self {
        Self {
            host,
            class: Arc::new(class),
            signature_index: OnceCell::new(),
            annotation_carriers: DashMap::new(),
            getters: DashMap::new(),
            default_params: OnceCell::new(),
        }
    }

    /// The host type
    pub fn host(&self) -> &H {
        &self.host
    }

    /// The decoded class
    pub fn class_declaration(&self) -> &ClassDeclaration {
        &self.class
    }

    pub(crate) fn shared_class_declaration(&self) -> Arc<ClassDeclaration> {
        Arc::clone(&self.class)
    }

    /// Host methods keyed by signature, built on first use
    pub fn signature_index(&self) -> &SignatureIndex<H::Method> {
        self.signature_index
            .get_or_init(|| SignatureIndex::build(&self.host))
    }

    /// Whether any constructor has a parameter with a default value
    pub fn contains_constructor_with_default_param(&self) -> bool {
        *self.default_params.get_or_init(|| {
            self.class
                .constructors()
                .iter()
                .flat_map(FunctionDeclaration::parameters)
                .any(|parameter| parameter.has(Flag::DeclaresDefaultValue))
        })
    }

    /// The decoded function for a host method
    pub fn function_declaration(&self, method: &H::Method) -> Option<&FunctionDeclaration> {
        self.class
            .function_by_signature(&self.host.method_descriptor(method))
    }

    /// Find the property backed by `field`
    ///
    /// Looks the field up by signature first. Failing that, the field name
    /// with any `$delegate` suffix removed must match exactly one property
    /// that has a backing field.
    pub fn find_property(&self, field: &H::Field) -> Result<&PropertyDeclaration, ResolveError> {
        let signature = self.host.field_descriptor(field);
        if let Some(property) = self.class.property_by_field_signature(&signature) {
            return Ok(property);
        }

        let field_name = self.host.field_name(field);
        let candidate = field_name
            .strip_suffix(DELEGATED_PROPERTY_SUFFIX)
            .unwrap_or(&field_name);
        let matches: Vec<&PropertyDeclaration> = self
            .class
            .properties_by_field_signature()
            .map(|(_, property)| property)
            .filter(|property| property.name() == candidate)
            .collect();

        match matches.as_slice() {
            [property] => {
                tracing::debug!(
                    field = %signature,
                    property = property.name(),
                    "matched field to property by name"
                );
                Ok(*property)
            }
            _ => Err(ResolveError::PropertyNotFound {
                field: format!("{}.{}", self.host.name(), field_name),
                candidate: candidate.to_string(),
                matches: matches.len(),
            }),
        }
    }

    /// Resolve the synthetic method carrying the annotations of `field`'s property
    ///
    /// `Ok(None)` when the property has no carrier at all.
    pub fn annotation_carrier(
        &self,
        field: &H::Field,
    ) -> Result<Option<ResolvedMember<H::Method>>, ResolveError> {
        if let Some(cached) = self.annotation_carriers.get(field) {
            return Ok(cached.clone());
        }

        let carrier = self
            .find_property(field)?
            .annotation_carrier_signature()
            .map(|signature| match self.signature_index().get(signature) {
                Some(method) => ResolvedMember::Found(method.clone()),
                None => ResolvedMember::Missing,
            });
        tracing::trace!(?field, ?carrier, "cached annotation carrier");

        Ok(self
            .annotation_carriers
            .entry(field.clone())
            .or_insert(carrier)
            .clone())
    }

    /// Whether `field`'s property names a carrier the host does not declare
    pub fn is_missing_synthetic_annotation_method(
        &self,
        field: &H::Field,
    ) -> Result<bool, ResolveError> {
        Ok(self
            .annotation_carrier(field)?
            .is_some_and(|carrier| carrier.is_missing()))
    }

    /// The annotation carrier of `field`'s property, if it has one
    ///
    /// # Panics
    ///
    /// Panics when the carrier is missing from the host. Check
    /// [`is_missing_synthetic_annotation_method`] first.
    ///
    /// [`is_missing_synthetic_annotation_method`]: TypeMetadata::is_missing_synthetic_annotation_method
    pub fn synthetic_annotation_method(
        &self,
        field: &H::Field,
    ) -> Result<Option<H::Method>, ResolveError> {
        Ok(self
            .annotation_carrier(field)?
            .map(ResolvedMember::unwrap_found))
    }

    /// Resolve the getter of `field`'s property
    ///
    /// A getter signature the host does not declare yields `Ok(None)`.
    pub fn property_getter(&self, field: &H::Field) -> Result<Option<H::Method>, ResolveError> {
        if let Some(cached) = self.getters.get(field) {
            return Ok(cached.clone());
        }

        let getter = self
            .find_property(field)?
            .getter_signature()
            .and_then(|signature| self.signature_index().get(signature).cloned());
        tracing::trace!(?field, ?getter, "cached property getter");

        Ok(self
            .getters
            .entry(field.clone())
            .or_insert(getter)
            .clone())
    }
}
