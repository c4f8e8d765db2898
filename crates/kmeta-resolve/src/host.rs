//! Host reflection boundary

use kmeta_decode::AnnotationSource;
use std::fmt::Debug;
use std::hash::Hash;

/// A type as seen by the host reflection layer
///
/// Descriptors use the same rendering as the decoded metadata: methods are
/// `name(params)ret`, fields are `name:type`.
pub trait HostType {
    /// Identity of the type within a session
    type Id: Eq + Hash + Clone + Debug;
    /// Method handle
    type Method: Clone + Debug;
    /// Field handle
    type Field: Eq + Hash + Clone + Debug;

    /// Identity of this type
    fn id(&self) -> Self::Id;

    /// Name used in diagnostics
    fn name(&self) -> String;

    /// The metadata container attached to the type, if any
    fn metadata(&self) -> Option<&dyn AnnotationSource>;

    /// Methods declared by the type
    fn methods(&self) -> Vec<Self::Method>;

    /// Host-level signature of a method
    fn method_descriptor(&self, method: &Self::Method) -> String;

    /// Host-level signature of a field
    fn field_descriptor(&self, field: &Self::Field) -> String;

    /// Simple name of a field
    fn field_name(&self, field: &Self::Field) -> String;
}
