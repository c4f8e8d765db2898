//! Declaration model
//!
//! Immutable records produced by the decoder. A [`ClassDeclaration`] owns its
//! constructors, functions and properties; each of those owns its value
//! parameters. Records are assembled through the builders in this module and
//! never change afterwards.

use crate::flags::{Flag, Flags};
use indexmap::IndexMap;

/// Reserved name of constructors
pub const CONSTRUCTOR_NAME: &str = "<init>";

/// A value parameter of a constructor or function
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ValueParameterDeclaration {
    flags: Flags,
    name: String,
}

impl ValueParameterDeclaration {
    /// Create a value parameter
    pub fn new(flags: Flags, name: impl Into<String>) -> Self {
        Self {
            flags,
            name: name.into(),
        }
    }

    /// Parameter flags
    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Check a parameter flag
    pub fn has(&self, flag: Flag) -> bool {
        self.flags.test(flag)
    }

    /// Parameter name
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A constructor or function
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FunctionDeclaration {
    flags: Flags,
    name: String,
    signature: Option<String>,
    parameters: Vec<ValueParameterDeclaration>,
}

impl FunctionDeclaration {
    /// Function flags
    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Check a function flag
    pub fn has(&self, flag: Flag) -> bool {
        self.flags.test(flag)
    }

    /// Function name (`<init>` for constructors)
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Host-level method signature (`name` + descriptor)
    pub fn signature(&self) -> Option<&str> {
        self.signature.as_deref()
    }

    /// Value parameters in source order
    pub fn parameters(&self) -> &[ValueParameterDeclaration] {
        &self.parameters
    }

    /// Whether this is a constructor
    pub fn is_constructor(&self) -> bool {
        self.name == CONSTRUCTOR_NAME
    }
}

/// Builder for a [`FunctionDeclaration`]
#[derive(Debug, Clone)]
pub struct FunctionBuilder {
    function: FunctionDeclaration,
}

impl FunctionBuilder {
    /// Start a function
    pub fn new(flags: Flags, name: impl Into<String>) -> Self {
        Self {
            function: FunctionDeclaration {
                flags,
                name: name.into(),
                signature: None,
                parameters: Vec::new(),
            },
        }
    }

    /// Start a constructor
    pub fn constructor(flags: Flags) -> Self {
        Self::new(flags, CONSTRUCTOR_NAME)
    }

    /// Replace the flags
    pub fn flags(mut self, flags: Flags) -> Self {
        self.function.flags = flags;
        self
    }

    /// Set the host-level signature
    pub fn signature(mut self, signature: impl Into<String>) -> Self {
        self.function.signature = Some(signature.into());
        self
    }

    /// Append a value parameter
    pub fn parameter(mut self, parameter: ValueParameterDeclaration) -> Self {
        self.function.parameters.push(parameter);
        self
    }

    /// Name the function is being built with
    pub fn name(&self) -> &str {
        &self.function.name
    }

    /// Seal the function
    pub fn build(self) -> FunctionDeclaration {
        self.function
    }
}

/// A property
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyDeclaration {
    flags: Flags,
    name: String,
    getter_flags: Option<Flags>,
    setter_flags: Option<Flags>,
    field_signature: Option<String>,
    getter_signature: Option<String>,
    setter_signature: Option<String>,
    annotation_carrier_signature: Option<String>,
}

impl PropertyDeclaration {
    /// Property flags
    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Check a property flag
    pub fn has(&self, flag: Flag) -> bool {
        self.flags.test(flag)
    }

    /// Property name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Getter flags, when encoded
    pub fn getter_flags(&self) -> Option<Flags> {
        self.getter_flags
    }

    /// Setter flags, when encoded
    pub fn setter_flags(&self) -> Option<Flags> {
        self.setter_flags
    }

    /// Host-level signature of the backing field (`name:descriptor`)
    pub fn field_signature(&self) -> Option<&str> {
        self.field_signature.as_deref()
    }

    /// Host-level signature of the getter
    pub fn getter_signature(&self) -> Option<&str> {
        self.getter_signature.as_deref()
    }

    /// Host-level signature of the setter
    pub fn setter_signature(&self) -> Option<&str> {
        self.setter_signature.as_deref()
    }

    /// Signature of the synthetic method holding the property's annotations
    pub fn annotation_carrier_signature(&self) -> Option<&str> {
        self.annotation_carrier_signature.as_deref()
    }
}

/// Builder for a [`PropertyDeclaration`]
#[derive(Debug, Clone)]
pub struct PropertyBuilder {
    property: PropertyDeclaration,
}

impl PropertyBuilder {
    /// Start a property
    pub fn new(flags: Flags, name: impl Into<String>) -> Self {
        Self {
            property: PropertyDeclaration {
                flags,
                name: name.into(),
                getter_flags: None,
                setter_flags: None,
                field_signature: None,
                getter_signature: None,
                setter_signature: None,
                annotation_carrier_signature: None,
            },
        }
    }

    /// Replace the flags
    pub fn flags(mut self, flags: Flags) -> Self {
        self.property.flags = flags;
        self
    }

    /// Set the getter flags
    pub fn getter_flags(mut self, flags: Flags) -> Self {
        self.property.getter_flags = Some(flags);
        self
    }

    /// Set the setter flags
    pub fn setter_flags(mut self, flags: Flags) -> Self {
        self.property.setter_flags = Some(flags);
        self
    }

    /// Set or clear the backing field signature
    pub fn field_signature(mut self, signature: Option<String>) -> Self {
        self.property.field_signature = signature;
        self
    }

    /// Set or clear the getter signature
    pub fn getter_signature(mut self, signature: Option<String>) -> Self {
        self.property.getter_signature = signature;
        self
    }

    /// Set or clear the setter signature
    pub fn setter_signature(mut self, signature: Option<String>) -> Self {
        self.property.setter_signature = signature;
        self
    }

    /// Set or clear the annotation-carrier method signature
    pub fn annotation_carrier_signature(mut self, signature: Option<String>) -> Self {
        self.property.annotation_carrier_signature = signature;
        self
    }

    /// Name the property is being built with
    pub fn name(&self) -> &str {
        &self.property.name
    }

    /// Seal the property
    pub fn build(self) -> PropertyDeclaration {
        self.property
    }
}

/// A decoded class and everything it declares
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDeclaration {
    flags: Flags,
    name: String,
    companion_object_name: Option<String>,
    constructors: Vec<FunctionDeclaration>,
    functions: Vec<FunctionDeclaration>,
    properties: Vec<PropertyDeclaration>,
    functions_by_signature: IndexMap<String, usize>,
    properties_by_field_signature: IndexMap<String, usize>,
}

/// Position of a function in either list
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionSlot {
    Constructor(usize),
    Function(usize),
}

impl ClassDeclaration {
    /// Class flags
    pub fn flags(&self) -> Flags {
        self.flags
    }

    /// Check a class flag
    pub fn has(&self, flag: Flag) -> bool {
        self.flags.test(flag)
    }

    /// Class name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Simple name of the companion object, if any
    pub fn companion_object_name(&self) -> Option<&str> {
        self.companion_object_name.as_deref()
    }

    /// Constructors in declaration order, without duplicates
    pub fn constructors(&self) -> &[FunctionDeclaration] {
        &self.constructors
    }

    /// All functions in declaration order, including those without a signature
    pub fn functions(&self) -> &[FunctionDeclaration] {
        &self.functions
    }

    /// All properties in declaration order, including those without a backing field
    pub fn properties(&self) -> &[PropertyDeclaration] {
        &self.properties
    }

    /// Look up a constructor or function by host-level signature
    pub fn function_by_signature(&self, signature: &str) -> Option<&FunctionDeclaration> {
        self.functions_by_signature
            .get(signature)
            .map(|&slot| self.slot(slot))
    }

    /// Constructors and functions keyed by host-level signature
    pub fn functions_by_signature(&self) -> impl Iterator<Item = (&str, &FunctionDeclaration)> {
        self.functions_by_signature
            .iter()
            .map(|(signature, &slot)| (signature.as_str(), self.slot(slot)))
    }

    /// Look up a property by backing field signature
    pub fn property_by_field_signature(&self, signature: &str) -> Option<&PropertyDeclaration> {
        self.properties_by_field_signature
            .get(signature)
            .map(|&index| &self.properties[index])
    }

    /// Properties with a backing field, keyed by field signature
    pub fn properties_by_field_signature(
        &self,
    ) -> impl Iterator<Item = (&str, &PropertyDeclaration)> {
        self.properties_by_field_signature
            .iter()
            .map(|(signature, &index)| (signature.as_str(), &self.properties[index]))
    }

    fn slot(&self, slot: usize) -> &FunctionDeclaration {
        let constructors = self.constructors.len();
        if slot < constructors {
            &self.constructors[slot]
        } else {
            &self.functions[slot - constructors]
        }
    }
}

/// Builder for a [`ClassDeclaration`]
#[derive(Debug, Clone)]
pub struct ClassBuilder {
    flags: Flags,
    name: String,
    companion_object_name: Option<String>,
    constructors: Vec<FunctionDeclaration>,
    functions: Vec<FunctionDeclaration>,
    properties: Vec<PropertyDeclaration>,
    functions_by_signature: IndexMap<String, FunctionSlot>,
    properties_by_field_signature: IndexMap<String, usize>,
}

impl ClassBuilder {
    /// Start a class
    pub fn new(flags: Flags, name: impl Into<String>) -> Self {
        Self {
            flags,
            name: name.into(),
            companion_object_name: None,
            constructors: Vec::new(),
            functions: Vec::new(),
            properties: Vec::new(),
            functions_by_signature: IndexMap::new(),
            properties_by_field_signature: IndexMap::new(),
        }
    }

    /// Replace the flags
    pub fn flags(&mut self, flags: Flags) -> &mut Self {
        self.flags = flags;
        self
    }

    /// Replace the name
    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = name.into();
        self
    }

    /// Record the companion object name
    pub fn companion_object_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.companion_object_name = Some(name.into());
        self
    }

    /// Add a constructor; it is also indexed by signature when it has one
    pub fn add_constructor(&mut self, constructor: FunctionDeclaration) -> &mut Self {
        let index = match self.constructors.iter().position(|c| *c == constructor) {
            Some(existing) => existing,
            None => {
                self.constructors.push(constructor);
                self.constructors.len() - 1
            }
        };
        if let Some(signature) = self.constructors[index].signature.clone() {
            self.functions_by_signature
                .insert(signature, FunctionSlot::Constructor(index));
        }
        self
    }

    /// Add a function; a repeated signature replaces the earlier index entry
    pub fn add_function(&mut self, function: FunctionDeclaration) -> &mut Self {
        if let Some(signature) = function.signature.clone() {
            self.functions_by_signature
                .insert(signature, FunctionSlot::Function(self.functions.len()));
        }
        self.functions.push(function);
        self
    }

    /// Add a property; only properties with a backing field are indexed
    pub fn add_property(&mut self, property: PropertyDeclaration) -> &mut Self {
        if let Some(signature) = property.field_signature.clone() {
            self.properties_by_field_signature
                .insert(signature, self.properties.len());
        }
        self.properties.push(property);
        self
    }

    /// Seal the class
    pub fn build(self) -> ClassDeclaration {
        let constructors = self.constructors.len();
        let functions_by_signature = self
            .functions_by_signature
            .into_iter()
            .map(|(signature, slot)| {
                let index = match slot {
                    FunctionSlot::Constructor(index) => index,
                    FunctionSlot::Function(index) => constructors + index,
                };
                (signature, index)
            })
            .collect();

        ClassDeclaration {
            flags: self.flags,
            name: self.name,
            companion_object_name: self.companion_object_name,
            constructors: self.constructors,
            functions: self.functions,
            properties: self.properties,
            functions_by_signature,
            properties_by_field_signature: self.properties_by_field_signature,
        }
    }
}
