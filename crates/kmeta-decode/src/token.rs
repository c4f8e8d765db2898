//! Structural token stream over the encoded declaration tree
//!
//! [`TokenReader`] walks the nested wire messages one field at a time and
//! yields a flat stream of [`Token`]s: `Enter`/`Exit` bracket each
//! declaration, scalar tokens carry its fields, and `Extension` hands over
//! the raw payload of an extension entry keyed by its type tag. Fields a
//! declaration kind does not know are skipped.

use crate::error::DecodeError;
use crate::wire::{WireReader, WireType};
use std::fmt;

/// Field numbers of the encoded messages
pub mod fields {
    /// Flags field, shared by every declaration kind
    pub const FLAGS: u32 = 1;

    /// Class message
    pub mod class {
        /// Class name
        pub const NAME: u32 = 3;
        /// Companion object name
        pub const COMPANION_OBJECT_NAME: u32 = 4;
        /// Nested constructor
        pub const CONSTRUCTOR: u32 = 8;
        /// Nested function
        pub const FUNCTION: u32 = 9;
        /// Nested property
        pub const PROPERTY: u32 = 10;
    }

    /// Constructor message
    pub mod constructor {
        /// Nested value parameter
        pub const VALUE_PARAMETER: u32 = 2;
    }

    /// Function message
    pub mod function {
        /// Function name
        pub const NAME: u32 = 2;
        /// Nested value parameter
        pub const VALUE_PARAMETER: u32 = 6;
    }

    /// Property message
    pub mod property {
        /// Property name
        pub const NAME: u32 = 2;
        /// Getter flags
        pub const GETTER_FLAGS: u32 = 7;
        /// Setter flags
        pub const SETTER_FLAGS: u32 = 8;
    }

    /// Value parameter message
    pub mod value_parameter {
        /// Parameter name
        pub const NAME: u32 = 2;
    }

    /// Method signature inside the host-binding extension
    pub mod method_signature {
        /// Method name
        pub const NAME: u32 = 1;
        /// Method descriptor
        pub const DESC: u32 = 2;
    }

    /// Field signature inside the host-binding property extension
    pub mod field_signature {
        /// Field name
        pub const NAME: u32 = 1;
        /// Field descriptor
        pub const DESC: u32 = 2;
    }

    /// Host-binding property extension
    pub mod property_signature {
        /// Backing field signature
        pub const FIELD: u32 = 1;
        /// Synthetic annotation-carrier method
        pub const SYNTHETIC_METHOD: u32 = 2;
        /// Getter signature
        pub const GETTER: u32 = 3;
        /// Setter signature
        pub const SETTER: u32 = 4;
    }
}

/// Field numbers at or above this value are extension entries
pub const EXTENSION_TAG_BASE: u32 = 100;

/// Type tag of the host-binding (JVM signature) extension
pub const HOST_BINDING_EXTENSION: u32 = 100;

/// Kind of a declaration node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    /// The class itself
    Class,
    /// A constructor
    Constructor,
    /// A function
    Function,
    /// A property
    Property,
    /// A value parameter of a constructor or function
    ValueParameter,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Class => "class",
            NodeKind::Constructor => "constructor",
            NodeKind::Function => "function",
            NodeKind::Property => "property",
            NodeKind::ValueParameter => "value parameter",
        };
        f.write_str(name)
    }
}

/// One structural token of the declaration tree
#[derive(Debug, Clone, PartialEq)]
pub enum Token<'a> {
    /// A declaration starts
    Enter(NodeKind),
    /// The innermost open declaration ends
    Exit(NodeKind),
    /// Flags of the innermost declaration
    Flags(u32),
    /// Name of the innermost declaration, as a string table index
    Name(u64),
    /// Companion object name of the class, as a string table index
    CompanionObject(u64),
    /// Getter flags of a property
    GetterFlags(u32),
    /// Setter flags of a property
    SetterFlags(u32),
    /// An extension entry attached to the innermost declaration
    Extension {
        /// Extension type tag
        tag: u32,
        /// Raw extension payload
        payload: &'a [u8],
    },
}

struct Frame<'a> {
    kind: NodeKind,
    reader: WireReader<'a>,
}

/// Pull reader producing [`Token`]s from an encoded class message
pub struct TokenReader<'a> {
    root: Option<&'a [u8]>,
    stack: Vec<Frame<'a>>,
}

impl<'a> TokenReader<'a> {
    /// Create a reader over an encoded class message
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            root: Some(data),
            stack: Vec::new(),
        }
    }

    /// Current nesting depth
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    fn next_token(&mut self) -> Result<Option<Token<'a>>, DecodeError> {
        if let Some(data) = self.root.take() {
            self.stack.push(Frame {
                kind: NodeKind::Class,
                reader: WireReader::new(data),
            });
            return Ok(Some(Token::Enter(NodeKind::Class)));
        }

        loop {
            let Some(frame) = self.stack.last_mut() else {
                return Ok(None);
            };
            if !frame.reader.has_more() {
                let kind = frame.kind;
                self.stack.pop();
                return Ok(Some(Token::Exit(kind)));
            }

            let kind = frame.kind;
            let (field, wire_type) = frame.reader.read_key()?;
            match read_field(kind, field, wire_type, &mut frame.reader)? {
                Field::Token(token) => return Ok(Some(token)),
                Field::Child(child, payload) => {
                    self.stack.push(Frame {
                        kind: child,
                        reader: WireReader::new(payload),
                    });
                    return Ok(Some(Token::Enter(child)));
                }
                Field::Skipped => {
                    tracing::trace!(node = %kind, field, ?wire_type, "skipping unknown field");
                }
            }
        }
    }
}

impl<'a> Iterator for TokenReader<'a> {
    type Item = Result<Token<'a>, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_token() {
            Ok(token) => token.map(Ok),
            Err(err) => {
                // Stop after the first error
                self.stack.clear();
                Some(Err(err))
            }
        }
    }
}

enum Field<'a> {
    Token(Token<'a>),
    Child(NodeKind, &'a [u8]),
    Skipped,
}

fn read_field<'a>(
    kind: NodeKind,
    field: u32,
    wire_type: WireType,
    reader: &mut WireReader<'a>,
) -> Result<Field<'a>, DecodeError> {
    use NodeKind::*;

    let expect = |expected: WireType| {
        if wire_type == expected {
            Ok(())
        } else {
            Err(DecodeError::UnexpectedField {
                node: kind,
                field,
                wire_type,
            })
        }
    };

    let result = match (kind, field) {
        (_, fields::FLAGS) => {
            expect(WireType::Varint)?;
            Field::Token(Token::Flags(reader.read_u32()?))
        }
        (Class, fields::class::NAME)
        | (Function, fields::function::NAME)
        | (Property, fields::property::NAME)
        | (ValueParameter, fields::value_parameter::NAME) => {
            expect(WireType::Varint)?;
            Field::Token(Token::Name(reader.read_varint()?))
        }
        (Class, fields::class::COMPANION_OBJECT_NAME) => {
            expect(WireType::Varint)?;
            Field::Token(Token::CompanionObject(reader.read_varint()?))
        }
        (Property, fields::property::GETTER_FLAGS) => {
            expect(WireType::Varint)?;
            Field::Token(Token::GetterFlags(reader.read_u32()?))
        }
        (Property, fields::property::SETTER_FLAGS) => {
            expect(WireType::Varint)?;
            Field::Token(Token::SetterFlags(reader.read_u32()?))
        }
        (Class, fields::class::CONSTRUCTOR) => {
            expect(WireType::LengthDelimited)?;
            Field::Child(Constructor, reader.read_bytes()?)
        }
        (Class, fields::class::FUNCTION) => {
            expect(WireType::LengthDelimited)?;
            Field::Child(Function, reader.read_bytes()?)
        }
        (Class, fields::class::PROPERTY) => {
            expect(WireType::LengthDelimited)?;
            Field::Child(Property, reader.read_bytes()?)
        }
        (Constructor, fields::constructor::VALUE_PARAMETER)
        | (Function, fields::function::VALUE_PARAMETER) => {
            expect(WireType::LengthDelimited)?;
            Field::Child(ValueParameter, reader.read_bytes()?)
        }
        (Constructor | Function | Property, tag)
            if tag >= EXTENSION_TAG_BASE && wire_type == WireType::LengthDelimited =>
        {
            Field::Token(Token::Extension {
                tag,
                payload: reader.read_bytes()?,
            })
        }
        _ => {
            reader.skip(wire_type)?;
            Field::Skipped
        }
    };
    Ok(result)
}
