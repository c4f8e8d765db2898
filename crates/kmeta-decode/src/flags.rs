//! Declaration flag bitsets
//!
//! Every declaration carries a packed integer of boolean and enum-like traits.
//! A [`Flag`] names one trait and knows where it lives inside the integer: a
//! bit range plus the value that range must hold. Which flags are meaningful
//! depends on the kind of declaration the bitset belongs to.

use std::fmt;

/// A named declaration trait encoded inside a [`Flags`] bitset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Flag {
    // ===== Common =====
    /// Declaration carries annotations
    HasAnnotations,
    /// `internal` visibility
    IsInternal,
    /// `private` visibility
    IsPrivate,
    /// `protected` visibility
    IsProtected,
    /// `public` visibility
    IsPublic,
    /// Private to the receiver instance
    IsPrivateToThis,
    /// Local declaration
    IsLocal,
    /// `final` modality
    IsFinal,
    /// `open` modality
    IsOpen,
    /// `abstract` modality
    IsAbstract,
    /// `sealed` modality
    IsSealed,

    // ===== Class =====
    /// Plain class
    IsClass,
    /// Interface
    IsInterface,
    /// Enum class
    IsEnumClass,
    /// Enum entry
    IsEnumEntry,
    /// Annotation class
    IsAnnotationClass,
    /// Object declaration
    IsObject,
    /// Companion object
    IsCompanionObject,
    /// Inner class
    IsInner,
    /// Data class
    IsData,
    /// Value (inline) class
    IsValue,
    /// Functional interface
    IsFunInterface,

    // ===== Constructor =====
    /// Secondary constructor
    IsSecondary,

    // ===== Function & property member kind =====
    /// Declared in source
    IsDeclaration,
    /// Inherited without being redeclared
    IsFakeOverride,
    /// Produced by interface delegation
    IsDelegation,
    /// Synthesized by the compiler
    IsSynthesized,

    // ===== Function =====
    /// Operator function
    IsOperator,
    /// Infix function
    IsInfix,
    /// Inline function
    IsInline,
    /// Suspending function
    IsSuspend,

    // ===== Property =====
    /// Mutable property
    IsVar,
    /// Property has a getter
    HasGetter,
    /// Property has a setter
    HasSetter,
    /// Compile-time constant
    IsConst,
    /// Late-initialized property
    IsLateinit,
    /// Property is backed by a delegate
    IsDelegated,

    // ===== Value parameter =====
    /// Parameter declares a default value
    DeclaresDefaultValue,
    /// `crossinline` parameter
    IsCrossinline,
    /// `noinline` parameter
    IsNoinline,
}

/// Bit range and expected value for a flag
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct FlagField {
    offset: u32,
    width: u32,
    value: u32,
}

const fn field(offset: u32, width: u32, value: u32) -> FlagField {
    FlagField { offset, width, value }
}

const fn bit(offset: u32) -> FlagField {
    field(offset, 1, 1)
}

const VISIBILITY: u32 = 1;
const MODALITY: u32 = 4;
const CLASS_KIND: u32 = 6;
const MEMBER_KIND: u32 = 6;

impl Flag {
    fn field(self) -> FlagField {
        match self {
            Flag::HasAnnotations => bit(0),

            Flag::IsInternal => field(VISIBILITY, 3, 0),
            Flag::IsPrivate => field(VISIBILITY, 3, 1),
            Flag::IsProtected => field(VISIBILITY, 3, 2),
            Flag::IsPublic => field(VISIBILITY, 3, 3),
            Flag::IsPrivateToThis => field(VISIBILITY, 3, 4),
            Flag::IsLocal => field(VISIBILITY, 3, 5),

            Flag::IsFinal => field(MODALITY, 2, 0),
            Flag::IsOpen => field(MODALITY, 2, 1),
            Flag::IsAbstract => field(MODALITY, 2, 2),
            Flag::IsSealed => field(MODALITY, 2, 3),

            Flag::IsClass => field(CLASS_KIND, 3, 0),
            Flag::IsInterface => field(CLASS_KIND, 3, 1),
            Flag::IsEnumClass => field(CLASS_KIND, 3, 2),
            Flag::IsEnumEntry => field(CLASS_KIND, 3, 3),
            Flag::IsAnnotationClass => field(CLASS_KIND, 3, 4),
            Flag::IsObject => field(CLASS_KIND, 3, 5),
            Flag::IsCompanionObject => field(CLASS_KIND, 3, 6),
            Flag::IsInner => bit(9),
            Flag::IsData => bit(10),
            Flag::IsValue => bit(13),
            Flag::IsFunInterface => bit(14),

            Flag::IsSecondary => bit(4),

            Flag::IsDeclaration => field(MEMBER_KIND, 2, 0),
            Flag::IsFakeOverride => field(MEMBER_KIND, 2, 1),
            Flag::IsDelegation => field(MEMBER_KIND, 2, 2),
            Flag::IsSynthesized => field(MEMBER_KIND, 2, 3),

            Flag::IsOperator => bit(8),
            Flag::IsInfix => bit(9),
            Flag::IsInline => bit(10),
            Flag::IsSuspend => bit(13),

            Flag::IsVar => bit(8),
            Flag::HasGetter => bit(9),
            Flag::HasSetter => bit(10),
            Flag::IsConst => bit(11),
            Flag::IsLateinit => bit(12),
            Flag::IsDelegated => bit(15),

            Flag::DeclaresDefaultValue => bit(1),
            Flag::IsCrossinline => bit(2),
            Flag::IsNoinline => bit(3),
        }
    }

    /// Check whether this flag holds in a raw flags integer
    pub fn test(self, flags: u32) -> bool {
        let FlagField { offset, width, value } = self.field();
        let mask = (1u32 << width) - 1;
        (flags >> offset) & mask == value
    }

    /// Set this flag in a raw flags integer, clearing the rest of its bit range
    pub fn apply(self, flags: u32) -> u32 {
        let FlagField { offset, width, value } = self.field();
        let mask = ((1u32 << width) - 1) << offset;
        (flags & !mask) | (value << offset)
    }
}

/// Packed declaration flags
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Flags(u32);

impl Flags {
    /// Default flags of a class, constructor or function: public and final
    pub const DEFAULT: Flags = Flags(6);

    /// Default flags of a property: public, final, with a getter
    pub const DEFAULT_PROPERTY: Flags = Flags(518);

    /// Wrap a raw flags integer
    pub const fn new(bits: u32) -> Self {
        Self(bits)
    }

    /// Build a bitset from a list of flags
    pub fn of(flags: &[Flag]) -> Self {
        Self(flags.iter().fold(0, |bits, flag| flag.apply(bits)))
    }

    /// Get the raw integer
    pub const fn bits(self) -> u32 {
        self.0
    }

    /// Check whether a flag holds
    pub fn test(self, flag: Flag) -> bool {
        flag.test(self.0)
    }

    /// Return a copy with the given flag set
    pub fn with(self, flag: Flag) -> Self {
        Self(flag.apply(self.0))
    }
}

impl From<u32> for Flags {
    fn from(bits: u32) -> Self {
        Self(bits)
    }
}

impl fmt::Debug for Flags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Flags({:#x})", self.0)
    }
}
