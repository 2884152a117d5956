//! Entry categories and attribute identifiers
//!
//! Closed enums over the category/attribute codes the engine dispatches
//! on, with `Other` escape hatches for codes it treats opaquely.
//! Numeric codes follow the DWARF `DW_TAG_*` / `DW_AT_*` encodings.

/// Category of a debug-information entry.
///
/// The payload factory and the stickiness policy dispatch on this tag.
/// Codes not in the closed set round-trip through `Other`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    CompileUnit,
    Namespace,
    Subprogram,
    Variable,
    FormalParameter,
    BaseType,
    PointerType,
    StructureType,
    UnionType,
    EnumerationType,
    Typedef,
    Member,
    Enumerator,
    LexicalBlock,
    InlinedSubroutine,
    Other(u16),
}

impl Tag {
    /// Decode a raw tag code
    pub fn from_code(code: u16) -> Self {
        match code {
            0x11 => Tag::CompileUnit,
            0x39 => Tag::Namespace,
            0x2e => Tag::Subprogram,
            0x34 => Tag::Variable,
            0x05 => Tag::FormalParameter,
            0x24 => Tag::BaseType,
            0x0f => Tag::PointerType,
            0x13 => Tag::StructureType,
            0x17 => Tag::UnionType,
            0x04 => Tag::EnumerationType,
            0x16 => Tag::Typedef,
            0x0d => Tag::Member,
            0x28 => Tag::Enumerator,
            0x0b => Tag::LexicalBlock,
            0x1d => Tag::InlinedSubroutine,
            other => Tag::Other(other),
        }
    }

    /// The raw tag code
    pub fn code(self) -> u16 {
        match self {
            Tag::CompileUnit => 0x11,
            Tag::Namespace => 0x39,
            Tag::Subprogram => 0x2e,
            Tag::Variable => 0x34,
            Tag::FormalParameter => 0x05,
            Tag::BaseType => 0x24,
            Tag::PointerType => 0x0f,
            Tag::StructureType => 0x13,
            Tag::UnionType => 0x17,
            Tag::EnumerationType => 0x04,
            Tag::Typedef => 0x16,
            Tag::Member => 0x0d,
            Tag::Enumerator => 0x28,
            Tag::LexicalBlock => 0x0b,
            Tag::InlinedSubroutine => 0x1d,
            Tag::Other(code) => code,
        }
    }

    /// Compilation-unit test; unit entries are always sticky
    #[inline]
    pub fn is_unit(self) -> bool {
        self == Tag::CompileUnit
    }

    /// Does this category introduce a lexical scope with named children?
    ///
    /// Scoped name resolution retries from the nearest ancestor for
    /// which this returns true.
    pub fn has_named_children(self) -> bool {
        matches!(
            self,
            Tag::CompileUnit
                | Tag::Namespace
                | Tag::Subprogram
                | Tag::StructureType
                | Tag::UnionType
                | Tag::EnumerationType
                | Tag::LexicalBlock
        )
    }
}

/// Attribute identifier on an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrId {
    Name,
    ByteSize,
    LowPc,
    HighPc,
    DeclFile,
    DeclLine,
    Type,
    External,
    Declaration,
    CompDir,
    Producer,
    Other(u16),
}

impl AttrId {
    /// Decode a raw attribute code
    pub fn from_code(code: u16) -> Self {
        match code {
            0x03 => AttrId::Name,
            0x0b => AttrId::ByteSize,
            0x11 => AttrId::LowPc,
            0x12 => AttrId::HighPc,
            0x3a => AttrId::DeclFile,
            0x3b => AttrId::DeclLine,
            0x49 => AttrId::Type,
            0x3f => AttrId::External,
            0x3c => AttrId::Declaration,
            0x1b => AttrId::CompDir,
            0x25 => AttrId::Producer,
            other => AttrId::Other(other),
        }
    }

    /// The raw attribute code
    pub fn code(self) -> u16 {
        match self {
            AttrId::Name => 0x03,
            AttrId::ByteSize => 0x0b,
            AttrId::LowPc => 0x11,
            AttrId::HighPc => 0x12,
            AttrId::DeclFile => 0x3a,
            AttrId::DeclLine => 0x3b,
            AttrId::Type => 0x49,
            AttrId::External => 0x3f,
            AttrId::Declaration => 0x3c,
            AttrId::CompDir => 0x1b,
            AttrId::Producer => 0x25,
            AttrId::Other(code) => code,
        }
    }
}
