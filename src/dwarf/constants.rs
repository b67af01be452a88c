//! DWARF tag / attribute-name / attribute-form enumerations.
//!
//! Hand-rolled `from(n) -> Self` matches, generalizing the teacher's
//! `dwarf.rs::{DIETag, AttrName, AttrForm}` — the whole point of this
//! engine is to decode these by hand rather than depend on a cooked
//! constants table from a DWARF-reading library (spec.md explicitly
//! specifies the abbreviation loader and DIE walker as hand-rolled
//! recursive descent).

#![allow(non_camel_case_types)]

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tag {
    ArrayType,
    ClassType,
    EntryPoint,
    EnumerationType,
    FormalParameter,
    ImportedDeclaration,
    Label,
    LexicalBlock,
    Member,
    PointerType,
    ReferenceType,
    CompileUnit,
    StringType,
    StructureType,
    SubroutineType,
    Typedef,
    UnionType,
    UnspecifiedParameters,
    Variant,
    CommonBlock,
    CommonInclusion,
    Inheritance,
    InlinedSubroutine,
    Module,
    PtrToMemberType,
    SetType,
    SubrangeType,
    WithStmt,
    AccessDeclaration,
    BaseType,
    CatchBlock,
    ConstType,
    Constant,
    Enumerator,
    FileType,
    Friend,
    Namelist,
    NamelistItem,
    PackedType,
    Subprogram,
    TemplateTypeParameter,
    TemplateValueParameter,
    ThrownType,
    TryBlock,
    VariantPart,
    Variable,
    VolatileType,
    DwarfProcedure,
    RestrictType,
    InterfaceType,
    Namespace,
    ImportedModule,
    UnspecifiedType,
    PartialUnit,
    ImportedUnit,
    Condition,
    SharedType,
    TypeUnit,
    RvalueReferenceType,
    TemplateAlias,
    LoUser,
    HiUser,
    Unrecognized(u64),
}

impl Tag {
    pub fn from(value: u64) -> Tag {
        match value {
            0x01 => Tag::ArrayType,
            0x02 => Tag::ClassType,
            0x03 => Tag::EntryPoint,
            0x04 => Tag::EnumerationType,
            0x05 => Tag::FormalParameter,
            0x08 => Tag::ImportedDeclaration,
            0x0a => Tag::Label,
            0x0b => Tag::LexicalBlock,
            0x0d => Tag::Member,
            0x0f => Tag::PointerType,
            0x10 => Tag::ReferenceType,
            0x11 => Tag::CompileUnit,
            0x12 => Tag::StringType,
            0x13 => Tag::StructureType,
            0x15 => Tag::SubroutineType,
            0x16 => Tag::Typedef,
            0x17 => Tag::UnionType,
            0x18 => Tag::UnspecifiedParameters,
            0x19 => Tag::Variant,
            0x1a => Tag::CommonBlock,
            0x1b => Tag::CommonInclusion,
            0x1c => Tag::Inheritance,
            0x1d => Tag::InlinedSubroutine,
            0x1e => Tag::Module,
            0x1f => Tag::PtrToMemberType,
            0x20 => Tag::SetType,
            0x21 => Tag::SubrangeType,
            0x22 => Tag::WithStmt,
            0x23 => Tag::AccessDeclaration,
            0x24 => Tag::BaseType,
            0x25 => Tag::CatchBlock,
            0x26 => Tag::ConstType,
            0x27 => Tag::Constant,
            0x28 => Tag::Enumerator,
            0x29 => Tag::FileType,
            0x2a => Tag::Friend,
            0x2b => Tag::Namelist,
            0x2c => Tag::NamelistItem,
            0x2d => Tag::PackedType,
            0x2e => Tag::Subprogram,
            0x2f => Tag::TemplateTypeParameter,
            0x30 => Tag::TemplateValueParameter,
            0x31 => Tag::ThrownType,
            0x32 => Tag::TryBlock,
            0x33 => Tag::VariantPart,
            0x34 => Tag::Variable,
            0x35 => Tag::VolatileType,
            0x36 => Tag::DwarfProcedure,
            0x37 => Tag::RestrictType,
            0x38 => Tag::InterfaceType,
            0x39 => Tag::Namespace,
            0x3a => Tag::ImportedModule,
            0x3b => Tag::UnspecifiedType,
            0x3c => Tag::PartialUnit,
            0x3d => Tag::ImportedUnit,
            0x3f => Tag::Condition,
            0x40 => Tag::SharedType,
            0x41 => Tag::TypeUnit,
            0x42 => Tag::RvalueReferenceType,
            0x43 => Tag::TemplateAlias,
            0x4080 => Tag::LoUser,
            0xffff => Tag::HiUser,
            n => Tag::Unrecognized(n),
        }
    }

    /// `DW_TAG_hi_user`, the ceiling the abbreviation loader checks a
    /// tag against (spec.md §4.2).
    pub const HI_USER: u64 = 0xffff;

    pub fn is_compile_unit_like(self) -> bool {
        matches!(self, Tag::CompileUnit | Tag::PartialUnit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrName {
    Sibling,
    Location,
    Name,
    Ordering,
    ByteSize,
    BitOffset,
    BitSize,
    StmtList,
    LowPc,
    HighPc,
    Language,
    Discr,
    DiscrValue,
    Visibility,
    Import,
    StringLength,
    CommonReference,
    CompDir,
    ConstValue,
    ContainingType,
    DefaultValue,
    Inline,
    IsOptional,
    LowerBound,
    Producer,
    Prototyped,
    ReturnAddr,
    StartScope,
    BitStride,
    UpperBound,
    AbstractOrigin,
    Accessibility,
    AddressClass,
    Artificial,
    BaseTypes,
    CallingConvention,
    Count,
    DataMemberLocation,
    DeclColumn,
    DeclFile,
    DeclLine,
    Declaration,
    DiscrList,
    Encoding,
    External,
    FrameBase,
    Friend,
    IdentifierCase,
    MacroInfo,
    NamelistItem,
    Priority,
    Segment,
    Specification,
    StaticLink,
    Type,
    UseLocation,
    VariableParameter,
    Virtuality,
    VtableElemLocation,
    Allocated,
    Associated,
    DataLocation,
    ByteStride,
    EntryPc,
    UseUTF8,
    Extension,
    Ranges,
    Trampoline,
    CallColumn,
    CallFile,
    CallLine,
    Description,
    BinaryScale,
    DecimalScale,
    Small,
    DecimalSign,
    DigitCount,
    PictureString,
    Mutable,
    ThreadsScaled,
    Explicit,
    ObjectPointer,
    Endianity,
    Elemental,
    Pure,
    Recursive,
    Signature,
    MainSubprogram,
    DataBitOffset,
    ConstExpr,
    EnumClass,
    LinkageName,
    LoUser,
    HiUser,
    Unrecognized(u64),
}

impl AttrName {
    pub fn from(n: u64) -> AttrName {
        match n {
            0x01 => AttrName::Sibling,
            0x02 => AttrName::Location,
            0x03 => AttrName::Name,
            0x09 => AttrName::Ordering,
            0x0b => AttrName::ByteSize,
            0x0c => AttrName::BitOffset,
            0x0d => AttrName::BitSize,
            0x10 => AttrName::StmtList,
            0x11 => AttrName::LowPc,
            0x12 => AttrName::HighPc,
            0x13 => AttrName::Language,
            0x15 => AttrName::Discr,
            0x16 => AttrName::DiscrValue,
            0x17 => AttrName::Visibility,
            0x18 => AttrName::Import,
            0x19 => AttrName::StringLength,
            0x1a => AttrName::CommonReference,
            0x1b => AttrName::CompDir,
            0x1c => AttrName::ConstValue,
            0x1d => AttrName::ContainingType,
            0x1e => AttrName::DefaultValue,
            0x20 => AttrName::Inline,
            0x21 => AttrName::IsOptional,
            0x22 => AttrName::LowerBound,
            0x25 => AttrName::Producer,
            0x27 => AttrName::Prototyped,
            0x2a => AttrName::ReturnAddr,
            0x2c => AttrName::StartScope,
            0x2e => AttrName::BitStride,
            0x2f => AttrName::UpperBound,
            0x31 => AttrName::AbstractOrigin,
            0x32 => AttrName::Accessibility,
            0x33 => AttrName::AddressClass,
            0x34 => AttrName::Artificial,
            0x35 => AttrName::BaseTypes,
            0x36 => AttrName::CallingConvention,
            0x37 => AttrName::Count,
            0x38 => AttrName::DataMemberLocation,
            0x39 => AttrName::DeclColumn,
            0x3a => AttrName::DeclFile,
            0x3b => AttrName::DeclLine,
            0x3c => AttrName::Declaration,
            0x3d => AttrName::DiscrList,
            0x3e => AttrName::Encoding,
            0x3f => AttrName::External,
            0x40 => AttrName::FrameBase,
            0x41 => AttrName::Friend,
            0x42 => AttrName::IdentifierCase,
            0x43 => AttrName::MacroInfo,
            0x44 => AttrName::NamelistItem,
            0x45 => AttrName::Priority,
            0x46 => AttrName::Segment,
            0x47 => AttrName::Specification,
            0x48 => AttrName::StaticLink,
            0x49 => AttrName::Type,
            0x4a => AttrName::UseLocation,
            0x4b => AttrName::VariableParameter,
            0x4c => AttrName::Virtuality,
            0x4d => AttrName::VtableElemLocation,
            0x4e => AttrName::Allocated,
            0x4f => AttrName::Associated,
            0x50 => AttrName::DataLocation,
            0x51 => AttrName::ByteStride,
            0x52 => AttrName::EntryPc,
            0x53 => AttrName::UseUTF8,
            0x54 => AttrName::Extension,
            0x55 => AttrName::Ranges,
            0x56 => AttrName::Trampoline,
            0x57 => AttrName::CallColumn,
            0x58 => AttrName::CallFile,
            0x59 => AttrName::CallLine,
            0x5a => AttrName::Description,
            0x5b => AttrName::BinaryScale,
            0x5c => AttrName::DecimalScale,
            0x5d => AttrName::Small,
            0x5e => AttrName::DecimalSign,
            0x5f => AttrName::DigitCount,
            0x60 => AttrName::PictureString,
            0x61 => AttrName::Mutable,
            0x62 => AttrName::ThreadsScaled,
            0x63 => AttrName::Explicit,
            0x64 => AttrName::ObjectPointer,
            0x65 => AttrName::Endianity,
            0x66 => AttrName::Elemental,
            0x67 => AttrName::Pure,
            0x68 => AttrName::Recursive,
            0x69 => AttrName::Signature,
            0x6a => AttrName::MainSubprogram,
            0x6b => AttrName::DataBitOffset,
            0x6c => AttrName::ConstExpr,
            0x6d => AttrName::EnumClass,
            0x6e => AttrName::LinkageName,
            0x2000 => AttrName::LoUser,
            0x3fff => AttrName::HiUser,
            n => AttrName::Unrecognized(n),
        }
    }

    pub fn is_sibling(self) -> bool {
        matches!(self, AttrName::Sibling)
    }

    /// `location`, `frame_base`, `data_location`, `data_member_location`
    /// (spec.md §4.2).
    pub fn is_location_attr(self) -> bool {
        matches!(
            self,
            AttrName::Location | AttrName::FrameBase | AttrName::DataLocation | AttrName::DataMemberLocation
        )
    }

    pub fn is_ranges_or_stmt_list(self) -> bool {
        matches!(self, AttrName::Ranges | AttrName::StmtList)
    }

    pub fn is_low_pc(self) -> bool {
        matches!(self, AttrName::LowPc)
    }

    pub fn is_high_pc(self) -> bool {
        matches!(self, AttrName::HighPc)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Form {
    Addr,
    Block2,
    Block4,
    Data2,
    Data4,
    Data8,
    String,
    Block,
    Block1,
    Data1,
    Flag,
    SData,
    StrP,
    UData,
    RefAddr,
    Ref1,
    Ref2,
    Ref4,
    Ref8,
    RefUdata,
    Indirect,
    SecOffset,
    ExprLoc,
    FlagPresent,
    RefSig8,
    Unrecognized(u64),
}

impl Form {
    pub fn from(n: u64) -> Form {
        match n {
            0x01 => Form::Addr,
            0x03 => Form::Block2,
            0x04 => Form::Block4,
            0x05 => Form::Data2,
            0x06 => Form::Data4,
            0x07 => Form::Data8,
            0x08 => Form::String,
            0x09 => Form::Block,
            0x0a => Form::Block1,
            0x0b => Form::Data1,
            0x0c => Form::Flag,
            0x0d => Form::SData,
            0x0e => Form::StrP,
            0x0f => Form::UData,
            0x10 => Form::RefAddr,
            0x11 => Form::Ref1,
            0x12 => Form::Ref2,
            0x13 => Form::Ref4,
            0x14 => Form::Ref8,
            0x15 => Form::RefUdata,
            0x16 => Form::Indirect,
            0x17 => Form::SecOffset,
            0x18 => Form::ExprLoc,
            0x19 => Form::FlagPresent,
            0x20 => Form::RefSig8,
            n => Form::Unrecognized(n),
        }
    }

    /// Is this form in the "reference" class (spec.md §4.2's
    /// `DW_AT_sibling` form policy)?
    pub fn is_reference_class(self) -> bool {
        matches!(
            self,
            Form::Ref1 | Form::Ref2 | Form::Ref4 | Form::Ref8 | Form::RefUdata | Form::RefAddr | Form::RefSig8
        )
    }

    pub fn is_block(self) -> bool {
        matches!(self, Form::Block | Form::Block1 | Form::Block2 | Form::Block4)
    }

    /// `data4`, `data8`, any `block*`, or `indirect` — the form classes
    /// spec.md §4.2 allows for location attributes.
    pub fn is_valid_location_form(self) -> bool {
        matches!(self, Form::Data4 | Form::Data8 | Form::Indirect) || self.is_block()
    }

    /// `data4`, `data8`, or `indirect` — the forms spec.md §4.2 allows
    /// for `DW_AT_ranges`/`DW_AT_stmt_list`.
    pub fn is_valid_rangeptr_form(self) -> bool {
        matches!(self, Form::Data4 | Form::Data8 | Form::Indirect)
    }

    /// `addr` or `ref_addr` — the forms spec.md §4.2 allows for
    /// `DW_AT_low_pc`/`DW_AT_high_pc`.
    pub fn is_valid_pc_form(self) -> bool {
        matches!(self, Form::Addr | Form::RefAddr)
    }
}

/// Location-expression opcodes referenced by spec.md §4.4. Only the ones
/// the validator must special-case are named; everything else is looked
/// up generically by operand-form table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Addr,
    Const1u,
    Const1s,
    Const2u,
    Const2s,
    Const4u,
    Const4s,
    Const8u,
    Const8s,
    Constu,
    Consts,
    DerefSize,
    PlusUconst,
    Bra,
    Skip,
    Other(u8),
}

impl Op {
    pub fn from(n: u8) -> Op {
        match n {
            0x03 => Op::Addr,
            0x08 => Op::Const1u,
            0x09 => Op::Const1s,
            0x0a => Op::Const2u,
            0x0b => Op::Const2s,
            0x0c => Op::Const4u,
            0x0d => Op::Const4s,
            0x0e => Op::Const8u,
            0x0f => Op::Const8s,
            0x10 => Op::Constu,
            0x11 => Op::Consts,
            0x94 => Op::DerefSize,
            0x23 => Op::PlusUconst,
            0x28 => Op::Bra,
            0x2f => Op::Skip,
            n => Op::Other(n),
        }
    }
}
