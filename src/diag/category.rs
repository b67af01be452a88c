//! Message category bitset (spec.md §3).
//!
//! Categories combine by OR; a diagnostic's category is the union of the
//! section it came from, the aspect of the check that fired, its accuracy
//! class, its impact/severity class, and (for LEB128 issues) its subtype.
//! `bitflags` is the teacher's own declared-but-unused dependency
//! (`Cargo.toml: bitflags = "2.4.1"`); this is its first real use.

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Category: u32 {
        // section axis
        const INFO       = 1 << 0;
        const ABBREVS    = 1 << 1;
        const ARANGES    = 1 << 2;
        const LINE       = 1 << 3;
        const LOC        = 1 << 4;
        const RANGES     = 1 << 5;
        const STRINGS    = 1 << 6;
        const PUBTABLES  = 1 << 7;
        const PUBNAMES   = 1 << 8;
        const PUBTYPES   = 1 << 9;
        const ELF        = 1 << 10;
        const RELOC      = 1 << 11;

        // aspect axis
        const HEADER     = 1 << 12;
        const DIE_REL    = 1 << 13;
        const DIE_OTHER  = 1 << 14;

        // accuracy axis
        const BLOAT      = 1 << 15;
        const SUBOPTIMAL = 1 << 16;

        // severity/impact axis
        const IMPACT_1   = 1 << 17;
        const IMPACT_2   = 1 << 18;
        const IMPACT_3   = 1 << 19;
        const IMPACT_4   = 1 << 20;
        const ERROR      = 1 << 21;

        // subtype axis
        const LEB128     = 1 << 22;
    }
}

impl Category {
    /// The set of bits that make up the "section" axis, used when
    /// formatting a diagnostic's leading `.debug_*:` prefix.
    pub const SECTION_AXIS: Category = Category::from_bits_truncate(
        Category::INFO.bits()
            | Category::ABBREVS.bits()
            | Category::ARANGES.bits()
            | Category::LINE.bits()
            | Category::LOC.bits()
            | Category::RANGES.bits()
            | Category::STRINGS.bits()
            | Category::PUBTABLES.bits()
            | Category::PUBNAMES.bits()
            | Category::PUBTYPES.bits()
            | Category::ELF.bits()
            | Category::RELOC.bits(),
    );
}
