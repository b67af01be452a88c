//! C0 — Object adapter: the narrow contract spec.md §1 carves out for "the
//! ELF container reader" as an external collaborator. Everything below C1
//! talks to object files only through this trait; `ObjectFile` is the one
//! place that knows about `object::File`/ELF section headers and symbol
//! tables. Grounded in the teacher's `macho::File`/`macho::Header`
//! container-specific-struct-feeding-a-format-agnostic-DWARF-layer
//! pattern, and in goblin's `ElfSectionHeader` trait
//! (`other_examples/…goblin__src-elf-section_header.rs`) for the section
//! index constants `SHN_UNDEF`/`SHN_ABS`/`SHN_COMMON`/`SHN_XINDEX`.

use std::path::Path;

use memmap2::Mmap;
use object::read::{Object, ObjectSection, ObjectSymbol};
use object::{RelocationTarget, SectionIndex};

use crate::error::{LintError, Result};

/// Where a symbol's value is anchored, mirroring ELF's special
/// `st_shndx` values (`SHN_UNDEF`/`SHN_ABS`/`SHN_COMMON`/`SHN_XINDEX`) per
/// goblin's `elf::section_header` constants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolSection {
    Undefined,
    Absolute,
    Common,
    Section(usize),
}

#[derive(Debug, Clone)]
pub struct SymbolInfo {
    pub name: String,
    pub value: u64,
    pub section: SymbolSection,
    /// `true` for `STT_SECTION` symbols, needed by `relocate_one`'s
    /// `addend + section_address` special case (spec.md §4.7).
    pub is_section_symbol: bool,
}

/// A relocation entry as read straight off the container, before any
/// width/class validation (that happens in `reloc.rs`, C5).
#[derive(Debug, Clone, Copy)]
pub struct RawRelocation {
    pub offset: u64,
    pub kind: u32,
    pub symbol_index: u64,
    pub addend: i64,
}

/// The width category a relocation type patches, per spec.md §4.7
/// ("classify a relocation type into a width category").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelocWidth {
    Width1,
    Width2,
    Width4,
    Width8,
}

impl RelocWidth {
    pub fn bytes(self) -> u8 {
        match self {
            RelocWidth::Width1 => 1,
            RelocWidth::Width2 => 2,
            RelocWidth::Width4 => 4,
            RelocWidth::Width8 => 8,
        }
    }
}

/// The external collaborator contract (spec.md §1): enumerate sections by
/// name; read a section as a byte buffer; read a symbol by index;
/// classify a relocation type; report endianness/address size/ET_REL-ness.
pub trait ObjectView {
    fn is_big_endian(&self) -> bool;
    fn is_relocatable(&self) -> bool;
    fn section_bytes(&self, name: &str) -> Option<&[u8]>;
    fn section_align(&self, name: &str) -> Option<u64>;
    fn section_flags(&self, name: &str) -> Option<SectionFlags>;
    fn symbol(&self, index: u64) -> Option<SymbolInfo>;
    fn relocations(&self, section_name: &str) -> Vec<RawRelocation>;
    fn classify_reloc_width(&self, kind: u32) -> Option<RelocWidth>;
    /// The section name a given section index refers to (for comparing
    /// "do both relocated symbols target the same section").
    fn section_name_by_index(&self, index: usize) -> Option<String>;

    /// Every section in the file, ordered by address — the coverage map
    /// (C10) builds its per-section coverage list from this.
    fn sections(&self) -> Vec<SectionInfo>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SectionFlags {
    pub alloc: bool,
    pub exec: bool,
}

/// One allocated (or not) section as the coverage map (C10) needs it:
/// name, final address, size, and alignment. `address` is the
/// already-laid-out `sh_addr` — for ET_REL inputs this is the synthetic
/// address assigned by the address-layout pass spec.md §6 describes as a
/// precondition external to the core.
#[derive(Debug, Clone)]
pub struct SectionInfo {
    pub name: String,
    pub address: u64,
    pub size: u64,
    pub align: u64,
    pub flags: SectionFlags,
}

/// `ObjectView` backed by the `object` crate over a memory-mapped file —
/// spec.md §5: "all I/O happens once up-front via the ELF layer's memory
/// map, after which parsing proceeds over in-memory slices."
pub struct ObjectFile {
    _mmap: Mmap,
    // SAFETY contract: `file` borrows from `_mmap`, which outlives it for
    // the lifetime of this struct because both are dropped together and
    // `file` is never exposed beyond this struct's own lifetime.
    file: object::File<'static>,
}

impl ObjectFile {
    pub fn open(path: &Path) -> Result<Self> {
        let f = std::fs::File::open(path).map_err(|e| LintError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        let mmap = unsafe { Mmap::map(&f) }.map_err(|e| LintError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        // Extend the borrow to 'static: valid because `_mmap` is kept
        // alive alongside `file` for the struct's whole lifetime and
        // nothing ever hands out a reference that outlives `self`.
        let data: &'static [u8] = unsafe { std::mem::transmute(&mmap[..]) };
        let file = object::File::parse(data).map_err(|_| LintError::BrokenElf)?;
        Ok(ObjectFile { _mmap: mmap, file })
    }

    fn section_by_name(&self, name: &str) -> Option<object::Section<'_, '_>> {
        self.file.sections().find(|s| s.name() == Ok(name))
    }
}

impl ObjectView for ObjectFile {
    fn is_big_endian(&self) -> bool {
        self.file.is_big_endian()
    }

    fn is_relocatable(&self) -> bool {
        use object::ObjectKind;
        self.file.kind() == ObjectKind::Relocatable
    }

    fn section_bytes(&self, name: &str) -> Option<&[u8]> {
        self.section_by_name(name)?.data().ok()
    }

    fn section_align(&self, name: &str) -> Option<u64> {
        Some(self.section_by_name(name)?.align())
    }

    fn section_flags(&self, name: &str) -> Option<SectionFlags> {
        let sec = self.section_by_name(name)?;
        use object::SectionFlags as ObjFlags;
        let (alloc, exec) = match sec.flags() {
            ObjFlags::Elf { sh_flags } => {
                const SHF_ALLOC: u64 = 0x2;
                const SHF_EXECINSTR: u64 = 0x4;
                (sh_flags & SHF_ALLOC != 0, sh_flags & SHF_EXECINSTR != 0)
            }
            _ => (false, false),
        };
        Some(SectionFlags { alloc, exec })
    }

    fn symbol(&self, index: u64) -> Option<SymbolInfo> {
        let sym = self.file.symbol_by_index(object::SymbolIndex(index as usize)).ok()?;
        let section = match sym.section() {
            object::SymbolSection::Undefined => SymbolSection::Undefined,
            object::SymbolSection::Absolute => SymbolSection::Absolute,
            object::SymbolSection::Common => SymbolSection::Common,
            object::SymbolSection::Section(idx) => SymbolSection::Section(idx.0),
            _ => SymbolSection::Undefined,
        };
        Some(SymbolInfo {
            name: sym.name().unwrap_or_default().to_string(),
            value: sym.address(),
            section,
            is_section_symbol: sym.kind() == object::SymbolKind::Section,
        })
    }

    fn relocations(&self, section_name: &str) -> Vec<RawRelocation> {
        let Some(sec) = self.section_by_name(section_name) else {
            return vec![];
        };
        sec.relocations()
            .map(|(offset, reloc)| {
                let symbol_index = match reloc.target() {
                    RelocationTarget::Symbol(idx) => idx.0 as u64,
                    _ => 0,
                };
                let kind = match reloc.flags() {
                    object::RelocationFlags::Elf { r_type } => r_type,
                    _ => 0,
                };
                RawRelocation {
                    offset,
                    kind,
                    symbol_index,
                    addend: reloc.addend(),
                }
            })
            .collect()
    }

    fn classify_reloc_width(&self, kind: u32) -> Option<RelocWidth> {
        classify_elf_reloc_width(self.file.architecture(), kind)
    }

    fn section_name_by_index(&self, index: usize) -> Option<String> {
        self.file
            .section_by_index(SectionIndex(index))
            .ok()
            .and_then(|s| s.name().ok())
            .map(|s| s.to_string())
    }

    fn sections(&self) -> Vec<SectionInfo> {
        let mut out: Vec<SectionInfo> = self
            .file
            .sections()
            .filter_map(|sec| {
                let name = sec.name().ok()?.to_string();
                use object::SectionFlags as ObjFlags;
                let (alloc, exec) = match sec.flags() {
                    ObjFlags::Elf { sh_flags } => {
                        const SHF_ALLOC: u64 = 0x2;
                        const SHF_EXECINSTR: u64 = 0x4;
                        (sh_flags & SHF_ALLOC != 0, sh_flags & SHF_EXECINSTR != 0)
                    }
                    _ => (false, false),
                };
                Some(SectionInfo {
                    name,
                    address: sec.address(),
                    size: sec.size(),
                    align: sec.align(),
                    flags: SectionFlags { alloc, exec },
                })
            })
            .collect();
        out.sort_by_key(|s| s.address);
        out
    }
}

/// Width classification for the handful of relocation types the core
/// actually cares about (those that patch DWARF section-offset or
/// address fields). Architecture-specific beyond this is out of scope —
/// the core only needs "does this relocation patch 4 or 8 bytes".
fn classify_elf_reloc_width(arch: object::Architecture, kind: u32) -> Option<RelocWidth> {
    use object::Architecture::*;
    match arch {
        X86_64 => match kind {
            1 => Some(RelocWidth::Width8), // R_X86_64_64
            2 => Some(RelocWidth::Width4), // R_X86_64_PC32
            10 => Some(RelocWidth::Width4), // R_X86_64_32
            11 => Some(RelocWidth::Width4), // R_X86_64_32S
            _ => None,
        },
        I386 => match kind {
            1 => Some(RelocWidth::Width4), // R_386_32
            2 => Some(RelocWidth::Width4), // R_386_PC32
            _ => None,
        },
        Aarch64 => match kind {
            0x101 => Some(RelocWidth::Width8), // R_AARCH64_ABS64
            0x102 => Some(RelocWidth::Width4), // R_AARCH64_ABS32
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
pub mod fake {
    //! A hand-built `ObjectView` test double used by unit/integration
    //! tests so the end-to-end scenarios in spec.md §8 can be expressed
    //! as raw byte buffers without fixturing real ELF binaries — same
    //! spirit as the teacher's `leb.rs` tests hand-writing byte arrays.
    use super::*;
    use std::collections::HashMap;

    #[derive(Default)]
    pub struct FakeObject {
        pub big_endian: bool,
        pub relocatable: bool,
        pub sections: HashMap<&'static str, Vec<u8>>,
        pub aligns: HashMap<&'static str, u64>,
        pub flags: HashMap<&'static str, SectionFlags>,
        pub symbols: HashMap<u64, SymbolInfo>,
        pub relocs: HashMap<&'static str, Vec<RawRelocation>>,
        pub section_infos: Vec<SectionInfo>,
    }

    impl ObjectView for FakeObject {
        fn is_big_endian(&self) -> bool {
            self.big_endian
        }

        fn is_relocatable(&self) -> bool {
            self.relocatable
        }

        fn section_bytes(&self, name: &str) -> Option<&[u8]> {
            self.sections.get(name).map(|v| v.as_slice())
        }

        fn section_align(&self, name: &str) -> Option<u64> {
            self.aligns.get(name).copied()
        }

        fn section_flags(&self, name: &str) -> Option<SectionFlags> {
            self.flags.get(name).copied()
        }

        fn symbol(&self, index: u64) -> Option<SymbolInfo> {
            self.symbols.get(&index).cloned()
        }

        fn relocations(&self, section_name: &str) -> Vec<RawRelocation> {
            self.relocs.get(section_name).cloned().unwrap_or_default()
        }

        fn classify_reloc_width(&self, _kind: u32) -> Option<RelocWidth> {
            Some(RelocWidth::Width4)
        }

        fn section_name_by_index(&self, _index: usize) -> Option<String> {
            None
        }

        fn sections(&self) -> Vec<SectionInfo> {
            self.section_infos.clone()
        }
    }
}
