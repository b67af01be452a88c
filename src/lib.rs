//! `dwarflint` — a pedantic structural validator for DWARF 2/3 debugging
//! information embedded in ELF object files (spec.md §1).
//!
//! The library crate exposes `LintSession`, `Criteria`, `Diagnostic`, and
//! `ObjectView` as its public API so the core stays independently testable
//! and embeddable behind the thin `src/bin/dwarflint.rs` front end, the
//! same shape the teacher uses for `dwarf`/`leb` behind its own `main.rs`.

pub mod abbrev;
pub mod address;
pub mod aranges;
pub mod coverage;
pub mod coverage_map;
pub mod diag;
pub mod dwarf;
pub mod error;
pub mod leb128;
pub mod line;
pub mod loc_range;
pub mod objectview;
pub mod pubtable;
pub mod read;
pub mod reloc;

use tracing::instrument;

pub use diag::{Category, Criteria, Diagnostic, Diagnostics, Severity};
pub use error::{LintError, Result};
pub use objectview::ObjectView;

use coverage::Coverage;
use coverage_map::CoverageMap;
use diag::Where;
use dwarf::die::WalkerCx;
use reloc::RelocationTable;

const REQUIRED_SECTIONS: [&str; 2] = [".debug_abbrev", ".debug_info"];

/// Per-file session (spec.md §5): owns the diagnostic sink and every
/// resource scoped to one input — CU chain, abbrev chain, per-section
/// relocation tables — all released when `run` returns.
pub struct LintSession<'c> {
    pub diags: Diagnostics<'c>,
    ignore_missing: bool,
    tolerant: bool,
    nohl: bool,
}

impl<'c> LintSession<'c> {
    pub fn new(criteria: &'c Criteria, with_ref: bool, ignore_missing: bool, tolerant: bool, nohl: bool) -> Self {
        LintSession {
            diags: Diagnostics::new(criteria, with_ref),
            ignore_missing,
            tolerant,
            nohl,
        }
    }

    /// Runs every structural check against `obj`, per spec.md §2's
    /// dependency order: C6 abbrev load feeds C7's DIE walk, which feeds
    /// C8's loc/range check and C9's aranges/pub/line checks, all reporting
    /// through `self.diags`.
    #[instrument(skip_all)]
    pub fn run(&mut self, obj: &dyn ObjectView) -> Result<()> {
        let big_endian = obj.is_big_endian();
        let is_rel = obj.is_relocatable();

        let (abbrev_buf, info_buf) = self.required_sections(obj)?;

        let abbrev_chain = abbrev::load(abbrev_buf, big_endian, &mut self.diags);

        let str_buf = obj.section_bytes(".debug_str").unwrap_or(&[]);
        let mut info_reloc = RelocationTable::load(obj, ".debug_info");
        let mut str_coverage = Coverage::new();
        let mut global_pc_coverage = Coverage::new();

        let cus = {
            let mut cx = WalkerCx {
                str_buf,
                reloc_info: &mut info_reloc,
                obj,
                is_rel,
                str_coverage: &mut str_coverage,
                global_pc_coverage: &mut global_pc_coverage,
            };
            dwarf::die::walk(info_buf, big_endian, &abbrev_chain, &mut cx, &mut self.diags)
        };
        let mut cus = cus;

        dwarf::die::resolve_global_refs(&cus, &mut self.diags);
        let info_where = self.diags.insert_where(Where::new(".debug_info"));
        info_reloc.relocation_skip_rest(info_where, &mut self.diags);

        if let Some(loc_buf) = obj.section_bytes(".debug_loc") {
            let mut reloc = RelocationTable::load(obj, ".debug_loc");
            loc_range::check(loc_range::Kind::Loc, loc_buf, big_endian, &mut cus, &mut reloc, obj, &mut self.diags);
            let w = self.diags.insert_where(Where::new(".debug_loc"));
            reloc.relocation_skip_rest(w, &mut self.diags);
        }

        if let Some(ranges_buf) = obj.section_bytes(".debug_ranges") {
            let mut reloc = RelocationTable::load(obj, ".debug_ranges");
            loc_range::check(loc_range::Kind::Ranges, ranges_buf, big_endian, &mut cus, &mut reloc, obj, &mut self.diags);
            let w = self.diags.insert_where(Where::new(".debug_ranges"));
            reloc.relocation_skip_rest(w, &mut self.diags);
        }

        // Every CU's own address contribution is the union of its
        // low/high-pc span (accumulated globally while walking DIEs) and
        // whatever `.debug_ranges` coverage C8 attributed to it.
        let mut cu_coverage = global_pc_coverage.clone_coverage();
        for cu in &cus {
            cu.coverage.cov.find_ranges(|start, len| cu_coverage.add(start, len));
        }

        if let Some(aranges_buf) = obj.section_bytes(".debug_aranges") {
            let mut reloc = RelocationTable::load(obj, ".debug_aranges");
            let aranges_coverage = aranges::check(aranges_buf, big_endian, &mut cus, &mut reloc, obj, self.tolerant, &mut self.diags);
            let w = self.diags.insert_where(Where::new(".debug_aranges"));
            reloc.relocation_skip_rest(w, &mut self.diags);

            if !self.nohl {
                let align = cus.first().map(|cu| 2 * cu.address_size as u64).unwrap_or(8);
                let compare_where = self.diags.insert_where(Where::new(".debug_aranges"));
                aranges::compare_with_cu_coverage(&cu_coverage, &aranges_coverage, align, |start, len| {
                    self.diags.report(
                        Category::ARANGES | Category::RANGES | Category::IMPACT_2,
                        compare_where,
                        format!("addresses [{:#x}, {:#x}) are covered with CUs, but not with aranges", start, start + len),
                    );
                });
            }
        }

        if let Some(pubnames_buf) = obj.section_bytes(".debug_pubnames") {
            let mut reloc = RelocationTable::load(obj, ".debug_pubnames");
            pubtable::check(pubtable::Kind::Names, pubnames_buf, big_endian, &mut cus, &mut reloc, obj, &mut self.diags);
            let w = self.diags.insert_where(Where::new(".debug_pubnames"));
            reloc.relocation_skip_rest(w, &mut self.diags);
        }

        if let Some(pubtypes_buf) = obj.section_bytes(".debug_pubtypes") {
            let mut reloc = RelocationTable::load(obj, ".debug_pubtypes");
            pubtable::check(pubtable::Kind::Types, pubtypes_buf, big_endian, &mut cus, &mut reloc, obj, &mut self.diags);
            let w = self.diags.insert_where(Where::new(".debug_pubtypes"));
            reloc.relocation_skip_rest(w, &mut self.diags);
        }

        if let Some(line_buf) = obj.section_bytes(".debug_line") {
            let addr_size = cus.first().map(|cu| cu.address_size).unwrap_or(8);
            let mut reloc = RelocationTable::load(obj, ".debug_line");
            line::check(line_buf, big_endian, addr_size, &mut cus, &mut reloc, obj, &mut self.diags);
            let w = self.diags.insert_where(Where::new(".debug_line"));
            reloc.relocation_skip_rest(w, &mut self.diags);
        }

        if !self.nohl {
            self.check_section_coverage(obj, &cu_coverage);
        }

        Ok(())
    }

    /// Fetches `.debug_abbrev`/`.debug_info`, per spec.md §7: "a completely
    /// missing `.debug_abbrev` or `.debug_info` is a hard error unless
    /// `--ignore-missing` masked off the `elf` axis" — implemented as a
    /// genuine bail-out (`LintError`) rather than a `Diagnostics` entry
    /// when `--ignore-missing` is not set, since there is nothing left to
    /// structurally validate without them.
    fn required_sections<'a>(&mut self, obj: &'a dyn ObjectView) -> Result<(&'a [u8], &'a [u8])> {
        let mut bufs = [&[][..], &[][..]];
        for (i, section) in REQUIRED_SECTIONS.into_iter().enumerate() {
            match obj.section_bytes(section) {
                Some(buf) => bufs[i] = buf,
                None if self.ignore_missing => {
                    let w = self.diags.insert_where(Where::new(section));
                    self.diags.report(Category::ELF | Category::IMPACT_2, w, format!("{} is missing from the object file", section));
                }
                None => return Err(LintError::MissingSection { section }),
            }
        }
        Ok((bufs[0], bufs[1]))
    }

    /// C10's compare pass: every CU-contributed address that lands outside
    /// any allocated section, and every hole `find_holes` surfaces in an
    /// executable section spec.md §4.5 doesn't already explain away.
    fn check_section_coverage(&mut self, obj: &dyn ObjectView, cu_coverage: &Coverage) {
        let mut map = CoverageMap::build(obj);
        let w = self.diags.insert_where(Where::new(".debug_info"));
        let mut ranges = Vec::new();
        cu_coverage.find_ranges(|start, len| ranges.push((start, len)));
        for (start, len) in ranges {
            map.add(start, len, w, Category::INFO, &mut self.diags);
        }

        let mut holes = Vec::new();
        map.find_holes(obj, |sc, start, len| holes.push((sc.info.name.clone(), start, len)));
        for (name, start, len) in holes {
            self.diags.report(
                Category::INFO | Category::IMPACT_1,
                w,
                format!("{} bytes [{:#x}, {:#x}) of section {} are never described by any CU", len, start, start + len, name),
            );
        }
    }
}

/// End-to-end scenarios (spec.md §8): each drives the whole `run()`
/// pipeline through a `FakeObject`, the way no single component's own
/// unit tests can. Fixture-building helpers mirror the byte-literal
/// style already used in `abbrev.rs`/`aranges.rs`/`dwarf/die.rs`.
#[cfg(test)]
mod e2e_tests {
    use super::*;
    use crate::leb128::uleb128_encode;
    use crate::objectview::fake::FakeObject;

    fn uleb(v: u64) -> Vec<u8> {
        uleb128_encode(v)
    }

    /// One abbrev table: code 1 is `DW_TAG_compile_unit`, no children,
    /// `DW_AT_low_pc(addr)`/`DW_AT_high_pc(addr)`.
    fn cu_abbrev_bytes() -> Vec<u8> {
        let mut b = Vec::new();
        b.extend(uleb(1));
        b.extend(uleb(0x11)); // DW_TAG_compile_unit
        b.push(0); // no children
        b.extend(uleb(0x11)); // DW_AT_low_pc
        b.extend(uleb(0x01)); // DW_FORM_addr
        b.extend(uleb(0x12)); // DW_AT_high_pc
        b.extend(uleb(0x01)); // DW_FORM_addr
        b.extend(uleb(0));
        b.extend(uleb(0));
        b.extend(uleb(0));
        b
    }

    /// One CU at section offset 0 with `low_pc`/`high_pc` set to `lo`/`hi`.
    fn cu_info_bytes(lo: u32, hi: u32) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend(2u16.to_le_bytes()); // version
        body.extend(0u32.to_le_bytes()); // abbrev_offset
        body.push(4); // address_size
        body.extend(uleb(1)); // DIE code 1
        body.extend(lo.to_le_bytes());
        body.extend(hi.to_le_bytes());
        body.push(0); // terminate top-level chain

        let mut out = Vec::new();
        out.extend((body.len() as u32).to_le_bytes());
        out.extend(body);
        out
    }

    /// One `.debug_aranges` set referencing CU offset 0, with one valid
    /// tuple followed by a `(0,0)` terminator before the declared end of
    /// the table — spec.md §8 scenario 1's `aranges_terminate_early`.
    fn aranges_terminate_early_bytes(tuple: (u32, u32)) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend(2u16.to_le_bytes()); // version
        body.extend(0u32.to_le_bytes()); // cu_offset
        body.push(4); // address_size
        body.push(0); // segment_size
        body.extend([0u8; 4]); // align to 2*4=8
        body.extend(tuple.0.to_le_bytes());
        body.extend(tuple.1.to_le_bytes());
        body.extend(0u32.to_le_bytes()); // terminator addr
        body.extend(0u32.to_le_bytes()); // terminator len
        body.extend([0u8; 16]); // declared-but-unused trailing bytes

        let mut out = Vec::new();
        out.extend((body.len() as u32).to_le_bytes());
        out.extend(body);
        out
    }

    #[test]
    fn aranges_terminate_early_warns_on_padding_and_uncovered_cu_range() {
        let mut obj = FakeObject::default();
        obj.sections.insert(".debug_abbrev", cu_abbrev_bytes());
        obj.sections.insert(".debug_info", cu_info_bytes(0x400474, 0x400481));
        // A tuple well away from the CU's [0x400474, 0x400481) range, so
        // the compare pass finds that whole span uncovered by aranges.
        obj.sections.insert(".debug_aranges", aranges_terminate_early_bytes((0x500000, 0x10)));

        let criteria = Criteria::default();
        let mut session = LintSession::new(&criteria, false, false, false, false);
        session.run(&obj).expect("required sections are present");

        let rendered = session.diags.render();
        assert_eq!(session.diags.error_count(), 0, "rendered: {rendered:?}");
        assert!(
            rendered.iter().any(|l| l.contains("[0x20, 0x30): unnecessary padding with zero bytes")),
            "rendered: {rendered:?}"
        );
        assert!(
            rendered.iter().any(|l| l.contains("[0x400474, 0x400481) are covered with CUs, but not with aranges")),
            "rendered: {rendered:?}"
        );
    }

    #[test]
    fn et_rel_strp_without_relocation_warns_lack_relocation() {
        // Abbrev: code 1 is DW_TAG_compile_unit, no children, one
        // DW_AT_name(DW_FORM_strp) attribute.
        let mut ab = Vec::new();
        ab.extend(uleb(1));
        ab.extend(uleb(0x11));
        ab.push(0);
        ab.extend(uleb(0x03)); // DW_AT_name
        ab.extend(uleb(0x0e)); // DW_FORM_strp
        ab.extend(uleb(0));
        ab.extend(uleb(0));
        ab.extend(uleb(0));

        let mut body = Vec::new();
        body.extend(2u16.to_le_bytes());
        body.extend(0u32.to_le_bytes());
        body.push(4);
        body.extend(uleb(1)); // DIE code 1
        body.extend(0u32.to_le_bytes()); // DW_FORM_strp offset, unrelocated
        body.push(0); // terminate top-level chain

        let mut info = Vec::new();
        info.extend((body.len() as u32).to_le_bytes());
        info.extend(body);

        let mut obj = FakeObject::default();
        obj.relocatable = true;
        obj.sections.insert(".debug_abbrev", ab);
        obj.sections.insert(".debug_info", info);
        obj.sections.insert(".debug_str", vec![0u8]);

        let criteria = Criteria::default();
        let mut session = LintSession::new(&criteria, false, false, false, false);
        session.run(&obj).expect("required sections are present");
        assert_eq!(session.diags.error_count(), 0, "exit 0 under default criteria (warnings only)");
        let rendered = session.diags.render();
        assert!(rendered.iter().any(|l| l.contains("LACK_RELOCATION")), "rendered: {rendered:?}");
    }

    #[test]
    fn missing_debug_info_is_a_hard_error_unless_ignore_missing() {
        let mut obj = FakeObject::default();
        obj.sections.insert(".debug_abbrev", cu_abbrev_bytes());

        let criteria = Criteria::default();
        let mut session = LintSession::new(&criteria, false, false, false, false);
        let err = session.run(&obj).unwrap_err();
        assert!(matches!(err, LintError::MissingSection { section: ".debug_info" }));

        let mut ignoring = LintSession::new(&criteria, false, true, false, false);
        ignoring.run(&obj).expect("ignore-missing continues past the missing section");
        assert_eq!(ignoring.diags.error_count(), 0);
        assert!(ignoring.diags.render().iter().any(|l| l.contains(".debug_info is missing")));
    }
}
