//! C10 — Coverage map (spec.md §4.8): an ELF-section-indexed coverage used
//! to compare CU-derived address ranges (low/high pc, aranges, ranges)
//! against the sections an object file actually allocates.
//!
//! No teacher counterpart (the teacher never tracks address coverage at
//! all); built directly from spec.md §4.8 in the same plain-struct style
//! as `coverage.rs` (C3), which this module wraps one-per-section.

use crate::coverage::Coverage;
use crate::diag::{Category, Diagnostics, WhereId};
use crate::objectview::{ObjectView, SectionInfo};

/// One allocated section wrapped with its own coverage set, plus the two
/// flags spec.md §3 "Section coverage" names: `hit` (anything was ever
/// added to it) and `warn` (it matched the *warn* mask but not the
/// *required* mask, e.g. `.debug_str` under `--strict`-adjacent policy).
#[derive(Debug)]
pub struct SectionCoverage {
    pub info: SectionInfo,
    pub cov: Coverage,
    pub hit: bool,
    pub warn: bool,
}

/// Ordered (by address) list of section coverages for one ELF, built by
/// filtering `ObjectView::sections()` through a required/warn flag mask
/// (spec.md §4.8: "Built from an ELF filtered by `(flags & required_mask)
/// == required_mask` (normal) and `(flags & warn_mask) == warn_mask`
/// (warn-only)"). This implementation uses the allocated-section flag as
/// the required mask (every `SHF_ALLOC` section participates) and treats
/// every other section as warn-only, since spec.md never needs finer
/// per-flag masks than ALLOC vs non-ALLOC for its own compare passes.
#[derive(Debug, Default)]
pub struct CoverageMap {
    sections: Vec<SectionCoverage>,
}

impl CoverageMap {
    pub fn build(obj: &dyn ObjectView) -> Self {
        let sections = obj
            .sections()
            .into_iter()
            .map(|info| {
                let warn = !info.flags.alloc;
                SectionCoverage {
                    info,
                    cov: Coverage::new(),
                    hit: false,
                    warn,
                }
            })
            .collect();
        CoverageMap { sections }
    }

    pub fn sections(&self) -> &[SectionCoverage] {
        &self.sections
    }

    /// Locates the (at most one contiguous run of) sections that
    /// `[address, address+length)` intersects and distributes the range
    /// across them, reporting cross-section straddles and per-section
    /// overlaps (spec.md §4.8).
    pub fn add(&mut self, address: u64, length: u64, where_id: WhereId, cat: Category, diags: &mut Diagnostics) {
        if length == 0 {
            return;
        }
        let end = address + length;
        let mut touched = 0usize;
        let mut covered_by_any_section = false;

        for sc in &mut self.sections {
            let sec_start = sc.info.address;
            let sec_end = sc.info.address + sc.info.size;
            let lo = address.max(sec_start);
            let hi = end.min(sec_end);
            if lo >= hi {
                continue;
            }
            touched += 1;
            covered_by_any_section = true;
            if sc.cov.is_overlap(lo, hi - lo) {
                diags.report(
                    cat | Category::IMPACT_2 | Category::ERROR,
                    where_id,
                    format!(
                        "range [{:#x}, {:#x}) overlaps previously covered bytes of section {}",
                        lo, hi, sc.info.name
                    ),
                );
            }
            sc.cov.add(lo, hi - lo);
            sc.hit = true;
        }

        if touched > 1 {
            diags.report(
                cat | Category::IMPACT_2,
                where_id,
                format!("range [{:#x}, {:#x}) straddles more than one section", address, end),
            );
        }
        if !covered_by_any_section {
            diags.report(
                cat | Category::IMPACT_2,
                where_id,
                format!("range [{:#x}, {:#x}) falls in no allocated section", address, end),
            );
        }
    }

    /// Iterates every per-section hole not explained away by spec.md
    /// §4.8's exceptions: a non-executable, non-`.init`/`.fini`/`.plt`
    /// section; an all-zero-byte hole; or a hole shorter than one
    /// alignment unit.
    pub fn find_holes(&self, obj: &dyn ObjectView, mut cb: impl FnMut(&SectionCoverage, u64, u64)) {
        for sc in &self.sections {
            if !sc.info.flags.alloc || !sc.hit {
                continue;
            }
            let is_special = matches!(sc.info.name.as_str(), ".init" | ".fini" | ".plt");
            if !sc.info.flags.exec && !is_special {
                continue;
            }
            let bytes = obj.section_bytes(&sc.info.name);
            let align = sc.info.align.max(1);
            sc.cov.find_holes(sc.info.address, sc.info.address + sc.info.size, |start, len| {
                if len < align {
                    return;
                }
                if let Some(bytes) = bytes {
                    let rel = (start - sc.info.address) as usize;
                    let end = rel + len as usize;
                    if end <= bytes.len() && bytes[rel..end].iter().all(|&b| b == 0) {
                        return;
                    }
                }
                cb(sc, start, len);
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::{Criteria, Where};
    use crate::objectview::{SectionFlags, SectionInfo};

    fn obj_with_text() -> crate::objectview::fake::FakeObject {
        let mut obj = crate::objectview::fake::FakeObject::default();
        obj.section_infos.push(SectionInfo {
            name: ".text".to_string(),
            address: 0x1000,
            size: 0x100,
            align: 4,
            flags: SectionFlags { alloc: true, exec: true },
        });
        obj
    }

    #[test]
    fn add_detects_overlap_within_a_section() {
        let obj = obj_with_text();
        let mut map = CoverageMap::build(&obj);
        let criteria = Criteria::default();
        let mut diags = Diagnostics::new(&criteria, false);
        let w = diags.insert_where(Where::new(".debug_info"));
        map.add(0x1000, 0x10, w, Category::INFO, &mut diags);
        map.add(0x1008, 0x10, w, Category::INFO, &mut diags);
        assert_eq!(diags.error_count(), 1);
    }

    #[test]
    fn add_outside_any_section_is_reported() {
        let obj = obj_with_text();
        let mut map = CoverageMap::build(&obj);
        let criteria = Criteria::default();
        let mut diags = Diagnostics::new(&criteria, false);
        let w = diags.insert_where(Where::new(".debug_info"));
        map.add(0x5000, 0x10, w, Category::INFO, &mut diags);
        assert_eq!(diags.warning_count(), 1);
    }

    #[test]
    fn find_holes_skips_all_zero_gaps() {
        let mut obj = obj_with_text();
        obj.sections.insert(".text", vec![0u8; 0x100]);
        let mut map = CoverageMap::build(&obj);
        let criteria = Criteria::default();
        let mut diags = Diagnostics::new(&criteria, false);
        let w = diags.insert_where(Where::new(".debug_info"));
        map.add(0x1000, 0x10, w, Category::INFO, &mut diags);
        map.add(0x1080, 0x10, w, Category::INFO, &mut diags);
        let mut holes = vec![];
        map.find_holes(&obj, |sc, s, l| holes.push((sc.info.name.clone(), s, l)));
        assert!(holes.is_empty(), "an all-zero-filled hole should not be reported: {holes:?}");
    }
}
