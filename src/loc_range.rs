//! C8 — Loc/Range checker (spec.md §4.5): validates `.debug_loc` and
//! `.debug_ranges` entries referenced from the CU chain's `loc_refs`/
//! `range_refs`, in lock-step with the relocation cursor.
//!
//! No teacher counterpart; built directly from spec.md §4.5, reusing
//! `ReadContext` and the relocation-then-classify pattern C7 (`dwarf::die`)
//! established for `.debug_info`.

use crate::coverage::Coverage;
use crate::diag::{Category, Diagnostics, Where, WhereId};
use crate::dwarf::cu::Cu;
use crate::dwarf::die::relocate_addr;
use crate::dwarf::loc_expr;
use crate::objectview::ObjectView;
use crate::read::ReadContext;
use crate::reloc::{ExpectedTarget, RelocationTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Loc,
    Ranges,
}

impl Kind {
    fn section_name(self) -> &'static str {
        match self {
            Kind::Loc => ".debug_loc",
            Kind::Ranges => ".debug_ranges",
        }
    }

    fn category(self) -> Category {
        match self {
            Kind::Loc => Category::LOC,
            Kind::Ranges => Category::RANGES,
        }
    }
}

/// Validates every `.debug_loc`/`.debug_ranges` list referenced by any CU
/// in `cus`, per spec.md §4.5. `byte_coverage` tracks which bytes of the
/// section have already been consumed so that two lists claiming
/// overlapping bytes are caught; it is a section-local `Coverage`, not an
/// address-space one (that one lives per-CU in `cu.coverage.cov`).
pub fn check(
    kind: Kind,
    buf: &[u8],
    big_endian: bool,
    cus: &mut [Cu],
    reloc: &mut RelocationTable,
    obj: &dyn ObjectView,
    diags: &mut Diagnostics,
) {
    let section = kind.section_name();
    let cat = kind.category();

    // Pre-pass: collect all references across all CUs, paired with the
    // originating CU's index, sorted by offset, deduplicated so the
    // relocation cursor only ever advances (spec.md §4.5, §5).
    let mut refs: Vec<(u64, usize, WhereId)> = Vec::new();
    for (idx, cu) in cus.iter().enumerate() {
        let list = match kind {
            Kind::Loc => &cu.loc_refs,
            Kind::Ranges => &cu.range_refs,
        };
        for r in list.iter() {
            refs.push((r.addr, idx, r.origin));
        }
    }
    refs.sort_by_key(|r| r.0);
    refs.dedup_by_key(|r| r.0);

    let mut byte_coverage = Coverage::new();

    for (offset, cu_idx, origin_where) in refs {
        if offset as usize >= buf.len() {
            diags.report(
                cat | Category::ERROR,
                origin_where,
                format!("{} reference {:#x} is outside the section", section, offset),
            );
            continue;
        }
        if byte_coverage.is_covered(offset, 1) {
            diags.report(
                cat | Category::ERROR,
                origin_where,
                format!("{} list at offset {:#x} overlaps a previously parsed list", section, offset),
            );
            continue;
        }

        let addr_size = cus[cu_idx].address_size;
        let start_where = diags.insert_where({
            let mut w = Where::new(section).with_addr1(offset);
            w.reference = Some(origin_where);
            w
        });

        let consumed = match kind {
            Kind::Loc => check_loc_list(buf, big_endian, addr_size, offset, &mut cus[cu_idx], reloc, obj, start_where, diags),
            Kind::Ranges => check_ranges_list(buf, big_endian, addr_size, offset, &mut cus[cu_idx], reloc, obj, start_where, diags),
        };

        if consumed > 0 {
            byte_coverage.add(offset, consumed);
        }
        if matches!(kind, Kind::Ranges) {
            cus[cu_idx].coverage.need_ranges = false;
        }
    }
}

/// The escape value marking a base-address-selection entry: all ones for
/// the CU's address size.
fn escape_value(addr_size: u8) -> u64 {
    if addr_size == 8 {
        u64::MAX
    } else {
        u32::MAX as u64
    }
}

struct AddrRead {
    value: u64,
    relocated: bool,
    section: Option<String>,
}

fn read_addr(
    ctx: &mut ReadContext,
    addr_size: u8,
    reloc: &mut RelocationTable,
    obj: &dyn ObjectView,
    where_id: WhereId,
    diags: &mut Diagnostics,
) -> Option<AddrRead> {
    let file_off = ctx.get_offset();
    let raw = ctx.var(addr_size).ok()?;
    if raw == escape_value(addr_size) {
        // Escape sentinels are synthetic markers, never relocated.
        return Some(AddrRead {
            value: raw,
            relocated: false,
            section: None,
        });
    }
    let (value, relocated, section) = relocate_addr(reloc, file_off, addr_size, raw, ExpectedTarget::RelAddress, where_id, obj, true, diags);
    Some(AddrRead { value, relocated, section })
}

#[allow(clippy::too_many_arguments)]
fn check_ranges_list(
    buf: &[u8],
    big_endian: bool,
    addr_size: u8,
    offset: u64,
    cu: &mut Cu,
    reloc: &mut RelocationTable,
    obj: &dyn ObjectView,
    where_id: WhereId,
    diags: &mut Diagnostics,
) -> u64 {
    let mut ctx = match ReadContext::init(buf, 0, big_endian).init_sub(offset as usize, buf.len()) {
        Ok(c) => c,
        Err(_) => return 0,
    };
    let mut base = cu.low_pc;

    loop {
        if ctx.eof() {
            diags.report(Category::RANGES | Category::ERROR, where_id, "range list runs off the end of the section without a terminator");
            break;
        }
        let Some(begin) = read_addr(&mut ctx, addr_size, reloc, obj, where_id, diags) else {
            break;
        };
        let Some(end) = read_addr(&mut ctx, addr_size, reloc, obj, where_id, diags) else {
            break;
        };

        if begin.value == escape_value(addr_size) {
            if base == Some(end.value) {
                diags.report(
                    Category::RANGES | Category::BLOAT | Category::IMPACT_3,
                    where_id,
                    "redundant base-address selection re-selects the current base",
                );
            }
            base = Some(end.value);
            continue;
        }
        if begin.value == 0 && end.value == 0 && !begin.relocated && !end.relocated {
            break;
        }

        check_reloc_discipline(&begin, &end, where_id, diags);

        if end.value < begin.value {
            diags.report(Category::RANGES | Category::ERROR, where_id, "range list entry has end address before begin address");
            continue;
        }
        if end.value == begin.value {
            diags.report(Category::RANGES | Category::BLOAT, where_id, "range list entry spans zero bytes");
            continue;
        }
        let Some(base) = base else {
            diags.report(Category::RANGES | Category::ERROR, where_id, "address range with no base address set");
            continue;
        };
        cu.coverage.cov.add(base + begin.value, end.value - begin.value);
    }

    ctx.get_offset()
}

#[allow(clippy::too_many_arguments)]
fn check_loc_list(
    buf: &[u8],
    big_endian: bool,
    addr_size: u8,
    offset: u64,
    cu: &mut Cu,
    reloc: &mut RelocationTable,
    obj: &dyn ObjectView,
    where_id: WhereId,
    diags: &mut Diagnostics,
) -> u64 {
    let mut ctx = match ReadContext::init(buf, 0, big_endian).init_sub(offset as usize, buf.len()) {
        Ok(c) => c,
        Err(_) => return 0,
    };
    let mut base = cu.low_pc;

    loop {
        if ctx.eof() {
            diags.report(Category::LOC | Category::ERROR, where_id, "location list runs off the end of the section without a terminator");
            break;
        }
        let Some(begin) = read_addr(&mut ctx, addr_size, reloc, obj, where_id, diags) else {
            break;
        };
        let Some(end) = read_addr(&mut ctx, addr_size, reloc, obj, where_id, diags) else {
            break;
        };

        if begin.value == escape_value(addr_size) {
            if base == Some(end.value) {
                diags.report(
                    Category::LOC | Category::BLOAT | Category::IMPACT_3,
                    where_id,
                    "redundant base-address selection re-selects the current base",
                );
            }
            base = Some(end.value);
            continue;
        }
        if begin.value == 0 && end.value == 0 && !begin.relocated && !end.relocated {
            break;
        }

        check_reloc_discipline(&begin, &end, where_id, diags);

        let valid = if end.value < begin.value {
            diags.report(Category::LOC | Category::ERROR, where_id, "location list entry has end address before begin address");
            false
        } else if end.value == begin.value {
            diags.report(Category::LOC | Category::BLOAT, where_id, "location list entry spans zero bytes");
            false
        } else if base.is_none() {
            diags.report(Category::LOC | Category::ERROR, where_id, "address range with no base address set");
            false
        } else {
            true
        };

        let Ok(len) = ctx.u16() else {
            diags.report(Category::LOC | Category::ERROR, where_id, "location list entry is missing its expression length");
            break;
        };
        let Ok(expr_bytes) = ctx.peek_bytes(len as usize) else {
            diags.report(Category::LOC | Category::ERROR, where_id, "location expression length runs past the end of the section");
            break;
        };
        let expr_bytes = expr_bytes.to_vec();
        if ctx.skip(len as usize).is_err() {
            break;
        }
        loc_expr::validate(&expr_bytes, big_endian, addr_size == 8, where_id, diags);

        if valid {
            if let Some(base) = base {
                cu.coverage.cov.add(base + begin.value, end.value - begin.value);
            }
        }
    }

    ctx.get_offset()
}

fn check_reloc_discipline(begin: &AddrRead, end: &AddrRead, where_id: WhereId, diags: &mut Diagnostics) {
    if begin.relocated != end.relocated {
        diags.report(
            Category::RELOC | Category::IMPACT_2,
            where_id,
            "one of a range's two addresses is relocated but the other is not",
        );
        return;
    }
    if begin.relocated && end.relocated && begin.section != end.section {
        diags.report(
            Category::RELOC | Category::IMPACT_2,
            where_id,
            "a range's begin and end addresses are relocated against different sections",
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::{Criteria, WhereArena};
    use crate::dwarf::cu::Cu;
    use crate::objectview::fake::FakeObject;
    use crate::reloc::RelocationTable;

    fn test_cu(low_pc: Option<u64>) -> Cu {
        let mut arena = WhereArena::new();
        let w = arena.insert(Where::new(".debug_info"));
        let mut cu = Cu::new(0, w);
        cu.address_size = 4;
        cu.low_pc = low_pc;
        cu
    }

    #[test]
    fn ranges_list_with_base_accumulates_coverage() {
        let mut buf = Vec::new();
        buf.extend(0x10u32.to_le_bytes()); // begin
        buf.extend(0x20u32.to_le_bytes()); // end
        buf.extend(0u32.to_le_bytes()); // terminator
        buf.extend(0u32.to_le_bytes());

        let mut cu = test_cu(Some(0x1000));
        cu.range_refs.push(0, cu.where_id);
        let mut cus = vec![cu];

        let obj = FakeObject::default();
        let mut reloc = RelocationTable::load(&obj, ".rel.debug_ranges");
        let criteria = Criteria::default();
        let mut diags = Diagnostics::new(&criteria, false);

        check(Kind::Ranges, &buf, false, &mut cus, &mut reloc, &obj, &mut diags);
        assert_eq!(diags.error_count(), 0);
        assert!(cus[0].coverage.cov.is_covered(0x1010, 0x10));
        assert!(!cus[0].coverage.need_ranges);
    }

    #[test]
    fn ranges_list_without_base_is_an_error() {
        let mut buf = Vec::new();
        buf.extend(0x10u32.to_le_bytes());
        buf.extend(0x20u32.to_le_bytes());
        buf.extend(0u32.to_le_bytes());
        buf.extend(0u32.to_le_bytes());

        let mut cu = test_cu(None);
        cu.range_refs.push(0, cu.where_id);
        let mut cus = vec![cu];

        let obj = FakeObject::default();
        let mut reloc = RelocationTable::load(&obj, ".rel.debug_ranges");
        let criteria = Criteria::default();
        let mut diags = Diagnostics::new(&criteria, false);

        check(Kind::Ranges, &buf, false, &mut cus, &mut reloc, &obj, &mut diags);
        assert_eq!(diags.error_count(), 1);
    }

    #[test]
    fn two_lists_claiming_the_same_offset_overlap() {
        let mut buf = Vec::new();
        buf.extend(0x10u32.to_le_bytes());
        buf.extend(0x20u32.to_le_bytes());
        buf.extend(0u32.to_le_bytes());
        buf.extend(0u32.to_le_bytes());

        let mut cu = test_cu(Some(0x1000));
        cu.range_refs.push(0, cu.where_id);
        cu.range_refs.push(0, cu.where_id); // duplicate offset, deduped by the pre-pass
        let mut cus = vec![cu];

        let obj = FakeObject::default();
        let mut reloc = RelocationTable::load(&obj, ".rel.debug_ranges");
        let criteria = Criteria::default();
        let mut diags = Diagnostics::new(&criteria, false);

        check(Kind::Ranges, &buf, false, &mut cus, &mut reloc, &obj, &mut diags);
        assert_eq!(diags.error_count(), 0); // deduped, not double-processed
    }
}
