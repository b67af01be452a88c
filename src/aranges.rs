//! C9 (aranges half) — Structural validation of `.debug_aranges` against
//! the CU chain (spec.md §4.6), plus the optional CU-coverage compare
//! pass: "subtract aranges coverage from CU coverage; report gaps that
//! are not natural alignment padding."
//!
//! No teacher counterpart (the teacher never reads `.debug_aranges`);
//! built from spec.md §4.6 in the table-of-sets shape shared with
//! `pubtable.rs`/`line.rs`.

use crate::coverage::Coverage;
use crate::diag::{Category, Diagnostics, Where};
use crate::dwarf::cu::Cu;
use crate::dwarf::die::relocate_addr;
use crate::objectview::ObjectView;
use crate::read::ReadContext;
use crate::reloc::{ExpectedTarget, RelocationTable};

/// Reads and validates every set in `.debug_aranges`, marking matched CUs'
/// `has_arange` flag and returning the union of every valid tuple's
/// address range, for the optional compare pass against CU coverage.
pub fn check(
    buf: &[u8],
    big_endian: bool,
    cus: &mut [Cu],
    reloc: &mut RelocationTable,
    obj: &dyn ObjectView,
    tolerant_overlap: bool,
    diags: &mut Diagnostics,
) -> Coverage {
    let mut ctx = ReadContext::init(buf, 0, big_endian);
    let mut coverage = Coverage::new();

    while !ctx.eof() {
        if ctx.remaining() < 4 {
            break;
        }
        match check_one_set(&mut ctx, cus, reloc, obj, &mut coverage, tolerant_overlap, diags) {
            Some(()) => {}
            None => break,
        }
    }

    coverage
}

#[allow(clippy::too_many_arguments)]
fn check_one_set(
    ctx: &mut ReadContext,
    cus: &mut [Cu],
    reloc: &mut RelocationTable,
    obj: &dyn ObjectView,
    coverage: &mut Coverage,
    tolerant_overlap: bool,
    diags: &mut Diagnostics,
) -> Option<()> {
    let set_offset = ctx.get_offset();
    let set_where = diags.insert_where(Where::new(".debug_aranges").with_addr1(set_offset));

    let first4 = ctx.u32().ok()?;
    let dwarf64 = first4 == 0xffff_ffff;
    let length = if dwarf64 { ctx.u64().ok()? } else { first4 as u64 };
    let set_end = ctx.get_offset() + length;

    let version = ctx.u16().ok()?;
    if version != 2 {
        diags.report(Category::ARANGES | Category::HEADER | Category::ERROR, set_where, format!("unsupported .debug_aranges version {}", version));
        skip_to(ctx, set_end);
        return Some(());
    }

    let cu_off_pos = ctx.get_offset();
    let cu_offset_raw = ctx.offset(dwarf64).ok()?;
    let cu_offset = relocate_addr(
        reloc,
        cu_off_pos,
        if dwarf64 { 8 } else { 4 },
        cu_offset_raw,
        ExpectedTarget::DebugSection(".debug_info"),
        set_where,
        obj,
        true,
        diags,
    )
    .0;

    let address_size = ctx.ubyte().ok()?;
    let segment_size = ctx.ubyte().ok()?;
    if segment_size != 0 {
        diags.report(Category::ARANGES | Category::ERROR, set_where, format!("non-zero segment_size {} is not supported", segment_size));
    }
    if address_size != 4 && address_size != 8 {
        diags.report(Category::ARANGES | Category::ERROR, set_where, format!("address size {} is neither 4 nor 8", address_size));
        skip_to(ctx, set_end);
        return Some(());
    }

    let header_len = ctx.get_offset() - set_offset;
    let align = 2u64 * address_size as u64;
    let pad = (align - header_len % align) % align;
    if pad > 0 {
        if let Ok(bytes) = ctx.peek_bytes(pad as usize) {
            if bytes.iter().any(|&b| b != 0) {
                diags.report(Category::ARANGES | Category::IMPACT_2, set_where, "non-zero padding before the first address-range tuple");
            }
        }
        let _ = ctx.skip(pad as usize);
    }

    let cu = cus.iter_mut().find(|c| c.offset == cu_offset);
    if let Some(cu) = cu {
        cu.has_arange = true;
    } else {
        diags.report(Category::ARANGES | Category::ERROR, set_where, format!("set references CU offset {:#x}, which does not exist", cu_offset));
    }

    loop {
        if ctx.get_offset() >= set_end {
            break;
        }
        let tuple_where = set_where;
        let address = ctx.var(address_size).ok()?;
        let len = ctx.var(address_size).ok()?;

        if address == 0 && len == 0 {
            if ctx.get_offset() < set_end {
                diags.report(
                    Category::ARANGES | Category::BLOAT | Category::IMPACT_3,
                    set_where,
                    format!("[{:#x}, {:#x}): unnecessary padding with zero bytes", ctx.get_offset(), set_end),
                );
                let _ = ctx.skip((set_end - ctx.get_offset()) as usize);
            }
            break;
        }
        if len == 0 {
            diags.report(Category::ARANGES | Category::ERROR, tuple_where, format!("zero-length address-range tuple at address {:#x}", address));
            continue;
        }

        if !tolerant_overlap && coverage.is_overlap(address, len) {
            diags.report(
                Category::ARANGES | Category::RANGES | Category::BLOAT | Category::IMPACT_2,
                tuple_where,
                format!("address range [{:#x}, {:#x}) overlaps a previously declared range", address, address + len),
            );
        }
        coverage.add(address, len);
    }

    Some(())
}

fn skip_to(ctx: &mut ReadContext, set_end: u64) {
    let _ = ctx.skip((set_end.saturating_sub(ctx.get_offset())) as usize);
}

/// Subtracts `aranges_coverage` from `cu_coverage` and invokes `cb` for
/// every remaining gap wider than one alignment unit — spec.md §4.6's
/// "Optional compare pass."
pub fn compare_with_cu_coverage(cu_coverage: &Coverage, aranges_coverage: &Coverage, align: u64, mut cb: impl FnMut(u64, u64)) {
    let mut remaining = cu_coverage.clone_coverage();
    remaining.remove_all(aranges_coverage);
    remaining.find_ranges(|start, len| {
        if len >= align {
            cb(start, len);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::{Criteria, WhereArena};
    use crate::objectview::fake::FakeObject;
    use crate::reloc::RelocationTable;

    fn one_set(cu_offset: u32, tuples: &[(u32, u32)]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend(2u16.to_le_bytes()); // version
        body.extend(cu_offset.to_le_bytes()); // cu_offset
        body.push(4); // address_size
        body.push(0); // segment_size
        // header_len counted from the set's start (including the 4-byte
        // initial length) is 4+2+4+1+1=12; align to 2*4=8 needs 4 more.
        body.extend([0u8; 4]);
        for (a, l) in tuples {
            body.extend(a.to_le_bytes());
            body.extend(l.to_le_bytes());
        }
        body.extend(0u32.to_le_bytes());
        body.extend(0u32.to_le_bytes());

        let mut out = Vec::new();
        out.extend((body.len() as u32).to_le_bytes());
        out.extend(body);
        out
    }

    #[test]
    fn matches_cu_by_offset_and_marks_has_arange() {
        let mut arena = WhereArena::new();
        let w = arena.insert(Where::new(".debug_info"));
        let mut cu = Cu::new(0, w);
        cu.address_size = 4;
        let mut cus = vec![cu];

        let buf = one_set(0, &[(0x400474, 0x10)]);
        let obj = FakeObject::default();
        let mut reloc = RelocationTable::load(&obj, ".rel.debug_aranges");
        let criteria = Criteria::default();
        let mut diags = Diagnostics::new(&criteria, false);

        let cov = check(&buf, false, &mut cus, &mut reloc, &obj, false, &mut diags);
        assert!(cus[0].has_arange);
        assert!(cov.is_covered(0x400474, 0x10));
        assert_eq!(diags.error_count(), 0);
    }

    #[test]
    fn early_terminator_is_reported_as_padding() {
        let mut body = Vec::new();
        body.extend(2u16.to_le_bytes());
        body.extend(0u32.to_le_bytes());
        body.push(4);
        body.push(0);
        // header_len from the set's start (including the 4-byte initial
        // length) is 4+2+4+1+1=12; align to 2*4=8 needs 4 more.
        body.extend([0u8; 4]);
        body.extend(0x400474u32.to_le_bytes());
        body.extend(0x10u32.to_le_bytes());
        body.extend(0u32.to_le_bytes()); // terminator
        body.extend(0u32.to_le_bytes());
        body.extend([0u8; 16]); // extra padding bytes before declared end

        let mut out = Vec::new();
        out.extend(((body.len()) as u32).to_le_bytes());
        out.extend(body);

        let mut arena = WhereArena::new();
        let w = arena.insert(Where::new(".debug_info"));
        let mut cu = Cu::new(0, w);
        cu.address_size = 4;
        let mut cus = vec![cu];

        let obj = FakeObject::default();
        let mut reloc = RelocationTable::load(&obj, ".rel.debug_aranges");
        let criteria = Criteria::default();
        let mut diags = Diagnostics::new(&criteria, false);
        check(&out, false, &mut cus, &mut reloc, &obj, false, &mut diags);
        assert_eq!(diags.warning_count(), 1);
        assert_eq!(diags.error_count(), 0);
    }

    #[test]
    fn compare_pass_reports_uncovered_cu_addresses() {
        let mut cu_cov = Coverage::new();
        cu_cov.add(0x400474, 0x20);
        let mut ar_cov = Coverage::new();
        ar_cov.add(0x400474, 0xd); // covers [0x400474, 0x400481)

        let mut gaps = vec![];
        compare_with_cu_coverage(&cu_cov, &ar_cov, 4, |s, l| gaps.push((s, l)));
        assert_eq!(gaps, vec![(0x400481, 0x13)]);
    }
}
