//! C7 — DIE chain walker (spec.md §4.3): recursive parse of `.debug_info`
//! CU by CU, DIE by DIE, with attribute-form decoding, sibling/reference
//! tracking, and low/high-pc coverage accumulation.
//!
//! Grounded in the teacher's `dwarf.rs::{CUHeader::from, DIE::from,
//! DIE::nfrom}` recursive-descent shape (a CU header reader feeding a
//! DIE-tree reader that recurses on `has_children`), generalized from a
//! single hardcoded CU to a CU chain, real abbrev-table lookups, and
//! relocation-aware form decoding. Per spec.md §9's redesign note, the
//! walker's per-DIE result is the `WalkOutcome` sum type rather than the
//! teacher's raw `-1/0/+1`.
//!
//! Implementation choice: rather than building per-CU sub-`ReadContext`s
//! and translating CU-local offsets to section offsets by hand, the
//! whole `.debug_info` buffer is read through a single context and a CU
//! boundary is just an offset compared against `cu_end` — every offset
//! already *is* the absolute section offset spec.md's `die_addrs`/
//! `die_refs` expect, with no addition required.

use crate::abbrev::{AbbrevChain, AbbrevTable, Abbreviation};
use crate::coverage::Coverage;
use crate::diag::{Category, Diagnostics, Where, WhereId};
use crate::dwarf::cu::Cu;
use crate::dwarf::loc_expr;
use crate::dwarf::constants::{AttrName, Form};
use crate::objectview::{ObjectView, RelocWidth, SymbolSection};
use crate::read::ReadContext;
use crate::reloc::{ExpectedTarget, RelocationTable};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkOutcome {
    Err,
    Empty,
    Loaded,
}

enum AttrValue {
    Ref(u64),
    Addr { value: u64, relocated: bool, section: Option<String> },
    Other,
}

/// Everything the attribute-form decoder needs but that doesn't belong
/// on `Cu` itself — bundled so the many helper functions below don't
/// each take a dozen positional parameters.
pub struct WalkerCx<'a> {
    pub str_buf: &'a [u8],
    pub reloc_info: &'a mut RelocationTable,
    pub obj: &'a dyn ObjectView,
    pub is_rel: bool,
    pub str_coverage: &'a mut Coverage,
    pub global_pc_coverage: &'a mut Coverage,
}

/// Walks the whole `.debug_info` buffer, returning the CU chain in file
/// order.
pub fn walk(info_buf: &[u8], big_endian: bool, abbrevs: &AbbrevChain, cx: &mut WalkerCx, diags: &mut Diagnostics) -> Vec<Cu> {
    let mut ctx = ReadContext::init(info_buf, 0, big_endian);
    let mut cus = Vec::new();

    while !ctx.eof() {
        if ctx.remaining() < 4 {
            break;
        }
        if ctx.as_slice().iter().all(|&b| b == 0) {
            break; // trailing NUL padding, accepted per spec.md §8.
        }
        match parse_cu(&mut ctx, abbrevs, cx, diags) {
            Some(cu) => cus.push(cu),
            None => break,
        }
    }

    cus
}

fn parse_cu(ctx: &mut ReadContext, abbrevs: &AbbrevChain, cx: &mut WalkerCx, diags: &mut Diagnostics) -> Option<Cu> {
    let cu_offset = ctx.get_offset();
    let cu_where = diags.insert_where(Where::new(".debug_info").with_addr1(cu_offset));

    let first4 = ctx.u32().ok()?;
    let dwarf64;
    let length;
    match first4 {
        0xffff_ffff => {
            dwarf64 = true;
            length = ctx.u64().ok()?;
        }
        0xffff_fff0..=0xffff_fffe => {
            diags.report(
                Category::INFO | Category::HEADER | Category::ERROR,
                cu_where,
                format!("reserved initial-length escape value {:#x}", first4),
            );
            return None;
        }
        _ => {
            dwarf64 = false;
            length = first4 as u64;
        }
    }
    let cu_end = ctx.get_offset() + length;

    let version = ctx.u16().ok()?;
    if version != 2 && version != 3 {
        diags.report(
            Category::INFO | Category::HEADER | Category::ERROR,
            cu_where,
            format!("unsupported CU version {}", version),
        );
        return skip_to(ctx, cu_end);
    }
    if version == 2 && dwarf64 {
        diags.report(
            Category::INFO | Category::HEADER | Category::ERROR,
            cu_where,
            "DWARF version 2 compile unit uses the 64-bit initial-length escape",
        );
    }

    let abbrev_off_pos = ctx.get_offset();
    let abbrev_offset_raw = ctx.offset(dwarf64).ok()?;
    let abbrev_offset = if cx.is_rel {
        relocate_addr(
            cx.reloc_info,
            abbrev_off_pos,
            if dwarf64 { 8 } else { 4 },
            abbrev_offset_raw,
            ExpectedTarget::DebugSection(".debug_abbrev"),
            cu_where,
            cx.obj,
            cx.is_rel,
            diags,
        )
        .0
    } else {
        abbrev_offset_raw
    };

    let address_size = ctx.ubyte().ok()?;
    if address_size != 4 && address_size != 8 {
        diags.report(
            Category::INFO | Category::HEADER | Category::ERROR,
            cu_where,
            format!("address size {} is neither 4 nor 8", address_size),
        );
        return skip_to(ctx, cu_end);
    }

    let Some(table) = abbrevs.table_at(abbrev_offset) else {
        diags.report(
            Category::INFO | Category::HEADER | Category::ERROR,
            cu_where,
            format!("no abbreviation table at offset {:#x}", abbrev_offset),
        );
        return skip_to(ctx, cu_end);
    };

    let mut cu = Cu::new(cu_offset, cu_where);
    cu.length = length;
    cu.address_size = address_size;
    cu.dwarf64 = dwarf64;
    cu.cudie_offset = ctx.get_offset();

    let outcome = walk_die_chain(ctx, &mut cu, table, true, cu_end, cx, diags);
    if outcome == WalkOutcome::Err {
        return skip_to_keep(ctx, cu_end, cu);
    }

    for abbrev in table.iter() {
        if !abbrev.used.get() {
            diags.report(
                Category::ABBREVS | Category::BLOAT,
                cu.where_id,
                format!("abbreviation code {} is never used", abbrev.code),
            );
        }
    }

    resolve_local_refs(&mut cu, diags);

    Some(cu)
}

/// Abandons the rest of a malformed CU but still returns the (possibly
/// empty) partial record so siblings keep working; `None` is reserved
/// for failures so early that no `Cu` exists yet.
fn skip_to(ctx: &mut ReadContext, cu_end: u64) -> Option<Cu> {
    let _ = ctx.skip((cu_end.saturating_sub(ctx.get_offset())) as usize);
    None
}

fn skip_to_keep(ctx: &mut ReadContext, cu_end: u64, cu: Cu) -> Option<Cu> {
    let _ = ctx.skip((cu_end.saturating_sub(ctx.get_offset())) as usize);
    Some(cu)
}

fn resolve_local_refs(cu: &mut Cu, diags: &mut Diagnostics) {
    for r in cu.die_refs.sorted_deduped() {
        if !cu.die_addrs.contains(r.addr) {
            diags.report(
                Category::INFO | Category::DIE_REL | Category::ERROR,
                r.origin,
                format!("unresolved reference to DIE at {:#x}", r.addr),
            );
        }
    }
}

/// Whole-file post-pass over every CU's `global_refs`, run once all CUs
/// have been parsed (spec.md §4.3: "a global post-pass checks that all
/// global references find a DIE in any CU").
pub fn resolve_global_refs(cus: &[Cu], diags: &mut Diagnostics) {
    for cu in cus {
        for r in cu.global_refs.sorted_deduped() {
            let resolved_locally = cu.die_addrs.contains(r.addr);
            let resolved_elsewhere = cus.iter().any(|other| other.die_addrs.contains(r.addr));
            if !resolved_elsewhere {
                diags.report(
                    Category::INFO | Category::DIE_REL | Category::ERROR,
                    r.origin,
                    format!("unresolved reference to DIE at {:#x}", r.addr),
                );
            } else if resolved_locally {
                diags.report(
                    Category::INFO | Category::DIE_REL | Category::BLOAT,
                    r.origin,
                    "DW_FORM_ref_addr used for a reference that resolves within its own compile unit",
                );
            }
        }
    }
}

fn walk_die_chain(
    ctx: &mut ReadContext,
    cu: &mut Cu,
    table: &AbbrevTable,
    is_top_level: bool,
    cu_end: u64,
    cx: &mut WalkerCx,
    diags: &mut Diagnostics,
) -> WalkOutcome {
    let mut pending_sibling: Option<(u64, WhereId)> = None;
    let mut any_loaded = false;
    let mut first = true;

    loop {
        if ctx.get_offset() >= cu_end {
            break;
        }
        let die_offset = ctx.get_offset();
        let code = match ctx.uleb128() {
            Ok(leb) => *leb.value(),
            Err(_) => return WalkOutcome::Err,
        };

        if code == 0 {
            if let Some((expected, sib_where)) = pending_sibling.take() {
                diags.report(
                    Category::INFO | Category::DIE_REL | Category::ERROR,
                    sib_where,
                    format!("This DIE should have had its sibling at {:#x}, but it's the last in its chain", expected),
                );
            }
            break;
        }

        if let Some((expected, sib_where)) = pending_sibling.take() {
            if expected != die_offset {
                diags.report(
                    Category::INFO | Category::DIE_REL | Category::ERROR,
                    sib_where,
                    format!("This DIE should have had its sibling at {:#x}, but it's at {:#x}", expected, die_offset),
                );
            }
        }

        let Some(abbrev) = table.lookup(code) else {
            diags.report(
                Category::INFO | Category::ERROR,
                cu.where_id,
                format!("DIE at {:#x} uses unknown abbreviation code {}", die_offset, code),
            );
            return WalkOutcome::Err;
        };
        abbrev.used.set(true);
        cu.die_addrs.insert(die_offset);

        let die_where = diags.insert_where(Where::cu_die(cu.offset, die_offset));
        let is_cu_die = is_top_level && first;
        first = false;

        let sibling = walk_attributes(ctx, abbrev, cu, is_cu_die, die_where, cx, diags);
        match sibling {
            Some(offset) => pending_sibling = Some((offset, die_where)),
            None if abbrev.has_children => {
                diags.report(
                    Category::INFO | Category::DIE_REL | Category::BLOAT | Category::SUBOPTIMAL,
                    die_where,
                    "DIE with children has no DW_AT_sibling attribute",
                );
            }
            None => {}
        }

        any_loaded = true;

        if abbrev.has_children {
            let outcome = walk_die_chain(ctx, cu, table, false, cu_end, cx, diags);
            match outcome {
                WalkOutcome::Err => return WalkOutcome::Err,
                WalkOutcome::Empty => {
                    diags.report(
                        Category::INFO | Category::DIE_OTHER | Category::BLOAT | Category::IMPACT_3,
                        die_where,
                        "DIE advertises children but its child chain is empty",
                    );
                }
                WalkOutcome::Loaded => {}
            }
        }
    }

    if any_loaded {
        WalkOutcome::Loaded
    } else {
        WalkOutcome::Empty
    }
}

fn walk_attributes(
    ctx: &mut ReadContext,
    abbrev: &Abbreviation,
    cu: &mut Cu,
    is_cu_die: bool,
    die_where: WhereId,
    cx: &mut WalkerCx,
    diags: &mut Diagnostics,
) -> Option<u64> {
    let mut sibling_offset = None;
    let mut low_pc: Option<(u64, bool, Option<String>)> = None;
    let mut high_pc: Option<(u64, bool, Option<String>)> = None;

    for attr in &abbrev.attribs {
        let Some(value) = read_attr_value(ctx, cu, attr.form, attr.name, die_where, cx, diags) else {
            break; // truncated read; stop decoding this DIE's remaining attributes
        };

        match attr.name {
            AttrName::Sibling => {
                if let AttrValue::Ref(offset) = value {
                    sibling_offset = Some(offset);
                }
            }
            AttrName::LowPc => {
                if let AttrValue::Addr { value, relocated, section } = value {
                    if is_cu_die {
                        cu.low_pc = Some(value);
                    }
                    low_pc = Some((value, relocated, section));
                }
            }
            AttrName::HighPc => {
                if let AttrValue::Addr { value, relocated, section } = value {
                    if is_cu_die {
                        cu.high_pc = Some(value);
                        if let (Some(lo), hi) = (cu.low_pc, value) {
                            if hi > lo {
                                cx.global_pc_coverage.add(lo, hi - lo);
                            }
                        }
                    }
                    high_pc = Some((value, relocated, section));
                }
            }
            _ => {}
        }
    }

    if let (Some((_, lr, lsec)), Some((_, hr, hsec))) = (&low_pc, &high_pc) {
        if lr != hr {
            diags.report(
                Category::INFO | Category::DIE_OTHER | Category::IMPACT_2,
                die_where,
                "low_pc and high_pc disagree on whether they carry a relocation",
            );
        } else if *lr && *hr && lsec != hsec {
            diags.report(
                Category::INFO | Category::DIE_OTHER | Category::IMPACT_2,
                die_where,
                "low_pc and high_pc relocations target different sections",
            );
        }
    }

    sibling_offset
}

fn read_attr_value(
    ctx: &mut ReadContext,
    cu: &mut Cu,
    form_in: Form,
    attr_name: AttrName,
    die_where: WhereId,
    cx: &mut WalkerCx,
    diags: &mut Diagnostics,
) -> Option<AttrValue> {
    let mut form = form_in;
    let mut indirected = false;
    loop {
        if !matches!(form, Form::Indirect) {
            break;
        }
        if indirected {
            diags.report(
                Category::INFO | Category::ERROR,
                die_where,
                "DW_FORM_indirect used as the decoded value of another DW_FORM_indirect",
            );
            return None;
        }
        indirected = true;
        let leb = ctx.uleb128().ok()?;
        if leb.is_bloated() {
            report_leb_bloat(diags, die_where);
        }
        form = Form::from(*leb.value());
        if attr_name.is_sibling() && !form.is_reference_class() {
            diags.report(
                Category::INFO | Category::ERROR,
                die_where,
                "indirect DW_AT_sibling does not resolve to a reference form",
            );
        }
    }

    match form {
        Form::Addr => {
            let width = if cu.address_size == 8 { 8 } else { 4 };
            let file_off = ctx.get_offset();
            let raw = ctx.var(width).ok()?;
            let (value, relocated, section) = relocate_addr(
                cx.reloc_info,
                file_off,
                width,
                raw,
                ExpectedTarget::RelAddress,
                die_where,
                cx.obj,
                cx.is_rel,
                diags,
            );
            Some(AttrValue::Addr { value, relocated, section })
        }
        Form::RefAddr => {
            let width = if cu.dwarf64 { 8 } else { 4 };
            let file_off = ctx.get_offset();
            let raw = ctx.offset(cu.dwarf64).ok()?;
            let (value, _relocated, _section) = relocate_addr(
                cx.reloc_info,
                file_off,
                width,
                raw,
                ExpectedTarget::DebugSection(".debug_info"),
                die_where,
                cx.obj,
                cx.is_rel,
                diags,
            );
            cu.global_refs.push(value, die_where);
            Some(AttrValue::Ref(value))
        }
        Form::StrP => {
            let width = if cu.dwarf64 { 8 } else { 4 };
            let file_off = ctx.get_offset();
            let raw = ctx.offset(cu.dwarf64).ok()?;
            let reloc_width = if width == 8 { RelocWidth::Width8 } else { RelocWidth::Width4 };
            let offset = if let Some(rel) = cx.reloc_info.relocation_next(file_off, die_where, false, diags) {
                cx.reloc_info
                    .relocate_one(&rel, reloc_width, raw, ExpectedTarget::DebugSection(".debug_str"), die_where, cx.obj, diags)
            } else {
                if cx.is_rel {
                    diags.report(
                        Category::RELOC | Category::IMPACT_2,
                        die_where,
                        "LACK_RELOCATION: DW_FORM_strp offset has no matching relocation entry",
                    );
                }
                raw
            };
            if offset as usize >= cx.str_buf.len() {
                diags.report(
                    Category::STRINGS | Category::ERROR,
                    die_where,
                    format!("DW_FORM_strp offset {:#x} is outside .debug_str", offset),
                );
            } else {
                let rest = &cx.str_buf[offset as usize..];
                let len = rest.iter().position(|&b| b == 0).unwrap_or(rest.len());
                cx.str_coverage.add(offset, (len + 1) as u64);
            }
            Some(AttrValue::Other)
        }
        Form::String => {
            ctx.str().ok()?;
            Some(AttrValue::Other)
        }
        Form::UData => {
            let leb = ctx.uleb128().ok()?;
            if leb.is_bloated() {
                report_leb_bloat(diags, die_where);
            }
            Some(AttrValue::Other)
        }
        Form::RefUdata => {
            let leb = ctx.uleb128().ok()?;
            if leb.is_bloated() {
                report_leb_bloat(diags, die_where);
            }
            let global = cu.offset + *leb.value();
            cu.die_refs.push(global, die_where);
            Some(AttrValue::Ref(global))
        }
        Form::Flag => {
            ctx.ubyte().ok()?;
            Some(AttrValue::Other)
        }
        Form::FlagPresent => Some(AttrValue::Other),
        Form::Data1 => {
            ctx.ubyte().ok()?;
            Some(AttrValue::Other)
        }
        Form::Ref1 => {
            let v = ctx.ubyte().ok()? as u64;
            let global = cu.offset + v;
            cu.die_refs.push(global, die_where);
            Some(AttrValue::Ref(global))
        }
        Form::Data2 => {
            ctx.u16().ok()?;
            Some(AttrValue::Other)
        }
        Form::Ref2 => {
            let v = ctx.u16().ok()? as u64;
            let global = cu.offset + v;
            cu.die_refs.push(global, die_where);
            Some(AttrValue::Ref(global))
        }
        Form::Data4 | Form::Data8 => {
            let width = if matches!(form, Form::Data4) { 4 } else { 8 };
            if matches!(form, Form::Data8) && !cu.dwarf64 {
                diags.report(Category::INFO | Category::ERROR, die_where, "DW_FORM_data8 used in 32-bit DWARF");
            }
            let file_off = ctx.get_offset();
            let raw = ctx.var(width).ok()?;
            let reloc_width = if width == 8 { RelocWidth::Width8 } else { RelocWidth::Width4 };

            if attr_name.is_location_attr() {
                let value = if let Some(rel) = cx.reloc_info.relocation_next(file_off, die_where, false, diags) {
                    cx.reloc_info
                        .relocate_one(&rel, reloc_width, raw, ExpectedTarget::DebugSection(".debug_loc"), die_where, cx.obj, diags)
                } else {
                    raw
                };
                if value % cu.address_size as u64 != 0 {
                    diags.report(Category::LOC | Category::IMPACT_2, die_where, "location-list pointer is not address-size aligned");
                }
                cu.loc_refs.push(value, die_where);
            } else if attr_name.is_ranges_or_stmt_list() {
                let target_section = if matches!(attr_name, AttrName::Ranges) { ".debug_ranges" } else { ".debug_line" };
                let value = if let Some(rel) = cx.reloc_info.relocation_next(file_off, die_where, false, diags) {
                    cx.reloc_info
                        .relocate_one(&rel, reloc_width, raw, ExpectedTarget::DebugSection(target_section), die_where, cx.obj, diags)
                } else {
                    raw
                };
                if value % cu.address_size as u64 != 0 {
                    diags.report(Category::RANGES | Category::IMPACT_2, die_where, "range/line pointer is not address-size aligned");
                }
                match attr_name {
                    AttrName::Ranges => {
                        cu.range_refs.push(value, die_where);
                        cu.coverage.need_ranges = true;
                    }
                    AttrName::StmtList => cu.line_refs.push(value, die_where),
                    _ => {}
                }
            }
            Some(AttrValue::Other)
        }
        Form::Ref4 => {
            let v = ctx.u32().ok()? as u64;
            let global = cu.offset + v;
            cu.die_refs.push(global, die_where);
            Some(AttrValue::Ref(global))
        }
        Form::Ref8 => {
            let v = ctx.u64().ok()?;
            let global = cu.offset + v;
            cu.die_refs.push(global, die_where);
            Some(AttrValue::Ref(global))
        }
        Form::RefSig8 => {
            ctx.u64().ok()?;
            Some(AttrValue::Other)
        }
        Form::SData => {
            let leb = ctx.sleb128().ok()?;
            if leb.is_bloated() {
                report_leb_bloat(diags, die_where);
            }
            Some(AttrValue::Other)
        }
        Form::SecOffset => {
            ctx.offset(cu.dwarf64).ok()?;
            Some(AttrValue::Other)
        }
        Form::ExprLoc => {
            let leb = ctx.uleb128().ok()?;
            let len = *leb.value();
            let bytes = ctx.peek_bytes(len as usize).ok()?.to_vec();
            ctx.skip(len as usize).ok()?;
            loc_expr::validate(&bytes, ctx.big_endian, cu.address_size == 8, die_where, diags);
            Some(AttrValue::Other)
        }
        Form::Block | Form::Block1 | Form::Block2 | Form::Block4 => {
            let len = match form {
                Form::Block => *ctx.uleb128().ok()?.value(),
                Form::Block1 => ctx.ubyte().ok()? as u64,
                Form::Block2 => ctx.u16().ok()? as u64,
                Form::Block4 => ctx.u32().ok()? as u64,
                _ => unreachable!(),
            };
            let bytes = ctx.peek_bytes(len as usize).ok()?.to_vec();
            ctx.skip(len as usize).ok()?;
            if attr_name.is_location_attr() {
                loc_expr::validate(&bytes, ctx.big_endian, cu.address_size == 8, die_where, diags);
            } else {
                let here = ctx.get_offset();
                cx.reloc_info.relocation_next(here, die_where, false, diags);
            }
            Some(AttrValue::Other)
        }
        Form::Indirect => unreachable!("resolved by the loop above"),
        Form::Unrecognized(n) => {
            diags.report(Category::INFO | Category::ERROR, die_where, format!("unrecognized attribute form {:#x}", n));
            None
        }
    }
}

pub(crate) fn relocate_addr(
    reloc_info: &mut RelocationTable,
    file_off: u64,
    width: u8,
    raw: u64,
    expected: ExpectedTarget,
    where_id: WhereId,
    obj: &dyn ObjectView,
    is_rel: bool,
    diags: &mut Diagnostics,
) -> (u64, bool, Option<String>) {
    let reloc_width = if width == 8 { RelocWidth::Width8 } else { RelocWidth::Width4 };
    if let Some(rel) = reloc_info.relocation_next(file_off, where_id, false, diags) {
        let value = reloc_info.relocate_one(&rel, reloc_width, raw, expected, where_id, obj, diags);
        let section = obj.symbol(rel.symndx).and_then(|s| match s.section {
            SymbolSection::Section(idx) => obj.section_name_by_index(idx),
            _ => None,
        });
        (value, true, section)
    } else {
        if is_rel && raw != 0 {
            diags.report(Category::RELOC | Category::IMPACT_2, where_id, "value is not relocated in an ET_REL file");
        }
        (raw, false, None)
    }
}

fn report_leb_bloat(diags: &mut Diagnostics, where_id: WhereId) {
    diags.report(
        Category::INFO | Category::LEB128 | Category::BLOAT | Category::IMPACT_3,
        where_id,
        "LEB128 value encoded with more bytes than necessary",
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abbrev;
    use crate::diag::Criteria;
    use crate::leb128::uleb128_encode;
    use crate::objectview::fake::FakeObject;
    use crate::reloc::RelocationTable;

    fn uleb(v: u64) -> Vec<u8> {
        uleb128_encode(v)
    }

    /// One CU with one DIE (compile_unit, no children, no attributes).
    fn minimal_cu_bytes() -> Vec<u8> {
        let mut body = Vec::new();
        body.extend(2u16.to_le_bytes()); // version
        body.extend(0u32.to_le_bytes()); // abbrev_offset
        body.push(4); // address_size
        body.extend(uleb(1)); // DIE code 1
        body.push(0); // terminate top-level chain

        let mut out = Vec::new();
        out.extend((body.len() as u32).to_le_bytes());
        out.extend(body);
        out
    }

    fn abbrev_bytes() -> Vec<u8> {
        let mut b = Vec::new();
        b.extend(uleb(1));
        b.extend(uleb(0x11)); // compile_unit
        b.push(0); // no children
        b.extend(uleb(0));
        b.extend(uleb(0));
        b.extend(uleb(0));
        b
    }

    #[test]
    fn walks_one_minimal_cu() {
        let criteria = Criteria::default();
        let mut diags = Diagnostics::new(&criteria, false);
        let abbrev_buf = abbrev_bytes();
        let abbrevs = abbrev::load(&abbrev_buf, false, &mut diags);
        let info_buf = minimal_cu_bytes();
        let obj = FakeObject::default();
        let mut reloc = RelocationTable::load(&obj, ".rel.debug_info");
        let mut str_cov = Coverage::new();
        let mut pc_cov = Coverage::new();
        let mut cx = WalkerCx {
            str_buf: &[],
            reloc_info: &mut reloc,
            obj: &obj,
            is_rel: false,
            str_coverage: &mut str_cov,
            global_pc_coverage: &mut pc_cov,
        };
        let cus = walk(&info_buf, false, &abbrevs, &mut cx, &mut diags);
        assert_eq!(cus.len(), 1);
        assert_eq!(cus[0].die_addrs.len(), 1);
        assert_eq!(diags.error_count(), 0);
    }

    #[test]
    fn sibling_mismatch_is_an_error() {
        // Abbrev: code 1 has_children=1 with DW_AT_sibling(ref4); code 2 is a plain leaf.
        let mut ab = Vec::new();
        ab.extend(uleb(1));
        ab.extend(uleb(0x2e)); // subprogram
        ab.push(1); // has_children
        ab.extend(uleb(0x01)); // DW_AT_sibling
        ab.extend(uleb(0x13)); // DW_FORM_ref4
        ab.extend(uleb(0));
        ab.extend(uleb(0));
        ab.extend(uleb(2));
        ab.extend(uleb(0x34)); // variable
        ab.push(0);
        ab.extend(uleb(0));
        ab.extend(uleb(0));
        ab.extend(uleb(0));

        let criteria = Criteria::default();
        let mut diags = Diagnostics::new(&criteria, false);
        let abbrevs = abbrev::load(&ab, false, &mut diags);

        // CU: DIE1 (code 1, sibling=0xFF bogus) { DIE2 (code 2) } terminator; terminator.
        let mut body = Vec::new();
        body.extend(2u16.to_le_bytes());
        body.extend(0u32.to_le_bytes());
        body.push(4);
        body.extend(uleb(1)); // DIE1 code
        body.extend(0xFFu32.to_le_bytes()); // bogus sibling offset
        body.extend(uleb(2)); // child DIE2
        body.push(0); // end DIE1's children
        body.push(0); // end top-level chain

        let mut info = Vec::new();
        info.extend((body.len() as u32).to_le_bytes());
        info.extend(body);

        let obj = FakeObject::default();
        let mut reloc = RelocationTable::load(&obj, ".rel.debug_info");
        let mut str_cov = Coverage::new();
        let mut pc_cov = Coverage::new();
        let mut cx = WalkerCx {
            str_buf: &[],
            reloc_info: &mut reloc,
            obj: &obj,
            is_rel: false,
            str_coverage: &mut str_cov,
            global_pc_coverage: &mut pc_cov,
        };
        let cus = walk(&info, false, &abbrevs, &mut cx, &mut diags);
        assert_eq!(cus.len(), 1);
        assert!(diags.error_count() >= 1);
    }
}
