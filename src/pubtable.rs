//! C9 (pubnames/pubtypes half) — Structural validation of
//! `.debug_pubnames`/`.debug_pubtypes` against the CU chain (spec.md
//! §4.6): "Pubnames / pubtypes: `{version:2, cu_offset, cu_length,
//! records*}` where each record is `(offset, NUL-terminated name)`,
//! terminated by `offset==0`. Validate `cu_length == cu.length`; each
//! `offset+cu.offset` must exist in `cu.die_addrs`."
//!
//! No teacher counterpart; shares the table-of-sets shape with
//! `aranges.rs`/`line.rs`.

use crate::diag::{Category, Diagnostics, Where, WhereId};
use crate::dwarf::cu::Cu;
use crate::dwarf::die::relocate_addr;
use crate::objectview::ObjectView;
use crate::read::ReadContext;
use crate::reloc::{ExpectedTarget, RelocationTable};

/// Which of the two structurally-identical tables is being checked —
/// only the section name, the `Category` bit, and the CU flag it sets
/// differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Names,
    Types,
}

impl Kind {
    fn section_name(self) -> &'static str {
        match self {
            Kind::Names => ".debug_pubnames",
            Kind::Types => ".debug_pubtypes",
        }
    }

    fn category(self) -> Category {
        match self {
            Kind::Names => Category::PUBNAMES,
            Kind::Types => Category::PUBTYPES,
        }
    }
}

pub fn check(kind: Kind, buf: &[u8], big_endian: bool, cus: &mut [Cu], reloc: &mut RelocationTable, obj: &dyn ObjectView, diags: &mut Diagnostics) {
    let mut ctx = ReadContext::init(buf, 0, big_endian);
    while !ctx.eof() {
        if ctx.remaining() < 4 {
            break;
        }
        if check_one_set(kind, &mut ctx, cus, reloc, obj, diags).is_none() {
            break;
        }
    }
}

fn check_one_set(kind: Kind, ctx: &mut ReadContext, cus: &mut [Cu], reloc: &mut RelocationTable, obj: &dyn ObjectView, diags: &mut Diagnostics) -> Option<()> {
    let set_where = diags.insert_where(Where::new(kind.section_name()).with_addr1(ctx.get_offset()));

    let first4 = ctx.u32().ok()?;
    let dwarf64 = first4 == 0xffff_ffff;
    let length = if dwarf64 { ctx.u64().ok()? } else { first4 as u64 };
    let set_end = ctx.get_offset() + length;

    let version = ctx.u16().ok()?;
    if version != 2 {
        diags.report(kind.category() | Category::HEADER | Category::ERROR, set_where, format!("unsupported {} version {}", kind.section_name(), version));
        let _ = ctx.skip((set_end.saturating_sub(ctx.get_offset())) as usize);
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

    let cu_length = ctx.offset(dwarf64).ok()?;

    let cu_idx = cus.iter().position(|c| c.offset == cu_offset);
    match cu_idx {
        Some(idx) => {
            if cu_length != cus[idx].length {
                diags.report(
                    kind.category() | Category::HEADER | Category::ERROR,
                    set_where,
                    format!("cu_length {:#x} does not match the referenced CU's own length {:#x}", cu_length, cus[idx].length),
                );
            }
            match kind {
                Kind::Names => cus[idx].has_pubnames = true,
                Kind::Types => cus[idx].has_pubtypes = true,
            }
        }
        None => {
            diags.report(kind.category() | Category::ERROR, set_where, format!("set references CU offset {:#x}, which does not exist", cu_offset));
        }
    }

    loop {
        if ctx.get_offset() >= set_end {
            break;
        }
        let record_where = set_where;
        let die_off_pos = ctx.get_offset();
        let die_offset_raw = ctx.offset(dwarf64).ok()?;

        if die_offset_raw == 0 {
            break;
        }

        let name = ctx.str().ok()?;

        if let Some(idx) = cu_idx {
            let global_offset = cus[idx].offset + die_offset_raw;
            if !cus[idx].die_addrs.contains(global_offset) {
                diags.report(
                    kind.category() | Category::DIE_REL | Category::ERROR,
                    record_where,
                    format!("{:?} {:#x} at offset {:#x} does not name a DIE in the referenced CU", name, global_offset, die_off_pos),
                );
            }
        }
    }

    Some(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::{Criteria, WhereArena};
    use crate::objectview::fake::FakeObject;
    use crate::reloc::RelocationTable;

    fn one_set(cu_offset: u32, cu_length: u32, records: &[(u32, &str)]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend(2u16.to_le_bytes());
        body.extend(cu_offset.to_le_bytes());
        body.extend(cu_length.to_le_bytes());
        for (off, name) in records {
            body.extend(off.to_le_bytes());
            body.extend(name.as_bytes());
            body.push(0);
        }
        body.extend(0u32.to_le_bytes()); // terminator

        let mut out = Vec::new();
        out.extend((body.len() as u32).to_le_bytes());
        out.extend(body);
        out
    }

    fn base_cu(offset: u64, length: u64, where_id: WhereId) -> Cu {
        let mut cu = Cu::new(offset, where_id);
        cu.length = length;
        cu
    }

    #[test]
    fn matching_record_marks_has_pubnames_and_is_clean() {
        let mut arena = WhereArena::new();
        let w = arena.insert(Where::new(".debug_info"));
        let mut cu = base_cu(0, 0x40, w);
        cu.die_addrs.insert(0x10);
        let mut cus = vec![cu];

        let buf = one_set(0, 0x40, &[(0x10, "main")]);
        let obj = FakeObject::default();
        let mut reloc = RelocationTable::load(&obj, ".rel.debug_pubnames");
        let criteria = Criteria::default();
        let mut diags = Diagnostics::new(&criteria, false);

        check(Kind::Names, &buf, false, &mut cus, &mut reloc, &obj, &mut diags);
        assert!(cus[0].has_pubnames);
        assert_eq!(diags.error_count(), 0);
    }

    #[test]
    fn record_pointing_outside_die_addrs_is_an_error() {
        let mut arena = WhereArena::new();
        let w = arena.insert(Where::new(".debug_info"));
        let cu = base_cu(0, 0x40, w);
        let mut cus = vec![cu];

        let buf = one_set(0, 0x40, &[(0x10, "main")]);
        let obj = FakeObject::default();
        let mut reloc = RelocationTable::load(&obj, ".rel.debug_pubnames");
        let criteria = Criteria::default();
        let mut diags = Diagnostics::new(&criteria, false);

        check(Kind::Names, &buf, false, &mut cus, &mut reloc, &obj, &mut diags);
        assert_eq!(diags.error_count(), 1);
    }

    #[test]
    fn mismatched_cu_length_is_an_error() {
        let mut arena = WhereArena::new();
        let w = arena.insert(Where::new(".debug_info"));
        let mut cu = base_cu(0, 0x40, w);
        cu.die_addrs.insert(0x10);
        let mut cus = vec![cu];

        let buf = one_set(0, 0x50, &[(0x10, "main")]);
        let obj = FakeObject::default();
        let mut reloc = RelocationTable::load(&obj, ".rel.debug_pubnames");
        let criteria = Criteria::default();
        let mut diags = Diagnostics::new(&criteria, false);

        check(Kind::Names, &buf, false, &mut cus, &mut reloc, &obj, &mut diags);
        assert_eq!(diags.error_count(), 1);
    }
}
