//! §4.4 — Location expression validator: a bounded sub-parser over one
//! location-expression block (a `DW_FORM_block*` location attribute, or
//! one `.debug_loc` list entry's expression bytes).
//!
//! No teacher counterpart; built directly from spec.md §4.4, reusing
//! `ReadContext` the same way C7 does for the outer DIE walk.

use crate::address::AddressSet;
use crate::diag::{Category, Diagnostics, WhereId};
use crate::dwarf::constants::Op;
use crate::read::ReadContext;

/// Walks every opcode in `buf`, validating branch targets and the
/// architecture-dependent width rules spec.md §4.4 calls out. `where_id`
/// is the breadcrumb blamed for any diagnostic raised inside the block.
pub fn validate(buf: &[u8], big_endian: bool, addr_is_64: bool, where_id: WhereId, diags: &mut Diagnostics) {
    let mut ctx = ReadContext::init(buf, 0, big_endian);
    let mut opcode_starts = AddressSet::new();
    let mut branch_targets: Vec<(u64, u64)> = Vec::new(); // (source offset, target offset)

    while !ctx.eof() {
        let start = ctx.get_offset();
        opcode_starts.insert(start);
        let opcode = match ctx.ubyte() {
            Ok(b) => b,
            Err(_) => {
                diags.report(
                    Category::LOC | Category::ERROR,
                    where_id,
                    "location expression truncated reading opcode",
                );
                return;
            }
        };

        let ok = match Op::from(opcode) {
            Op::Addr => ctx.var(if addr_is_64 { 8 } else { 4 }).is_ok(),
            Op::Const1u | Op::Const1s => ctx.ubyte().is_ok(),
            Op::Const2u | Op::Const2s => ctx.u16().is_ok(),
            Op::Const4u | Op::Const4s => ctx.u32().is_ok(),
            Op::Const8u | Op::Const8s => {
                let ok = ctx.u64().is_ok();
                if ok && !addr_is_64 {
                    diags.report(
                        Category::LOC | Category::ERROR,
                        where_id,
                        "DW_OP_const8u/const8s used on a 32-bit address architecture",
                    );
                }
                ok
            }
            Op::Constu => match ctx.uleb128() {
                Ok(leb) => {
                    if !addr_is_64 && *leb.value() > u32::MAX as u64 {
                        diags.report(
                            Category::LOC | Category::BLOAT,
                            where_id,
                            "DW_OP_constu operand exceeds 32 bits on a 32-bit address architecture",
                        );
                    }
                    true
                }
                Err(_) => false,
            },
            Op::Consts => match ctx.sleb128() {
                Ok(leb) => {
                    if !addr_is_64 && (*leb.value()).unsigned_abs() > u32::MAX as u64 {
                        diags.report(
                            Category::LOC | Category::BLOAT,
                            where_id,
                            "DW_OP_consts operand exceeds 32 bits on a 32-bit address architecture",
                        );
                    }
                    true
                }
                Err(_) => false,
            },
            Op::DerefSize => match ctx.ubyte() {
                Ok(_) => true,
                Err(_) => false,
            },
            Op::PlusUconst => match ctx.uleb128() {
                Ok(leb) => {
                    if !addr_is_64 && *leb.value() > u32::MAX as u64 {
                        diags.report(
                            Category::LOC | Category::BLOAT,
                            where_id,
                            "DW_OP_plus_uconst operand exceeds 32 bits on a 32-bit address architecture",
                        );
                    }
                    true
                }
                Err(_) => false,
            },
            Op::Bra | Op::Skip => match ctx.u16() {
                Ok(raw) => {
                    let signed = raw as i16;
                    if signed == 0 {
                        diags.report(
                            Category::LOC | Category::BLOAT | Category::IMPACT_3,
                            where_id,
                            "DW_OP_bra/DW_OP_skip with a zero-length jump",
                        );
                    }
                    let here = ctx.get_offset() as i64;
                    let target = here + signed as i64;
                    if target < 0 || target as u64 > buf.len() as u64 {
                        diags.report(
                            Category::LOC | Category::ERROR,
                            where_id,
                            "DW_OP_bra/DW_OP_skip target falls outside the expression",
                        );
                    } else if target as u64 != buf.len() as u64 {
                        // A target exactly at the end of the block is the
                        // common "skip past the last opcode" idiom and
                        // need not land on a recorded opcode start.
                        branch_targets.push((start, target as u64));
                    }
                    true
                }
                Err(_) => false,
            },
            Op::Other(opcode) => skip_generic_operand(&mut ctx, opcode).is_ok(),
        };

        if !ok {
            diags.report(
                Category::LOC | Category::ERROR,
                where_id,
                "location expression truncated reading an operand",
            );
            return;
        }
    }

    for (source, target) in branch_targets {
        if !opcode_starts.contains(target) {
            diags.report(
                Category::LOC | Category::ERROR,
                where_id,
                format!("branch at {:#x} targets {:#x}, which is not an opcode boundary", source, target),
            );
        }
    }
}

/// Operand shape for opcodes not given bespoke handling above: literals
/// and plain registers take no operand bytes; `breg*` take one SLEB128;
/// `regx` takes one ULEB128; `fbreg` takes one SLEB128; `bregx` takes
/// ULEB128+SLEB128; `piece`/`regx` take one ULEB128. Anything else is
/// assumed to carry no operand.
fn skip_generic_operand(ctx: &mut ReadContext, opcode: u8) -> crate::read::ReadResult<()> {
    const DW_OP_BREG0: u8 = 0x70;
    const DW_OP_BREG31: u8 = 0x8f;
    const DW_OP_REGX: u8 = 0x90;
    const DW_OP_FBREG: u8 = 0x91;
    const DW_OP_BREGX: u8 = 0x92;
    const DW_OP_PIECE: u8 = 0x93;

    match opcode {
        DW_OP_BREG0..=DW_OP_BREG31 => {
            ctx.sleb128()?;
        }
        DW_OP_REGX | DW_OP_PIECE => {
            ctx.uleb128()?;
        }
        DW_OP_FBREG => {
            ctx.sleb128()?;
        }
        DW_OP_BREGX => {
            ctx.uleb128()?;
            ctx.sleb128()?;
        }
        _ => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::{Criteria, Where};

    #[test]
    fn plain_addr_expression_is_clean() {
        let criteria = Criteria::default();
        let mut diags = Diagnostics::new(&criteria, false);
        let w = diags.insert_where(Where::new(".debug_info"));
        let mut bytes = vec![0x03]; // DW_OP_addr
        bytes.extend(0x1000u64.to_le_bytes());
        validate(&bytes, false, true, w, &mut diags);
        assert_eq!(diags.error_count(), 0);
    }

    #[test]
    fn const8u_on_32bit_arch_is_error() {
        let criteria = Criteria::default();
        let mut diags = Diagnostics::new(&criteria, false);
        let w = diags.insert_where(Where::new(".debug_info"));
        let mut bytes = vec![0x0e]; // DW_OP_const8u
        bytes.extend(0u64.to_le_bytes());
        validate(&bytes, false, false, w, &mut diags);
        assert_eq!(diags.error_count(), 1);
    }

    #[test]
    fn bra_target_outside_expression_is_error() {
        let criteria = Criteria::default();
        let mut diags = Diagnostics::new(&criteria, false);
        let w = diags.insert_where(Where::new(".debug_info"));
        let mut bytes = vec![0x28]; // DW_OP_bra
        bytes.extend(100i16.to_le_bytes());
        validate(&bytes, false, true, w, &mut diags);
        assert_eq!(diags.error_count(), 1);
    }

    #[test]
    fn bra_zero_offset_is_bloat_warning() {
        let criteria = Criteria::default();
        let mut diags = Diagnostics::new(&criteria, false);
        let w = diags.insert_where(Where::new(".debug_info"));
        let mut bytes = vec![0x28]; // DW_OP_bra
        bytes.extend(0i16.to_le_bytes());
        validate(&bytes, false, true, w, &mut diags);
        assert_eq!(diags.error_count(), 0);
        assert_eq!(diags.warning_count(), 1);
    }
}
