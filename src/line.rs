//! C9 (line-number program half) — Structural validation of
//! `.debug_line` against the CU chain (spec.md §4.6): a header describing
//! the include-directory and file-name tables followed by a byte-coded
//! state-machine program.
//!
//! No teacher counterpart; shares the table-of-sets shape with
//! `aranges.rs`/`pubtable.rs`.

use crate::diag::{Category, Diagnostics, Where};
use crate::dwarf::cu::Cu;
use crate::dwarf::die::relocate_addr;
use crate::objectview::ObjectView;
use crate::read::ReadContext;
use crate::reloc::{ExpectedTarget, RelocationTable};

const DW_LNS_SET_FILE: u8 = 4;
const DW_LNS_FIXED_ADVANCE_PC: u8 = 9;

const DW_LNE_END_SEQUENCE: u64 = 1;
const DW_LNE_SET_ADDRESS: u64 = 2;
const DW_LNE_DEFINE_FILE: u64 = 3;

pub fn check(buf: &[u8], big_endian: bool, addr_size: u8, cus: &mut [Cu], reloc: &mut RelocationTable, obj: &dyn ObjectView, diags: &mut Diagnostics) {
    let mut ctx = ReadContext::init(buf, 0, big_endian);
    let mut set_offsets = Vec::new();

    while !ctx.eof() {
        if ctx.remaining() < 4 {
            break;
        }
        let set_offset = ctx.get_offset();
        match check_one_set(&mut ctx, addr_size, reloc, obj, diags) {
            Some(()) => set_offsets.push(set_offset),
            None => break,
        }
    }

    for cu in cus.iter() {
        for r in cu.line_refs.iter() {
            if !set_offsets.contains(&r.addr) {
                diags.report(
                    Category::LINE | Category::DIE_REL | Category::ERROR,
                    r.origin,
                    format!("DW_AT_stmt_list {:#x} does not match the start of any line-number program", r.addr),
                );
            }
        }
    }
}

#[allow(clippy::too_many_lines)]
fn check_one_set(ctx: &mut ReadContext, addr_size: u8, reloc: &mut RelocationTable, obj: &dyn ObjectView, diags: &mut Diagnostics) -> Option<()> {
    let set_offset = ctx.get_offset();
    let set_where = diags.insert_where(Where::new(".debug_line").with_addr1(set_offset));

    let first4 = ctx.u32().ok()?;
    let dwarf64 = first4 == 0xffff_ffff;
    let unit_length = if dwarf64 { ctx.u64().ok()? } else { first4 as u64 };
    let set_end = ctx.get_offset() + unit_length;

    let version = ctx.u16().ok()?;
    if version != 2 && version != 3 {
        diags.report(Category::LINE | Category::HEADER | Category::ERROR, set_where, format!("unsupported .debug_line version {}", version));
        let _ = ctx.skip((set_end.saturating_sub(ctx.get_offset())) as usize);
        return Some(());
    }

    let header_length = ctx.offset(dwarf64).ok()?;
    let program_start = ctx.get_offset() + header_length;

    let min_instruction_length = ctx.ubyte().ok()?;
    let default_is_stmt = ctx.ubyte().ok()?;
    if default_is_stmt != 0 && default_is_stmt != 1 {
        diags.report(
            Category::LINE | Category::HEADER | Category::IMPACT_2,
            set_where,
            format!("default_is_stmt {} is neither 0 nor 1", default_is_stmt),
        );
    }
    let _line_base = ctx.ubyte().ok()? as i8;
    let _line_range = ctx.ubyte().ok()?;
    let opcode_base = ctx.ubyte().ok()?;
    let _ = min_instruction_length;

    let mut std_opcode_lengths = Vec::with_capacity(opcode_base.saturating_sub(1) as usize);
    for _ in 1..opcode_base {
        std_opcode_lengths.push(ctx.ubyte().ok()?);
    }

    let mut directories: Vec<String> = Vec::new();
    loop {
        let s = ctx.str().ok()?;
        if s.is_empty() {
            break;
        }
        directories.push(s.to_string());
    }
    let mut dir_used = vec![false; directories.len()];

    struct FileEntry {
        name: String,
        dir_index: u64,
    }
    let mut files: Vec<FileEntry> = Vec::new();
    loop {
        let name = ctx.str().ok()?;
        if name.is_empty() {
            break;
        }
        let dir_index = *ctx.uleb128().ok()?.value();
        let _mtime = *ctx.uleb128().ok()?.value();
        let _size = *ctx.uleb128().ok()?.value();

        if dir_index != 0 {
            let is_absolute = name.starts_with('/');
            if is_absolute {
                diags.report(
                    Category::LINE | Category::SUBOPTIMAL | Category::IMPACT_1,
                    set_where,
                    format!("file {:?} has an absolute path but a non-zero directory index {}", name, dir_index),
                );
            }
            if dir_index as usize > directories.len() {
                diags.report(
                    Category::LINE | Category::DIE_REL | Category::ERROR,
                    set_where,
                    format!("file {:?} references directory index {}, but only {} directories are declared", name, dir_index, directories.len()),
                );
            } else {
                dir_used[dir_index as usize - 1] = true;
            }
        }

        files.push(FileEntry { name: name.to_string(), dir_index });
    }
    let mut file_used = vec![false; files.len()];

    let here = ctx.get_offset();
    if here > program_start {
        diags.report(
            Category::LINE | Category::HEADER | Category::ERROR,
            set_where,
            format!("header_length claims the program starts at {:#x}, but the header itself already runs to {:#x}", program_start, here),
        );
    } else if here < program_start {
        let _ = ctx.skip((program_start - here) as usize);
    }

    let mut in_sequence = false;
    let mut saw_any_opcode = false;

    loop {
        if ctx.get_offset() >= set_end {
            if in_sequence {
                diags.report(Category::LINE | Category::ERROR, set_where, "line-number program ends with an unterminated sequence (no DW_LNE_end_sequence)");
            }
            break;
        }

        let opcode = ctx.ubyte().ok()?;

        if opcode == 0 {
            let ext_len = *ctx.uleb128().ok()?.value();
            let ext_start = ctx.get_offset();
            if ext_len == 0 {
                diags.report(Category::LINE | Category::ERROR, set_where, "extended opcode declares zero length");
                continue;
            }
            let sub_opcode = *ctx.uleb128().ok()?.value();
            saw_any_opcode = true;

            match sub_opcode {
                DW_LNE_END_SEQUENCE => {
                    in_sequence = false;
                }
                DW_LNE_SET_ADDRESS => {
                    in_sequence = true;
                    let pos = ctx.get_offset();
                    let raw = ctx.var(addr_size).ok()?;
                    let _ = relocate_addr(reloc, pos, addr_size, raw, ExpectedTarget::RelAddress, set_where, obj, true, diags);
                }
                DW_LNE_DEFINE_FILE => {
                    let _name = ctx.str().ok()?;
                    let _dir = ctx.uleb128().ok()?;
                    let _mtime = ctx.uleb128().ok()?;
                    let _size = ctx.uleb128().ok()?;
                }
                other => {
                    diags.report(Category::LINE | Category::IMPACT_1, set_where, format!("unknown extended opcode {}", other));
                }
            }

            let consumed = ctx.get_offset() - ext_start;
            if consumed < ext_len {
                let _ = ctx.skip((ext_len - consumed) as usize);
            } else if consumed > ext_len {
                diags.report(
                    Category::LINE | Category::ERROR,
                    set_where,
                    format!("extended opcode consumed {} bytes but declared length was {}", consumed, ext_len),
                );
            }
        } else if opcode < opcode_base {
            saw_any_opcode = true;
            match opcode {
                DW_LNS_FIXED_ADVANCE_PC => {
                    let _ = ctx.u16().ok()?;
                }
                DW_LNS_SET_FILE => {
                    let file = *ctx.uleb128().ok()?.value();
                    if file == 0 || file as usize > files.len() {
                        diags.report(Category::LINE | Category::DIE_REL | Category::ERROR, set_where, format!("DW_LNS_set_file references out-of-range file {}", file));
                    } else {
                        file_used[file as usize - 1] = true;
                    }
                }
                _ => {
                    // DW_LNS_copy and friends: all other standard opcodes
                    // just consume std_opcode_lengths[opcode-1] ULEB128s.
                    let n = std_opcode_lengths.get(opcode as usize - 1).copied().unwrap_or(0);
                    for _ in 0..n {
                        let _ = ctx.uleb128().ok()?;
                    }
                }
            }
        } else {
            saw_any_opcode = true;
            // special opcode: purely numeric, advances line/address; no
            // operands to read.
        }
    }

    if !saw_any_opcode {
        diags.report(Category::LINE | Category::BLOAT | Category::IMPACT_3, set_where, "line-number program is empty");
    }

    for (idx, used) in dir_used.iter().enumerate() {
        if !used {
            diags.report(Category::LINE | Category::BLOAT | Category::IMPACT_3, set_where, format!("directory {:?} is never referenced", directories[idx]));
        }
    }
    for (idx, used) in file_used.iter().enumerate() {
        if !used {
            diags.report(Category::LINE | Category::BLOAT | Category::IMPACT_3, set_where, format!("file {:?} is never referenced", files[idx].name));
        }
    }

    if ctx.get_offset() < set_end {
        let _ = ctx.skip((set_end - ctx.get_offset()) as usize);
    }

    Some(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::Criteria;
    use crate::dwarf::cu::Cu;
    use crate::objectview::fake::FakeObject;
    use crate::reloc::RelocationTable;

    fn header(opcode_base: u8, std_lens: &[u8], dirs: &[&str], files: &[(&str, u64)]) -> Vec<u8> {
        let mut h = Vec::new();
        h.push(1); // min_instruction_length
        h.push(1); // default_is_stmt
        h.push((-5i8) as u8); // line_base
        h.push(14); // line_range
        h.push(opcode_base);
        h.extend_from_slice(std_lens);
        for d in dirs {
            h.extend_from_slice(d.as_bytes());
            h.push(0);
        }
        h.push(0); // end of directories
        for (name, dir_index) in files {
            h.extend_from_slice(name.as_bytes());
            h.push(0);
            h.push(*dir_index as u8); // uleb128 single-byte
            h.push(0); // mtime
            h.push(0); // size
        }
        h.push(0); // end of files
        h
    }

    fn one_set(program: &[u8], dirs: &[&str], files: &[(&str, u64)]) -> Vec<u8> {
        let std_lens = [0u8, 1, 1, 1, 1, 0, 0, 0, 1];
        let hdr = header(10, &std_lens, dirs, files);

        let mut body = Vec::new();
        body.extend(2u16.to_le_bytes()); // version
        body.extend((hdr.len() as u32).to_le_bytes()); // header_length
        body.extend(hdr);
        body.extend_from_slice(program);

        let mut out = Vec::new();
        out.extend((body.len() as u32).to_le_bytes());
        out.extend(body);
        out
    }

    fn end_sequence_program(addr: u32) -> Vec<u8> {
        let mut p = Vec::new();
        p.push(0); // extended opcode
        p.push(1 + 4); // length: sub-opcode byte + 4-byte address
        p.push(2); // DW_LNE_set_address
        p.extend(addr.to_le_bytes());
        p.push(0);
        p.push(1);
        p.push(1); // DW_LNE_end_sequence
        p
    }

    #[test]
    fn well_formed_program_is_clean_and_marks_files_used() {
        let buf = one_set(&end_sequence_program(0x1000), &["/src"], &[("main.c", 1)]);
        let mut cus: Vec<Cu> = vec![];
        let obj = FakeObject::default();
        let mut reloc = RelocationTable::load(&obj, ".rel.debug_line");
        let criteria = Criteria::default();
        let mut diags = Diagnostics::new(&criteria, false);
        check(&buf, false, 4, &mut cus, &mut reloc, &obj, &mut diags);
        assert_eq!(diags.error_count(), 0);
    }

    #[test]
    fn unterminated_sequence_is_an_error() {
        let mut program = Vec::new();
        program.push(0);
        program.push(5);
        program.push(2); // DW_LNE_set_address
        program.extend(0x1000u32.to_le_bytes());
        // no end_sequence

        let buf = one_set(&program, &[], &[]);
        let mut cus: Vec<Cu> = vec![];
        let obj = FakeObject::default();
        let mut reloc = RelocationTable::load(&obj, ".rel.debug_line");
        let criteria = Criteria::default();
        let mut diags = Diagnostics::new(&criteria, false);
        check(&buf, false, 4, &mut cus, &mut reloc, &obj, &mut diags);
        assert_eq!(diags.error_count(), 1);
    }

    #[test]
    fn unreferenced_directory_is_a_bloat_warning() {
        let buf = one_set(&end_sequence_program(0x1000), &["/unused"], &[]);
        let mut cus: Vec<Cu> = vec![];
        let obj = FakeObject::default();
        let mut reloc = RelocationTable::load(&obj, ".rel.debug_line");
        let criteria = Criteria::default();
        let mut diags = Diagnostics::new(&criteria, false);
        check(&buf, false, 4, &mut cus, &mut reloc, &obj, &mut diags);
        assert_eq!(diags.error_count(), 0);
        assert_eq!(diags.warning_count(), 1);
    }
}
