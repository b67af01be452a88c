//! C6 — Abbreviation loader (spec.md §4.2): parses `.debug_abbrev` into a
//! chain of per-offset tables of `(code, tag, has_children, attribs)`.
//!
//! Grounded in the teacher's `dwarf.rs::{AbbrevDecl, AttrSpec}` shape (a
//! flat `Vec` of attribute specs per abbreviation, looked up later by a
//! DIE's code), generalized from the teacher's single hardcoded table to
//! a full chain keyed by starting offset, with the validation rules
//! spec.md §4.2 adds on top.

use std::cell::Cell;

use crate::diag::{Category, Diagnostics, Where, WhereId};
use crate::dwarf::constants::{AttrName, Form, Tag};
use crate::read::ReadContext;

#[derive(Debug, Clone)]
pub struct AttrSpec {
    pub name: AttrName,
    pub form: Form,
    pub where_id: WhereId,
}

#[derive(Debug)]
pub struct Abbreviation {
    pub code: u64,
    pub tag: Tag,
    pub has_children: bool,
    pub attribs: Vec<AttrSpec>,
    pub where_id: WhereId,
    /// Set once some DIE in `.debug_info` looks this code up (C7).
    pub used: Cell<bool>,
}

impl Abbreviation {
    pub fn attr(&self, name: AttrName) -> Option<&AttrSpec> {
        self.attribs.iter().find(|a| a.name == name)
    }
}

/// One `.debug_abbrev` table, sorted by code for binary lookup.
#[derive(Debug, Default)]
pub struct AbbrevTable {
    pub offset: u64,
    entries: Vec<Abbreviation>,
}

impl AbbrevTable {
    pub fn lookup(&self, code: u64) -> Option<&Abbreviation> {
        self.entries
            .binary_search_by_key(&code, |a| a.code)
            .ok()
            .map(|idx| &self.entries[idx])
    }

    pub fn iter(&self) -> impl Iterator<Item = &Abbreviation> {
        self.entries.iter()
    }
}

/// The whole `.debug_abbrev` section, as a set of tables keyed by their
/// starting offset (the offset a CU header's `abbrev_offset` refers to).
#[derive(Debug, Default)]
pub struct AbbrevChain {
    tables: Vec<AbbrevTable>,
}

impl AbbrevChain {
    pub fn table_at(&self, offset: u64) -> Option<&AbbrevTable> {
        self.tables.iter().find(|t| t.offset == offset)
    }
}

struct TableBuilder {
    offset: u64,
    entries: Vec<Abbreviation>,
}

impl TableBuilder {
    fn finish(self) -> AbbrevTable {
        let mut entries = self.entries;
        entries.sort_by_key(|a| a.code);
        AbbrevTable {
            offset: self.offset,
            entries,
        }
    }
}

/// Parses the whole `.debug_abbrev` buffer into a chain of tables,
/// applying every validation rule in spec.md §4.2.
pub fn load(buf: &[u8], big_endian: bool, diags: &mut Diagnostics) -> AbbrevChain {
    let mut ctx = ReadContext::init(buf, 0, big_endian);
    let mut chain = AbbrevChain::default();
    let mut current: Option<TableBuilder> = None;

    while !ctx.eof() {
        let entry_offset = ctx.get_offset();
        let code = match ctx.uleb128() {
            Ok(leb) => *leb.value(),
            Err(_) => break,
        };

        if code == 0 {
            if let Some(builder) = current.take() {
                chain.tables.push(builder.finish());
            }
            continue;
        }

        let table_offset = current.as_ref().map(|b| b.offset).unwrap_or(entry_offset);
        if current.is_none() {
            current = Some(TableBuilder {
                offset: table_offset,
                entries: Vec::new(),
            });
        }

        let entry_where = diags.insert_where(Where::new(".debug_abbrev").with_addr1(entry_offset));

        let tag_raw = match ctx.uleb128() {
            Ok(leb) => {
                if leb.is_bloated() {
                    diags.report(
                        Category::ABBREVS | Category::LEB128 | Category::BLOAT | Category::IMPACT_3,
                        entry_where,
                        "abbreviation tag encoded with more bytes than necessary",
                    );
                }
                *leb.value()
            }
            Err(_) => break,
        };
        if tag_raw > Tag::HI_USER {
            diags.report(
                Category::ABBREVS | Category::ERROR,
                entry_where,
                format!("abbreviation code {} has invalid tag {:#x}", code, tag_raw),
            );
        }
        let tag = Tag::from(tag_raw);

        let has_children_byte = match ctx.ubyte() {
            Ok(b) => b,
            Err(_) => break,
        };
        if has_children_byte > 1 {
            diags.report(
                Category::ABBREVS | Category::ERROR,
                entry_where,
                format!("abbreviation code {} has invalid has_children byte {}", code, has_children_byte),
            );
        }
        let has_children = has_children_byte != 0;

        let mut attribs = Vec::new();
        let mut saw_sibling: Option<(Form, WhereId)> = None;
        let mut saw_low_pc = false;
        let mut saw_high_pc = false;
        let mut saw_ranges = false;

        loop {
            let pair_offset = ctx.get_offset();
            let name_raw = match ctx.uleb128() {
                Ok(leb) => *leb.value(),
                Err(_) => break,
            };
            let form_raw = match ctx.uleb128() {
                Ok(leb) => *leb.value(),
                Err(_) => break,
            };
            if name_raw == 0 && form_raw == 0 {
                break;
            }
            let attr_where = diags.insert_where(Where::new(".debug_abbrev").with_addr1(pair_offset));
            let name = AttrName::from(name_raw);
            let form = Form::from(form_raw);

            if name.is_sibling() {
                if saw_sibling.is_some() {
                    diags.report(
                        Category::ABBREVS | Category::IMPACT_2,
                        attr_where,
                        "DW_AT_sibling appears more than once in one abbreviation",
                    );
                }
                saw_sibling = Some((form, attr_where));
            }
            if name.is_location_attr() && !form.is_valid_location_form() {
                diags.report(
                    Category::ABBREVS | Category::ERROR,
                    attr_where,
                    "location attribute does not have a location-expression form",
                );
            }
            if name.is_ranges_or_stmt_list() {
                saw_ranges = saw_ranges || matches!(name, AttrName::Ranges);
                if !form.is_valid_rangeptr_form() {
                    diags.report(
                        Category::ABBREVS | Category::ERROR,
                        attr_where,
                        "DW_AT_ranges/DW_AT_stmt_list does not have a range-pointer form",
                    );
                }
            }
            if name.is_low_pc() {
                saw_low_pc = true;
                if !form.is_valid_pc_form() {
                    diags.report(
                        Category::ABBREVS | Category::ERROR,
                        attr_where,
                        "DW_AT_low_pc does not have an address form",
                    );
                }
            }
            if name.is_high_pc() {
                saw_high_pc = true;
                if !form.is_valid_pc_form() {
                    diags.report(
                        Category::ABBREVS | Category::ERROR,
                        attr_where,
                        "DW_AT_high_pc does not have an address form",
                    );
                }
            }

            attribs.push(AttrSpec {
                name,
                form,
                where_id: attr_where,
            });
        }

        if let Some((form, sib_where)) = saw_sibling {
            if !form.is_reference_class() {
                diags.report(
                    Category::ABBREVS | Category::ERROR,
                    sib_where,
                    "DW_AT_sibling does not have a reference form",
                );
            } else if matches!(form, Form::RefAddr) {
                diags.report(
                    Category::ABBREVS | Category::IMPACT_2,
                    sib_where,
                    "DW_AT_sibling has form DW_FORM_ref_addr",
                );
            }
            if !has_children {
                diags.report(
                    Category::ABBREVS | Category::BLOAT,
                    sib_where,
                    "DW_AT_sibling attribute on a childless abbreviation is pointless",
                );
            }
        }

        if saw_high_pc && !saw_low_pc {
            diags.report(
                Category::ABBREVS | Category::ERROR,
                entry_where,
                "DW_AT_high_pc without DW_AT_low_pc",
            );
        }
        if saw_high_pc && saw_low_pc && saw_ranges {
            diags.report(
                Category::ABBREVS | Category::ERROR,
                entry_where,
                "DW_AT_low_pc, DW_AT_high_pc, and DW_AT_ranges all present together",
            );
        }

        let builder = current.as_mut().expect("table started above");
        if let Some(prev) = builder.entries.iter().find(|a| a.code == code) {
            let prev_offset = diags.arena_mut().get(prev.where_id).addr1.unwrap_or(0);
            diags.report(
                Category::ABBREVS | Category::ERROR,
                entry_where,
                format!(
                    "duplicate abbreviation code {} (previously defined at offset {:#x})",
                    code, prev_offset
                ),
            );
            continue;
        }

        builder.entries.push(Abbreviation {
            code,
            tag,
            has_children,
            attribs,
            where_id: entry_where,
            used: Cell::new(false),
        });
    }

    if let Some(builder) = current.take() {
        chain.tables.push(builder.finish());
    }

    chain
}
