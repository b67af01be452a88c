//! C5 — Relocation table and matcher (spec.md §3–§4.7, §5, §9).
//!
//! Per spec.md §9's redesign note ("Monotone shared cursor (relocations):
//! model as an iterator with a peek that is advanced in lock-step by the
//! consumer; forbid arbitrary seeking"), `RelocationTable` exposes a
//! monotone cursor rather than random access — callers can only advance
//! it, never rewind it, which is what makes the "lacks relocation"
//! diagnostic meaningful (spec.md §5: "Ordering guarantees").

use crate::diag::{Category, Diagnostics, Where, WhereId};
use crate::objectview::{ObjectView, RawRelocation, RelocWidth, SymbolSection};

#[derive(Debug, Clone, Copy)]
pub struct Relocation {
    pub offset: u64,
    pub kind: u32,
    pub symndx: u64,
    pub addend: i64,
    pub invalid: bool,
}

/// What a relocated value is expected to target, per spec.md §4.7: a
/// concrete DWARF section, or one of the abstract value classes used for
/// program counters and data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedTarget {
    DebugSection(&'static str),
    RelValue,
    RelAddress,
    RelExec,
}

/// Per-section relocation list, sorted by offset, with a monotone cursor.
pub struct RelocationTable {
    section: &'static str,
    entries: Vec<Relocation>,
    cursor: usize,
}

impl RelocationTable {
    pub fn load(obj: &dyn ObjectView, section: &'static str) -> Self {
        let mut entries: Vec<Relocation> = obj
            .relocations(section)
            .into_iter()
            .map(|r: RawRelocation| Relocation {
                offset: r.offset,
                kind: r.kind,
                symndx: r.symbol_index,
                addend: r.addend,
                invalid: false,
            })
            .collect();
        entries.sort_by_key(|r| r.offset);
        RelocationTable {
            section,
            entries,
            cursor: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Advances the cursor past every relocation whose offset is strictly
    /// less than `offset`, optionally reporting each as "mismatched"
    /// (`skip_mode = true`, used when draining at end of section) or
    /// "unreferenced" (`skip_mode = false`, a relocation that fell
    /// between two reads). Returns the relocation exactly at `offset`, if
    /// any, without consuming it — the caller consumes it by calling
    /// `relocate_one` or by calling this again with a larger offset.
    pub fn relocation_next(
        &mut self,
        offset: u64,
        where_id: WhereId,
        skip_mode: bool,
        diags: &mut Diagnostics,
    ) -> Option<Relocation> {
        while self.cursor < self.entries.len() && self.entries[self.cursor].offset < offset {
            let skipped = self.entries[self.cursor];
            let msg = if skip_mode {
                format!(
                    "relocation at offset {:#x} of section {} does not correspond to any datum",
                    skipped.offset, self.section
                )
            } else {
                format!(
                    "unreferenced part of relocation section {} at offset {:#x}",
                    self.section, skipped.offset
                )
            };
            diags.report(Category::RELOC | Category::IMPACT_2, where_id, msg);
            self.cursor += 1;
        }
        let found = self.entries.get(self.cursor).filter(|r| r.offset == offset).copied();
        if found.is_some() {
            // The match is considered consumed by the caller immediately;
            // advancing here keeps the cursor monotone without requiring a
            // separate "consume" call from every read site.
            self.cursor += 1;
        }
        found
    }

    /// Drains every remaining relocation, reporting each as mismatched —
    /// run after a section's checks succeed (spec.md §4.7).
    pub fn relocation_skip_rest(&mut self, where_id: WhereId, diags: &mut Diagnostics) {
        self.relocation_next(u64::MAX, where_id, true, diags);
    }

    /// Validates `rel`'s width and symbol target, and returns the
    /// relocated value: `addend + sym.value` (or `addend +
    /// section_address` when the symbol is a section symbol).
    pub fn relocate_one(
        &self,
        rel: &Relocation,
        expected_width: RelocWidth,
        raw_value: u64,
        expected: ExpectedTarget,
        where_id: WhereId,
        obj: &dyn ObjectView,
        diags: &mut Diagnostics,
    ) -> u64 {
        if let Some(width) = obj.classify_reloc_width(rel.kind) {
            if width != expected_width {
                diags.report(
                    Category::RELOC | Category::ERROR,
                    where_id,
                    format!(
                        "relocation type mismatch: expected width {}, got {}",
                        expected_width.bytes(),
                        width.bytes()
                    ),
                );
            }
        }

        let Some(sym) = obj.symbol(rel.symndx) else {
            diags.report(
                Category::RELOC | Category::ERROR,
                where_id,
                format!("invalid symbol index {} in relocation", rel.symndx),
            );
            return raw_value;
        };

        self.check_target_class(&sym, expected, where_id, obj, diags);

        match sym.section {
            SymbolSection::Undefined => rel.addend as u64,
            SymbolSection::Section(idx) if sym.is_section_symbol => {
                let section_address = obj
                    .section_name_by_index(idx)
                    .and_then(|name| obj.sections().into_iter().find(|s| s.name == name))
                    .map(|s| s.address)
                    .unwrap_or(sym.value);
                (rel.addend as i128 + section_address as i128) as u64
            }
            _ => (rel.addend as i128 + sym.value as i128) as u64,
        }
    }

    fn check_target_class(
        &self,
        sym: &crate::objectview::SymbolInfo,
        expected: ExpectedTarget,
        where_id: WhereId,
        obj: &dyn ObjectView,
        diags: &mut Diagnostics,
    ) {
        let SymbolSection::Section(idx) = sym.section else {
            return;
        };
        let Some(name) = obj.section_name_by_index(idx) else {
            return;
        };
        match expected {
            ExpectedTarget::DebugSection(want) => {
                if name != want {
                    diags.report(
                        Category::RELOC | Category::IMPACT_2,
                        where_id,
                        format!("relocation targets section {} instead of {}", name, want),
                    );
                }
            }
            ExpectedTarget::RelAddress | ExpectedTarget::RelExec => {
                if let Some(flags) = obj.section_flags(&name) {
                    if !flags.alloc || (expected == ExpectedTarget::RelExec && !flags.exec) {
                        diags.report(
                            Category::RELOC | Category::IMPACT_2,
                            where_id,
                            format!(
                                "relocation for a program-counter value targets non-allocated/non-executable section {}",
                                name
                            ),
                        );
                    }
                }
            }
            ExpectedTarget::RelValue => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::{Criteria, Diagnostics};
    use crate::objectview::fake::FakeObject;

    fn diag_where(diags: &mut Diagnostics) -> WhereId {
        diags.insert_where(Where::new(".debug_info"))
    }

    #[test]
    fn relocation_next_reports_skipped_entries() {
        let mut obj = FakeObject::default();
        obj.relocs.insert(
            "reloc",
            vec![
                RawRelocation {
                    offset: 0,
                    kind: 1,
                    symbol_index: 0,
                    addend: 0,
                },
                RawRelocation {
                    offset: 4,
                    kind: 1,
                    symbol_index: 0,
                    addend: 0,
                },
            ],
        );
        let mut table = RelocationTable::load(&obj, "reloc");
        let criteria = Criteria::default();
        let mut diags = Diagnostics::new(&criteria, false);
        let w = diag_where(&mut diags);
        let found = table.relocation_next(4, w, false, &mut diags);
        assert!(found.is_some());
        assert_eq!(diags.warning_count(), 1); // offset 0 reported as unreferenced
    }

    #[test]
    fn cursor_never_rewinds() {
        let mut obj = FakeObject::default();
        obj.relocs.insert(
            "reloc",
            vec![RawRelocation {
                offset: 10,
                kind: 1,
                symbol_index: 0,
                addend: 0,
            }],
        );
        let mut table = RelocationTable::load(&obj, "reloc");
        let criteria = Criteria::default();
        let mut diags = Diagnostics::new(&criteria, false);
        let w = diag_where(&mut diags);
        assert!(table.relocation_next(10, w, false, &mut diags).is_some());
        // The match was consumed; repeating the same offset finds nothing,
        // and the cursor still never rewinds to report it as skipped.
        assert!(table.relocation_next(10, w, false, &mut diags).is_none());
        assert_eq!(diags.warning_count(), 0);
    }
}
