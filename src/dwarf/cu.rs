//! Compile-unit record (spec.md §3 "CU"), owned by the DIE chain walker
//! (C7) and consumed read-only by C8/C9.

use crate::address::AddressSet;
use crate::address::ReferenceList;
use crate::coverage::Coverage;
use crate::diag::WhereId;

/// `{cov, need_ranges}` (spec.md §3 "CU coverage"): a CU's own fused
/// `.debug_ranges` coverage, which starts empty and is filled in by C8
/// once a `DW_AT_ranges` reference has been seen and resolved.
#[derive(Debug, Default, Clone)]
pub struct CuCoverage {
    pub cov: Coverage,
    pub need_ranges: bool,
}

#[derive(Debug)]
pub struct Cu {
    pub offset: u64,
    pub cudie_offset: u64,
    pub length: u64,
    pub address_size: u8,
    pub dwarf64: bool,
    pub low_pc: Option<u64>,
    pub high_pc: Option<u64>,
    pub die_addrs: AddressSet,
    /// CU-local references (`refN`/`ref_udata`), normalized to global
    /// section offsets by adding `offset`, resolved against this CU's
    /// own `die_addrs` at end-of-CU.
    pub die_refs: ReferenceList,
    /// `DW_FORM_ref_addr` references, resolved against every CU's
    /// `die_addrs` in a whole-file post-pass.
    pub global_refs: ReferenceList,
    pub loc_refs: ReferenceList,
    pub range_refs: ReferenceList,
    pub line_refs: ReferenceList,
    pub where_id: WhereId,
    pub coverage: CuCoverage,
    pub has_arange: bool,
    pub has_pubnames: bool,
    pub has_pubtypes: bool,
}

impl Cu {
    pub fn new(offset: u64, where_id: WhereId) -> Self {
        Cu {
            offset,
            cudie_offset: 0,
            length: 0,
            address_size: 0,
            dwarf64: false,
            low_pc: None,
            high_pc: None,
            die_addrs: AddressSet::new(),
            die_refs: ReferenceList::new(),
            global_refs: ReferenceList::new(),
            loc_refs: ReferenceList::new(),
            range_refs: ReferenceList::new(),
            line_refs: ReferenceList::new(),
            where_id,
            coverage: CuCoverage::default(),
            has_arange: false,
            has_pubnames: false,
            has_pubtypes: false,
        }
    }
}
