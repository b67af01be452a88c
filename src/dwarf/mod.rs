//! DWARF-specific submodules: the compile-unit record (C2 extension), the
//! hand-rolled tag/attribute/form/op enumerations (C6 support), the DIE
//! chain walker (C7), and the location-expression validator (§4.4).

pub mod constants;
pub mod cu;
pub mod die;
pub mod loc_expr;
