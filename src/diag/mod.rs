//! Diagnostic algebra (C4, spec.md §3–§4, §6–§7): category bitset, DNF
//! criteria, `Where` breadcrumbs, and the per-session sink that classifies
//! and collects findings.

pub mod category;
pub mod criterion;
pub mod where_;

pub use category::Category;
pub use criterion::Criterion;
pub use where_::{Format, Where, WhereArena, WhereId};

/// The two DNF criteria that classify every diagnostic (spec.md §3, §6).
#[derive(Debug, Clone)]
pub struct Criteria {
    pub warnings: Criterion,
    pub errors: Criterion,
}

impl Default for Criteria {
    /// "warnings accept everything; errors accept impact_4 or error."
    fn default() -> Self {
        Criteria {
            warnings: Criterion::all(),
            errors: Criterion::term(Category::IMPACT_4, Category::empty())
                .or(&Criterion::term(Category::ERROR, Category::empty())),
        }
    }
}

impl Criteria {
    /// `--gnu`: mask off the `bloat` axis (tolerate GCC artifacts).
    pub fn apply_gnu(&mut self) {
        self.warnings = self
            .warnings
            .and_not(&Criterion::term(Category::BLOAT, Category::empty()));
    }

    /// `--tolerant`: mask off `loc` and `ranges` axes.
    pub fn apply_tolerant(&mut self) {
        let loc_ranges = Criterion::term(Category::LOC, Category::empty())
            .or(&Criterion::term(Category::RANGES, Category::empty()));
        self.warnings = self.warnings.and_not(&loc_ranges);
    }

    /// `-i` / `--ignore-missing`: mask off the `elf` axis.
    pub fn apply_ignore_missing(&mut self) {
        self.warnings = self
            .warnings
            .and_not(&Criterion::term(Category::ELF, Category::empty()));
    }

    /// `--strict`: the default already keeps strings/line-header-bloat/
    /// pubtypes axes enabled; `--strict` is a no-op against `--gnu`'s
    /// narrowing unless `--gnu` ran first, in which case it restores
    /// nothing (the flags are mutually informative, not reversible) — so
    /// this is only meaningful as "do not also pass --gnu"; kept as an
    /// explicit method so `main` has one call per flag regardless.
    pub fn apply_strict(&mut self) {}

    pub fn severity(&self, c: Category) -> Severity {
        if self.errors.accepts(c) {
            Severity::Error
        } else if self.warnings.accepts(c) {
            Severity::Warning
        } else {
            Severity::Suppressed
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
    Warning,
    Suppressed,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Error => "error",
            Severity::Warning => "warning",
            Severity::Suppressed => "",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub seq: u64,
    pub category: Category,
    pub where_id: WhereId,
    pub message: String,
    pub severity: Severity,
}

/// Per-file (per `LintSession`) diagnostic counter and collector (spec.md
/// §5: "no mutable global state participates in parsing except the
/// diagnostic counter and criteria" — this struct *is* that counter,
/// threaded by `&mut` rather than kept as a global).
pub struct Diagnostics<'c> {
    criteria: &'c Criteria,
    arena: WhereArena,
    emitted: Vec<Diagnostic>,
    error_count: u32,
    warning_count: u32,
    seq: u64,
    with_ref: bool,
}

impl<'c> Diagnostics<'c> {
    pub fn new(criteria: &'c Criteria, with_ref: bool) -> Self {
        Diagnostics {
            criteria,
            arena: WhereArena::new(),
            emitted: Vec::new(),
            error_count: 0,
            warning_count: 0,
            seq: 0,
            with_ref,
        }
    }

    pub fn arena_mut(&mut self) -> &mut WhereArena {
        &mut self.arena
    }

    pub fn insert_where(&mut self, w: Where) -> WhereId {
        self.arena.insert(w)
    }

    /// Report one finding. Returns the assigned severity so callers can
    /// short-circuit further checking on `Severity::Error` when the spec
    /// calls for a section to bail (spec.md §7).
    pub fn report(&mut self, category: Category, where_id: WhereId, message: impl Into<String>) -> Severity {
        let severity = self.criteria.severity(category);
        match severity {
            Severity::Error => self.error_count += 1,
            Severity::Warning => self.warning_count += 1,
            Severity::Suppressed => {}
        }
        self.seq += 1;
        self.emitted.push(Diagnostic {
            seq: self.seq,
            category,
            where_id,
            message: message.into(),
            severity,
        });
        severity
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    pub fn warning_count(&self) -> u32 {
        self.warning_count
    }

    /// Exit code 0 iff no diagnostic with category `error` or `impact_4`
    /// was emitted (spec.md §6) — equivalent to `error_count() == 0` since
    /// the error criteria is fixed to exactly that disjunction.
    pub fn is_clean(&self) -> bool {
        self.error_count == 0
    }

    /// Rendered, non-suppressed diagnostic lines in emission order, each
    /// formatted per spec.md §6:
    /// `"<severity>: <section>[: <coord>]*[ (<ref-where>)][: <message>]\n"`.
    pub fn render(&self) -> Vec<String> {
        self.emitted
            .iter()
            .filter(|d| d.severity != Severity::Suppressed)
            .map(|d| {
                let where_str = self.arena.format(d.where_id, self.with_ref, d.category);
                format!("{}: {}: {}", d.severity.label(), where_str, d.message)
            })
            .collect()
    }

    pub fn emitted(&self) -> &[Diagnostic] {
        &self.emitted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_criteria_classify_as_documented() {
        let criteria = Criteria::default();
        assert_eq!(criteria.severity(Category::ERROR), Severity::Error);
        assert_eq!(criteria.severity(Category::IMPACT_4), Severity::Error);
        assert_eq!(criteria.severity(Category::BLOAT), Severity::Warning);
    }

    #[test]
    fn gnu_flag_suppresses_bloat_warnings() {
        let mut criteria = Criteria::default();
        criteria.apply_gnu();
        assert_eq!(criteria.severity(Category::BLOAT), Severity::Suppressed);
        assert_eq!(criteria.severity(Category::ERROR), Severity::Error);
    }

    #[test]
    fn report_counts_and_renders() {
        let criteria = Criteria::default();
        let mut diags = Diagnostics::new(&criteria, false);
        let w = diags.insert_where(Where::cu_die(3, 0x1a));
        diags.report(Category::ERROR | Category::INFO, w, "bad DIE");
        assert_eq!(diags.error_count(), 1);
        assert!(!diags.is_clean());
        let lines = diags.render();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0], "error: .debug_info: CU 3: DIE 0x1a: bad DIE");
    }

    #[test]
    fn suppressed_diagnostics_do_not_render() {
        let mut criteria = Criteria::default();
        criteria.apply_gnu();
        let mut diags = Diagnostics::new(&criteria, false);
        let w = diags.insert_where(Where::new(".debug_info"));
        diags.report(Category::BLOAT, w, "suboptimal encoding");
        assert!(diags.render().is_empty());
        assert_eq!(diags.warning_count(), 0);
        assert_eq!(diags.error_count(), 0);
    }
}
