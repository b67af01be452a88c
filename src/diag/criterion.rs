//! Diagnostic criterion: disjunctive normal form over `Category` (spec.md
//! §3). Described in spec.md §9 as "the single most re-usable and
//! error-prone abstraction in the core" — implemented here as a pure value
//! type and tested independently of any diagnostic plumbing.

use super::category::Category;

/// One conjunctive term: `positive & c == positive  &&  negative & c == {}`.
/// Invariant: `positive & negative == {}` (checked on construction; terms
/// that would violate it are simply never produced — see `and`/`multiply`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Term {
    positive: Category,
    negative: Category,
}

impl Term {
    fn is_contradiction(&self) -> bool {
        !(self.positive & self.negative).is_empty()
    }

    fn accepts(&self, c: Category) -> bool {
        (self.positive & c) == self.positive && (self.negative & c).is_empty()
    }
}

/// A disjunction of `Term`s: a message is accepted iff any term accepts it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Criterion {
    terms: Vec<Term>,
}

impl Criterion {
    /// Accepts nothing (empty disjunction).
    pub fn none() -> Self {
        Criterion { terms: Vec::new() }
    }

    /// Accepts everything (single term with no constraints).
    pub fn all() -> Self {
        Criterion {
            terms: vec![Term {
                positive: Category::empty(),
                negative: Category::empty(),
            }],
        }
    }

    /// A criterion that accepts exactly the categories satisfying
    /// `positive & c == positive && negative & c == {}`.
    pub fn term(positive: Category, negative: Category) -> Self {
        let t = Term { positive, negative };
        if t.is_contradiction() {
            Criterion::none()
        } else {
            Criterion { terms: vec![t] }
        }
    }

    pub fn accepts(&self, c: Category) -> bool {
        self.terms.iter().any(|t| t.accepts(c))
    }

    /// OR: append the other disjunction's terms.
    pub fn or(&self, other: &Criterion) -> Criterion {
        let mut terms = self.terms.clone();
        terms.extend(other.terms.iter().copied());
        Criterion { terms }.dedup()
    }

    /// AND a plain (positive, negative) term onto every existing term,
    /// dropping any term that becomes self-contradictory.
    pub fn and_term(&self, positive: Category, negative: Category) -> Criterion {
        let terms = self
            .terms
            .iter()
            .map(|t| Term {
                positive: t.positive | positive,
                negative: t.negative | negative,
            })
            .filter(|t| !t.is_contradiction())
            .collect();
        Criterion { terms }
    }

    /// AND of two arbitrary DNF criteria: Cartesian product of terms,
    /// pointwise OR, dropping contradictions.
    pub fn and(&self, other: &Criterion) -> Criterion {
        let mut terms = Vec::with_capacity(self.terms.len() * other.terms.len());
        for a in &self.terms {
            for b in &other.terms {
                let t = Term {
                    positive: a.positive | b.positive,
                    negative: a.negative | b.negative,
                };
                if !t.is_contradiction() {
                    terms.push(t);
                }
            }
        }
        Criterion { terms }.dedup()
    }

    /// NOT: De Morgan over the disjunction — the negation of a DNF is the
    /// AND (product) of the negation of each term, and the negation of one
    /// term `p1 & p2 & ... & ¬n1 & ¬n2 & ...` is the sum of singleton
    /// negations/positives `¬p1 | ¬p2 | ... | n1 | n2 | ...`.
    pub fn not(&self) -> Criterion {
        let mut acc = Criterion::all();
        for t in &self.terms {
            let mut term_negation = Criterion::none();
            for bit in t.positive.iter() {
                term_negation = term_negation.or(&Criterion::term(Category::empty(), bit));
            }
            for bit in t.negative.iter() {
                term_negation = term_negation.or(&Criterion::term(bit, Category::empty()));
            }
            if t.positive.is_empty() && t.negative.is_empty() {
                // Negation of "accept everything" is "accept nothing".
                term_negation = Criterion::none();
            }
            acc = acc.and(&term_negation);
        }
        acc
    }

    /// AND-NOT, composed from multiplication and negation as spec.md §3
    /// requires.
    pub fn and_not(&self, other: &Criterion) -> Criterion {
        self.and(&other.not())
    }

    fn dedup(mut self) -> Criterion {
        self.terms.sort_by_key(|t| (t.positive.bits(), t.negative.bits()));
        self.terms.dedup();
        self
    }

    #[cfg(test)]
    fn term_count(&self) -> usize {
        self.terms.len()
    }
}

impl std::fmt::Display for Criterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.terms.is_empty() {
            return write!(f, "(none)");
        }
        for (i, t) in self.terms.iter().enumerate() {
            if i > 0 {
                write!(f, " | ")?;
            }
            write!(f, "({:?} & !{:?})", t.positive, t.negative)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diag::category::Category;

    #[test]
    fn all_accepts_everything() {
        let c = Criterion::all();
        assert!(c.accepts(Category::empty()));
        assert!(c.accepts(Category::ERROR | Category::INFO));
    }

    #[test]
    fn none_accepts_nothing() {
        let c = Criterion::none();
        assert!(!c.accepts(Category::empty()));
    }

    #[test]
    fn term_invariant_holds() {
        // positive & negative != {} collapses to `none`.
        let c = Criterion::term(Category::ERROR, Category::ERROR);
        assert_eq!(c, Criterion::none());
    }

    #[test]
    fn or_accepts_union() {
        let a = Criterion::term(Category::ERROR, Category::empty());
        let b = Criterion::term(Category::BLOAT, Category::empty());
        let u = a.or(&b);
        assert!(u.accepts(Category::ERROR));
        assert!(u.accepts(Category::BLOAT));
        assert!(!u.accepts(Category::INFO));
    }

    #[test]
    fn and_accepts_intersection() {
        let a = Criterion::term(Category::ERROR, Category::empty());
        let b = Criterion::term(Category::INFO, Category::empty());
        let i = a.and(&b);
        assert!(i.accepts(Category::ERROR | Category::INFO));
        assert!(!i.accepts(Category::ERROR));
    }

    #[test]
    fn not_inverts_acceptance() {
        let a = Criterion::term(Category::BLOAT, Category::empty());
        let not_a = a.not();
        for c in [
            Category::empty(),
            Category::BLOAT,
            Category::ERROR,
            Category::BLOAT | Category::ERROR,
        ] {
            assert_eq!(a.accepts(c), !not_a.accepts(c), "category {c:?}");
        }
    }

    #[test]
    fn and_not_masks_axis() {
        // "mask off bloat" criterion used by --gnu.
        let warnings = Criterion::all();
        let no_bloat = warnings.and_not(&Criterion::term(Category::BLOAT, Category::empty()));
        assert!(no_bloat.accepts(Category::ERROR));
        assert!(!no_bloat.accepts(Category::BLOAT));
        assert!(!no_bloat.accepts(Category::BLOAT | Category::ERROR));
    }

    #[test]
    fn double_negation_round_trips() {
        let a = Criterion::term(Category::LOC, Category::empty()).or(&Criterion::term(
            Category::empty(),
            Category::RANGES,
        ));
        let back = a.not().not();
        for c in [
            Category::empty(),
            Category::LOC,
            Category::RANGES,
            Category::LOC | Category::RANGES,
        ] {
            assert_eq!(a.accepts(c), back.accepts(c));
        }
    }

    #[test]
    fn term_count_grows_with_product() {
        let a = Criterion::all().or(&Criterion::all());
        assert_eq!(a.dedup().term_count(), 1);
    }
}
