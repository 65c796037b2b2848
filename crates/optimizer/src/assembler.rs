use crate::tokens::TokenCounter;
use haste_code_chunker::{Language, Span, Unit, UnitId};
use haste_search::RetrievedUnit;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Rendered context plus the units it contains
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    pub content: String,
    /// Ascending source order
    pub included: Vec<UnitId>,
    /// Exact token count of `content`
    pub tokens: usize,
    /// The first unit alone did not fit and was kept anyway
    pub budget_exceeded: bool,
}

/// Greedy, whole-unit packing of retrieved units into a token budget
pub struct BudgetedAssembler<'a> {
    source: &'a str,
    language: Language,
    counter: &'a dyn TokenCounter,
}

impl<'a> BudgetedAssembler<'a> {
    pub fn new(source: &'a str, language: Language, counter: &'a dyn TokenCounter) -> Self {
        Self {
            source,
            language,
            counter,
        }
    }

    /// Pack `retrieved` into at most `max_tokens`.
    ///
    /// Candidates are visited by hop distance, then combined score (desc),
    /// then source position. A method is tried together with its class header
    /// first, and alone if the pair does not fit. Units are never cut.
    pub fn assemble(
        &self,
        units: &[Unit],
        retrieved: &[RetrievedUnit],
        max_tokens: usize,
    ) -> Assembly {
        let mut candidates: Vec<&RetrievedUnit> = retrieved
            .iter()
            .filter(|r| r.id().index() < units.len())
            .collect();
        candidates.sort_by(|a, b| priority(a, b));

        let mut included: BTreeSet<UnitId> = BTreeSet::new();
        let mut tokens = 0usize;
        let mut budget_exceeded = false;

        for candidate in candidates {
            let id = candidate.id();
            if included.contains(&id) {
                continue;
            }

            let header = bundled_header(&units[id.index()])
                .filter(|parent| !included.contains(parent));
            if let Some(header) = header {
                if let Some(count) = self.fits(units, &included, &[id, header], max_tokens) {
                    included.extend([id, header]);
                    tokens = count;
                    continue;
                }
            }

            if let Some(count) = self.fits(units, &included, &[id], max_tokens) {
                included.insert(id);
                tokens = count;
            } else if included.is_empty() {
                included.insert(id);
                tokens = self.counter.count(&self.render(units, &included));
                budget_exceeded = true;
                log::warn!(
                    "Highest-priority unit {} needs {tokens} tokens, over the budget of {max_tokens}",
                    units[id.index()].qualified_name
                );
            }
        }

        let content = self.render(units, &included);
        log::debug!(
            "Assembled {} of {} retrieved units into {tokens} tokens (budget {max_tokens})",
            included.len(),
            retrieved.len()
        );

        Assembly {
            content,
            included: included.into_iter().collect(),
            tokens,
            budget_exceeded,
        }
    }

    /// Token count of `included ∪ extra` if it stays within budget
    fn fits(
        &self,
        units: &[Unit],
        included: &BTreeSet<UnitId>,
        extra: &[UnitId],
        max_tokens: usize,
    ) -> Option<usize> {
        let mut trial = included.clone();
        trial.extend(extra.iter().copied());
        let count = self.counter.count(&self.render(units, &trial));
        (count <= max_tokens).then_some(count)
    }

    /// Render `ids` in source order.
    ///
    /// Text between two units that are neighbours in the source, or that is
    /// only whitespace, is kept verbatim; anything else is replaced by a
    /// one-line elision comment. Leaving a braced container (a Rust `impl`
    /// or `trait`) emits its closing delimiter so brackets stay balanced.
    pub fn render(&self, units: &[Unit], ids: &BTreeSet<UnitId>) -> String {
        let mut out = String::new();
        let mut previous: Option<&Unit> = None;

        for id in ids {
            let Some(unit) = units.get(id.index()) else {
                continue;
            };
            if let Some(prev) = previous {
                match closing_between(units, ids, prev, Some(unit)) {
                    Some(closing) => {
                        self.push_closing(&mut out, prev, closing);
                        out.push_str(&self.gap(closing.end_byte, prev, unit));
                    }
                    None => out.push_str(&self.separator(prev, unit)),
                }
            }
            out.push_str(&unit.text);
            previous = Some(unit);
        }

        if let Some(last) = previous {
            if let Some(closing) = closing_between(units, ids, last, None) {
                self.push_closing(&mut out, last, closing);
            }
        }

        out
    }

    fn push_closing(&self, out: &mut String, prev: &Unit, closing: Span) {
        let inside = self
            .source
            .get(prev.span.end_byte..closing.start_byte)
            .unwrap_or("");
        if inside.is_empty() {
            out.push('\n');
        } else if inside.trim().is_empty() {
            out.push_str(inside);
        } else {
            out.push_str(&self.elision());
        }
        out.push_str(
            self.source
                .get(closing.start_byte..closing.end_byte)
                .unwrap_or("}"),
        );
    }

    fn separator(&self, prev: &Unit, next: &Unit) -> String {
        if prev.span.end_byte > next.span.start_byte {
            return "\n".to_string();
        }
        self.gap(prev.span.end_byte, prev, next)
    }

    /// Source between `from` and `next`, or an elision comment when that
    /// text holds omitted units
    fn gap(&self, from: usize, prev: &Unit, next: &Unit) -> String {
        let gap = self.source.get(from..next.span.start_byte).unwrap_or("");
        let adjacent = prev.id.index() + 1 == next.id.index();

        if gap.is_empty() && from > next.span.start_byte {
            "\n".to_string()
        } else if adjacent || gap.trim().is_empty() {
            gap.to_string()
        } else {
            self.elision()
        }
    }

    fn elision(&self) -> String {
        format!("\n{} ...\n", self.language.comment_prefix())
    }
}

/// Braced container a unit renders inside: its parent, or itself for a
/// header that owns split-out members
fn container<'u>(units: &'u [Unit], unit: &'u Unit) -> Option<&'u Unit> {
    let owner = match unit.parent {
        Some(parent) => units.get(parent.index())?,
        None => unit,
    };
    owner.closing.is_some().then_some(owner)
}

/// Closing delimiter to emit after `prev` when `next` lies outside its
/// container and the container's opening header was rendered
fn closing_between(
    units: &[Unit],
    ids: &BTreeSet<UnitId>,
    prev: &Unit,
    next: Option<&Unit>,
) -> Option<Span> {
    let owner = container(units, prev).filter(|owner| ids.contains(&owner.id))?;
    let leaving = next.map_or(true, |next| {
        container(units, next).map(|c| c.id) != Some(owner.id)
    });
    if leaving {
        owner.closing
    } else {
        None
    }
}

/// Container header a member unit should travel with
fn bundled_header(unit: &Unit) -> Option<UnitId> {
    unit.parent
}

fn priority(a: &RetrievedUnit, b: &RetrievedUnit) -> Ordering {
    a.hops
        .cmp(&b.hops)
        .then_with(|| {
            b.score
                .combined
                .partial_cmp(&a.score.combined)
                .unwrap_or(Ordering::Equal)
        })
        .then_with(|| a.id().cmp(&b.id()))
}
