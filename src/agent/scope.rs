//! Programme-scope and money-query resolution.
//!
//! Pure keyword checks over the lowercased query. The scope decides which
//! slice of the corpus retrieval may touch; the money classification
//! widens recall and augments the search string. Both are recomputed per
//! request and carry no state.

use crate::retrieval::ProgramScope;

/// Tokens that unambiguously name a doctoral programme.
const DOCTORADO_KW: &[&str] = &["doctorado", "doctor", "phd"];

/// Tokens that unambiguously name a master's programme.
const MAGISTER_KW: &[&str] = &["magister", "magíster", "mgi", "master", "máster"];

/// Token naming a diploma programme.
const DIPLOMADO_KW: &[&str] = &["diplomado"];

/// Cost-related tokens that mark a money query.
const DINERO_KW: &[&str] = &[
    "cuanto", "precio", "valor", "costo", "sale", "arancel", "matricula",
];

/// Derive the retrieval scope from keyword presence in the query.
///
/// A query naming exactly one programme type restricts retrieval to that
/// type, so that similarly named fields (tuition, requirements) from the
/// other type cannot contaminate the answer. Naming both, or neither,
/// searches the whole corpus.
pub fn resolve_scope(query: &str) -> Option<ProgramScope> {
    let query = query.to_lowercase();

    let doctorado = contains_any(&query, DOCTORADO_KW);
    let magister = contains_any(&query, MAGISTER_KW);
    let diplomado = contains_any(&query, DIPLOMADO_KW);

    if doctorado && !magister {
        Some(ProgramScope::Doctorate)
    } else if magister && !doctorado {
        Some(ProgramScope::Masters)
    } else if diplomado {
        Some(ProgramScope::Diploma)
    } else {
        None
    }
}

/// True when the query matches the money lexicon.
pub fn is_money_query(query: &str) -> bool {
    contains_any(&query.to_lowercase(), DINERO_KW)
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| haystack.contains(n))
}
