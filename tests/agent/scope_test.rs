//! Programme-scope and money-query resolution tests.

use mauricia::agent::scope::{is_money_query, resolve_scope};
use mauricia::retrieval::ProgramScope;

#[test]
fn doctorate_only_query_scopes_to_doctorate() {
    assert_eq!(
        resolve_scope("¿Cuánto cuesta el doctorado en informática?"),
        Some(ProgramScope::Doctorate)
    );
    assert_eq!(
        resolve_scope("requisitos para el PhD"),
        Some(ProgramScope::Doctorate)
    );
}

#[test]
fn masters_only_query_scopes_to_masters() {
    assert_eq!(
        resolve_scope("valor del magíster en informática"),
        Some(ProgramScope::Masters)
    );
    assert_eq!(
        resolve_scope("arancel del magister"),
        Some(ProgramScope::Masters)
    );
    assert_eq!(resolve_scope("el máster de química"), Some(ProgramScope::Masters));
}

#[test]
fn diploma_query_scopes_to_diploma() {
    assert_eq!(
        resolve_scope("¿Qué diplomados ofrecen?"),
        Some(ProgramScope::Diploma)
    );
}

#[test]
fn mentioning_both_programme_types_disables_the_filter() {
    assert_eq!(
        resolve_scope("diferencias entre el doctorado y el magíster"),
        None
    );
}

#[test]
fn generic_query_searches_the_whole_corpus() {
    assert_eq!(resolve_scope("¿Qué postgrados tienen?"), None);
}

#[test]
fn scope_matching_is_case_insensitive() {
    assert_eq!(
        resolve_scope("Información del DOCTORADO"),
        Some(ProgramScope::Doctorate)
    );
}

#[test]
fn scope_maps_to_source_tags() {
    assert_eq!(ProgramScope::Doctorate.source_tag(), "doctorado");
    assert_eq!(ProgramScope::Masters.source_tag(), "magister");
    assert_eq!(ProgramScope::Diploma.source_tag(), "diplomado");
}

#[test]
fn cost_words_mark_money_queries() {
    assert!(is_money_query("¿Cuanto cuesta la matricula?"));
    assert!(is_money_query("precio del programa"));
    assert!(is_money_query("¿en cuánto sale el arancel?"));
    assert!(is_money_query("VALOR del semestre"));
}

#[test]
fn non_cost_query_is_not_a_money_query() {
    assert!(!is_money_query("¿Qué requisitos de postulación existen?"));
}
