use std::collections::HashMap;

use goldcheck_core::lang::checks;
use goldcheck_core::lang::directives;
use goldcheck_core::lang::substitutions;

#[test]
fn directives_spellings_unique_and_resolvable() {
    let mut seen: HashMap<&'static str, directives::DirectiveId> = HashMap::new();

    for info in directives::DIRECTIVES {
        assert_eq!(
            directives::from_str(info.canonical),
            Some(info.id),
            "directive canonical spelling not resolvable: {}",
            info.canonical
        );
        assert_eq!(
            directives::as_str(info.id),
            info.canonical,
            "directive as_str mismatch for {:?}",
            info.id
        );
        assert!(
            info.canonical.chars().all(|c| c.is_ascii_uppercase()),
            "directive spelling must be upper-case ASCII: {}",
            info.canonical
        );

        if let Some(prev) = seen.insert(info.canonical, info.id) {
            panic!(
                "duplicate directive spelling {:?}: {:?} and {:?}",
                info.canonical, prev, info.id
            );
        }
    }
}

#[test]
fn check_kinds_suffixes_unique_and_resolvable() {
    let mut seen: HashMap<&'static str, checks::CheckKindId> = HashMap::new();

    for info in checks::CHECK_KINDS {
        assert_eq!(
            checks::from_suffix(info.suffix),
            Some(info.id),
            "check suffix not resolvable: {:?}",
            info.suffix
        );
        if let Some(prev) = seen.insert(info.suffix, info.id) {
            panic!("duplicate check suffix {:?}: {:?} and {:?}", info.suffix, prev, info.id);
        }
    }

    // Exactly one kind is the bare prefix.
    assert_eq!(checks::CHECK_KINDS.iter().filter(|c| c.suffix.is_empty()).count(), 1);
}

#[test]
fn default_prefix_is_not_a_directive() {
    assert!(directives::from_str(checks::DEFAULT_PREFIX).is_none());
    for info in checks::CHECK_KINDS {
        let spelled = checks::spelling(checks::DEFAULT_PREFIX, info.id);
        assert!(
            directives::from_str(&spelled).is_none(),
            "marker spelling collides with a directive: {}",
            spelled
        );
    }
}

#[test]
fn substitutions_names_unique_and_resolvable() {
    let mut seen: HashMap<&'static str, substitutions::SubstitutionId> = HashMap::new();

    for info in substitutions::SUBSTITUTIONS {
        assert_eq!(
            substitutions::from_str(info.name),
            Some(info.id),
            "substitution not resolvable: {}",
            info.name
        );
        assert_eq!(substitutions::as_str(info.id), info.name);
        if let Some(prev) = seen.insert(info.name, info.id) {
            panic!("duplicate substitution {:?}: {:?} and {:?}", info.name, prev, info.id);
        }
    }
}

#[test]
fn every_id_has_exactly_one_registry_row() {
    use checks::CheckKindId;
    use directives::DirectiveId;
    use substitutions::SubstitutionId;

    let directive_ids = [DirectiveId::Run, DirectiveId::Requires, DirectiveId::Unsupported, DirectiveId::XFail];
    for id in directive_ids {
        assert_eq!(directives::DIRECTIVES.iter().filter(|d| d.id == id).count(), 1, "{id:?}");
    }
    assert_eq!(directives::DIRECTIVES.len(), directive_ids.len());

    let check_ids = [CheckKindId::Check, CheckKindId::Next, CheckKindId::Not];
    for id in check_ids {
        assert_eq!(checks::CHECK_KINDS.iter().filter(|c| c.id == id).count(), 1, "{id:?}");
    }
    assert_eq!(checks::CHECK_KINDS.len(), check_ids.len());

    let substitution_ids = [
        SubstitutionId::SourcePath,
        SubstitutionId::SourceDir,
        SubstitutionId::TempPath,
        SubstitutionId::Percent,
    ];
    for id in substitution_ids {
        assert_eq!(substitutions::SUBSTITUTIONS.iter().filter(|s| s.id == id).count(), 1, "{id:?}");
    }
    assert_eq!(substitutions::SUBSTITUTIONS.len(), substitution_ids.len());
}
