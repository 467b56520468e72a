//! Class-name search

use crate::core::types::{CompareOptions, TypeHandle};
use crate::registry::TypeGraph;

/// Compare one type name against a partial name
///
/// Plain search looks for the pattern anywhere in the name. `ANCHORED`
/// pins it to the start, or to the end when `BACKWARDS` is also set.
/// An empty pattern matches every name.
pub fn name_matches(name: &str, pattern: &str, options: CompareOptions) -> bool {
    let name = name.as_bytes();
    let pattern = pattern.as_bytes();
    if pattern.len() > name.len() {
        return false;
    }

    let fold = options.contains(CompareOptions::CASE_INSENSITIVE);
    let same = |window: &[u8]| {
        if fold {
            window.eq_ignore_ascii_case(pattern)
        } else {
            window == pattern
        }
    };

    if options.contains(CompareOptions::ANCHORED) {
        if options.contains(CompareOptions::BACKWARDS) {
            same(&name[name.len() - pattern.len()..])
        } else {
            same(&name[..pattern.len()])
        }
    } else if pattern.is_empty() {
        true
    } else {
        name.windows(pattern.len()).any(same)
    }
}

/// Live types whose names match, in registry order
pub fn classes_matching(
    graph: &TypeGraph,
    pattern: &str,
    options: CompareOptions,
) -> Vec<TypeHandle> {
    graph
        .types()
        .filter(|&ty| {
            graph
                .name(ty)
                .is_some_and(|name| name_matches(name, pattern, options))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::TypeTable;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_contains_by_default() {
        assert!(name_matches("UIViewController", "View", CompareOptions::empty()));
        assert!(!name_matches("UIViewController", "view", CompareOptions::empty()));
        assert!(name_matches(
            "UIViewController",
            "view",
            CompareOptions::CASE_INSENSITIVE
        ));
    }

    #[test]
    fn test_anchored_prefix_and_suffix() {
        let prefix = CompareOptions::ANCHORED;
        let suffix = CompareOptions::ANCHORED | CompareOptions::BACKWARDS;

        assert!(name_matches("UIViewController", "UI", prefix));
        assert!(!name_matches("UIViewController", "View", prefix));
        assert!(name_matches("UIViewController", "Controller", suffix));
        assert!(!name_matches("UIViewController", "UI", suffix));
        assert!(name_matches(
            "UIViewController",
            "CONTROLLER",
            suffix | CompareOptions::CASE_INSENSITIVE
        ));
    }

    #[test]
    fn test_backwards_alone_is_contains() {
        assert!(name_matches("UIViewController", "View", CompareOptions::BACKWARDS));
    }

    #[test]
    fn test_empty_and_oversized_patterns() {
        assert!(name_matches("Dog", "", CompareOptions::empty()));
        assert!(name_matches("Dog", "", CompareOptions::ANCHORED));
        assert!(!name_matches("Dog", "Doggo", CompareOptions::empty()));
    }

    #[test]
    fn test_classes_matching_registry_order() {
        let table = TypeTable::new();
        let animal = table.register("Animal", None, 0).unwrap();
        let dog = table.register("Dog", Some(animal), 0).unwrap();
        let hotdog = table.register("HotDog", None, 0).unwrap();
        let graph = TypeGraph::snapshot(&table);

        assert_eq!(
            classes_matching(&graph, "Dog", CompareOptions::empty()),
            vec![dog, hotdog]
        );
        assert_eq!(
            classes_matching(&graph, "dog", CompareOptions::ANCHORED | CompareOptions::CASE_INSENSITIVE),
            vec![dog]
        );
        assert_eq!(classes_matching(&graph, "", CompareOptions::empty()).len(), 3);
    }
}
