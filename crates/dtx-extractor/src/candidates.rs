//! Candidate triple generation

use dtx_core::Candidate;

/// Every (subject, predicate, object) combination of the decoded spans
///
/// Ordered subject-major, then predicate, then object. Identical strings
/// coming from different spans are kept as separate candidates.
pub fn candidates(subjects: &[String], predicates: &[String], objects: &[String]) -> Vec<Candidate> {
    let mut out = Vec::with_capacity(subjects.len() * predicates.len() * objects.len());
    for subject in subjects {
        for predicate in predicates {
            for object in objects {
                out.push(Candidate::new(subject.as_str(), predicate.as_str(), object.as_str()));
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_cross_product_order() {
        let result = candidates(
            &strings(&["SPEAKER0", "SPEAKER1"]),
            &strings(&["like"]),
            &strings(&["pizza", "pasta"]),
        );

        assert_eq!(
            result,
            vec![
                Candidate::new("SPEAKER0", "like", "pizza"),
                Candidate::new("SPEAKER0", "like", "pasta"),
                Candidate::new("SPEAKER1", "like", "pizza"),
                Candidate::new("SPEAKER1", "like", "pasta"),
            ]
        );
    }

    #[test]
    fn test_empty_role_yields_nothing() {
        assert!(candidates(&[], &strings(&["like"]), &strings(&["pizza"])).is_empty());
        assert!(candidates(&strings(&["a"]), &[], &strings(&["pizza"])).is_empty());
        assert!(candidates(&strings(&["a"]), &strings(&["like"]), &[]).is_empty());
    }

    #[test]
    fn test_duplicates_are_kept() {
        let result = candidates(
            &strings(&["SPEAKER0", "SPEAKER0"]),
            &strings(&["like"]),
            &strings(&["pizza"]),
        );
        assert_eq!(result.len(), 2);
        assert_eq!(result[0], result[1]);
    }

    proptest! {
        #[test]
        fn prop_cardinality_is_product(s in 0usize..6, p in 0usize..6, o in 0usize..6) {
            let subjects: Vec<String> = (0..s).map(|i| format!("s{i}")).collect();
            let predicates: Vec<String> = (0..p).map(|i| format!("p{i}")).collect();
            let objects: Vec<String> = (0..o).map(|i| format!("o{i}")).collect();

            let result = candidates(&subjects, &predicates, &objects);
            prop_assert_eq!(result.len(), s * p * o);
        }
    }
}
