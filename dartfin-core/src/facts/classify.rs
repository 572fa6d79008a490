//! Keyword-based statement classification.
//!
//! A multi-label classifier: a tag is filed under every category whose
//! keyword list has a case-insensitive substring match, so a fact can land in
//! several categories (e.g. `ProfitLossBeforeTax` is income only, while
//! `IncreaseDecreaseInCashAndCashEquivalentsAssets` is both balance and cash
//! flow).

use crate::domain::{ClassifiedFactSet, RawFact, StatementCategory};

/// Categories whose keywords occur in `tag`, in `StatementCategory::ALL` order.
pub fn categories_for(tag: &str) -> Vec<StatementCategory> {
    let tag = tag.to_lowercase();
    StatementCategory::ALL
        .into_iter()
        .filter(|category| {
            category
                .keywords()
                .iter()
                .any(|kw| tag.contains(&kw.to_lowercase()))
        })
        .collect()
}

/// File every fact under each category it matches. Input order is preserved per category.
pub fn classify_facts(facts: &[RawFact]) -> ClassifiedFactSet {
    let mut set = ClassifiedFactSet::default();
    for fact in facts {
        for category in categories_for(&fact.account_tag) {
            set.get_mut(category).push(fact.clone());
        }
    }
    set
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fact(tag: &str) -> RawFact {
        RawFact {
            account_tag: tag.to_string(),
            numeric_value: 1.0,
            context_ref: None,
            unit_ref: None,
        }
    }

    #[test]
    fn single_category_tags() {
        assert_eq!(categories_for("Assets"), vec![StatementCategory::Balance]);
        assert_eq!(categories_for("Revenue"), vec![StatementCategory::Income]);
        assert_eq!(
            categories_for("NetCashFlowsFromUsedInOperatingActivities"),
            vec![StatementCategory::CashFlow]
        );
    }

    #[test]
    fn matching_is_case_insensitive() {
        assert_eq!(categories_for("totalASSETS"), vec![StatementCategory::Balance]);
        assert_eq!(categories_for("operatingincomeloss"), vec![StatementCategory::Income]);
    }

    #[test]
    fn overlapping_tags_get_several_categories() {
        assert_eq!(
            categories_for("CashAndCashEquivalentsAssets"),
            vec![StatementCategory::Balance, StatementCategory::CashFlow]
        );
        assert_eq!(
            categories_for("ProfitLossAttributableToEquityHolders"),
            vec![StatementCategory::Balance, StatementCategory::Income]
        );
    }

    #[test]
    fn unrelated_tag_has_no_category() {
        assert!(categories_for("DocumentType").is_empty());
    }

    #[test]
    fn classify_example_facts() {
        let set = classify_facts(&[fact("Assets"), fact("Revenue")]);
        assert_eq!(set.balance.len(), 1);
        assert_eq!(set.balance[0].account_tag, "Assets");
        assert_eq!(set.income.len(), 1);
        assert_eq!(set.income[0].account_tag, "Revenue");
        assert!(set.cash_flow.is_empty());
    }

    #[test]
    fn fact_appears_in_every_matching_output() {
        let set = classify_facts(&[fact("CashAndCashEquivalentsAssets")]);
        assert_eq!(set.balance.len(), 1);
        assert_eq!(set.cash_flow.len(), 1);
        assert!(set.income.is_empty());
    }

    proptest! {
        #[test]
        fn classify_agrees_with_categories_for(tags in prop::collection::vec("[A-Za-z]{0,24}", 0..20)) {
            let facts: Vec<RawFact> = tags.iter().map(|t| fact(t)).collect();
            let set = classify_facts(&facts);
            for category in StatementCategory::ALL {
                let expected = facts
                    .iter()
                    .filter(|f| categories_for(&f.account_tag).contains(&category))
                    .count();
                prop_assert_eq!(set.get(category).len(), expected);
            }
        }

        #[test]
        fn case_never_changes_categories(tag in "[A-Za-z]{0,30}") {
            prop_assert_eq!(categories_for(&tag.to_uppercase()), categories_for(&tag.to_lowercase()));
        }
    }
}
