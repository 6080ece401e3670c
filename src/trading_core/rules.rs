//! Ordered rule cascades
//!
//! Classifiers are written as a list of (predicate, result) pairs evaluated
//! top to bottom; the first predicate that holds decides. Keeping the list
//! as data makes the tie-break order something tests can inspect.

/// One entry of a cascade
pub struct Rule<C, R> {
    pub name: &'static str,
    pub predicate: fn(&C) -> bool,
    pub result: R,
}

impl<C, R> Rule<C, R> {
    pub const fn new(name: &'static str, predicate: fn(&C) -> bool, result: R) -> Self {
        Self {
            name,
            predicate,
            result,
        }
    }
}

/// Evaluate `rules` in order. Returns the winning result and the name of the
/// rule that produced it (`"fallback"` when nothing matched).
pub fn first_match<C, R: Copy>(rules: &[Rule<C, R>], ctx: &C, fallback: R) -> (R, &'static str) {
    rules
        .iter()
        .find(|rule| (rule.predicate)(ctx))
        .map(|rule| (rule.result, rule.name))
        .unwrap_or((fallback, "fallback"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rules() -> Vec<Rule<i32, &'static str>> {
        vec![
            Rule::new("negative", |x: &i32| *x < 0, "neg"),
            Rule::new("small", |x: &i32| *x < 10, "small"),
            Rule::new("even", |x: &i32| x % 2 == 0, "even"),
        ]
    }

    #[test]
    fn test_first_rule_wins() {
        // -4 is negative, small and even: the first rule decides
        assert_eq!(first_match(&rules(), &-4, "other"), ("neg", "negative"));
        assert_eq!(first_match(&rules(), &4, "other"), ("small", "small"));
        assert_eq!(first_match(&rules(), &12, "other"), ("even", "even"));
    }

    #[test]
    fn test_fallback() {
        assert_eq!(first_match(&rules(), &13, "other"), ("other", "fallback"));
    }
}
