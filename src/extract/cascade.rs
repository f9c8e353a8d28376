//! Ordered fallback chains.
//!
//! A [`Cascade`] is a list of named probes applied to the same scope in
//! order. The first probe that yields a non-blank value wins and the rest
//! are not run; partial results are never merged across probes.

/// The value a cascade settled on and the probe that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hit {
    pub value: String,
    pub strategy: String,
}

type Probe<'c, S> = Box<dyn Fn(&S) -> Option<String> + 'c>;

pub struct Cascade<'c, S> {
    steps: Vec<(String, Probe<'c, S>)>,
}

impl<'c, S> Default for Cascade<'c, S> {
    fn default() -> Self {
        Self { steps: Vec::new() }
    }
}

impl<'c, S> Cascade<'c, S> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a probe; probes run in the order they were added.
    pub fn then(mut self, name: impl Into<String>, probe: impl Fn(&S) -> Option<String> + 'c) -> Self {
        self.steps.push((name.into(), Box::new(probe)));
        self
    }

    /// Run the probes against `scope`, returning the first non-blank value trimmed.
    pub fn run(&self, scope: &S) -> Option<Hit> {
        self.steps.iter().find_map(|(name, probe)| {
            probe(scope)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .map(|value| Hit {
                    value,
                    strategy: name.clone(),
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn test_first_non_blank_wins() {
        let c: Cascade<'_, &str> = Cascade::new()
            .then("none", |_| None)
            .then("blank", |_| Some("   ".to_string()))
            .then("upper", |s: &&str| Some(s.to_uppercase()))
            .then("never", |_| Some("unreachable".to_string()));

        let hit = c.run(&"abc").unwrap();
        assert_eq!(hit.value, "ABC");
        assert_eq!(hit.strategy, "upper");
    }

    #[test]
    fn test_later_probes_do_not_run_after_hit() {
        let calls = Cell::new(0);
        let c: Cascade<'_, ()> = Cascade::new()
            .then("a", |_| Some("x".to_string()))
            .then("b", |_| {
                calls.set(calls.get() + 1);
                None
            });
        assert!(c.run(&()).is_some());
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_all_miss_is_none() {
        let c: Cascade<'_, ()> = Cascade::new().then("a", |_| None).then("b", |_| Some(String::new()));
        assert_eq!(c.run(&()), None);
    }
}
