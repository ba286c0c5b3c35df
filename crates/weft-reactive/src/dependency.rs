//! Dependency tokens and combinators
//!
//! A [`DependencyToken`] names a set of observed values. Attaching an event
//! to the token attaches it to each of them, so one event fires (once per
//! flush) when any of them changes.

use std::fmt;
use std::rc::Rc;

use crate::{AsDependency, EventId, ObservedBase};

/// Set of observed values a computation depends on
#[derive(Clone, Default)]
pub struct DependencyToken {
    dependencies: Vec<Rc<dyn ObservedBase>>,
}

/// Build a token over several observed values
pub fn observe(values: &[&dyn AsDependency]) -> DependencyToken {
    DependencyToken {
        dependencies: values.iter().map(|v| v.as_dependency()).collect(),
    }
}

impl DependencyToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one more dependency
    pub fn with(mut self, value: &dyn AsDependency) -> Self {
        self.dependencies.push(value.as_dependency());
        self
    }

    /// Attach `id` to every dependency
    pub fn attach_event(&self, id: EventId) {
        for dependency in &self.dependencies {
            dependency.attach_event(id);
        }
    }

    /// Attach `id` to every dependency for one change only
    pub fn attach_oneshot_event(&self, id: EventId) {
        for dependency in &self.dependencies {
            dependency.attach_oneshot_event(id);
        }
    }

    pub fn detach_event(&self, id: EventId) {
        for dependency in &self.dependencies {
            dependency.detach_event(id);
        }
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// Pair the token with a function computing a derived value
    pub fn generate<R>(self, generator: impl Fn() -> R + 'static) -> Combinator<R> {
        Combinator {
            token: self,
            generator: Rc::new(generator),
        }
    }
}

impl fmt::Debug for DependencyToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyToken")
            .field("dependencies", &self.dependencies.len())
            .finish()
    }
}

impl<T: AsDependency> From<&T> for DependencyToken {
    fn from(value: &T) -> Self {
        DependencyToken::new().with(value)
    }
}

/// Derived value recomputed from its dependencies on demand
pub struct Combinator<R> {
    token: DependencyToken,
    generator: Rc<dyn Fn() -> R>,
}

impl<R> Clone for Combinator<R> {
    fn clone(&self) -> Self {
        Self {
            token: self.token.clone(),
            generator: Rc::clone(&self.generator),
        }
    }
}

impl<R> Combinator<R> {
    /// Run the generator
    pub fn evaluate(&self) -> R {
        (self.generator)()
    }

    pub fn token(&self) -> &DependencyToken {
        &self.token
    }

    pub fn attach_event(&self, id: EventId) {
        self.token.attach_event(id);
    }

    pub fn detach_event(&self, id: EventId) {
        self.token.detach_event(id);
    }
}

impl<R> fmt::Debug for Combinator<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Combinator")
            .field("token", &self.token)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Event, EventContext, Observed, ObservedVec};
    use std::cell::Cell;

    #[test]
    fn test_observe_attaches_to_all() {
        let ctx = EventContext::new();
        let a = Observed::new(&ctx, 1);
        let b = Observed::new(&ctx, String::from("x"));
        let list = ObservedVec::new(&ctx, vec![1u8]);
        let token = observe(&[&a, &b, &list]);
        assert_eq!(token.len(), 3);

        let id = ctx.register_event(Event::new(|_| true));
        token.attach_event(id);
        assert_eq!(a.attached_event_count(), 1);
        assert_eq!(b.attached_event_count(), 1);
        assert_eq!(list.attached_event_count(), 1);

        token.detach_event(id);
        assert_eq!(a.attached_event_count(), 0);
    }

    #[test]
    fn test_combinator_evaluates_once_per_flush() {
        let ctx = EventContext::new();
        let first = Observed::new(&ctx, String::from("Ada"));
        let last = Observed::new(&ctx, String::from("Lovelace"));

        let (f, l) = (first.clone(), last.clone());
        let full = observe(&[&first, &last]).generate(move || format!("{} {}", f.get(), l.get()));

        let runs = Rc::new(Cell::new(0));
        let out = Rc::new(std::cell::RefCell::new(String::new()));
        let (r, o, c) = (runs.clone(), out.clone(), full.clone());
        let id = ctx.register_event(Event::new(move |_| {
            r.set(r.get() + 1);
            *o.borrow_mut() = c.evaluate();
            true
        }));
        full.attach_event(id);

        first.set("Grace".into());
        last.set("Hopper".into());
        ctx.execute_active_immediately();

        assert_eq!(runs.get(), 1);
        assert_eq!(*out.borrow(), "Grace Hopper");
    }

    #[test]
    fn test_token_from_single_value() {
        let ctx = EventContext::new();
        let a = Observed::new(&ctx, 0);
        let token = DependencyToken::from(&a);
        assert_eq!(token.len(), 1);
    }
}
