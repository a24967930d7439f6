use std::any::{type_name, Any};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Weak};

use crate::class::spec::ClassSpec;
use crate::core::Signal;
use crate::error::SignalError;

/// An instance of a [`ClassSpec`]: the state plus one signal per member.
///
/// Member signals are bound to the instance (wrappers see it through
/// `ctx.owner()`) and hold its handler methods weakly: once the last `Arc`
/// to the instance is dropped, its handlers are gone from every signal.
pub struct Instance<T> {
    class: Arc<ClassSpec<T>>,
    state: T,
    signals: HashMap<Arc<str>, Arc<dyn Any + Send + Sync>>,
}

impl<T: Send + Sync + 'static> Instance<T> {
    /// Instance state.
    pub fn state(&self) -> &T {
        &self.state
    }

    /// The class this instance was created from.
    pub fn class(&self) -> &Arc<ClassSpec<T>> {
        &self.class
    }

    /// Member signal `name`.
    ///
    /// # Errors
    /// - [`SignalError::UnknownSignal`] if the class has no such member;
    /// - [`SignalError::InvalidHandler`] if the member has other argument/result types.
    pub fn signal<A, R>(&self, name: &str) -> Result<&Signal<A, R>, SignalError>
    where
        A: Send + Sync + 'static,
        R: Clone + Send + Sync + 'static,
    {
        let erased = self
            .signals
            .get(name)
            .ok_or_else(|| SignalError::UnknownSignal {
                signal: name.to_string(),
                class: self.class.name().to_string(),
            })?;
        erased.downcast_ref::<Signal<A, R>>().ok_or_else(|| {
            SignalError::invalid_handler(
                name,
                format!(
                    "member is not a signal of ({}) -> {}",
                    type_name::<A>(),
                    type_name::<R>()
                ),
            )
        })
    }
}

impl<T> fmt::Debug for Instance<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&str> = self.signals.keys().map(|k| &**k).collect();
        names.sort_unstable();
        f.debug_struct("Instance")
            .field("class", &self.class.name)
            .field("signals", &names)
            .finish()
    }
}

impl<T: Send + Sync + 'static> ClassSpec<T> {
    /// Creates an instance and connects every declared handler, in resolved order.
    ///
    /// # Errors
    /// - [`SignalError::UnknownSignal`] for a checked handler of a signal not
    ///   visible from its declaring class;
    /// - [`SignalError::InvalidHandler`] for a handler declared with types that
    ///   do not match its signal;
    /// - [`SignalError::WrapperContract`] if a member's connect wrapper is asynchronous.
    pub fn instantiate(self: &Arc<Self>, state: T) -> Result<Arc<Instance<T>>, SignalError> {
        let plans = self.plan()?;
        let decls = self.signal_decls();

        let instance = Arc::new_cyclic(|weak: &Weak<Instance<T>>| {
            let owner: Weak<Instance<T>> = Weak::clone(weak);
            let owner: Weak<dyn Any + Send + Sync> = owner;
            let signals = decls
                .iter()
                .map(|decl| (Arc::clone(&decl.name), (decl.factory)(owner.clone())))
                .collect();
            Instance {
                class: Arc::clone(self),
                state,
                signals,
            }
        });

        let mut connected = 0;
        for (signal, planned) in plans {
            let Some(erased) = instance.signals.get(&signal) else {
                continue;
            };
            for entry in planned {
                (entry.connect)(&**erased, &instance, Some(entry.resolved.rank))?;
                connected += 1;
            }
        }

        tracing::debug!(
            class = %self.name,
            signals = instance.signals.len(),
            handlers = connected,
            "instance ready"
        );
        Ok(instance)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::core::{HandlerOrder, SignalConfig};
    use crate::handlers::{Deferred, HandlerFn};
    use crate::results::Results;

    #[derive(Default)]
    struct Widget {
        log: Mutex<Vec<&'static str>>,
    }

    fn record(tag: &'static str) -> impl Fn(&Widget, &u32) -> Deferred<anyhow::Result<String>> {
        move |w: &Widget, n: &u32| {
            w.log.lock().unwrap().push(tag);
            Deferred::ready(Ok(format!("{tag}:{n}")))
        }
    }

    fn widget_class(order: HandlerOrder) -> Arc<ClassSpec<Widget>> {
        let base = ClassSpec::<Widget>::root("Base")
            .signal::<u32, String>("click", SignalConfig::default().ordered(order))
            .handler("click", "on_base", record("base"))
            .handler("click", "on_shared", record("shared@base"))
            .build();
        let mid = ClassSpec::derive("Mid", &base)
            .handler("click", "on_mid", record("mid"))
            .handler("click", "on_shared", record("shared@mid"))
            .build();
        ClassSpec::derive("Leaf", &mid)
            .handler("click", "on_leaf", record("leaf"))
            .build()
    }

    fn fire_click(instance: &Instance<Widget>) -> Vec<String> {
        let res = instance
            .signal::<u32, String>("click")
            .unwrap()
            .fire(1)
            .unwrap();
        res.results()
            .unwrap()
            .iter()
            .map(|r| r.as_ref().unwrap().clone())
            .collect()
    }

    #[test]
    fn instance_connects_in_ancestors_first_order() {
        let leaf = widget_class(HandlerOrder::AncestorsFirst);
        let w = leaf.instantiate(Widget::default()).unwrap();
        assert_eq!(
            fire_click(&w),
            ["base:1", "shared@mid:1", "mid:1", "leaf:1"]
        );
        assert_eq!(
            *w.state().log.lock().unwrap(),
            ["base", "shared@mid", "mid", "leaf"]
        );
    }

    #[test]
    fn instance_connects_in_leaves_first_order() {
        let leaf = widget_class(HandlerOrder::LeavesFirst);
        let w = leaf.instantiate(Widget::default()).unwrap();
        assert_eq!(
            fire_click(&w),
            ["leaf:1", "mid:1", "base:1", "shared@mid:1"]
        );
    }

    #[test]
    fn repeated_instantiation_gives_the_same_order() {
        let leaf = widget_class(HandlerOrder::LeavesFirst);
        let first = fire_click(&leaf.instantiate(Widget::default()).unwrap());
        for _ in 0..5 {
            let w = leaf.instantiate(Widget::default()).unwrap();
            assert_eq!(fire_click(&w), first);
        }
    }

    #[test]
    fn instances_do_not_share_signals() {
        let leaf = widget_class(HandlerOrder::AncestorsFirst);
        let a = leaf.instantiate(Widget::default()).unwrap();
        let b = leaf.instantiate(Widget::default()).unwrap();
        fire_click(&a);
        assert_eq!(a.state().log.lock().unwrap().len(), 4);
        assert!(b.state().log.lock().unwrap().is_empty());
    }

    #[test]
    fn entries_carry_resolved_rank() {
        let leaf = widget_class(HandlerOrder::AncestorsFirst);
        let w = leaf.instantiate(Widget::default()).unwrap();
        let entries = w.signal::<u32, String>("click").unwrap().entries();
        let ranks: Vec<_> = entries.iter().map(|e| e.rank).collect();
        assert_eq!(ranks, [Some(0), Some(1), Some(2), Some(3)]);
        assert_eq!(entries[1].name, "on_shared");
    }

    #[test]
    fn dropping_the_instance_drops_its_handlers() {
        let leaf = widget_class(HandlerOrder::AncestorsFirst);
        let w = leaf.instantiate(Widget::default()).unwrap();
        let click = w.signal::<u32, String>("click").unwrap().clone();
        assert_eq!(click.len(), 4);
        assert!(click.owner().is_some());

        drop(w);
        assert!(click.is_empty());
        assert!(click.owner().is_none());
    }

    #[test]
    fn member_lookup_checks_name_and_types() {
        let leaf = widget_class(HandlerOrder::AncestorsFirst);
        let w = leaf.instantiate(Widget::default()).unwrap();
        assert_eq!(
            w.signal::<u32, String>("nope").unwrap_err().as_label(),
            "signal_unknown"
        );
        assert_eq!(
            w.signal::<u32, u32>("click").unwrap_err().as_label(),
            "signal_invalid_handler"
        );
    }

    #[test]
    fn mismatched_handler_types_fail_instantiation() {
        let class = ClassSpec::<Widget>::root("Broken")
            .signal::<u32, String>("click", SignalConfig::default())
            .handler("click", "wrong", |_: &Widget, n: &u32| Deferred::ready(Ok(*n)))
            .build();
        match class.instantiate(Widget::default()) {
            Err(SignalError::InvalidHandler { handler, .. }) => assert_eq!(handler, "wrong"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn unknown_signal_fails_instantiation() {
        let class = ClassSpec::<Widget>::root("Base")
            .handler("missing", "on_missing", record("x"))
            .build();
        assert!(matches!(
            class.instantiate(Widget::default()),
            Err(SignalError::UnknownSignal { .. })
        ));
    }

    #[test]
    fn member_wrappers_see_the_instance() {
        let class = ClassSpec::<Widget>::root("Wrapped")
            .signal_with::<u32, String, _>("click", SignalConfig::default(), |b| {
                b.on_fire(|ctx| {
                    let owner = ctx
                        .owner()
                        .and_then(|o| o.downcast::<Instance<Widget>>().ok());
                    match owner {
                        Some(w) if w.state().log.lock().unwrap().is_empty() => {
                            Deferred::ready(ctx.proceed())
                        }
                        _ => Deferred::ready(Results::empty()),
                    }
                })
            })
            .handler("click", "on_click", record("click"))
            .build();
        let w = class.instantiate(Widget::default()).unwrap();

        assert_eq!(fire_click(&w), ["click:1"]);
        assert!(fire_click(&w).is_empty());
    }

    #[test]
    fn class_level_handlers_reach_every_instance_first() {
        let leaf = widget_class(HandlerOrder::AncestorsFirst);
        let a = leaf.instantiate(Widget::default()).unwrap();
        let b = leaf.instantiate(Widget::default()).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let audit = HandlerFn::arc("audit", move |n: &u32| {
            sink.lock().unwrap().push(*n);
            Ok(format!("audit:{n}"))
        });
        leaf.class_signal::<u32, String>("click")
            .unwrap()
            .connect(&audit)
            .unwrap();

        assert_eq!(
            fire_click(&a),
            ["audit:1", "base:1", "shared@mid:1", "mid:1", "leaf:1"]
        );
        assert_eq!(fire_click(&b)[0], "audit:1");
        assert_eq!(*seen.lock().unwrap(), [1, 1]);

        let click = a.signal::<u32, String>("click").unwrap();
        assert_eq!(click.len(), 4);
        assert_eq!(click.subscribers().len(), 5);
    }

    #[test]
    fn derived_classes_share_the_declaring_class_signal() {
        let base = ClassSpec::<Widget>::root("Base")
            .signal::<u32, String>("click", SignalConfig::default())
            .build();
        let leaf = ClassSpec::derive("Leaf", &base)
            .handler("click", "on_leaf", record("leaf"))
            .build();
        let audit = HandlerFn::arc("audit", |n: &u32| Ok(format!("audit:{n}")));
        base.class_signal::<u32, String>("click")
            .unwrap()
            .connect(&audit)
            .unwrap();

        let w = leaf.instantiate(Widget::default()).unwrap();
        assert_eq!(fire_click(&w), ["audit:1", "leaf:1"]);

        let direct = base
            .class_signal::<u32, String>("click")
            .unwrap()
            .fire(2)
            .unwrap();
        assert_eq!(direct.len(), 1);
        assert_eq!(w.state().log.lock().unwrap().len(), 1);

        drop(audit);
        assert_eq!(fire_click(&w), ["leaf:1"]);

        assert_eq!(
            base.class_signal::<u32, u32>("click").unwrap_err().as_label(),
            "signal_invalid_handler"
        );
        assert_eq!(
            base.class_signal::<u32, String>("nope").unwrap_err().as_label(),
            "signal_unknown"
        );
    }
}
