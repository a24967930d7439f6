//! # Handler ordering resolver.
//!
//! Turns the handler declarations of a class hierarchy into the linear order in
//! which an instance connects them to one member signal.
//!
//! ## Sort key
//! ```text
//! (placement, level, declaration index)
//!
//!   placement : First < Normal < Last
//!   level     : AncestorsFirst → depth of the declaring class       (root = 0)
//!               LeavesFirst    → leaf depth - depth of the declaring class
//!   index     : position of the declaration inside its class
//! ```
//!
//! ## Rules
//! - A handler is identified by `(signal, method)`. A derived class redeclaring
//!   the same method overrides it: the entry keeps the position of the first
//!   declaration and runs the most derived implementation and options.
//! - A checked declaration whose signal is not visible from its declaring class
//!   (the class itself or an ancestor) fails with [`SignalError::UnknownSignal`].
//! - An unchecked declaration whose signal is absent is skipped.
//! - The result only depends on the declarations: repeated resolutions agree.

use std::sync::Arc;

use crate::class::spec::{ClassSpec, ConnectFn, HandlerDecl};
use crate::core::HandlerOrder;
use crate::error::SignalError;

/// Where a handler goes relative to the hierarchy order.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Placement {
    /// Before every `Normal` and `Last` handler.
    First,
    /// Ordered by hierarchy depth.
    #[default]
    Normal,
    /// After every `First` and `Normal` handler.
    Last,
}

/// Options of a handler declaration.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HandlerOptions {
    /// Position relative to the hierarchy order.
    pub placement: Placement,
    /// Skip the unknown-signal check (mixin-style declarations).
    pub unchecked: bool,
}

impl HandlerOptions {
    /// Options with [`Placement::First`].
    #[must_use]
    pub fn first(mut self) -> Self {
        self.placement = Placement::First;
        self
    }

    /// Options with [`Placement::Last`].
    #[must_use]
    pub fn last(mut self) -> Self {
        self.placement = Placement::Last;
        self
    }

    /// Options without the unknown-signal check.
    #[must_use]
    pub fn unchecked(mut self) -> Self {
        self.unchecked = true;
        self
    }
}

/// One entry of a resolved connection order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResolvedHandler {
    /// Method name.
    pub method: Arc<str>,
    /// Class whose declaration fixes the position.
    pub declared_in: Arc<str>,
    /// Most derived class providing the implementation.
    pub implemented_in: Arc<str>,
    /// Depth of `declared_in`.
    pub depth: usize,
    /// Placement of the effective declaration.
    pub placement: Placement,
    /// Position in the resolved order.
    pub rank: u32,
}

/// A resolved entry together with the way to connect it.
pub(crate) struct Planned<T> {
    pub(crate) resolved: ResolvedHandler,
    pub(crate) connect: ConnectFn<T>,
}

struct Candidate<'a, T> {
    declared_in: &'a Arc<str>,
    implemented_in: &'a Arc<str>,
    depth: usize,
    index: usize,
    decl: &'a HandlerDecl<T>,
}

impl<T: Send + Sync + 'static> ClassSpec<T> {
    /// Connection order of the handlers of `signal` for instances of this class.
    ///
    /// # Errors
    /// [`SignalError::UnknownSignal`] if the signal is not a member of this class,
    /// or if a checked handler of it is declared where the signal is not visible.
    pub fn resolve(&self, signal: &str) -> Result<Vec<ResolvedHandler>, SignalError> {
        Ok(self
            .plan_signal(signal)?
            .into_iter()
            .map(|planned| planned.resolved)
            .collect())
    }

    /// Plans every member signal, after validating all checked declarations.
    pub(crate) fn plan(&self) -> Result<Vec<(Arc<str>, Vec<Planned<T>>)>, SignalError> {
        self.validate(None)?;
        self.signal_decls()
            .into_iter()
            .map(|decl| Ok((Arc::clone(&decl.name), self.plan_signal(&decl.name)?)))
            .collect()
    }

    fn plan_signal(&self, signal: &str) -> Result<Vec<Planned<T>>, SignalError> {
        self.validate(Some(signal))?;
        let decl = self
            .signal_decls()
            .into_iter()
            .find(|d| &*d.name == signal)
            .ok_or_else(|| SignalError::UnknownSignal {
                signal: signal.to_string(),
                class: self.name.to_string(),
            })?;

        let chain = self.chain();
        let leaf = chain.len() - 1;
        let mut picked: Vec<Candidate<'_, T>> = Vec::new();
        for (depth, class) in chain.iter().enumerate() {
            let declared = class
                .handlers
                .iter()
                .enumerate()
                .filter(|(_, h)| &*h.signal == signal);
            for (index, handler) in declared {
                match picked.iter_mut().find(|c| c.decl.method == handler.method) {
                    Some(overridden) => {
                        overridden.implemented_in = &class.name;
                        overridden.decl = handler;
                    }
                    None => picked.push(Candidate {
                        declared_in: &class.name,
                        implemented_in: &class.name,
                        depth,
                        index,
                        decl: handler,
                    }),
                }
            }
        }

        let order = decl.config.order;
        picked.sort_by_key(|c| {
            let level = match order {
                HandlerOrder::AncestorsFirst => c.depth,
                HandlerOrder::LeavesFirst => leaf - c.depth,
            };
            (c.decl.options.placement, level, c.index)
        });

        Ok(picked
            .into_iter()
            .enumerate()
            .map(|(rank, c)| Planned {
                resolved: ResolvedHandler {
                    method: Arc::clone(&c.decl.method),
                    declared_in: Arc::clone(c.declared_in),
                    implemented_in: Arc::clone(c.implemented_in),
                    depth: c.depth,
                    placement: c.decl.options.placement,
                    rank: u32::try_from(rank).unwrap_or(u32::MAX),
                },
                connect: Arc::clone(&c.decl.connect),
            })
            .collect())
    }

    /// Checks that every checked declaration (of `only`, if given) targets a
    /// signal visible from its declaring class.
    fn validate(&self, only: Option<&str>) -> Result<(), SignalError> {
        let chain = self.chain();
        for (depth, class) in chain.iter().enumerate() {
            let checked = class
                .handlers
                .iter()
                .filter(|h| !h.options.unchecked)
                .filter(|h| only.map_or(true, |s| &*h.signal == s));
            for handler in checked {
                let visible = chain[..=depth]
                    .iter()
                    .any(|c| c.signals.iter().any(|s| s.name == handler.signal));
                if !visible {
                    return Err(SignalError::UnknownSignal {
                        signal: handler.signal.to_string(),
                        class: class.name.to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::SignalConfig;
    use crate::handlers::Deferred;

    struct State;

    fn noop(_: &State, n: &u32) -> Deferred<anyhow::Result<u32>> {
        Deferred::ready(Ok(*n))
    }

    fn methods(resolved: &[ResolvedHandler]) -> Vec<&str> {
        resolved.iter().map(|r| &*r.method).collect()
    }

    fn hierarchy(order: HandlerOrder) -> Arc<ClassSpec<State>> {
        let base = ClassSpec::<State>::root("Base")
            .signal::<u32, u32>("click", SignalConfig::default().ordered(order))
            .handler("click", "on_base", noop)
            .handler("click", "on_shared", noop)
            .build();
        let mid = ClassSpec::derive("Mid", &base)
            .handler("click", "on_mid", noop)
            .handler("click", "on_shared", noop)
            .build();
        ClassSpec::derive("Leaf", &mid)
            .handler("click", "on_leaf", noop)
            .build()
    }

    #[test]
    fn ancestors_first_walks_root_to_leaf() {
        let leaf = hierarchy(HandlerOrder::AncestorsFirst);
        let resolved = leaf.resolve("click").unwrap();
        assert_eq!(methods(&resolved), ["on_base", "on_shared", "on_mid", "on_leaf"]);
        assert_eq!(
            resolved.iter().map(|r| r.rank).collect::<Vec<_>>(),
            [0, 1, 2, 3]
        );
    }

    #[test]
    fn leaves_first_walks_leaf_to_root() {
        let leaf = hierarchy(HandlerOrder::LeavesFirst);
        let resolved = leaf.resolve("click").unwrap();
        assert_eq!(methods(&resolved), ["on_leaf", "on_mid", "on_base", "on_shared"]);
    }

    #[test]
    fn override_keeps_position_and_takes_derived_impl() {
        let leaf = hierarchy(HandlerOrder::AncestorsFirst);
        let resolved = leaf.resolve("click").unwrap();
        let shared = resolved.iter().find(|r| &*r.method == "on_shared").unwrap();
        assert_eq!(&*shared.declared_in, "Base");
        assert_eq!(&*shared.implemented_in, "Mid");
        assert_eq!(shared.depth, 0);
    }

    #[test]
    fn resolution_is_deterministic() {
        let leaf = hierarchy(HandlerOrder::LeavesFirst);
        let first = leaf.resolve("click").unwrap();
        for _ in 0..10 {
            assert_eq!(leaf.resolve("click").unwrap(), first);
        }
    }

    #[test]
    fn placement_overrides_depth() {
        let base = hierarchy(HandlerOrder::AncestorsFirst);
        let pinned = ClassSpec::derive("Pinned", &base)
            .handler_with("click", "early", HandlerOptions::default().first(), noop)
            .handler_with("click", "late", HandlerOptions::default().last(), noop)
            .handler("click", "normal", noop)
            .build();
        let resolved = pinned.resolve("click").unwrap();
        let names = methods(&resolved);
        assert_eq!(names.first(), Some(&"early"));
        assert_eq!(names.last(), Some(&"late"));
        assert_eq!(names[names.len() - 2], "normal");
    }

    #[test]
    fn handler_for_missing_signal_is_rejected() {
        let base = ClassSpec::<State>::root("Base")
            .signal::<u32, u32>("click", SignalConfig::default())
            .handler("missing", "on_missing", noop)
            .build();
        assert_eq!(
            base.resolve("missing").unwrap_err(),
            SignalError::UnknownSignal {
                signal: "missing".into(),
                class: "Base".into()
            }
        );
        assert!(base.plan().is_err());
        assert!(base.resolve("click").unwrap().is_empty());
    }

    #[test]
    fn signal_declared_only_below_is_not_visible() {
        let base = ClassSpec::<State>::root("Base")
            .handler("click", "on_click", noop)
            .build();
        let leaf = ClassSpec::derive("Leaf", &base)
            .signal::<u32, u32>("click", SignalConfig::default())
            .build();
        match leaf.resolve("click") {
            Err(SignalError::UnknownSignal { class, .. }) => assert_eq!(class, "Base"),
            other => panic!("unexpected outcome: {:?}", other.map(|r| r.len())),
        }
    }

    #[test]
    fn unchecked_declarations_are_skipped_or_picked_up() {
        let mixin = ClassSpec::<State>::root("Mixin")
            .handler_with("click", "on_click", HandlerOptions::default().unchecked(), noop)
            .build();
        assert!(mixin.plan().unwrap().is_empty());

        let widget = ClassSpec::derive("Widget", &mixin)
            .signal::<u32, u32>("click", SignalConfig::default())
            .build();
        assert_eq!(methods(&widget.resolve("click").unwrap()), ["on_click"]);
    }
}
