//! # Example: class_handlers
//!
//! Declares handlers on a small class hierarchy and shows the order in which
//! an instance connects them.
//!
//! Demonstrates how to:
//! - Declare member signals and handler methods with [`ClassSpec`].
//! - Override a method in a derived class and pin one with [`HandlerOptions`].
//! - Compare `AncestorsFirst` and `LeavesFirst` orders with [`ClassSpec::resolve`].
//!
//! ## Flow
//! ```text
//! Widget ──► Button ──► IconButton
//!    │          │            └─ on_icon, on_press (override)
//!    │          └─ on_press, on_audit (last)
//!    └─ "pressed" signal, on_widget
//!
//! instantiate(state) ──► fire("pressed") ──► handlers in resolved order
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example class_handlers
//! ```

use std::sync::Arc;

use sigvisor::{ClassSpec, Deferred, HandlerOptions, HandlerOrder, SignalConfig};

struct Ui {
    label: &'static str,
}

fn say(tag: &'static str) -> impl Fn(&Ui, &u32) -> Deferred<anyhow::Result<String>> {
    move |ui: &Ui, clicks: &u32| Deferred::ready(Ok(format!("{tag}({}, {clicks})", ui.label)))
}

fn hierarchy(order: HandlerOrder) -> Arc<ClassSpec<Ui>> {
    let widget = ClassSpec::<Ui>::root("Widget")
        .signal::<u32, String>("pressed", SignalConfig::default().ordered(order))
        .handler("pressed", "on_widget", say("widget"))
        .build();
    let button = ClassSpec::derive("Button", &widget)
        .handler("pressed", "on_press", say("button"))
        .handler_with("pressed", "on_audit", HandlerOptions::default().last(), say("audit"))
        .build();
    ClassSpec::derive("IconButton", &button)
        .handler("pressed", "on_icon", say("icon"))
        .handler("pressed", "on_press", say("icon-press"))
        .build()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    for order in [HandlerOrder::AncestorsFirst, HandlerOrder::LeavesFirst] {
        let class = hierarchy(order);
        println!("== {order:?}");
        for entry in class.resolve("pressed")? {
            println!(
                "  #{} {} (declared in {}, implemented in {}, {:?})",
                entry.rank, entry.method, entry.declared_in, entry.implemented_in, entry.placement
            );
        }

        let button = class.instantiate(Ui { label: "ok" })?;
        let res = button.signal::<u32, String>("pressed")?.fire(1)?;
        for outcome in res.results().unwrap_or_default() {
            println!("  -> {outcome:?}");
        }
    }
    Ok(())
}
