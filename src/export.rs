//! Condition dump — a readable listing of every registered condition.
//!
//! ```text
//! // trigger-rs condition dump
//! // Sensors: 2
//! // Conditions: 1 (1 satisfied)
//!
//! #1 "overpressure" [true] &([2]>(Pressure,20),[2]=(Temperature,600))
//!   -> sensor 2: Vent {Seconds: 5}
//! ```
//!
//! Expressions are written in canonical form, so they can be fed back to
//! [`Registry::register_root_condition`](crate::Registry::register_root_condition).

use std::io::Write;

use crate::model::Action;
use crate::registry::Registry;
use crate::Result;

/// Write every condition of `registry`, ordered by id.
pub fn write_conditions(registry: &Registry, writer: &mut dyn Write) -> Result<()> {
    let satisfied = registry.satisfied_conditions();

    writeln!(writer, "// trigger-rs condition dump")?;
    writeln!(writer, "// Sensors: {}", registry.sensors().count())?;
    writeln!(
        writer,
        "// Conditions: {} ({} satisfied)",
        registry.conditions().count(),
        satisfied.len()
    )?;
    writeln!(writer)?;

    for id in registry.conditions() {
        let Some(root) = registry.root(id) else {
            continue;
        };
        let name = root
            .name
            .as_deref()
            .map(|n| format!(" \"{}\"", n.replace('"', "\\\"")))
            .unwrap_or_default();
        let text = registry.render(id).unwrap_or_default();
        writeln!(writer, "#{id}{name} [{}] {text}", satisfied.contains(&id))?;

        for action in &root.actions {
            writeln!(writer, "  -> {}", format_action(action))?;
        }
    }
    Ok(())
}

fn format_action(action: &Action) -> String {
    if action.payload.is_empty() {
        return format!("sensor {}: {}", action.target, action.message);
    }
    let fields = action
        .payload
        .iter()
        .map(|(k, v)| format!("{k}: {v}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("sensor {}: {} {{{fields}}}", action.target, action.message)
}
