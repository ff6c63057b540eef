use std::fmt::Write;

use crate::models::{History, Property};

const SEPARATOR: &str = "----------------------------------------";

/// Human-readable history.txt for a property, entries in the given order
pub fn render_history(property: &Property, entries: &[History]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "History of property {} (agent code {})",
        property.property_code, property.agent_code
    );
    let _ = writeln!(out, "{SEPARATOR}");

    if entries.is_empty() {
        let _ = writeln!(out, "No recorded actions.");
        return out;
    }

    for entry in entries {
        let _ = writeln!(out, "Date: {}", entry.action_date.format("%Y-%m-%d %H:%M:%S"));
        let _ = writeln!(out, "Action: {}", entry.action_type.as_str());
        let _ = writeln!(out, "Agent ID: {}", entry.agent_id);
        let _ = writeln!(out, "Details: {}", entry.details);
        let _ = writeln!(out, "{SEPARATOR}");
    }
    out
}
