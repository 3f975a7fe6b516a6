//! Session snapshot types and the state report rendered for the model.
//!
//! The rendered report is a stable micro-format consumed by the model every
//! turn; changing its shape changes model behavior, so the exact lines are
//! pinned by tests.

/// One loaded object in the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedObject {
    pub name: String,
    pub atom_count: u64,
    /// Chain identifiers in session enumeration order.
    pub chains: Vec<String>,
}

/// One active named selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamedSelection {
    pub name: String,
    pub atom_count: u64,
}

/// Structured contents of the session at one point in time.
///
/// Ordering follows the session's native enumeration order and is never
/// re-sorted here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub objects: Vec<LoadedObject>,
    pub selections: Vec<NamedSelection>,
}

/// Render the snapshot into the textual report injected into model context.
///
/// Format:
/// - no objects: the single line `No objects loaded.`
/// - otherwise a `Loaded objects:` header and one line per object with name,
///   atom count, and comma-joined chains (`none` when the object has no
///   chains);
/// - an `Active selections:` section with one line per selection, omitted
///   entirely when there are none.
pub fn render_report(snapshot: &SessionSnapshot) -> String {
    let mut lines = Vec::new();

    if snapshot.objects.is_empty() {
        lines.push("No objects loaded.".to_string());
    } else {
        lines.push("Loaded objects:".to_string());
        for obj in &snapshot.objects {
            let chains = if obj.chains.is_empty() {
                "none".to_string()
            } else {
                obj.chains.join(", ")
            };
            lines.push(format!(
                "  - {}: {} atoms, chains: {}",
                obj.name, obj.atom_count, chains
            ));
        }
    }

    if !snapshot.selections.is_empty() {
        lines.push("Active selections:".to_string());
        for sel in &snapshot.selections {
            lines.push(format!("  - {}: {} atoms", sel.name, sel.atom_count));
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn object(name: &str, atoms: u64, chains: &[&str]) -> LoadedObject {
        LoadedObject {
            name: name.to_string(),
            atom_count: atoms,
            chains: chains.iter().map(|c| c.to_string()).collect(),
        }
    }

    #[test]
    fn empty_session_reports_single_line() {
        assert_eq!(
            render_report(&SessionSnapshot::default()),
            "No objects loaded."
        );
    }

    #[test]
    fn object_line_lists_name_atoms_and_chains() {
        let snapshot = SessionSnapshot {
            objects: vec![object("1ubq", 5, &["A", "B"])],
            selections: Vec::new(),
        };
        let report = render_report(&snapshot);
        assert_eq!(report, "Loaded objects:\n  - 1ubq: 5 atoms, chains: A, B");
    }

    #[test]
    fn chainless_object_reports_none() {
        let snapshot = SessionSnapshot {
            objects: vec![object("lig", 23, &[])],
            selections: Vec::new(),
        };
        assert!(render_report(&snapshot).contains("chains: none"));
    }

    #[test]
    fn selections_section_omitted_when_empty() {
        let snapshot = SessionSnapshot {
            objects: vec![object("1ubq", 660, &["A"])],
            selections: Vec::new(),
        };
        assert!(!render_report(&snapshot).contains("Active selections:"));
    }

    #[test]
    fn selections_listed_after_objects() {
        let snapshot = SessionSnapshot {
            objects: vec![object("1ubq", 660, &["A"])],
            selections: vec![NamedSelection {
                name: "pocket".to_string(),
                atom_count: 42,
            }],
        };
        let report = render_report(&snapshot);
        assert_eq!(
            report,
            "Loaded objects:\n  - 1ubq: 660 atoms, chains: A\n\
             Active selections:\n  - pocket: 42 atoms"
        );
    }

    #[test]
    fn ordering_follows_snapshot_order() {
        let snapshot = SessionSnapshot {
            objects: vec![object("zzz", 1, &[]), object("aaa", 2, &[])],
            selections: Vec::new(),
        };
        let report = render_report(&snapshot);
        let zzz = report.find("zzz").expect("zzz listed");
        let aaa = report.find("aaa").expect("aaa listed");
        assert!(zzz < aaa, "snapshot order preserved, not re-sorted");
    }
}
