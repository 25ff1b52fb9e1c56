//! Symbol selection for the auto-mode scan loop.

use std::collections::HashSet;

/// Merge the volume scan with currently held symbols.
///
/// Scanned symbols keep their ranking order and lose anything
/// blacklisted; held symbols are appended afterwards and always kept, so
/// an open position is never abandoned. Duplicates collapse to their
/// first occurrence.
pub fn select_targets(
    scanned: &[String],
    held: &[String],
    blacklist: &[String],
) -> Vec<String> {
    let banned: HashSet<&str> = blacklist.iter().map(String::as_str).collect();
    let mut seen: HashSet<&str> = HashSet::new();
    let mut targets = Vec::new();

    for symbol in scanned {
        if banned.contains(symbol.as_str()) {
            continue;
        }
        if seen.insert(symbol.as_str()) {
            targets.push(symbol.clone());
        }
    }

    for symbol in held {
        if seen.insert(symbol.as_str()) {
            targets.push(symbol.clone());
        }
    }

    targets
}
