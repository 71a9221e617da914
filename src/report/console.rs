use crate::controller::filter::FilterOutcome;
use crate::engine::engine::RegionResult;
use crate::ledger::ledger::PatternReport;
use crate::registry::registry_model::{ConfigOrigin, KeywordCategory, RegistrySnapshot, RegionName};

// ============================================================================
// Console reporter: formatted terminal output
// ============================================================================

/// Format the confirmed patterns of a scan run.
///
/// Produces output like:
/// ```text
/// === Pattern scan: 3 passes ===
///
/// ● div 5f1c0e…  seen 3x
///     selectors: [role="article"], [aria-label="Suggested for you"]
///     sample:    Suggested for you Follow
///
/// === Results: 1 confirmed, 4 tracked ===
/// ```
pub fn format_scan_report(passes: u32, reports: &[PatternReport], tracked: usize) -> String {
    let mut out = String::new();

    out.push_str(&format!("=== Pattern scan: {} passes ===\n\n", passes));

    if reports.is_empty() {
        out.push_str("No recurring patterns confirmed.\n");
    }

    for report in reports {
        out.push_str(&format!(
            "\u{25cf} {} {}  seen {}x\n",
            report.tag,
            short_digest(&report.signature),
            report.observation_count
        ));
        if !report.selectors.is_empty() {
            out.push_str(&format!("    selectors: {}\n", report.selectors.join(", ")));
        }
        if !report.sample_text.is_empty() {
            out.push_str(&format!("    sample:    {}\n", report.sample_text));
        }
        if !report.structure.is_empty() {
            let shape: Vec<&str> = report.structure.iter().map(|c| c.tag.as_str()).collect();
            out.push_str(&format!("    children:  {}\n", shape.join(" ")));
        }
    }

    out.push_str(&format!(
        "\n=== Results: {} confirmed, {} tracked ===\n",
        reports.len(),
        tracked
    ));
    out
}

/// One line per region: whether hide/show found anything, and the resulting state.
pub fn format_region_results(results: &[(RegionResult, bool)]) -> String {
    let mut out = String::new();
    for (result, hidden) in results {
        let marker = if result.applied { "\u{2713}" } else { "-" };
        let state = match (result.applied, hidden) {
            (false, _) => "not found",
            (true, true) => "hidden",
            (true, false) => "visible",
        };
        out.push_str(&format!("{} {:<10} {}\n", marker, result.region.as_str(), state));
    }
    out
}

pub fn format_filter_outcome(region: &RegionName, outcome: Option<&FilterOutcome>) -> String {
    match outcome {
        Some(o) => format!(
            "{}: kept {} unit(s), hid {} unit(s)\n",
            region.as_str(),
            o.kept,
            o.hidden
        ),
        None => format!("{}: nothing filtered\n", region.as_str()),
    }
}

/// Print the resolved registry: where it came from, each region's predicates,
/// and keyword lists.
pub fn format_registry(snapshot: &RegistrySnapshot) -> String {
    let mut out = String::new();

    let origin = match &snapshot.origin {
        ConfigOrigin::Defaults => "built-in defaults".to_string(),
        ConfigOrigin::Loaded(name) => name.clone(),
    };
    out.push_str(&format!("=== Selector registry ({}) ===\n", origin));

    for (region, predicates) in &snapshot.predicates {
        out.push_str(&format!("\n[{}]\n", region));
        for predicate in predicates {
            out.push_str(&format!("  {}\n", predicate));
        }
    }

    out.push('\n');
    for category in [
        KeywordCategory::Distraction,
        KeywordCategory::Closeness,
        KeywordCategory::Suggested,
    ] {
        let words: Vec<String> = snapshot.keywords(category).into_iter().collect();
        out.push_str(&format!("{:<12} {}\n", category.as_str(), words.join(", ")));
    }
    out
}

fn short_digest(digest: &str) -> &str {
    digest.get(..10).unwrap_or(digest)
}

