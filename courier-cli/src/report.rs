//! Run report output

use colored::*;
use courier_orchestrator::RunReport;

pub fn print_report(report: &RunReport) {
    let elapsed = report.finished_at - report.started_at;

    println!("{}", format!("Job {} completed", report.key).green().bold());
    println!(
        "  Coordinator: {} {}",
        report.coordinator_id,
        if report.launched {
            "(launched)".yellow()
        } else {
            "(reused)".dimmed()
        }
    );
    println!("  Polls:       {}", report.polls);
    println!(
        "  Records:     {}{}",
        report.records,
        if report.skipped > 0 {
            format!(" ({} malformed skipped)", report.skipped).yellow()
        } else {
            "".normal()
        }
    );
    println!("  Document:    {}", report.document.display());
    match &report.stats {
        Some(path) => println!("  Stats:       {}", path.display()),
        None => println!("  Stats:       {}", "not collected".dimmed()),
    }
    println!(
        "  Elapsed:     {}s",
        elapsed.num_milliseconds() as f64 / 1000.0
    );
}
