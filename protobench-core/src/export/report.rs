// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 Ankit Kumar Pandey

//! Standalone HTML report.
//!
//! No scripts and no external assets; the page can be opened straight from
//! disk. Output depends only on the runs, so rendering twice gives the same
//! bytes.

use super::comparison;
use crate::model::{format_timestamp, BenchmarkRun};
use crate::stats::BenchmarkStats;

/// Samples listed per run before the table is cut off.
const MAX_SAMPLE_ROWS: usize = 500;

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn fmt_latency(seconds: f64) -> String {
    html_escape(&BenchmarkStats::format_latency(seconds))
}

fn stat_card(label: &str, value: String) -> String {
    format!(
        "<div class=\"card\"><div class=\"label\">{}</div><div class=\"value\">{}</div></div>",
        label, value
    )
}

fn run_section(run: &BenchmarkRun) -> String {
    let stats = run.stats();
    let cards = [
        stat_card("Samples", stats.count.to_string()),
        stat_card("Mean", fmt_latency(stats.mean)),
        stat_card("Median", fmt_latency(stats.median)),
        stat_card("Std Dev", fmt_latency(stats.std_dev)),
        stat_card("Min", fmt_latency(stats.min)),
        stat_card("Max", fmt_latency(stats.max)),
        stat_card("P50", fmt_latency(stats.p50)),
        stat_card("P95", fmt_latency(stats.p95)),
        stat_card("P99", fmt_latency(stats.p99)),
    ]
    .join("\n");

    let anomalies = run.anomaly_count();
    let anomaly_note = if anomalies > 0 {
        format!(
            "<p class=\"warn\">{} sample(s) have a negative latency. Check clock synchronization between requester and responder.</p>",
            anomalies
        )
    } else {
        String::new()
    };

    let metadata = if run.metadata().is_empty() {
        String::new()
    } else {
        let items: String = run
            .metadata()
            .iter()
            .map(|(k, v)| format!("<li><code>{}</code> = {}</li>", html_escape(k), html_escape(v)))
            .collect();
        format!("<ul class=\"meta\">{}</ul>", items)
    };

    let rows: String = run
        .samples()
        .iter()
        .take(MAX_SAMPLE_ROWS)
        .map(|s| {
            let class = if s.is_anomalous() { " class=\"anomaly\"" } else { "" };
            format!(
                "<tr{}><td>{}</td><td>{}</td><td>{}</td><td>{:.6}</td></tr>",
                class,
                s.request_id,
                html_escape(&s.request_timestamp),
                html_escape(&s.response_timestamp),
                s.latency_seconds
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    let caption = if run.samples().len() > MAX_SAMPLE_ROWS {
        format!(
            "Showing first {} of {} samples",
            MAX_SAMPLE_ROWS,
            run.samples().len()
        )
    } else {
        format!("{} samples", run.samples().len())
    };

    format!(
        r#"<section>
<h2>{protocol} <span class="run-id">{run_id}</span></h2>
<p class="sub">Created {created}</p>
{anomaly_note}
<div class="cards">
{cards}
</div>
{metadata}
<table>
<caption>{caption}</caption>
<thead><tr><th>#</th><th>Request</th><th>Response</th><th>Latency (s)</th></tr></thead>
<tbody>
{rows}
</tbody>
</table>
</section>"#,
        protocol = html_escape(run.protocol().as_str()),
        run_id = html_escape(run.run_id().as_str()),
        created = format_timestamp(run.created_at()),
        anomaly_note = anomaly_note,
        cards = cards,
        metadata = metadata,
        caption = caption,
        rows = rows,
    )
}

fn comparison_table(runs: &[BenchmarkRun]) -> String {
    let rows: String = comparison(runs)
        .iter()
        .map(|row| {
            format!(
                "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
                html_escape(&row.protocol),
                html_escape(&row.run_id),
                row.count,
                fmt_latency(row.mean),
                fmt_latency(row.median),
                fmt_latency(row.p50),
                fmt_latency(row.p95),
                fmt_latency(row.p99),
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"<section>
<h2>Comparison</h2>
<table>
<thead><tr><th>Protocol</th><th>Run</th><th>Samples</th><th>Mean</th><th>Median</th><th>P50</th><th>P95</th><th>P99</th></tr></thead>
<tbody>
{}
</tbody>
</table>
</section>"#,
        rows
    )
}

/// Render one report covering `runs`.
pub fn render(runs: &[BenchmarkRun]) -> String {
    let title = match runs {
        [run] => format!("{} benchmark {}", run.protocol(), run.run_id()),
        _ => format!("Protocol benchmark comparison ({} runs)", runs.len()),
    };

    let comparison = if runs.len() > 1 {
        comparison_table(runs)
    } else {
        String::new()
    };

    let sections = runs
        .iter()
        .map(run_section)
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<meta name="viewport" content="width=device-width, initial-scale=1.0">
<title>{title}</title>
<style>
  body {{ font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif; margin: 0; padding: 2rem; background: #0f172a; color: #e2e8f0; line-height: 1.5; }}
  h1 {{ font-size: 1.75rem; margin: 0 0 1.5rem; color: #f1f5f9; }}
  h2 {{ font-size: 1.25rem; margin: 2rem 0 0.25rem; color: #f1f5f9; }}
  .run-id {{ font-size: 0.9rem; color: #94a3b8; font-weight: 400; }}
  .sub {{ color: #94a3b8; margin: 0 0 1rem; }}
  .cards {{ display: grid; grid-template-columns: repeat(auto-fill, minmax(120px, 1fr)); gap: 0.75rem; margin-bottom: 1rem; }}
  .card {{ background: #1e293b; border: 1px solid #334155; border-radius: 8px; padding: 0.75rem; }}
  .label {{ font-size: 0.75rem; text-transform: uppercase; color: #94a3b8; }}
  .value {{ font-size: 1.1rem; font-weight: 600; color: #38bdf8; }}
  .warn {{ background: #422006; border-left: 4px solid #f59e0b; padding: 0.5rem 0.75rem; }}
  .meta {{ color: #94a3b8; font-size: 0.85rem; }}
  table {{ width: 100%; border-collapse: collapse; font-size: 0.85rem; margin-top: 0.5rem; }}
  caption {{ text-align: left; color: #94a3b8; padding-bottom: 0.25rem; }}
  th, td {{ padding: 0.35rem 0.6rem; border-bottom: 1px solid #1e293b; text-align: left; }}
  th {{ background: #1e293b; color: #cbd5e1; }}
  tr.anomaly td {{ color: #f87171; }}
</style>
</head>
<body>
<h1>{title}</h1>
{comparison}
{sections}
</body>
</html>
"#,
        title = html_escape(&title),
        comparison = comparison,
        sections = sections,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::fixtures;
    use crate::types::{ProtocolName, TimestampPair};

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("<a href=\"x\">A & B</a>"), "&lt;a href=&quot;x&quot;&gt;A &amp; B&lt;/a&gt;");
    }

    #[test]
    fn test_single_run_report() {
        let run = fixtures::run("REST", 0, &[3, 5]);
        let html = render(std::slice::from_ref(&run));

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains(run.run_id().as_str()));
        assert!(html.contains("4.000ms"));
        assert!(!html.contains("<h2>Comparison</h2>"));
        assert!(!html.contains("negative latency"));
    }

    #[test]
    fn test_comparison_table_for_multiple_runs() {
        let runs = vec![fixtures::run("REST", 0, &[3]), fixtures::run("gRPC", 1, &[1])];
        let html = render(&runs);
        assert!(html.contains("<h2>Comparison</h2>"));
        assert!(html.contains("(2 runs)"));
    }

    #[test]
    fn test_anomaly_note_and_escaped_metadata() {
        let pairs = vec![
            TimestampPair::parse("2025-01-05T12:00:00.005Z", "2025-01-05T12:00:00.001Z").unwrap(),
        ];
        let run = crate::stats::ingest(pairs, &ProtocolName::new("CBOR").unwrap(), None)
            .unwrap()
            .with_metadata("note", "<script>alert(1)</script>");
        let html = render(std::slice::from_ref(&run));

        assert!(html.contains("negative latency"));
        assert!(html.contains("class=\"anomaly\""));
        assert!(!html.contains("<script>"));
    }

    #[test]
    fn test_render_is_deterministic() {
        let runs = vec![fixtures::run("AVRO", 0, &[2, 7])];
        assert_eq!(render(&runs), render(&runs));
    }
}
