//! HTML rendering for the dashboard page
//!
//! Plain string building; every value that came from the store, the query
//! string or a log line goes through `html_escape` first.

use std::fmt::Write as _;

use html_escape::{encode_double_quoted_attribute as attr, encode_text as text};

use crate::collector::{PassStatus, RunPhase, RunReport};
use crate::store::DashboardView;

const STYLE: &str = r#"
      body { font-family: Arial, sans-serif; margin: 20px; }
      table { border-collapse: collapse; width: 100%; margin-bottom: 30px; }
      th, td { border: 1px solid #ccc; padding: 8px; }
      th { background: #f4f4f4; }
      form { margin-bottom: 20px; }
      .btn { background: #007BFF; color: white; padding: 6px 12px; border: none; cursor: pointer; text-decoration: none; }
      .btn:hover { background: #0056b3; }
      .status { padding: 10px; margin: 10px 0; border-radius: 4px; }
      .success { background: #d4edda; color: #155724; }
      .warning { background: #fff3cd; color: #856404; }
      .error { background: #f8d7da; color: #721c24; }
      .info { background: #d1ecf1; color: #0c5460; }
"#;

/// Status banner shown above the filter form
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Banner {
    pub text: String,
    pub level: BannerLevel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BannerLevel {
    Success,
    Warning,
    Error,
    Info,
}

impl BannerLevel {
    /// Unknown names render as `info`
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name {
            "success" => BannerLevel::Success,
            "warning" => BannerLevel::Warning,
            "error" => BannerLevel::Error,
            _ => BannerLevel::Info,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            BannerLevel::Success => "success",
            BannerLevel::Warning => "warning",
            BannerLevel::Error => "error",
            BannerLevel::Info => "info",
        }
    }
}

/// Filter values exactly as typed, for refilling the form
#[derive(Debug, Clone, Default)]
pub struct FormValues {
    pub username: String,
    pub kind: String,
    pub date: String,
}

/// Everything needed to draw the page
pub struct PageModel<'a> {
    pub banner: Option<Banner>,
    pub form: &'a FormValues,
    pub view: &'a DashboardView,
    pub recent_days: u32,
    pub phase: RunPhase,
    pub last_report: Option<&'a RunReport>,
}

fn selected(current: &str, value: &str) -> &'static str {
    if current == value { " selected" } else { "" }
}

fn render_banner(out: &mut String, banner: &Banner) {
    let _ = writeln!(
        out,
        r#"    <div class="status {}">{}</div>"#,
        banner.level.as_str(),
        text(&banner.text)
    );
}

fn render_form(out: &mut String, form: &FormValues) {
    let _ = write!(
        out,
        r#"    <form method="get" action="/">
      <input type="text" name="username" placeholder="Username" value="{username}">
      <select name="type">
        <option value="">Transaction type</option>
        <option value="purchase"{purchase}>Purchase</option>
        <option value="tip"{tip}>Tip</option>
      </select>
      <input type="date" name="date" value="{date}">
      <button class="btn" type="submit">Filter</button>
      <a href="/update" class="btn">Update data</a>
      <a href="/logs" class="btn">Show logs</a>
    </form>
"#,
        username = attr(&form.username),
        purchase = selected(&form.kind, "purchase"),
        tip = selected(&form.kind, "tip"),
        date = attr(&form.date),
    );
}

fn render_subscribers(out: &mut String, view: &DashboardView, recent_days: u32) {
    let _ = writeln!(out, "    <h2>Subscribers (last {recent_days} days)</h2>");
    if view.recent_subscribers.is_empty() {
        let _ = writeln!(out, "    <p>No subscribers in the last {recent_days} days</p>");
        return;
    }
    out.push_str("    <table>\n      <tr><th>Username</th><th>Subscribed</th></tr>\n");
    for row in &view.recent_subscribers {
        let _ = writeln!(
            out,
            "      <tr><td>{}</td><td>{}</td></tr>",
            text(&row.username),
            text(&row.subscribed_date)
        );
    }
    out.push_str("    </table>\n");
}

fn render_transactions(out: &mut String, view: &DashboardView) {
    out.push_str("    <h2>Transactions</h2>\n");
    if view.transactions.is_empty() {
        out.push_str("    <p>No transactions</p>\n");
        return;
    }
    out.push_str(
        "    <table>\n      <tr><th>Username</th><th>Type</th><th>Amount</th><th>Date</th></tr>\n",
    );
    for row in &view.transactions {
        let _ = writeln!(
            out,
            "      <tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            text(&row.username),
            text(&row.kind),
            row.amount,
            text(&row.date)
        );
    }
    out.push_str("    </table>\n");
}

fn pass_cells(status: &PassStatus) -> (String, String) {
    match status {
        PassStatus::Completed {
            blocks,
            extracted,
            rejected,
            inserted,
            duplicates,
            ..
        } => (
            "completed".to_string(),
            format!(
                "{extracted} extracted from {blocks} blocks, {rejected} rejected, \
                 {inserted} new, {duplicates} known"
            ),
        ),
        PassStatus::Skipped { reason } => ("skipped".to_string(), reason.clone()),
        PassStatus::Failed { kind, message } => (format!("failed ({kind})"), message.clone()),
    }
}

fn render_last_run(out: &mut String, phase: RunPhase, report: Option<&RunReport>) {
    out.push_str("    <h2>Last run</h2>\n");
    if phase.is_running() {
        let _ = writeln!(out, "    <p>Collection in progress: {phase}</p>");
    }
    let Some(report) = report else {
        out.push_str("    <p>No collection has run since startup</p>\n");
        return;
    };

    let _ = writeln!(
        out,
        "    <p>{} at {}</p>",
        text(&report.summary()),
        report.finished_at.format("%Y-%m-%d %H:%M:%S")
    );
    if report.passes.is_empty() {
        return;
    }
    out.push_str("    <table>\n      <tr><th>Source</th><th>Status</th><th>Details</th></tr>\n");
    for pass in &report.passes {
        let (status, details) = pass_cells(&pass.status);
        let _ = writeln!(
            out,
            "      <tr><td>{}</td><td>{}</td><td>{}</td></tr>",
            pass.source,
            text(&status),
            text(&details)
        );
    }
    out.push_str("    </table>\n");
}

/// Full dashboard document
#[must_use]
pub fn dashboard_page(model: &PageModel<'_>) -> String {
    let mut out = String::with_capacity(8 * 1024);
    let _ = write!(
        out,
        "<!doctype html>\n<html lang=\"en\">\n  <head>\n    <meta charset=\"utf-8\">\n    \
         <title>fanledger dashboard</title>\n    <style>{STYLE}    </style>\n  </head>\n  <body>\n    \
         <h1>fanledger dashboard</h1>\n"
    );

    if let Some(banner) = &model.banner {
        render_banner(&mut out, banner);
    }
    render_form(&mut out, model.form);
    render_subscribers(&mut out, model.view, model.recent_days);
    render_transactions(&mut out, model.view);
    render_last_run(&mut out, model.phase, model.last_report);

    out.push_str("  </body>\n</html>\n");
    out
}

/// Log file contents, escaped inside `<pre>`
#[must_use]
pub fn logs_page(contents: &str) -> String {
    format!(
        "<!doctype html>\n<html lang=\"en\">\n  <head><meta charset=\"utf-8\"><title>fanledger logs</title></head>\n  \
         <body><pre>{}</pre></body>\n</html>\n",
        text(contents)
    )
}
