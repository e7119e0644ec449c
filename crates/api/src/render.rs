//! Server-side HTML rendering of the report page.
//!
//! The page is assembled from a [`ReportView`] with `write!` into a
//! `String`. Every value that originates outside this module (device
//! names, mountpoints, the filter text) goes through [`escape_html`].

use std::fmt::Write;

use storemon_core::report::ReportView;
use storemon_core::volume::VolumeUsage;

const PAGE_STYLE: &str = r#"
    body { font-family: sans-serif; margin: 2em; color: #222; }
    h1 { margin-bottom: 0.2em; }
    .date { color: #666; margin-top: 0; }
    .summary { display: flex; gap: 2em; margin: 1em 0 2em; }
    .summary div { background: #f3f3f3; border-radius: 0.5em; padding: 0.8em 1.2em; }
    .summary b { display: block; font-size: 1.4em; }
    form { display: inline-block; margin-right: 1em; }
    table { border-collapse: collapse; margin-bottom: 2em; min-width: 60em; }
    th, td { border: 1px solid #ccc; padding: 0.3em 0.7em; text-align: left; }
    td.num { text-align: right; font-variant-numeric: tabular-nums; }
    tr.critical td { background: #fbe3e3; }
    .empty { color: #888; font-style: italic; }
    #refresh-status { margin-left: 1em; }
"#;

const REFRESH_SCRIPT: &str = r#"
  document.getElementById('refresh-form').addEventListener('submit', async (ev) => {
    ev.preventDefault();
    const status = document.getElementById('refresh-status');
    status.textContent = 'Refreshing...';
    const body = JSON.stringify({
      username: ev.target.username.value,
      password: ev.target.password.value,
    });
    try {
      const res = await fetch('/refresh_mounts', {
        method: 'POST',
        headers: { 'Content-Type': 'application/json' },
        body,
      });
      const data = await res.json();
      status.textContent = data.message;
      if (data.success) { setTimeout(() => window.location.reload(), 1000); }
    } catch (err) {
      status.textContent = 'Error: ' + err;
    }
  });
"#;

/// Render the complete report page.
pub fn render_index(view: &ReportView) -> String {
    let mut html = String::with_capacity(16 * 1024);
    let filter = escape_html(&view.current_filter);

    // Writing into a String cannot fail.
    let _ = write!(
        html,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
  <meta charset="UTF-8">
  <title>Storage Utilization Report</title>
  <style>{PAGE_STYLE}</style>
</head>
<body>
  <h1>Storage Utilization Report</h1>
  <p class="date">{date}</p>

  <div class="summary">
    <div>Total used<b>{used:.2} TB</b></div>
    <div>Fleet capacity<b>{capacity:.2} TB</b></div>
    <div>Utilized<b>{percent:.2}%</b></div>
  </div>

  <div class="controls">
    <form method="get" action="/">
      <input type="text" name="filter" value="{filter}" placeholder="Filter mountpoints...">
      <button type="submit">Filter</button>
    </form>
    <form method="get" action="/download">
      <input type="hidden" name="filter" value="{filter}">
      <button type="submit">Download CSV</button>
    </form>
    <form id="refresh-form">
      <input type="text" name="username" placeholder="Username" autocomplete="username">
      <input type="password" name="password" placeholder="Password" autocomplete="current-password">
      <button type="submit">Refresh mounts</button>
      <span id="refresh-status"></span>
    </form>
  </div>
"#,
        date = escape_html(&view.report_date),
        used = view.total_used_tb,
        capacity = view.fleet_capacity_tb,
        percent = view.percent_utilized,
    );

    let critical_title = format!("Critical Volumes (&ge; {}% utilized)", view.critical_threshold);
    let sections: [(&str, &[VolumeUsage]); 6] = [
        (&critical_title, &view.critical),
        ("General Storage", &view.general),
        ("Curator", &view.curator),
        ("Raysync", &view.raysync),
        ("Lucid", &view.lucid),
        ("Defunct", &view.defunct),
    ];

    for (title, volumes) in sections {
        render_section(&mut html, title, volumes, view.critical_threshold);
    }

    let _ = write!(html, "  <script>{REFRESH_SCRIPT}</script>\n</body>\n</html>\n");
    html
}

/// Append one titled volume table. `title` is trusted markup.
fn render_section(html: &mut String, title: &str, volumes: &[VolumeUsage], threshold: f64) {
    let _ = writeln!(html, "  <h2>{title}</h2>");

    if volumes.is_empty() {
        html.push_str("  <p class=\"empty\">No volumes</p>\n");
        return;
    }

    html.push_str(
        "  <table>\n    <tr><th>Device</th><th>Mountpoint</th><th>Quota (TB)</th>\
         <th>Used (TB)</th><th>Free (TB)</th><th>Utilization (%)</th></tr>\n",
    );

    for v in volumes {
        let utilization = v.utilization_percent();
        let class = if utilization >= threshold { " class=\"critical\"" } else { "" };
        let _ = writeln!(
            html,
            "    <tr{class}><td>{}</td><td>{}</td><td class=\"num\">{:.2}</td>\
             <td class=\"num\">{:.2}</td><td class=\"num\">{:.2}</td><td class=\"num\">{:.2}</td></tr>",
            escape_html(&v.device),
            escape_html(&v.mountpoint),
            v.total_tb,
            v.used_tb,
            v.free_tb,
            utilization,
        );
    }

    html.push_str("  </table>\n");
}

/// Escape text for use in element content and double-quoted attributes.
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use storemon_core::report::{build_report, MountFilter, ReportSettings};

    use super::*;

    fn view_for(volumes: Vec<VolumeUsage>, filter: Option<&str>) -> ReportView {
        let settings = ReportSettings::default();
        let report = build_report(volumes, &settings);
        ReportView::build(&report, &MountFilter::new(filter), &settings)
    }

    #[test]
    fn escapes_markup_characters() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & Jerry's</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/a&gt;"
        );
        assert_eq!(escape_html("/mnt/GEN1"), "/mnt/GEN1");
    }

    #[test]
    fn page_lists_volumes_and_marks_critical_rows() {
        let view = view_for(
            vec![
                VolumeUsage::new("nas:/mnt/GEN1", "/mnt/GEN1", 2.0, 1.9, 0.1),
                VolumeUsage::new("nas:/mnt/GEN2", "/mnt/GEN2", 2.0, 0.5, 1.5),
            ],
            None,
        );
        let html = render_index(&view);

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<td>/mnt/GEN1</td>"));
        assert!(html.contains("<td>/mnt/GEN2</td>"));
        assert!(html.contains("<tr class=\"critical\"><td>nas:/mnt/GEN1</td>"));
        assert!(html.contains("<tr><td>nas:/mnt/GEN2</td>"));
        assert!(html.contains(&view.report_date));
    }

    #[test]
    fn empty_groups_render_placeholder() {
        let html = render_index(&view_for(Vec::new(), None));
        assert_eq!(html.matches("No volumes").count(), 6);
        assert!(!html.contains("<table>"));
    }

    #[test]
    fn filter_text_is_escaped_in_both_forms() {
        let html = render_index(&view_for(Vec::new(), Some("\"><script>")));
        assert_eq!(html.matches("value=\"&quot;&gt;&lt;script&gt;\"").count(), 2);
        assert!(!html.contains("\"><script>"));
    }
}
