use std::fmt::Write;

use crate::stats::StatsSnapshot;

const STYLE: &str = "html { margin: 0; padding: 0; } \
body { margin: 0; padding: 10px; font-family: sans-serif; color: rgb(204, 204, 204); background-color: rgb(17, 17, 17); } \
h1, h2, h3, h4, h5, h6 { color: #FFFFFF; } a { color: #4287F5; }";

const CHART_SCRIPT: &str = r##"
const ctx = document.getElementById("chart");
Chart.defaults.color = "rgb(204, 204, 204)";
new Chart(ctx, {
    type: "bar",
    data: {
        labels,
        datasets: [{
            label: "# of Contributions",
            backgroundColor: "#0EA5E9",
            data,
            borderWidth: 1,
        }],
    },
    options: {
        maintainAspectRatio: false,
        scales: {
            x: { grid: { color: "rgb(85, 85, 85)" } },
            y: { beginAtZero: true, grid: { color: "rgb(85, 85, 85)" } },
        },
    },
});
"##;

pub(crate) fn render_html(snap: &StatsSnapshot) -> String {
    let mut html = String::with_capacity(4096);

    html.push_str("<!DOCTYPE html><html><head>");
    html.push_str("<meta charset=\"utf-8\">");
    html.push_str("<title>Contribution Statistics</title>");
    let _ = write!(html, "<style>{}</style>", STYLE);
    html.push_str("</head>");

    html.push_str(
        "<body style=\"display: flex; flex-direction: column; box-sizing: border-box; height: 100%;\">",
    );
    html.push_str("<h1 style=\"margin: 5px; text-align: center;\">Contribution Statistics</h1>");
    html.push_str("<div style=\"display: flex; flex: 1; min-height: 0;\">");
    html.push_str("<div style=\"flex: 1; min-width: 0; margin: 10px; overflow-y: auto;\">");

    let _ = write!(
        html,
        "<p><strong>Running since:</strong> {}</p>",
        snap.running_since.format("%a, %d %b %Y %H:%M:%S GMT")
    );
    let _ = write!(
        html,
        "<p><strong>Queue size:</strong> {}/{}</p>",
        snap.pending, snap.initial
    );
    let _ = write!(
        html,
        "<p><strong>Contributions per minute:</strong> {:.3}</p>",
        snap.contributions_per_minute
    );
    let _ = write!(
        html,
        "<p><strong>Unique contributors:</strong> {}</p>",
        snap.unique_contributors
    );
    let _ = write!(
        html,
        "<p><strong>Connected workers:</strong> {}</p>",
        snap.connected_workers
    );

    if !snap.top_contributors.is_empty() {
        html.push_str("<p><strong>Most active contributors:</strong></p><ol>");
        for entry in &snap.top_contributors {
            let _ = write!(
                html,
                "<li>{} - {} contribution(s)</li>",
                escape(&entry.address),
                entry.contributions
            );
        }
        html.push_str("</ol>");
    }
    html.push_str("</div>");

    html.push_str(
        "<div style=\"flex: 1; min-width: 0; margin: 10px; padding: 10px; \
         background-color: rgb(34, 34, 34); border-radius: 10px;\"><canvas id=\"chart\"></canvas></div>",
    );
    html.push_str("</div>");

    let labels: Vec<&str> = snap.activity.iter().map(|a| a.label.as_str()).collect();
    let data: Vec<u64> = snap.activity.iter().map(|a| a.count).collect();
    html.push_str("<script src=\"https://cdn.jsdelivr.net/npm/chart.js\"></script>");
    let _ = write!(
        html,
        "<script>const labels = {};const data = {};{}</script>",
        serde_json::to_string(&labels).unwrap_or_else(|_| "[]".to_string()),
        serde_json::to_string(&data).unwrap_or_else(|_| "[]".to_string()),
        CHART_SCRIPT
    );

    html.push_str("</body></html>");
    html
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
