use serde::Serialize;

use crate::database::{NodeView, NormalizedReading, ParentReport};
use crate::display::{ElementId, TextBoard};
use crate::map::{MapScene, MarkerId};
use crate::nodes::Node;

/// Escapes text for element content and attribute values.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
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

/// JSON that is safe to inline inside a `<script>` block.
pub fn script_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "null".to_string())
        .replace("</", "<\\/")
}

const LEAFLET_HEAD: &str = r#"<link rel="stylesheet" href="https://unpkg.com/leaflet@1.9.4/dist/leaflet.css" />
    <link rel="stylesheet" href="https://cdnjs.cloudflare.com/ajax/libs/font-awesome/6.5.1/css/all.min.css" />"#;
const LEAFLET_SCRIPT: &str = r#"<script src="https://unpkg.com/leaflet@1.9.4/dist/leaflet.js"></script>"#;

// Page layout shared by every view
const LAYOUT_HTML: &str = r#"<!DOCTYPE html>
<html lang="el">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title><!-- TITLE --></title>
    <!-- HEAD -->
    <link rel="stylesheet" href="/static/style.css" />
</head>
<body>
    <header class="topbar">
        <a href="/dashboard">Κόμβοι</a>
        <a href="/drone">Drone</a>
        <span class="clock"><span id="current-time"></span> <span id="current-date"></span></span>
    </header>
    <!-- BODY -->
    <!-- SCRIPTS -->
    <script src="/static/clock.js"></script>
</body>
</html>"#;

/// Fills empty `<span>` targets with the board's text, so the page shows a
/// value before its script runs.
pub fn prefill(html: String, board: &TextBoard) -> String {
    ElementId::ALL.iter().fold(html, |html, id| match board.text(*id) {
        Some(text) if !text.is_empty() => {
            let empty = format!("id=\"{}\"></span>", id.dom_id());
            html.replace(&empty, &format!("id=\"{}\">{}</span>", id.dom_id(), escape_html(text)))
        }
        _ => html,
    })
}

fn layout(title: &str, head: &str, body: &str, scripts: &str) -> String {
    LAYOUT_HTML
        .replace("<!-- TITLE -->", &escape_html(title))
        .replace("<!-- HEAD -->", head)
        .replace("<!-- BODY -->", body)
        .replace("<!-- SCRIPTS -->", scripts)
}

pub fn dashboard_page(region: Option<&str>, nodes: &[Node], scene: &MapScene) -> String {
    let heading = region.map(escape_html).unwrap_or_else(|| "Όλες οι περιοχές".to_string());
    let body = format!(
        r#"<main class="map-page">
        <div class="info-panel">
            <h2>{heading}</h2>
            <p>Κόμβοι: <strong>{count}</strong></p>
            <p>Τελευταία ενημέρωση: <span id="db-update-time"></span></p>
        </div>
        <div id="map"></div>
    </main>"#,
        heading = heading,
        count = nodes.len(),
    );
    let scripts = format!(
        r#"{leaflet}
    <script>
        window.NODES = {nodes};
        window.NODE_MAP_SCENE = {scene};
    </script>
    <script src="/static/scene.js"></script>
    <script src="/static/nodes.js"></script>"#,
        leaflet = LEAFLET_SCRIPT,
        nodes = script_json(&nodes),
        scene = script_json(scene),
    );
    layout("Πίνακας Κόμβων", LEAFLET_HEAD, &body, &scripts)
}

/// `marker` is the drone's marker inside `scene`.
pub fn drone_page(drone_image_url: &str, scene: &MapScene, marker: MarkerId, telemetry_interval_ms: u64) -> String {
    let body = r#"<main class="map-page">
        <div class="info-panel">
            <h2>Επιτήρηση Drone</h2>
            <dl class="telemetry">
                <dt>Θέση</dt><dd id="location">-</dd>
                <dt>Υψόμετρο</dt><dd id="altitude">-</dd>
                <dt>Ταχύτητα</dt><dd id="speed">-</dd>
                <dt>Μπαταρία</dt><dd id="battery">-</dd>
                <dt>Κατάσταση</dt><dd id="fire-status">-</dd>
                <dt>Τελευταία ενημέρωση</dt><dd id="last-update">-</dd>
            </dl>
        </div>
        <div id="map"></div>
    </main>"#;
    let scripts = format!(
        r#"{leaflet}
    <script>
        window.DRONE_IMAGE_URL = {url};
        window.DRONE_MAP_SCENE = {scene};
        window.DRONE_MARKER = {marker};
        window.TELEMETRY_INTERVAL_MS = {interval};
    </script>
    <script src="/static/scene.js"></script>
    <script src="/static/drone.js"></script>"#,
        leaflet = LEAFLET_SCRIPT,
        url = script_json(&drone_image_url),
        scene = script_json(scene),
        marker = marker.0,
        interval = telemetry_interval_ms,
    );
    layout("Drone", LEAFLET_HEAD, body, &scripts)
}

pub fn node_page(node: &NodeView) -> String {
    let mut rows = vec![
        ("Κωδικός", escape_html(&node.node_id)),
        ("Τοποθεσία", escape_html(&node.location)),
    ];
    if let (Some(lat), Some(lng)) = (node.lat, node.lng) {
        rows.push(("Συντεταγμένες", format!("{:.6}, {:.6}", lat, lng)));
    }
    match &node.latest {
        Some(reading) => {
            rows.push(("Θερμοκρασία", format!("{:.1} °C", reading.temperature)));
            rows.push(("Υγρασία", format!("{:.1} %", reading.humidity)));
            rows.push(("Αέρια / καπνός", format!("{:.2}", reading.gas_and_smoke)));
            rows.push(("Επίπεδο κινδύνου", format!("{:.0}", reading.danger_level)));
            rows.push(("Βροχή", if reading.rain { "Ναι" } else { "Όχι" }.to_string()));
            rows.push(("Ταχύτητα ανέμου", format!("{:.1} m/s", reading.wind_speed)));
            rows.push(("Πυκνότητα βλάστησης", format!("{:.0}", reading.flora_density)));
            rows.push(("Κλίση", format!("{:.0}°", reading.slope)));
            rows.push(("Μέτρηση", escape_html(&reading.timestamp)));
        }
        None => rows.push(("Μετρήσεις", "Δεν υπάρχουν ιστορικά δεδομένα".to_string())),
    }

    let table: String = rows
        .iter()
        .map(|(label, value)| format!("<tr><th>{}</th><td>{}</td></tr>", label, value))
        .collect::<Vec<_>>()
        .join("\n                ");
    let body = format!(
        r#"<main class="detail-page">
        <h2>{title}</h2>
        <table class="node-info">
                {table}
        </table>
        <p><a href="/history/{id}">Ιστορικό μετρήσεων</a></p>
    </main>"#,
        title = escape_html(&node.title),
        table = table,
        id = escape_html(&node.node_id),
    );
    layout(&node.title, "", &body, "")
}

pub fn parent_page(parent: &Node, reports: &[ParentReport]) -> String {
    let items = if reports.is_empty() {
        "<li>Δεν υπάρχουν αναφορές</li>".to_string()
    } else {
        reports
            .iter()
            .map(|r| {
                format!(
                    "<li><strong>{}</strong> {} <em>{}</em></li>",
                    escape_html(&r.report_type),
                    escape_html(&r.timestamp),
                    escape_html(&r.status)
                )
            })
            .collect::<Vec<_>>()
            .join("\n            ")
    };
    let body = format!(
        r#"<main class="detail-page">
        <h2>{title}</h2>
        <p>{location}</p>
        <ul class="reports">
            {items}
        </ul>
    </main>"#,
        title = escape_html(parent.label()),
        location = escape_html(parent.location.as_deref().unwrap_or_default()),
        items = items,
    );
    layout(parent.label(), "", &body, "")
}

pub fn nodes_page(region: Option<&str>, nodes: &[Node]) -> String {
    let rows = if nodes.is_empty() {
        "<tr><td colspan=\"4\">Δεν βρέθηκαν κόμβοι</td></tr>".to_string()
    } else {
        nodes
            .iter()
            .map(|node| {
                format!(
                    "<tr><td><a href=\"{url}\">{id}</a></td><td>{title}</td><td>{location}</td><td>{kind}</td></tr>",
                    url = escape_html(&node.url()),
                    id = escape_html(&node.node_id),
                    title = escape_html(node.label()),
                    location = escape_html(node.location.as_deref().unwrap_or_default()),
                    kind = if node.is_parent() { "Γονικός" } else { "Αισθητήρας" },
                )
            })
            .collect::<Vec<_>>()
            .join("\n                ")
    };
    let body = format!(
        r#"<main class="detail-page">
        <h2>{heading}</h2>
        <table class="node-list">
            <tr><th>Κωδικός</th><th>Όνομα</th><th>Τοποθεσία</th><th>Τύπος</th></tr>
                {rows}
        </table>
    </main>"#,
        heading = region.map(escape_html).unwrap_or_else(|| "Όλοι οι κόμβοι".to_string()),
        rows = rows,
    );
    layout("Κόμβοι", "", &body, "")
}

/// Reading table for one node. `node` is absent when only readings exist.
pub fn history_page(node_id: &str, node: Option<&Node>, readings: &[NormalizedReading]) -> String {
    let title = node.map(Node::label).unwrap_or(node_id);
    let content = if readings.is_empty() {
        "<p class=\"message\">No historical data available</p>".to_string()
    } else {
        let rows = readings
            .iter()
            .map(|r| {
                format!(
                    "<tr><td>{}</td><td>{:.1}</td><td>{:.1}</td><td>{:.2}</td><td>{:.0}</td><td>{}</td><td>{:.1}</td></tr>",
                    escape_html(&r.timestamp),
                    r.temperature,
                    r.humidity,
                    r.gas_and_smoke,
                    r.danger_level,
                    if r.rain { "Ναι" } else { "Όχι" },
                    r.wind_speed,
                )
            })
            .collect::<Vec<_>>()
            .join("\n                ");
        format!(
            r#"<table class="history">
            <tr><th>Μέτρηση</th><th>°C</th><th>%</th><th>Αέρια / καπνός</th><th>Κίνδυνος</th><th>Βροχή</th><th>m/s</th></tr>
                {}
        </table>"#,
            rows
        )
    };
    let body = format!(
        r#"<main class="detail-page">
        <h2>{title}</h2>
        {content}
    </main>"#,
        title = escape_html(title),
        content = content,
    );
    layout(title, "", &body, "")
}

pub fn error_page(message: &str) -> String {
    let body = format!(
        r#"<main class="detail-page error">
        <h2>Σφάλμα</h2>
        <p>{}</p>
        <p><a href="/dashboard">Επιστροφή</a></p>
    </main>"#,
        escape_html(message)
    );
    layout("Σφάλμα", "", &body, "")
}
