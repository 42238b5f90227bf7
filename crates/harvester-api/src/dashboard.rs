//! Dashboard HTML rendering.

use chaos_harvester_core::events::ChaosEvent;

const PAGE_HEAD: &str = r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="utf-8">
    <title>&#9763; Chaos Harvester Console &#9763;</title>
</head>
<body style="background:#0d0d0d;color:#ff6666;font-family:monospace;padding:2rem;">
    <h1>&#9760; CHAOS HARVESTER &#9760;</h1>
    <p>Operational in dimension <b>&omega;</b>. Recording entropy:</p>
    <table border="1" cellpadding="6" style="width:100%;margin-top:2rem;color:#fff;border-color:#f33;">
        <tr style="color:#f55;">
            <th>Source</th><th>Threat</th><th>Insight</th><th>Keywords</th>
        </tr>
"#;

const PAGE_TAIL: &str = r#"    </table>
    <p style="margin-top:1rem;color:#999;">Inject more chaos via <code>/ingest</code>.</p>
</body>
</html>
"#;

/// Escape text for embedding in HTML element content or attributes
pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Render the dashboard page, one table row per event in the given order.
///
/// With `escape` off, stored text is emitted verbatim.
pub fn render_dashboard(events: &[ChaosEvent], escape: bool) -> String {
    let cell = |text: &str| {
        if escape {
            escape_html(text)
        } else {
            text.to_string()
        }
    };

    let mut html = String::from(PAGE_HEAD);
    for event in events {
        html.push_str(&format!(
            "        <tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>\n",
            cell(&event.source),
            cell(&event.threat_level),
            cell(&event.insight),
            cell(&event.keywords),
        ));
    }
    html.push_str(PAGE_TAIL);
    html
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str, insight: &str) -> ChaosEvent {
        ChaosEvent {
            id: id.to_string(),
            source: "darkfeeds".to_string(),
            insight: insight.to_string(),
            keywords: "anomalous, everywhere".to_string(),
            threat_level: "high".to_string(),
        }
    }

    #[test]
    fn test_empty_dashboard_has_header_only() {
        let html = render_dashboard(&[], true);
        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.trim_end().ends_with("</html>"));
        assert_eq!(html.matches("<tr").count(), 1);
        assert!(html.contains("<th>Source</th><th>Threat</th><th>Insight</th><th>Keywords</th>"));
    }

    #[test]
    fn test_one_row_per_event() {
        let events = vec![event("b", "first"), event("a", "second")];
        let html = render_dashboard(&events, true);

        assert_eq!(html.matches("<tr").count(), 3);
        assert!(html.find("first").unwrap() < html.find("second").unwrap());
        assert!(html.contains(
            "<tr><td>darkfeeds</td><td>high</td><td>first</td><td>anomalous, everywhere</td></tr>"
        ));
    }

    #[test]
    fn test_escaping_enabled() {
        let html = render_dashboard(&[event("a", "<script>alert('x')</script>")], true);
        assert!(!html.contains("<script>"));
        assert!(html.contains("&lt;script&gt;alert(&#x27;x&#x27;)&lt;/script&gt;"));
    }

    #[test]
    fn test_escaping_disabled_renders_verbatim() {
        let html = render_dashboard(&[event("a", "<b>bold</b>")], false);
        assert!(html.contains("<td><b>bold</b></td>"));
    }

    #[test]
    fn test_escape_html_ampersand_first() {
        assert_eq!(escape_html("&lt;"), "&amp;lt;");
        assert_eq!(escape_html("plain"), "plain");
    }
}
