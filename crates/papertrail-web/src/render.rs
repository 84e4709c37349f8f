//! Index page rendering.

use papertrail_common::Paper;

/// Page template; `{{papers_content}}` receives the rendered paper list.
pub const INDEX_HTML: &str = include_str!("../templates/index.html");
/// Per-paper fragment.
pub const PAPER_HTML: &str = include_str!("../templates/paper.html");
pub const STYLE_CSS: &str = include_str!("../templates/style.css");

pub const NO_PAPERS_HTML: &str = "<p>No papers found.</p>";

pub fn render_index(papers: &[Paper]) -> String {
    let papers_content = if papers.is_empty() {
        NO_PAPERS_HTML.to_string()
    } else {
        papers.iter().map(render_paper).collect()
    };
    fill(INDEX_HTML, &[("papers_content", papers_content.as_str())])
}

fn render_paper(paper: &Paper) -> String {
    let summary = format!("AI summary: {}", paper.summary);
    let published = paper.display_date();
    fill(
        PAPER_HTML,
        &[
            ("title", paper.title.as_str()),
            ("summary", summary.as_str()),
            ("published", published.as_str()),
            ("keyword", paper.keyword.as_str()),
            ("url", paper.url.as_str()),
        ],
    )
}

/// Replace each `{{name}}` in one pass. Substituted values are not rescanned;
/// unknown placeholders are kept verbatim.
fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find("{{") {
        out.push_str(&rest[..open]);
        let after = &rest[open + 2..];
        let Some(close) = after.find("}}") else {
            out.push_str(&rest[open..]);
            return out;
        };

        let name = &after[..close];
        match values.iter().find(|(key, _)| *key == name) {
            Some((_, value)) => out.push_str(value),
            None => out.push_str(&rest[open..open + 2 + close + 2]),
        }
        rest = &after[close + 2..];
    }

    out.push_str(rest);
    out
}
