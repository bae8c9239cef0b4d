use pulldown_cmark::{Event, Options, Parser, html};

/// Renders entry Markdown to HTML.
///
/// Raw HTML in the source is emitted as escaped text, so an entry can never
/// inject markup or scripts into the page.
pub fn render(content: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);

    let parser = Parser::new_ext(content, options).map(|event| match event {
        Event::Html(raw) | Event::InlineHtml(raw) => Event::Text(raw),
        other => other,
    });
    let mut out = String::with_capacity(content.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_headings_and_links() {
        let out = render("# Git\n\nSee [Python](/encyclopedia/wiki/Python).");
        assert!(out.contains("<h1>Git</h1>"));
        assert!(out.contains(r#"<a href="/encyclopedia/wiki/Python">Python</a>"#));
    }

    #[test]
    fn inline_html_is_escaped() {
        let out = render("hi <script>alert(document.cookie)</script>");
        assert!(!out.contains("<script>"));
        assert!(out.contains("&lt;script&gt;"));
    }

    #[test]
    fn html_block_is_escaped() {
        let out = render("<div onclick=\"steal()\">\nclick\n</div>\n");
        assert!(!out.contains("<div"));
        assert!(out.contains("&lt;div"));
    }
}
