use std::sync::LazyLock;

use scraper::node::Node;
use scraper::{ElementRef, Selector};

use crate::block::{Annotations, TextRun};

static ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("BUG: hardcoded selector 'a[href]' is valid"));

/// Full text content of an element, markup dropped.
pub fn flattened_text(element: ElementRef) -> String {
    element.text().collect()
}

/// Build the rich text runs of a content-bearing element.
///
/// Only one level of decoration is honoured: each direct child becomes one
/// run with the annotation of its own tag. A link is always a single run and
/// any formatting inside it is flattened.
pub fn runs_for(element: ElementRef) -> Vec<TextRun> {
    if let Some(href) = link_target(element) {
        let content = flattened_text(element);
        if content.is_empty() {
            return Vec::new();
        }
        return vec![TextRun::linked(content, href)];
    }

    let mut runs = Vec::new();
    for child in element.children() {
        match child.value() {
            Node::Text(text) => {
                if !text.trim().is_empty() {
                    runs.push(TextRun::plain(&**text));
                }
            }
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    runs.extend(run_for_child(child));
                }
            }
            _ => {}
        }
    }
    runs
}

fn run_for_child(child: ElementRef) -> Option<TextRun> {
    let tag = child.value().name();
    if tag == "br" {
        return Some(TextRun::plain("\n"));
    }

    let content = flattened_text(child);
    if content.is_empty() {
        return None;
    }

    let link = link_target(child).or_else(|| {
        child
            .select(&ANCHOR)
            .next()
            .and_then(|anchor| anchor.value().attr("href"))
            .map(str::to_string)
    });

    Some(TextRun {
        content,
        annotations: annotations_for(tag),
        link,
    })
}

fn link_target(element: ElementRef) -> Option<String> {
    if element.value().name() != "a" {
        return None;
    }
    element.value().attr("href").map(str::to_string)
}

fn annotations_for(tag: &str) -> Annotations {
    let mut annotations = Annotations::default();
    match tag {
        "b" | "strong" => annotations.bold = true,
        "i" | "em" => annotations.italic = true,
        "u" => annotations.underline = true,
        "code" => annotations.code = true,
        "del" | "s" => annotations.strikethrough = true,
        _ => {}
    }
    annotations
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use scraper::Html;

    fn runs(html: &str) -> Vec<TextRun> {
        let fragment = Html::parse_fragment(html);
        let element = fragment
            .root_element()
            .children()
            .find_map(ElementRef::wrap)
            .expect("fragment has an element");
        runs_for(element)
    }

    fn annotated(content: &str, f: impl FnOnce(&mut Annotations)) -> TextRun {
        let mut annotations = Annotations::default();
        f(&mut annotations);
        TextRun::plain(content).with_annotations(annotations)
    }

    #[test]
    fn plain_text() {
        assert_eq!(runs("<p>Hello world</p>"), vec![TextRun::plain("Hello world")]);
    }

    #[test]
    fn one_run_per_child_in_order() {
        assert_eq!(
            runs("<p>a <strong>b</strong> <em>c</em><code>d</code><del>e</del><u>f</u></p>"),
            vec![
                TextRun::plain("a "),
                annotated("b", |a| a.bold = true),
                annotated("c", |a| a.italic = true),
                annotated("d", |a| a.code = true),
                annotated("e", |a| a.strikethrough = true),
                annotated("f", |a| a.underline = true),
            ]
        );
    }

    #[test]
    fn whitespace_between_children_is_dropped() {
        assert_eq!(runs("<p><b>x</b> <i>y</i></p>").len(), 2);
    }

    #[test]
    fn link_child() {
        assert_eq!(
            runs(r#"<p>see <a href="https://x.com">here</a></p>"#),
            vec![TextRun::plain("see "), TextRun::linked("here", "https://x.com")]
        );
    }

    #[test]
    fn formatting_inside_link_is_flattened() {
        assert_eq!(
            runs(r#"<p><a href="https://x.com"><strong>bold</strong> link</a></p>"#),
            vec![TextRun::linked("bold link", "https://x.com")]
        );
    }

    #[test]
    fn element_that_is_a_link() {
        assert_eq!(
            runs(r#"<a href="https://x.com">x <em>y</em></a>"#),
            vec![TextRun::linked("x y", "https://x.com")]
        );
    }

    #[test]
    fn decorated_child_picks_up_nested_link() {
        assert_eq!(
            runs(r#"<p><strong>go <a href="https://x.com">there</a></strong></p>"#),
            vec![TextRun {
                content: "go there".to_string(),
                annotations: Annotations {
                    bold: true,
                    ..Annotations::default()
                },
                link: Some("https://x.com".to_string()),
            }]
        );
    }

    #[test]
    fn unknown_tag_is_plain() {
        assert_eq!(runs("<p><mark>hi</mark></p>"), vec![TextRun::plain("hi")]);
    }

    #[test]
    fn line_break() {
        assert_eq!(
            runs("<p>one<br>two</p>"),
            vec![TextRun::plain("one"), TextRun::plain("\n"), TextRun::plain("two")]
        );
    }
}
