// Low-level HTML string scanning for saved listing pages.
// Deliberately naive but tailored to the card markup the directory site emits;
// tag and attribute matching is ASCII case-insensitive.

use crate::domain::model::ClientCard;
use regex::Regex;

/// Extracts `<a class="card">` entries from listing page HTML.
pub struct CardExtractor {
    star_re: Regex,
}

impl Default for CardExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl CardExtractor {
    pub fn new() -> Self {
        Self {
            // Star ratings render as "★ 123" somewhere inside the card.
            star_re: Regex::new(r"★\s*(\d+)").expect("static star pattern"),
        }
    }

    /// All cards in one page, in document order. Cards without an href are
    /// skipped; missing child nodes degrade to empty fields / zero stars.
    pub fn extract_cards(&self, html: &str, base_url: &str) -> Vec<ClientCard> {
        let mut cards = Vec::new();
        let mut from = 0;

        while let Some((start, end)) = next_anchor_block(html, from) {
            from = end;
            let block = &html[start..end];
            let open_tag = open_tag_of(block);

            if !has_class(open_tag, "card") {
                continue;
            }
            let Some(href) = attr_value(open_tag, "href") else {
                continue;
            };

            let title = first_tag_inner(block, "h3").unwrap_or_default();
            let description = first_tag_inner(block, "p").unwrap_or_default();
            let text = strip_tags(normalize_entities(block));
            let stars = self
                .star_re
                .captures(&text)
                .and_then(|caps| caps[1].parse::<u32>().ok())
                .unwrap_or(0);
            let category = text_segments(block)
                .into_iter()
                .find(|seg| seg.contains("Client"))
                .unwrap_or_default();

            cards.push(ClientCard {
                title,
                url: format!("{}{}", base_url.trim_end_matches('/'), href),
                stars,
                description,
                category,
                kind: None,
            });
        }

        cards
    }
}

/// Next complete `<a ...>...</a>` block from `from` onwards.
/// Anchors don't nest in valid HTML, so the first closing tag wins.
fn next_anchor_block(s: &str, from: usize) -> Option<(usize, usize)> {
    let lc = to_lowercase_fast(s);
    let rel = find_tag_open(&lc[from..])?;
    let start = from + rel;
    let open_end = s[start..].find('>')? + start + 1;
    let close_rel = lc[open_end..].find("</a>")?;
    let end = open_end + close_rel + "</a>".len();
    Some((start, end))
}

// "<a " or "<a\n" etc., not "<abbr".
fn find_tag_open(lc: &str) -> Option<usize> {
    let bytes = lc.as_bytes();
    let mut idx = 0;
    while let Some(rel) = lc[idx..].find("<a") {
        let pos = idx + rel;
        match bytes.get(pos + 2) {
            Some(b) if b.is_ascii_whitespace() || *b == b'>' => return Some(pos),
            Some(_) => idx = pos + 2,
            None => return None,
        }
    }
    None
}

/// The opening tag of a block, including both angle brackets.
fn open_tag_of(block: &str) -> &str {
    match block.find('>') {
        Some(end) => &block[..=end],
        None => block,
    }
}

/// Value of an attribute inside an opening tag; handles double/single quotes
/// and bare values.
fn attr_value(open_tag: &str, attr: &str) -> Option<String> {
    let lc = to_lowercase_fast(open_tag);
    let needle = format!("{}=", to_lowercase_fast(attr));
    let mut search_from = 0;

    loop {
        let rel = lc[search_from..].find(&needle)?;
        let at = search_from + rel;
        // Must start an attribute name, not the tail of another one.
        let preceded_ok = at == 0
            || lc
                .as_bytes()
                .get(at - 1)
                .map(|b| b.is_ascii_whitespace())
                .unwrap_or(false);
        if !preceded_ok {
            search_from = at + needle.len();
            continue;
        }

        let rest = &open_tag[at + needle.len()..];
        return Some(match rest.as_bytes().first()? {
            b'"' => rest[1..].split('"').next()?.to_string(),
            b'\'' => rest[1..].split('\'').next()?.to_string(),
            _ => rest
                .split(|c: char| c.is_ascii_whitespace() || c == '>')
                .next()?
                .to_string(),
        });
    }
}

/// Whether the opening tag's class list contains `wanted` as a whole token.
fn has_class(open_tag: &str, wanted: &str) -> bool {
    match attr_value(open_tag, "class") {
        Some(classes) => classes
            .split_ascii_whitespace()
            .any(|token| token.eq_ignore_ascii_case(wanted)),
        None => false,
    }
}

/// Inner text of the first `<tag>...</tag>` child, tags stripped and
/// whitespace collapsed. `<p>` must not match `<path>` and friends.
fn first_tag_inner(block: &str, tag: &str) -> Option<String> {
    let lc = to_lowercase_fast(block);
    let open_pat = format!("<{}", to_lowercase_fast(tag));
    let close_pat = format!("</{}>", to_lowercase_fast(tag));

    let mut search_from = 0;
    let open_idx = loop {
        let rel = lc[search_from..].find(&open_pat)?;
        let at = search_from + rel;
        match lc.as_bytes().get(at + open_pat.len()) {
            Some(b) if b.is_ascii_whitespace() || *b == b'>' => break at,
            Some(_) => search_from = at + open_pat.len(),
            None => return None,
        }
    };

    let after_open = block[open_idx..].find('>')? + open_idx + 1;
    let close_rel = lc[after_open..].find(&close_pat)?;
    let inner = &block[after_open..after_open + close_rel];
    Some(strip_tags(normalize_entities(inner)))
}

/// Text nodes of a block: the text between tags, entity-decoded, whitespace
/// collapsed, empties dropped.
fn text_segments(block: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_tag = false;

    for ch in block.chars() {
        match ch {
            '<' => {
                let seg = normalize_ws(&normalize_entities(&current));
                if !seg.is_empty() {
                    segments.push(seg);
                }
                current.clear();
                in_tag = true;
            }
            '>' => in_tag = false,
            _ if !in_tag => current.push(ch),
            _ => {}
        }
    }
    let seg = normalize_ws(&normalize_entities(&current));
    if !seg.is_empty() {
        segments.push(seg);
    }
    segments
}

/// Remove all `<...>` tags, then collapse whitespace.
fn strip_tags(s: String) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_tag = false;
    for ch in s.chars() {
        match ch {
            '<' => in_tag = true,
            '>' => in_tag = false,
            _ if !in_tag => out.push(ch),
            _ => {}
        }
    }
    normalize_ws(&out)
}

/// Minimal entity decoding: the two that actually show up in these pages.
fn normalize_entities(s: &str) -> String {
    s.replace("&nbsp;", " ").replace("&amp;", "&")
}

/// Collapse whitespace runs into single spaces and trim.
fn normalize_ws(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut prev_space = false;
    for ch in s.chars() {
        if ch.is_whitespace() {
            if !prev_space {
                out.push(' ');
                prev_space = true;
            }
        } else {
            out.push(ch);
            prev_space = false;
        }
    }
    out.trim().to_string()
}

fn to_lowercase_fast(s: &str) -> String {
    s.chars()
        .map(|c| if c.is_ascii() { c.to_ascii_lowercase() } else { c })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"
<html><body>
  <a class="card featured" href="/client/cline">
    <h3>Cline</h3>
    <p>Autonomous coding agent in your IDE</p>
    <span>★ 312</span>
    <span>Client</span>
  </a>
  <a href="/about">About</a>
  <A CLASS="card" HREF="/client/shelf-desktop">
    <h3>Shelf &amp; Desktop</h3>
    <p>Desktop
       companion</p>
    Client
  </A>
</body></html>
"#;

    #[test]
    fn test_extract_cards_counts_only_card_anchors() {
        let cards = CardExtractor::new().extract_cards(PAGE, "https://mcp.so");
        assert_eq!(cards.len(), 2);
    }

    #[test]
    fn test_extract_card_fields() {
        let cards = CardExtractor::new().extract_cards(PAGE, "https://mcp.so");

        assert_eq!(cards[0].title, "Cline");
        assert_eq!(cards[0].url, "https://mcp.so/client/cline");
        assert_eq!(cards[0].stars, 312);
        assert_eq!(cards[0].description, "Autonomous coding agent in your IDE");
        assert_eq!(cards[0].category, "Client");
    }

    #[test]
    fn test_extract_card_entities_and_whitespace() {
        let cards = CardExtractor::new().extract_cards(PAGE, "https://mcp.so");

        assert_eq!(cards[1].title, "Shelf & Desktop");
        assert_eq!(cards[1].description, "Desktop companion");
        // No star text node at all.
        assert_eq!(cards[1].stars, 0);
        assert_eq!(cards[1].category, "Client");
    }

    #[test]
    fn test_card_without_href_is_skipped() {
        let html = r#"<a class="card"><h3>Broken</h3></a>"#;
        let cards = CardExtractor::new().extract_cards(html, "https://mcp.so");
        assert!(cards.is_empty());
    }

    #[test]
    fn test_class_token_must_match_whole_word() {
        let html = r#"<a class="cardigan" href="/x"><h3>No</h3></a>"#;
        let cards = CardExtractor::new().extract_cards(html, "https://mcp.so");
        assert!(cards.is_empty());
    }

    #[test]
    fn test_attr_value_quoting_styles() {
        assert_eq!(
            attr_value(r#"<a href="/client/a">"#, "href").as_deref(),
            Some("/client/a")
        );
        assert_eq!(
            attr_value("<a href='/client/b'>", "href").as_deref(),
            Some("/client/b")
        );
        assert_eq!(
            attr_value("<a href=/client/c>", "href").as_deref(),
            Some("/client/c")
        );
        assert_eq!(attr_value("<a data-href=\"/x\">", "href"), None);
    }

    #[test]
    fn test_p_tag_does_not_match_svg_path() {
        let html = r#"<a class="card" href="/client/icon">
            <svg><path d="M0 0"/></svg>
            <h3>Icon</h3>
            <p>Real description</p>
            Client
        </a>"#;
        let cards = CardExtractor::new().extract_cards(html, "https://mcp.so");
        assert_eq!(cards[0].description, "Real description");
    }

    #[test]
    fn test_anchor_scan_skips_other_a_tags() {
        let html = "<abbr>x</abbr><a href=\"/y\">y</a>";
        let (start, end) = next_anchor_block(html, 0).unwrap();
        assert_eq!(&html[start..end], "<a href=\"/y\">y</a>");
    }
}
