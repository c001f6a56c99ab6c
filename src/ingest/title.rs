// src/ingest/title.rs
//! Title repair for text glued together by the email-to-text extraction.

/// Brand names whose internal capitals must survive run-on repair.
const PRESERVED_WORDS: &[&str] = &[
    "OpenAI",
    "MacBook",
    "GitHub",
    "SaaS",
    "JavaScript",
    "NotebookLM",
    "NoteBookLM",
    "LiteLLM",
];

/// Insert the missing space in run-on titles:
/// `"WordWord"` → `"Word Word"`, `"end.Next"` → `"end. Next"`,
/// `"2026Feb"` → `"2026 Feb"`. Words in `PRESERVED_WORDS` stay intact but are
/// still split from their neighbours.
pub fn repair_title(title: &str) -> String {
    if title.is_empty() {
        return String::new();
    }

    // Each preserved word becomes a plain Titlecase token so the splitter
    // treats it like any other word.
    let mut masked = title.to_string();
    let keys: Vec<(String, &str)> = PRESERVED_WORDS
        .iter()
        .enumerate()
        .map(|(i, w)| (format!("Excepmask{}", (b'a' + i as u8) as char), *w))
        .collect();
    for (key, word) in &keys {
        masked = masked.replace(word, key);
    }

    let mut out = split_run_ons(&masked);

    for (key, word) in &keys {
        out = out.replace(key.as_str(), word);
    }
    out
}

fn split_run_ons(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len() + 8);
    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && c.is_ascii_uppercase() && needs_space_before(&chars[..i]) {
            out.push(' ');
        }
        out.push(c);
    }
    out
}

fn needs_space_before(prefix: &[char]) -> bool {
    let Some(&prev) = prefix.last() else {
        return false;
    };

    // Titlecase word directly followed by a capital.
    if prev.is_ascii_lowercase() {
        let run = prefix
            .iter()
            .rev()
            .take_while(|c| c.is_ascii_lowercase())
            .count();
        return prefix.len() > run && prefix[prefix.len() - run - 1].is_ascii_uppercase();
    }

    // Digit followed by a capital.
    if prev.is_ascii_digit() {
        return true;
    }

    // Punctuation followed by a capital, except openers and joiners.
    !prev.is_alphanumeric()
        && prev != '_'
        && !prev.is_whitespace()
        && !matches!(prev, '(' | '-' | '&' | '"' | '`')
}

/// Title derived from a URL when the record carried none.
///
/// Medium-style slugs (`/some-long-article-title-3f2a9c`) are turned into
/// words with the trailing hash dropped; otherwise the last path segment or
/// the host is used.
pub fn title_from_url(url: &str) -> String {
    let without_query = url.split(['?', '#']).next().unwrap_or_default();
    let parts: Vec<&str> = without_query
        .split('/')
        .filter(|p| !p.is_empty())
        .collect();

    for part in &parts {
        if part.len() > 20 && part.contains('-') && !part.starts_with("source=") {
            let words: Vec<&str> = part.split('-').filter(|w| !w.is_empty()).collect();
            if words.len() > 1 {
                return title_case(&words[..words.len() - 1].join(" "));
            }
        }
    }

    parts
        .iter()
        .rev()
        .find(|p| !p.ends_with(':'))
        .map(|p| p.replace(['-', '_'], " "))
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn title_case(s: &str) -> String {
    s.split(' ')
        .map(|w| {
            let mut cs = w.chars();
            match cs.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(cs.flat_map(char::to_lowercase))
                    .collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_glued_words() {
        assert_eq!(repair_title("HelloWorld"), "Hello World");
        assert_eq!(repair_title("Done.Next steps"), "Done. Next steps");
        assert_eq!(repair_title("Roadmap 2026Feb"), "Roadmap 2026 Feb");
    }

    #[test]
    fn keeps_preserved_words() {
        assert_eq!(repair_title("UsingOpenAI with GitHub"), "Using OpenAI with GitHub");
        assert_eq!(repair_title("JavaScript tips"), "JavaScript tips");
    }

    #[test]
    fn leaves_ordinary_titles_alone() {
        for t in ["Intro to Python", "iPhone tricks", "Why (Rust) wins", "rock-Solid", "AI & ML"] {
            assert_eq!(repair_title(t), t);
        }
    }

    #[test]
    fn slug_becomes_title() {
        assert_eq!(
            title_from_url("https://medium.com/@me/building-a-tiny-search-engine-3f2a9c?source=email"),
            "Building A Tiny Search Engine"
        );
        assert_eq!(title_from_url("https://x.dev/posts/rust_tips"), "rust tips");
        assert_eq!(title_from_url("https://x.dev/"), "x.dev");
    }
}
