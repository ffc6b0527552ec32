//! Markup script reference rewriting
//!
//! A page that loads a source file directly (`<script src="/main.civet">`)
//! would bypass resolution. The rewriter points such references at the routed
//! identifier instead, leaving every other byte of the document alone.

use regex::{Captures, Regex};
use std::borrow::Cow;
use std::sync::LazyLock;

// Quoted attribute values may contain `>`.
static SCRIPT_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)<script\b(?:[^>"']|"[^"]*"|'[^']*')*>"#).expect("valid regex")
});

// One attribute per match, left to right. A stray quoted string is consumed
// whole so nothing inside it is read as an attribute. Group 1 is the name,
// group 2 the `=` with its whitespace, groups 3-5 the double-quoted,
// single-quoted and unquoted value.
static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#""[^"]*"|'[^']*'|([^\s"'>/=]+)(?:(\s*=\s*)(?:"([^"]*)"|'([^']*)'|([^\s"'=<>`]+)))?"#,
    )
    .expect("valid regex")
});

const SCRIPT_OPEN: usize = "<script".len();

/// Rewrites `<script src>` references to owned sources
#[derive(Debug, Clone)]
pub struct ReferenceRewriter {
    input_extension: String,
    suffix: String,
}

impl ReferenceRewriter {
    /// Rewriter turning `*<input_extension>` into `*<input_extension><suffix>`
    ///
    /// `suffix` is the router's decoration, output extension plus marker.
    pub fn new(input_extension: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            input_extension: input_extension.into(),
            suffix: suffix.into(),
        }
    }

    /// Rewrite every matching script reference in `html`
    ///
    /// Applying this twice gives the same document as applying it once.
    pub fn rewrite<'a>(&self, html: &'a str) -> Cow<'a, str> {
        SCRIPT_TAG.replace_all(html, |tag: &Captures| self.rewrite_tag(&tag[0]))
    }

    /// Rewrite the first `src` attribute of one opening tag
    fn rewrite_tag(&self, tag: &str) -> String {
        let (open, attributes) = tag.split_at(SCRIPT_OPEN);
        let src = ATTRIBUTE.captures_iter(attributes).find(|attr| {
            attr.get(1)
                .is_some_and(|name| name.as_str().eq_ignore_ascii_case("src"))
        });

        let Some(src) = src else {
            return tag.to_string();
        };
        let Some(rewritten) = self.rewrite_src(&src) else {
            return tag.to_string();
        };

        let span = src.get(0).map_or(0..0, |m| m.range());
        format!(
            "{}{}{}{}",
            open,
            &attributes[..span.start],
            rewritten,
            &attributes[span.end..]
        )
    }

    fn rewrite_src(&self, attr: &Captures) -> Option<String> {
        let name = attr.get(1)?.as_str();
        let equals = attr.get(2)?.as_str();
        let (value, quote) = match (attr.get(3), attr.get(4), attr.get(5)) {
            (Some(v), _, _) => (v.as_str(), "\""),
            (_, Some(v), _) => (v.as_str(), "'"),
            (_, _, Some(v)) => (v.as_str(), ""),
            _ => return None,
        };

        value
            .ends_with(&self.input_extension)
            .then(|| format!("{name}{equals}{quote}{value}{}{quote}", self.suffix))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rewriter() -> ReferenceRewriter {
        ReferenceRewriter::new(".civet", ".js?transform")
    }

    #[test]
    fn test_rewrites_quoted_and_unquoted_sources() {
        let html = concat!(
            "<script type=\"module\" src=\"/src/main.civet\"></script>\n",
            "<script src='/src/other.civet'></script>\n",
            "<SCRIPT SRC=/src/bare.civet></SCRIPT>\n",
        );

        assert_eq!(
            rewriter().rewrite(html),
            concat!(
                "<script type=\"module\" src=\"/src/main.civet.js?transform\"></script>\n",
                "<script src='/src/other.civet.js?transform'></script>\n",
                "<SCRIPT SRC=/src/bare.civet.js?transform></SCRIPT>\n",
            )
        );
    }

    #[test]
    fn test_unrelated_markup_is_untouched() {
        let html = concat!(
            "<!doctype html>\n<html>\n  <head>\n",
            "    <script src=\"/vendor/lib.js\"></script>\n",
            "    <img data-src=\"/a.civet\" src=\"/b.png\">\n",
            "    <script>const civet = 'x.civet';</script>\n",
            "  </head>\n</html>\n",
        );

        assert_eq!(rewriter().rewrite(html), html);
    }

    #[test]
    fn test_data_attribute_is_not_source() {
        let html = "<script data-src=\"/a.civet\" src=\"/b.civet\"></script>";

        assert_eq!(
            rewriter().rewrite(html),
            "<script data-src=\"/a.civet\" src=\"/b.civet.js?transform\"></script>"
        );
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let html = "<body><script type=\"module\" src=\"./app.civet\"></script></body>";
        let once = rewriter().rewrite(html).into_owned();
        let twice = rewriter().rewrite(&once).into_owned();

        assert_eq!(once, twice);
        assert!(once.contains("./app.civet.js?transform"));
    }

    #[test]
    fn test_src_inside_another_attribute_value_is_ignored() {
        let html = "<script data-note=\"see src=/a.civet\" src=\"/b.civet\"></script>";

        assert_eq!(
            rewriter().rewrite(html),
            "<script data-note=\"see src=/a.civet\" src=\"/b.civet.js?transform\"></script>"
        );
    }

    #[test]
    fn test_angle_bracket_in_quoted_value() {
        let html = "<script data-x=\"a>b\" src=\"/m.civet\"></script>";

        assert_eq!(
            rewriter().rewrite(html),
            "<script data-x=\"a>b\" src=\"/m.civet.js?transform\"></script>"
        );
    }

    #[test]
    fn test_only_first_src_counts() {
        let html = "<script src=\"/vendor.js\" src=\"/a.civet\"></script>";

        assert_eq!(rewriter().rewrite(html), html);
    }

    #[test]
    fn test_boolean_attributes_before_src() {
        let html = "<script async defer src=/a.civet></script>";

        assert_eq!(
            rewriter().rewrite(html),
            "<script async defer src=/a.civet.js?transform></script>"
        );
    }
}
