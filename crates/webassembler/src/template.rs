//! Positional template binding.
//!
//! A template carries a marker of the form `<%=N%>`. Binding replaces the
//! first marker only, with the N-th substitution, and pretty-prints the
//! result. Further markers are left in place.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::error::TemplateError;
use crate::format::HtmlFormatter;

fn marker_regex() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(r"<%=([0-9]+)%>").expect("marker pattern compiles"))
}

/// Binds substitutions into templates, optionally formatting the output.
#[derive(Debug, Clone)]
pub struct TemplateBinder {
    formatter: Option<HtmlFormatter>,
}

impl Default for TemplateBinder {
    fn default() -> Self {
        Self {
            formatter: Some(HtmlFormatter::default()),
        }
    }
}

impl TemplateBinder {
    pub fn new(formatter: Option<HtmlFormatter>) -> Self {
        Self { formatter }
    }

    /// A binder that returns the substituted text as-is.
    pub fn raw() -> Self {
        Self { formatter: None }
    }

    /// Read the template at `path` and bind `substitutions` into it.
    pub fn bind_file<S: AsRef<str>>(
        &self,
        path: &Path,
        substitutions: &[S],
    ) -> Result<String, TemplateError> {
        let bytes = fs::read(path).map_err(|source| TemplateError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let template = String::from_utf8_lossy(&bytes);
        self.bind_str(&template, path, substitutions)
    }

    /// Bind into an in-memory template. `origin` names the template in
    /// error messages.
    pub fn bind_str<S: AsRef<str>>(
        &self,
        template: &str,
        origin: &Path,
        substitutions: &[S],
    ) -> Result<String, TemplateError> {
        let built = substitute(template, origin, substitutions)?;
        Ok(match &self.formatter {
            Some(formatter) => formatter.format(&built),
            None => built,
        })
    }
}

/// Replace the first `<%=N%>` marker in `template` with `substitutions[N]`,
/// without formatting.
///
/// A template without a marker comes back unchanged, whatever the
/// substitutions are.
pub fn substitute<S: AsRef<str>>(
    template: &str,
    origin: &Path,
    substitutions: &[S],
) -> Result<String, TemplateError> {
    let Some(captures) = marker_regex().captures(template) else {
        return Ok(template.to_owned());
    };
    let (Some(marker), Some(digits)) = (captures.get(0), captures.get(1)) else {
        return Ok(template.to_owned());
    };

    let value: &str = digits
        .as_str()
        .parse::<usize>()
        .ok()
        .and_then(|index| substitutions.get(index))
        .ok_or_else(|| TemplateError::IndexOutOfRange {
            path: origin.to_path_buf(),
            index: display_index(digits.as_str()),
            available: substitutions.len(),
        })?
        .as_ref();

    let mut built = String::with_capacity(template.len() + value.len());
    built.push_str(&template[..marker.start()]);
    built.push_str(value);
    built.push_str(&template[marker.end()..]);
    Ok(built)
}

/// Read and bind a template with the default formatter.
pub fn bind_template<P, S>(path: P, substitutions: &[S]) -> Result<String, TemplateError>
where
    P: AsRef<Path>,
    S: AsRef<str>,
{
    TemplateBinder::default().bind_file(path.as_ref(), substitutions)
}

/// Bind an in-memory template with the default formatter.
pub fn bind_template_str<S: AsRef<str>>(
    template: &str,
    origin: impl AsRef<Path>,
    substitutions: &[S],
) -> Result<String, TemplateError> {
    TemplateBinder::default().bind_str(template, origin.as_ref(), substitutions)
}

// "007" reports as 7
fn display_index(digits: &str) -> String {
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        "0".to_owned()
    } else {
        trimmed.to_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn origin() -> &'static Path {
        Path::new("template.html")
    }

    #[test]
    fn substitutes_marker() {
        let built = substitute("<h1><%=0%></h1>", origin(), &["<p>Hello</p>"]).unwrap();
        assert_eq!(built, "<h1><p>Hello</p></h1>");
    }

    #[test]
    fn only_first_marker_is_replaced() {
        let built = substitute("<%=1%> and <%=0%>", origin(), &["a", "b"]).unwrap();
        assert_eq!(built, "b and <%=0%>");
    }

    #[test]
    fn out_of_range_index_fails() {
        let err = substitute("<%=3%>", origin(), &["a", "b"]).unwrap_err();
        assert_eq!(err.to_string(), "Input index out of range in template.html: 3");
        assert!(matches!(
            err,
            TemplateError::IndexOutOfRange { available: 2, .. }
        ));
    }

    #[test]
    fn oversized_index_fails_instead_of_overflowing() {
        let err = substitute("<%=99999999999999999999999%>", origin(), &["a"]).unwrap_err();
        assert!(err.to_string().ends_with(": 99999999999999999999999"));
    }

    #[test]
    fn leading_zeros_are_parsed() {
        assert_eq!(substitute("<%=01%>", origin(), &["a", "b"]).unwrap(), "b");
        let err = substitute("<%=007%>", origin(), &["a"]).unwrap_err();
        assert!(err.to_string().ends_with(": 7"));
    }

    #[test]
    fn missing_marker_returns_template() {
        let empty: [&str; 0] = [];
        assert_eq!(substitute("<p>x</p>", origin(), &empty).unwrap(), "<p>x</p>");
        assert_eq!(substitute("<% =0 %>", origin(), &empty).unwrap(), "<% =0 %>");
    }

    #[test]
    fn substitution_text_is_not_rescanned() {
        let built = substitute("<div><%=0%></div>", origin(), &["<%=5%>"]).unwrap();
        assert_eq!(built, "<div><%=5%></div>");
    }

    #[test]
    fn default_binder_formats_output() {
        let html = bind_template_str("<h1><%=0%></h1>", origin(), &["<p>Hello</p>"]).unwrap();
        assert_eq!(html, "<h1>\n  <p>Hello</p>\n</h1>\n");
    }

    #[test]
    fn raw_binder_skips_formatting() {
        let html = TemplateBinder::raw()
            .bind_str("<h1><%=0%></h1>", origin(), &["<p>Hello</p>"])
            .unwrap();
        assert_eq!(html, "<h1><p>Hello</p></h1>");
    }
}
