/// A compound selector: optional tag, optional id and any number of classes.
///
/// Combinators, attribute selectors and selector lists are not supported;
/// parsing them yields `None` so callers treat the lookup as a miss.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct Selector {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

impl Selector {
    pub(crate) fn parse(input: &str) -> Option<Self> {
        let input = input.trim();
        if input.is_empty()
            || input.contains(char::is_whitespace)
            || input.contains(['>', '+', '~', '[', ',', ':'])
        {
            return None;
        }

        let mut selector = Self::default();
        let tag_end = input.find(['.', '#']).unwrap_or(input.len());
        if tag_end > 0 {
            selector.tag = Some(input[..tag_end].to_ascii_lowercase());
        }

        let mut rest = &input[tag_end..];
        while let Some(marker) = rest.chars().next() {
            let body = &rest[marker.len_utf8()..];
            let end = body.find(['.', '#']).unwrap_or(body.len());
            let name = &body[..end];
            if name.is_empty() {
                return None;
            }

            match marker {
                '.' => selector.classes.push(name.to_string()),
                '#' => selector.id = Some(name.to_string()),
                _ => return None,
            }

            rest = &body[end..];
        }

        Some(selector)
    }

    pub(crate) fn matches(&self, tag: &str, id: Option<&str>, classes: &[String]) -> bool {
        if let Some(expected) = &self.tag {
            if expected != "*" && expected != tag {
                return false;
            }
        }

        if let Some(expected) = &self.id {
            if id != Some(expected.as_str()) {
                return false;
            }
        }

        self.classes
            .iter()
            .all(|class| classes.iter().any(|candidate| candidate == class))
    }
}
