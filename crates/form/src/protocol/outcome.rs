use crate::protocol::{Disposition, PartHeaders};

/// How one part's body will be consumed, decided once from its headers
/// before any body byte is read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PartOutcome {
    /// Accumulate the body in memory under this field name
    Binary(String),
    /// Capture headers and body together as a list element under this field name
    NamedPart(String),
    /// Stream the body to a temp file
    FileUpload {
        name: String,
        content_type: Option<String>,
    },
    /// Drain the body and discard it
    Skip,
}

impl PartOutcome {
    /// Classifies a part from its parsed disposition and the configured
    /// options. Pure decision table:
    ///
    /// | disposition | result |
    /// |---|---|
    /// | `filename` or `filename*` present but empty | `Skip` |
    /// | `filename` or `filename*` non-empty | `FileUpload` |
    /// | only `name` | `Binary` |
    /// | no `content-disposition`, `include_unnamed_parts_at` set | `NamedPart` |
    /// | no `content-disposition`, option unset | `Skip` |
    ///
    /// A `Skip` part must still be drained by the caller so the boundary scan
    /// stays synchronized.
    pub fn classify(
        disposition: Option<&Disposition>,
        headers: &PartHeaders,
        include_unnamed_parts_at: Option<&str>,
    ) -> Self {
        let Some(disposition) = disposition else {
            return match include_unnamed_parts_at {
                Some(key) => PartOutcome::NamedPart(key.to_string()),
                None => PartOutcome::Skip,
            };
        };

        let filename = disposition.filename.as_deref().or(disposition.filename_ext.as_deref());

        match filename {
            Some("") => PartOutcome::Skip,
            Some(_) => PartOutcome::FileUpload {
                name: disposition.name.clone().unwrap_or_default(),
                content_type: headers.content_type().map(str::to_string),
            },
            None => match &disposition.name {
                Some(name) => PartOutcome::Binary(name.clone()),
                None => match include_unnamed_parts_at {
                    Some(key) => PartOutcome::NamedPart(key.to_string()),
                    None => PartOutcome::Skip,
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::PartHeaders;

    fn disposition(name: Option<&str>, filename: Option<&str>, filename_ext: Option<&str>) -> Disposition {
        Disposition {
            name: name.map(str::to_string),
            filename: filename.map(str::to_string),
            filename_ext: filename_ext.map(str::to_string),
        }
    }

    #[test]
    fn empty_filename_is_skipped_even_with_name() {
        let d = disposition(Some("pic"), Some(""), None);
        let outcome = PartOutcome::classify(Some(&d), &PartHeaders::default(), None);
        assert_eq!(outcome, PartOutcome::Skip);
    }

    #[test]
    fn empty_extended_filename_is_skipped() {
        let d = disposition(Some("pic"), None, Some(""));
        let outcome = PartOutcome::classify(Some(&d), &PartHeaders::default(), None);
        assert_eq!(outcome, PartOutcome::Skip);
    }

    #[test]
    fn filename_yields_upload_with_content_type() {
        let d = disposition(Some("pic"), Some("foo.txt"), None);
        let headers = PartHeaders::new(vec![("Content-Type".to_string(), "text/plain".to_string())]);
        let outcome = PartOutcome::classify(Some(&d), &headers, None);
        assert_eq!(
            outcome,
            PartOutcome::FileUpload { name: "pic".to_string(), content_type: Some("text/plain".to_string()) }
        );
    }

    #[test]
    fn bare_name_is_binary() {
        let d = disposition(Some("age"), None, None);
        let outcome = PartOutcome::classify(Some(&d), &PartHeaders::default(), None);
        assert_eq!(outcome, PartOutcome::Binary("age".to_string()));
    }

    #[test]
    fn headerless_part_goes_to_configured_key() {
        let outcome = PartOutcome::classify(None, &PartHeaders::default(), Some("parts"));
        assert_eq!(outcome, PartOutcome::NamedPart("parts".to_string()));

        let outcome = PartOutcome::classify(None, &PartHeaders::default(), None);
        assert_eq!(outcome, PartOutcome::Skip);
    }
}
