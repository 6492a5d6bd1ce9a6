use std::fmt;
use std::path::Path;

/// OOXML container vs the older binary (OLE) format of the same family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Generation {
    OpenXml,
    Legacy,
}

/// Closed set of formats the extractor understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Word(Generation),
    Markdown,
    PlainText,
    Spreadsheet(Generation),
    Csv,
    Html,
    Presentation(Generation),
}

impl DocumentFormat {
    pub fn from_extension(extension: &str) -> Option<Self> {
        let format = match extension.to_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "docx" => Self::Word(Generation::OpenXml),
            "doc" => Self::Word(Generation::Legacy),
            "md" | "markdown" => Self::Markdown,
            "txt" => Self::PlainText,
            "xlsx" => Self::Spreadsheet(Generation::OpenXml),
            "xls" => Self::Spreadsheet(Generation::Legacy),
            "csv" => Self::Csv,
            "html" | "htm" => Self::Html,
            "pptx" => Self::Presentation(Generation::OpenXml),
            "ppt" => Self::Presentation(Generation::Legacy),
            _ => return None,
        };
        Some(format)
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

impl fmt::Display for DocumentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Pdf => "pdf",
            Self::Word(Generation::OpenXml) => "docx",
            Self::Word(Generation::Legacy) => "doc",
            Self::Markdown => "markdown",
            Self::PlainText => "txt",
            Self::Spreadsheet(Generation::OpenXml) => "xlsx",
            Self::Spreadsheet(Generation::Legacy) => "xls",
            Self::Csv => "csv",
            Self::Html => "html",
            Self::Presentation(Generation::OpenXml) => "pptx",
            Self::Presentation(Generation::Legacy) => "ppt",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_mapping() {
        assert_eq!(DocumentFormat::from_extension("PDF"), Some(DocumentFormat::Pdf));
        assert_eq!(
            DocumentFormat::from_extension("markdown"),
            Some(DocumentFormat::Markdown)
        );
        assert_eq!(DocumentFormat::from_extension("htm"), Some(DocumentFormat::Html));
        assert_eq!(
            DocumentFormat::from_extension("xls"),
            Some(DocumentFormat::Spreadsheet(Generation::Legacy))
        );
        assert_eq!(DocumentFormat::from_extension("exe"), None);
    }

    #[test]
    fn test_from_path() {
        assert_eq!(
            DocumentFormat::from_path(Path::new("/tmp/Report.DOCX")),
            Some(DocumentFormat::Word(Generation::OpenXml))
        );
        assert_eq!(DocumentFormat::from_path(Path::new("/tmp/no_extension")), None);
    }
}
