//! Text serialization for configuration and metadata records.

use serde::de::DeserializeOwned;
use serde::Serialize;

pub type Result<T> = anyhow::Result<T>;

/// Text formats a host can use to exchange configs and correction metadata.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FileFormat {
    Yaml,
    Json,
}

impl FileFormat {
    pub fn all_formats_for_testing() -> [Self; 2] {
        [Self::Yaml, Self::Json]
    }

    /// Picks a format from a file name's extension.
    pub fn from_file_name(file_name: &str) -> Result<Self> {
        let ext = std::path::Path::new(file_name)
            .extension()
            .and_then(|os_str| os_str.to_str())
            .ok_or_else(|| anyhow::anyhow!("Failed to get file extension: {}", file_name))?;

        if ext.eq_ignore_ascii_case("yaml") || ext.eq_ignore_ascii_case("yml") {
            Ok(Self::Yaml)
        } else if ext.eq_ignore_ascii_case("json") {
            Ok(Self::Json)
        } else {
            anyhow::bail!("Unsupported file extension for file: {}", file_name)
        }
    }
}

pub fn serialize<T: Serialize>(value: &T, format: FileFormat) -> Result<String> {
    let text = match format {
        FileFormat::Yaml => serde_yml::to_string(value)?,
        FileFormat::Json => serde_json::to_string_pretty(value)?,
    };
    Ok(normalize_line_endings(&text))
}

pub fn deserialize<T: DeserializeOwned + 'static>(
    serialized: &str,
    format: FileFormat,
) -> Result<T> {
    match format {
        FileFormat::Yaml => Ok(serde_yml::from_str(serialized)?),
        FileFormat::Json => Ok(serde_json::from_str(serialized)?),
    }
}

/// Strips `\r` and guarantees a single trailing `\n`.
fn normalize_line_endings(text: &str) -> String {
    let mut out = text.replace("\r\n", "\n").replace('\r', "\n");
    if !out.ends_with('\n') {
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, serde::Serialize, serde::Deserialize)]
    struct Sample {
        name: String,
        level: f64,
    }

    #[test]
    fn roundtrip_in_every_format() {
        let sample = Sample {
            name: "ratio".to_string(),
            level: 0.25,
        };
        for format in FileFormat::all_formats_for_testing() {
            let text = serialize(&sample, format).unwrap();
            assert!(text.ends_with('\n'));
            let back: Sample = deserialize(&text, format).unwrap();
            assert_eq!(back, sample, "format {:?}", format);
        }
    }

    #[test]
    fn format_from_file_name() {
        assert_eq!(FileFormat::from_file_name("a.yml").unwrap(), FileFormat::Yaml);
        assert_eq!(FileFormat::from_file_name("a.YAML").unwrap(), FileFormat::Yaml);
        assert_eq!(FileFormat::from_file_name("a.json").unwrap(), FileFormat::Json);
        assert!(FileFormat::from_file_name("a.toml").is_err());
        assert!(FileFormat::from_file_name("noext").is_err());
    }

    #[test]
    fn crlf_is_normalized() {
        assert_eq!(normalize_line_endings("a\r\nb\rc"), "a\nb\nc\n");
        assert_eq!(normalize_line_endings("a\n"), "a\n");
    }

    #[test]
    fn invalid_yaml_is_an_error() {
        let result: Result<Sample> = deserialize("name: [unclosed", FileFormat::Yaml);
        assert!(result.is_err());
    }
}
