//! Model extraction from downloaded ZIP payloads.
//!
//! Meshy may deliver either a bare model file or a ZIP holding the model
//! next to textures. Bare payloads are used verbatim.

use super::format::{search_extensions, ModelFormat};
use async_zip::base::read::seek::ZipFileReader;
use futures::io::Cursor;
use tracing::debug;

/// End-of-central-directory record signature
const EOCD_SIGNATURE: &[u8; 4] = b"PK\x05\x06";
/// Fixed EOCD size plus the largest possible archive comment
const EOCD_SEARCH_WINDOW: usize = 22 + 65_535;

/// Bytes ready for upload, with their authoritative format
#[derive(Debug, Clone)]
pub struct ResolvedModel {
    pub data: Vec<u8>,
    pub format: ModelFormat,
    /// Archive entry the bytes came from (None for bare payloads)
    pub archive_entry: Option<String>,
}

/// Extraction failures
#[derive(Debug, Clone, PartialEq)]
pub enum ArchiveError {
    /// No entry matched the requested format
    NoMatch { requested: String, entries: Vec<String> },
    /// The matching entry could not be decompressed
    Read(String),
}

impl std::fmt::Display for ArchiveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ArchiveError::NoMatch { requested, entries } => write!(
                f,
                "No {} model file found in ZIP. Contents: {:?}",
                requested, entries
            ),
            ArchiveError::Read(msg) => write!(f, "Failed to extract model from ZIP: {}", msg),
        }
    }
}

impl std::error::Error for ArchiveError {}

/// Cheap check for a ZIP end-of-central-directory record
pub fn looks_like_zip(data: &[u8]) -> bool {
    if data.len() < 22 {
        return false;
    }
    let window = &data[data.len().saturating_sub(EOCD_SEARCH_WINDOW)..];
    window.windows(4).any(|w| w == EOCD_SIGNATURE)
}

/// Resolve the upload payload for `requested` format.
///
/// If `raw` is a ZIP, the first entry (in archive order) with a matching
/// extension is extracted and its extension decides the format.
pub async fn resolve_model(raw: Vec<u8>, requested: &str) -> Result<ResolvedModel, ArchiveError> {
    let fallback_format = ModelFormat::parse(requested).unwrap_or(ModelFormat::Glb);

    if !looks_like_zip(&raw) {
        return Ok(ResolvedModel {
            data: raw,
            format: fallback_format,
            archive_entry: None,
        });
    }

    match extract_entry(&raw, requested).await? {
        Some((name, data)) => Ok(ResolvedModel {
            data,
            format: ModelFormat::from_file_name(&name).unwrap_or(fallback_format),
            archive_entry: Some(name),
        }),
        None => Ok(ResolvedModel {
            data: raw,
            format: fallback_format,
            archive_entry: None,
        }),
    }
}

/// Inflate the first entry matching `requested`, reading the archive in place.
///
/// Returns `None` when the bytes are not a readable archive.
async fn extract_entry(
    raw: &[u8],
    requested: &str,
) -> Result<Option<(String, Vec<u8>)>, ArchiveError> {
    let mut reader = match ZipFileReader::new(Cursor::new(raw)).await {
        Ok(reader) => reader,
        Err(e) => {
            debug!(error = %e, "Payload has a ZIP signature but is not a readable archive");
            return Ok(None);
        }
    };

    let extensions = search_extensions(requested);
    let names: Vec<String> = reader
        .file()
        .entries()
        .iter()
        .map(|entry| {
            entry
                .filename()
                .as_str()
                .map(str::to_string)
                .unwrap_or_default()
        })
        .collect();

    let matched = names.iter().position(|name| {
        let lower = name.to_ascii_lowercase();
        extensions.iter().any(|ext| lower.ends_with(ext))
    });

    let Some(index) = matched else {
        return Err(ArchiveError::NoMatch {
            requested: requested.to_string(),
            entries: names,
        });
    };

    let mut entry_reader = reader
        .reader_with_entry(index)
        .await
        .map_err(|e| ArchiveError::Read(e.to_string()))?;
    let mut data = Vec::new();
    entry_reader
        .read_to_end_checked(&mut data)
        .await
        .map_err(|e| ArchiveError::Read(e.to_string()))?;

    Ok(Some((names[index].clone(), data)))
}


#[cfg(test)]
mod tests {
    use super::test_support::build_zip;
    use super::*;

    #[tokio::test]
    async fn test_extracts_requested_glb() {
        let zip = build_zip(&[("model.glb", "glTF-binary"), ("textures.png", "PNG")]).await;

        let resolved = resolve_model(zip, "glb").await.unwrap();

        assert_eq!(resolved.data, b"glTF-binary");
        assert_eq!(resolved.format, ModelFormat::Glb);
        assert_eq!(resolved.archive_entry.as_deref(), Some("model.glb"));
    }

    #[tokio::test]
    async fn test_raw_payload_used_verbatim() {
        let raw = b"glTF\x02\x00\x00\x00 raw model bytes".to_vec();

        let resolved = resolve_model(raw.clone(), "glb").await.unwrap();

        assert_eq!(resolved.data, raw);
        assert_eq!(resolved.format, ModelFormat::Glb);
        assert!(resolved.archive_entry.is_none());
    }

    #[tokio::test]
    async fn test_gltf_falls_back_to_glb_and_rederives_format() {
        let zip = build_zip(&[("readme.txt", "hi"), ("mesh/Model.GLB", "binary")]).await;

        let resolved = resolve_model(zip, "gltf").await.unwrap();

        assert_eq!(resolved.data, b"binary");
        assert_eq!(resolved.format, ModelFormat::Glb);
    }

    #[tokio::test]
    async fn test_first_match_in_archive_order_wins() {
        let zip = build_zip(&[("b.fbx", "second-name"), ("a.fbx", "first-name")]).await;

        let resolved = resolve_model(zip, "fbx").await.unwrap();

        assert_eq!(resolved.archive_entry.as_deref(), Some("b.fbx"));
        assert_eq!(resolved.data, b"second-name");
    }

    #[tokio::test]
    async fn test_unknown_format_searches_glb_then_fbx() {
        let zip = build_zip(&[("model.fbx", "fbx-data")]).await;

        let resolved = resolve_model(zip, "usdz").await.unwrap();

        assert_eq!(resolved.format, ModelFormat::Fbx);
        assert_eq!(resolved.data, b"fbx-data");
    }

    #[tokio::test]
    async fn test_no_match_lists_contents() {
        let zip = build_zip(&[("model.obj", "v 0 0 0"), ("model.mtl", "")]).await;

        let err = resolve_model(zip, "fbx").await.unwrap_err();

        assert_eq!(
            err,
            ArchiveError::NoMatch {
                requested: "fbx".to_string(),
                entries: vec!["model.obj".to_string(), "model.mtl".to_string()],
            }
        );
        assert!(err.to_string().contains("model.obj"));
    }

    #[tokio::test]
    async fn test_unreadable_archive_uploaded_raw() {
        // EOCD pointing at a central directory that is not there
        let mut raw = vec![b'A'; 64];
        raw.extend_from_slice(b"PK\x05\x06");
        raw.extend_from_slice(&[0, 0, 0, 0, 1, 0, 1, 0]);
        raw.extend_from_slice(&46u32.to_le_bytes());
        raw.extend_from_slice(&0u32.to_le_bytes());
        raw.extend_from_slice(&[0, 0]);
        assert!(looks_like_zip(&raw));

        let resolved = resolve_model(raw.clone(), "fbx").await.unwrap();

        assert_eq!(resolved.data, raw);
        assert_eq!(resolved.format, ModelFormat::Fbx);
        assert!(resolved.archive_entry.is_none());
    }

    #[test]
    fn test_looks_like_zip() {
        assert!(!looks_like_zip(b"short"));
        assert!(!looks_like_zip(&[0u8; 64]));

        let mut eocd = vec![0u8; 10];
        eocd.extend_from_slice(b"PK\x05\x06");
        eocd.extend_from_slice(&[0u8; 18]);
        assert!(looks_like_zip(&eocd));
    }
}
