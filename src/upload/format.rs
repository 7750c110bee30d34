//! 3D model formats accepted by the Roblox asset API.

/// Concrete format of the bytes being uploaded
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelFormat {
    Fbx,
    Glb,
    Gltf,
    Obj,
}

impl ModelFormat {
    /// Parse a requested format name (case-insensitive)
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "fbx" => Some(ModelFormat::Fbx),
            "glb" => Some(ModelFormat::Glb),
            "gltf" => Some(ModelFormat::Gltf),
            "obj" => Some(ModelFormat::Obj),
            _ => None,
        }
    }

    /// Format implied by a file name's extension
    pub fn from_file_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        let (_, ext) = lower.rsplit_once('.')?;
        Self::parse(ext)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ModelFormat::Fbx => "fbx",
            ModelFormat::Glb => "glb",
            ModelFormat::Gltf => "gltf",
            ModelFormat::Obj => "obj",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ModelFormat::Fbx => "model/fbx",
            ModelFormat::Glb => "model/gltf-binary",
            ModelFormat::Gltf => "model/gltf+json",
            ModelFormat::Obj => "model/obj",
        }
    }

    /// Synthetic file name for the multipart upload
    pub fn file_name(&self) -> &'static str {
        match self {
            ModelFormat::Fbx => "model.fbx",
            ModelFormat::Glb => "model.glb",
            ModelFormat::Gltf => "model.gltf",
            ModelFormat::Obj => "model.obj",
        }
    }
}

/// Archive entry extensions searched for a requested format, in priority order.
///
/// `gltf` also accepts a `.glb`; unknown formats fall back to `.glb`/`.fbx`.
pub fn search_extensions(requested: &str) -> &'static [&'static str] {
    match ModelFormat::parse(requested) {
        Some(ModelFormat::Fbx) => &[".fbx"],
        Some(ModelFormat::Glb) => &[".glb"],
        Some(ModelFormat::Gltf) => &[".gltf", ".glb"],
        Some(ModelFormat::Obj) => &[".obj"],
        None => &[".glb", ".fbx"],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_types() {
        assert_eq!(ModelFormat::Fbx.content_type(), "model/fbx");
        assert_eq!(ModelFormat::Glb.content_type(), "model/gltf-binary");
        assert_eq!(ModelFormat::Gltf.content_type(), "model/gltf+json");
        assert_eq!(ModelFormat::Obj.content_type(), "model/obj");
    }

    #[test]
    fn test_from_file_name() {
        assert_eq!(ModelFormat::from_file_name("out/Model.GLB"), Some(ModelFormat::Glb));
        assert_eq!(ModelFormat::from_file_name("scene.gltf"), Some(ModelFormat::Gltf));
        assert_eq!(ModelFormat::from_file_name("textures.png"), None);
        assert_eq!(ModelFormat::from_file_name("noext"), None);
    }

    #[test]
    fn test_search_extensions() {
        assert_eq!(search_extensions("glb"), &[".glb"]);
        assert_eq!(search_extensions("gltf"), &[".gltf", ".glb"]);
        assert_eq!(search_extensions("FBX"), &[".fbx"]);
        assert_eq!(search_extensions("usdz"), &[".glb", ".fbx"]);
    }
}
