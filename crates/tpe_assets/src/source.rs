//! Where image bytes come from.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use tpe_render::Image;

pub type ImageFuture<'a> = Pin<Box<dyn Future<Output = Result<Image, String>> + Send + 'a>>;

/// Asynchronous fetch-and-decode primitive the loader retries and times out.
pub trait ImageSource: Send + Sync {
    fn fetch<'a>(&'a self, path: &'a str) -> ImageFuture<'a>;
}

const FILE_SCHEME: &str = "file://";
const DATA_SCHEME: &str = "data:";

/// Decode the payload of a `data:image/<type>;base64,<payload>` URL.
pub fn decode_data_url(url: &str) -> Result<Vec<u8>, String> {
    let rest = url
        .strip_prefix(DATA_SCHEME)
        .ok_or_else(|| "Not a data URL".to_string())?;
    let (header, payload) = rest
        .split_once(',')
        .ok_or_else(|| "Malformed data URL: missing ','".to_string())?;
    let mut params = header.split(';');
    let mime = params.next().unwrap_or_default();
    if !mime.starts_with("image/") {
        return Err(format!("Data URL is not an image (media type '{mime}')"));
    }
    if !params.any(|param| param.eq_ignore_ascii_case("base64")) {
        return Err("Data URL is not base64-encoded".to_string());
    }
    STANDARD
        .decode(payload.trim())
        .map_err(|e| format!("Invalid base64 in data URL: {e}"))
}

/// Reads images from a directory tree. Paths starting with `/` are relative to
/// the root, the way a web server resolves them against its public directory.
#[derive(Debug, Clone)]
pub struct FsImageSource {
    root: PathBuf,
}

impl FsImageSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map an image path to a file. `file://` URLs name absolute files; other
    /// URL schemes are not readable from disk. Data URLs carry their bytes
    /// inline and never resolve to a file.
    pub fn resolve(&self, path: &str) -> Result<PathBuf, String> {
        if let Some(file) = path.strip_prefix(FILE_SCHEME) {
            return Ok(PathBuf::from(file));
        }
        if path.contains("://") || path.starts_with("data:") {
            return Err(format!("Unsupported image scheme in '{path}'"));
        }
        if path.trim().is_empty() {
            return Err("Empty image path".to_string());
        }
        Ok(self.root.join(path.trim_start_matches('/')))
    }
}

impl ImageSource for FsImageSource {
    fn fetch<'a>(&'a self, path: &'a str) -> ImageFuture<'a> {
        if path.starts_with(DATA_SCHEME) {
            let decoded = decode_data_url(path);
            return Box::pin(async move {
                let bytes = decoded?;
                tokio::task::spawn_blocking(move || Image::from_encoded(&bytes, "data URL"))
                    .await
                    .map_err(|e| format!("Image decode task failed: {e}"))?
            });
        }
        let resolved = self.resolve(path);
        Box::pin(async move {
            let file = resolved?;
            tokio::task::spawn_blocking(move || {
                let bytes = std::fs::read(&file)
                    .map_err(|e| format!("Failed to read {}: {e}", file.display()))?;
                Image::from_encoded(&bytes, &file.display().to_string())
            })
            .await
            .map_err(|e| format!("Image decode task failed: {e}"))?
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::fs;
    use std::io::Cursor;

    fn temp_root(name: &str) -> PathBuf {
        let root = std::env::temp_dir().join(format!("tpe_assets_{name}_{}", std::process::id()));
        fs::create_dir_all(&root).expect("create temp root");
        root
    }

    #[test]
    fn leading_slash_is_relative_to_root() {
        let source = FsImageSource::new("/srv/public");
        assert_eq!(
            source.resolve("/tileset_fixed.png").expect("resolve"),
            PathBuf::from("/srv/public/tileset_fixed.png")
        );
        assert_eq!(
            source.resolve("sprites/hero.png").expect("resolve"),
            PathBuf::from("/srv/public/sprites/hero.png")
        );
    }

    #[test]
    fn file_urls_are_absolute() {
        let source = FsImageSource::new("/srv/public");
        assert_eq!(
            source.resolve("file:///tmp/a.png").expect("resolve"),
            PathBuf::from("/tmp/a.png")
        );
    }

    #[test]
    fn remote_and_data_urls_do_not_resolve_to_files() {
        let source = FsImageSource::new("/srv/public");
        let err = source.resolve("https://cdn.example.com/a.png").expect_err("remote");
        assert!(err.contains("Unsupported"));
        assert!(source.resolve("data:image/png;base64,AAAA").is_err());
        assert!(source.resolve("").is_err());
    }

    fn png_data_url(pixel: [u8; 4]) -> String {
        let mut png = RgbaImage::new(1, 1);
        png.put_pixel(0, 0, Rgba(pixel));
        let mut bytes = Cursor::new(Vec::new());
        png.write_to(&mut bytes, ImageFormat::Png).expect("encode png");
        format!("data:image/png;base64,{}", STANDARD.encode(bytes.into_inner()))
    }

    #[tokio::test]
    async fn fetch_decodes_base64_data_url() {
        let source = FsImageSource::new("/nonexistent-root");
        let image = source
            .fetch(&png_data_url([9, 8, 7, 255]))
            .await
            .expect("data URL should decode");
        assert_eq!((image.width(), image.height()), (1, 1));
        assert_eq!(image.pixels().get_pixel(0, 0).0, [9, 8, 7, 255]);
    }

    #[tokio::test]
    async fn fetch_rejects_bad_data_urls_and_remote_urls() {
        let source = FsImageSource::new("/srv/public");

        let err = source
            .fetch("data:text/plain;base64,aGVsbG8=")
            .await
            .expect_err("not an image");
        assert!(err.contains("not an image"));

        let err = source
            .fetch("data:image/png,rawbytes")
            .await
            .expect_err("not base64");
        assert!(err.contains("not base64-encoded"));

        let err = source
            .fetch("data:image/png;base64,@@@")
            .await
            .expect_err("bad payload");
        assert!(err.contains("Invalid base64"));

        let err = source
            .fetch("data:image/png;base64,aGVsbG8=")
            .await
            .expect_err("payload is not a png");
        assert!(!err.is_empty());

        let err = source
            .fetch("https://cdn.example.com/a.png")
            .await
            .expect_err("remote");
        assert!(err.contains("Unsupported"));
    }

    #[tokio::test]
    async fn fetch_decodes_png_from_root() {
        let root = temp_root("fetch");
        let mut png = RgbaImage::new(2, 2);
        png.put_pixel(1, 0, Rgba([1, 2, 3, 255]));
        png.save_with_format(root.join("tiles.png"), ImageFormat::Png)
            .expect("write png");

        let source = FsImageSource::new(&root);
        let image = source.fetch("/tiles.png").await.expect("fetch");
        assert_eq!((image.width(), image.height()), (2, 2));
        assert_eq!(image.pixels().get_pixel(1, 0).0, [1, 2, 3, 255]);

        let err = source.fetch("/absent.png").await.expect_err("missing file");
        assert!(err.contains("absent.png"));
        let _ = fs::remove_dir_all(root);
    }
}
