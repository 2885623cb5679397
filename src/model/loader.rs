use glam::Vec3;

use crate::controller::asset_stage::{AssetLoader, LoadCallback};
use crate::error::LoadFailure;
use crate::model::stl::parse_stl;
use crate::model::Mesh;

/// Prefix of model paths that are generated instead of fetched
pub const BUILTIN_PREFIX: &str = "builtin:";

/// Decode STL bytes, tagging failures with the path they came from
pub fn decode_model(path: &str, data: &[u8]) -> Result<Mesh, LoadFailure> {
    parse_stl(data).map_err(|e| LoadFailure::Decode {
        path: path.to_string(),
        reason: e.to_string(),
    })
}

/// Meshes that ship with the binary: `builtin:cube`
#[derive(Debug, Default, Clone, Copy)]
pub struct BuiltinLoader;

impl BuiltinLoader {
    pub fn mesh(name: &str) -> Result<Mesh, LoadFailure> {
        match name {
            // Sized like the reference model once the default 0.1 scale applies
            "cube" => Ok(Mesh::cuboid(Vec3::new(30.0, 60.0, 30.0))),
            other => Err(LoadFailure::UnknownBuiltin(other.to_string())),
        }
    }
}

impl AssetLoader for BuiltinLoader {
    fn load(&self, path: &str, on_done: LoadCallback) {
        let name = path.strip_prefix(BUILTIN_PREFIX).unwrap_or(path);
        on_done(Self::mesh(name));
    }
}

/// Reads models from the local filesystem; completes before `load` returns
#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug, Default, Clone)]
pub struct FileLoader {
    pub base_dir: Option<std::path::PathBuf>,
}

#[cfg(not(target_arch = "wasm32"))]
impl FileLoader {
    fn read(&self, path: &str) -> Result<Mesh, LoadFailure> {
        let full = match &self.base_dir {
            Some(dir) => dir.join(path),
            None => std::path::PathBuf::from(path),
        };
        let data = std::fs::read(&full).map_err(|e| LoadFailure::Io {
            path: full.display().to_string(),
            reason: e.to_string(),
        })?;
        decode_model(path, &data)
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl AssetLoader for FileLoader {
    fn load(&self, path: &str, on_done: LoadCallback) {
        on_done(self.read(path));
    }
}

/// Fetches models over HTTP relative to the page; completes on a later turn of the event loop
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default, Clone, Copy)]
pub struct FetchLoader;

#[cfg(target_arch = "wasm32")]
impl FetchLoader {
    async fn fetch(path: &str) -> Result<Vec<u8>, LoadFailure> {
        use wasm_bindgen::JsCast;
        use wasm_bindgen_futures::JsFuture;

        let io = |reason: String| LoadFailure::Io { path: path.to_string(), reason };
        let window = web_sys::window().ok_or_else(|| io("no window".into()))?;
        let response = JsFuture::from(window.fetch_with_str(path))
            .await
            .map_err(|e| io(format!("{e:?}")))?;
        let response: web_sys::Response = response.dyn_into().map_err(|e| io(format!("{e:?}")))?;
        if !response.ok() {
            return Err(LoadFailure::Http { path: path.to_string(), status: response.status() });
        }
        let body = response.array_buffer().map_err(|e| io(format!("{e:?}")))?;
        let buffer = JsFuture::from(body).await.map_err(|e| io(format!("{e:?}")))?;
        Ok(js_sys::Uint8Array::new(&buffer).to_vec())
    }
}

#[cfg(target_arch = "wasm32")]
impl AssetLoader for FetchLoader {
    fn load(&self, path: &str, on_done: LoadCallback) {
        let path = path.to_string();
        wasm_bindgen_futures::spawn_local(async move {
            let result = Self::fetch(&path).await.and_then(|data| decode_model(&path, &data));
            on_done(result);
        });
    }
}

/// Built-ins by prefix, everything else from the platform loader
#[derive(Debug, Default, Clone)]
pub struct DefaultLoader {
    #[cfg(not(target_arch = "wasm32"))]
    pub files: FileLoader,
    #[cfg(target_arch = "wasm32")]
    pub files: FetchLoader,
}

impl AssetLoader for DefaultLoader {
    fn load(&self, path: &str, on_done: LoadCallback) {
        if path.starts_with(BUILTIN_PREFIX) {
            BuiltinLoader.load(path, on_done);
        } else {
            self.files.load(path, on_done);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn load_now(loader: &impl AssetLoader, path: &str) -> Result<Mesh, LoadFailure> {
        let out = Rc::new(RefCell::new(None));
        let slot = out.clone();
        loader.load(path, Box::new(move |result| *slot.borrow_mut() = Some(result)));
        let result = out.borrow_mut().take();
        result.expect("loader completed synchronously")
    }

    #[test]
    fn builtin_cube() {
        let mesh = load_now(&DefaultLoader::default(), "builtin:cube").unwrap();
        assert_eq!(mesh.triangle_count(), 12);
    }

    #[test]
    fn builtin_prefix_never_reaches_the_platform_loader() {
        let loader = DefaultLoader {
            files: FileLoader { base_dir: Some("no/such/asset/root".into()) },
        };
        let mesh = load_now(&loader, "builtin:cube").unwrap();
        assert_eq!(mesh.triangle_count(), 12);
        assert!(matches!(
            load_now(&loader, "builtin:teapot"),
            Err(LoadFailure::UnknownBuiltin(_))
        ));
    }

    #[test]
    fn unknown_builtin() {
        assert_eq!(
            load_now(&BuiltinLoader, "builtin:teapot"),
            Err(LoadFailure::UnknownBuiltin("teapot".into()))
        );
    }

    #[test]
    fn missing_file_is_an_io_failure() {
        let result = load_now(&DefaultLoader::default(), "does/not/exist.stl");
        assert!(matches!(result, Err(LoadFailure::Io { .. })));
    }

    #[test]
    fn garbage_file_is_a_decode_failure() {
        let dir = std::env::temp_dir().join(format!("turntable-loader-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("bad.stl"), b"not a model").unwrap();

        let loader = FileLoader { base_dir: Some(dir.clone()) };
        let result = load_now(&loader, "bad.stl");
        assert!(matches!(result, Err(LoadFailure::Decode { ref path, .. }) if path == "bad.stl"));
        std::fs::remove_dir_all(dir).ok();
    }
}
